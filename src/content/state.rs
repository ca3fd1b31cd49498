//! Graphics state tracking.
//!
//! [`GraphicsStack`] interprets the state operators of a content stream
//! (`q`, `Q`, `cm`, line style, colour and text state) so that the path and
//! text scanners see the state in effect at every operation.

use serde::{Deserialize, Serialize};

use super::ops;
use crate::backend::{ContentOp, PdfValue};
use crate::error::{Error, Result};
use crate::geometry::Matrix;

/// An RGB colour with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn gray(g: f32) -> Self {
        Self { r: g, g, b: g }
    }

    pub fn cmyk(c: f32, m: f32, y: f32, k: f32) -> Self {
        Self {
            r: (1.0 - c) * (1.0 - k),
            g: (1.0 - m) * (1.0 - k),
            b: (1.0 - y) * (1.0 - k),
        }
    }

    /// Interpret colour operands by their count: 1 gray, 3 RGB, 4 CMYK.
    pub fn from_components(values: &[f32]) -> Option<Self> {
        match values {
            [g] => Some(Color::gray(*g)),
            [r, g, b] => Some(Color::rgb(*r, *g, *b)),
            [c, m, y, k] => Some(Color::cmyk(*c, *m, *y, *k)),
            _ => None,
        }
    }

    /// Hex notation, e.g. `#ff0000`.
    pub fn to_hex(&self) -> String {
        let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", c(self.r), c(self.g), c(self.b))
    }
}

/// Text state parameters, part of the graphics state.
#[derive(Debug, Clone, PartialEq)]
pub struct TextState {
    /// Font resource name selected by `Tf`
    pub font: Option<Vec<u8>>,
    pub size: f32,
    /// `Tc`
    pub char_spacing: f32,
    /// `Tw`
    pub word_spacing: f32,
    /// `Tz` as a factor (100% = 1.0)
    pub horizontal_scaling: f32,
    /// `TL`
    pub leading: f32,
    /// `Ts`
    pub rise: f32,
    /// `Tr`
    pub render_mode: i64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
            render_mode: 0,
        }
    }
}

/// The graphics state in effect at one point of a content stream.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsState {
    /// Current transformation matrix (user space to default user space)
    pub ctm: Matrix,
    pub stroke_color: Color,
    pub fill_color: Color,
    pub line_width: f32,
    pub line_join: i64,
    pub line_cap: i64,
    /// Dash pattern in content stream notation, e.g. `[3 2] 0`
    pub dashes: String,
    pub text: TextState,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            stroke_color: Color::BLACK,
            fill_color: Color::BLACK,
            line_width: 1.0,
            line_join: 0,
            line_cap: 0,
            dashes: "[] 0".to_string(),
            text: TextState::default(),
        }
    }
}

/// The `q`/`Q` stack plus the current state.
#[derive(Debug, Clone, Default)]
pub struct GraphicsStack {
    current: GraphicsState,
    saved: Vec<GraphicsState>,
}

impl GraphicsStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a given state (e.g. inherited by a form XObject).
    pub fn with_state(state: GraphicsState) -> Self {
        Self {
            current: state,
            saved: Vec::new(),
        }
    }

    pub fn current(&self) -> &GraphicsState {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut GraphicsState {
        &mut self.current
    }

    /// Number of saved states.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// `q`: push a copy of the current state.
    pub fn save(&mut self) {
        self.saved.push(self.current.clone());
    }

    /// `Q`: pop the most recently saved state.
    pub fn restore(&mut self, index: usize) -> Result<()> {
        match self.saved.pop() {
            Some(state) => {
                self.current = state;
                Ok(())
            }
            None => Err(Error::UnbalancedRestore(index)),
        }
    }

    /// Check that every `q` was matched by a `Q`.
    pub fn finish(&self) -> Result<()> {
        match self.depth() {
            0 => Ok(()),
            n => Err(Error::UnclosedSave(n)),
        }
    }

    /// Apply a state operator.
    ///
    /// Returns `Ok(true)` when the operator was a state operator, `Ok(false)`
    /// for anything else.
    pub fn apply(&mut self, op: &ContentOp, index: usize) -> Result<bool> {
        match op.operator.as_str() {
            "q" => {
                self.save();
                return Ok(true);
            }
            "Q" => {
                self.restore(index)?;
                return Ok(true);
            }
            _ => {}
        }
        let state = &mut self.current;
        match op.operator.as_str() {
            "cm" => {
                let m = ops::matrix(op, index)?;
                state.ctm = m.concat(&state.ctm);
            }
            "w" => state.line_width = ops::number(op, index)?,
            "J" => state.line_cap = ops::number(op, index)? as i64,
            "j" => state.line_join = ops::number(op, index)? as i64,
            "d" => state.dashes = dash_notation(op, index)?,
            "g" | "rg" | "k" => state.fill_color = device_color(op, index)?,
            "G" | "RG" | "K" => state.stroke_color = device_color(op, index)?,
            "sc" | "scn" => {
                if let Some(c) = Color::from_components(&ops::leading_numbers(op)) {
                    state.fill_color = c;
                }
            }
            "SC" | "SCN" => {
                if let Some(c) = Color::from_components(&ops::leading_numbers(op)) {
                    state.stroke_color = c;
                }
            }
            "cs" => state.fill_color = Color::BLACK,
            "CS" => state.stroke_color = Color::BLACK,
            "Tf" => {
                if op.operands.len() != 2 {
                    return Err(ops::syntax_error(op, index, "expected font name and size"));
                }
                let name = ops::name_at(op, index, 0)?.to_vec();
                let size = op.operands[1]
                    .as_number()
                    .ok_or_else(|| ops::syntax_error(op, index, "expected a font size"))?;
                state.text.font = Some(name);
                state.text.size = size;
            }
            "Tc" => state.text.char_spacing = ops::number(op, index)?,
            "Tw" => state.text.word_spacing = ops::number(op, index)?,
            "Tz" => state.text.horizontal_scaling = ops::number(op, index)? / 100.0,
            "TL" => state.text.leading = ops::number(op, index)?,
            "Ts" => state.text.rise = ops::number(op, index)?,
            "Tr" => state.text.render_mode = ops::number(op, index)? as i64,
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Run all state operators of a stream and check `q`/`Q` balance.
    pub fn check(ops: &[ContentOp]) -> Result<()> {
        let mut stack = GraphicsStack::new();
        for (index, op) in ops.iter().enumerate() {
            stack.apply(op, index)?;
        }
        stack.finish()
    }
}

fn device_color(op: &ContentOp, index: usize) -> Result<Color> {
    let values = match op.operator.as_str() {
        "g" | "G" => ops::numbers::<1>(op, index)?.to_vec(),
        "rg" | "RG" => ops::numbers::<3>(op, index)?.to_vec(),
        _ => ops::numbers::<4>(op, index)?.to_vec(),
    };
    Color::from_components(&values).ok_or_else(|| ops::syntax_error(op, index, "bad colour"))
}

fn dash_notation(op: &ContentOp, index: usize) -> Result<String> {
    match op.operands.as_slice() {
        [PdfValue::Array(items), phase] => {
            let phase = phase
                .as_number()
                .ok_or_else(|| ops::syntax_error(op, index, "expected a dash phase"))?;
            let items: Vec<String> = items
                .iter()
                .filter_map(PdfValue::as_number)
                .map(fmt_number)
                .collect();
            Ok(format!("[{}] {}", items.join(" "), fmt_number(phase)))
        }
        _ => Err(ops::syntax_error(op, index, "expected dash array and phase")),
    }
}

/// Shortest decimal form of a number (`3` rather than `3.0`).
pub(crate) fn fmt_number(v: f32) -> String {
    if v.fract() == 0.0 && v.abs() < 1e9 {
        format!("{}", v as i64)
    } else {
        let s = format!("{:.4}", v);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
