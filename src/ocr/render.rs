//! Region rendering through poppler's `pdftoppm`.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use super::{tool_error, RegionRenderer};
use crate::error::Result;
use crate::geometry::Rect;

/// Renders page regions of a PDF file with `pdftoppm -png -singlefile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdftoppmRenderer {
    pub program: PathBuf,
    /// The document to render
    pub pdf: PathBuf,
    /// Password of an encrypted document, tried as owner and user password
    pub password: Option<String>,
}

impl PdftoppmRenderer {
    pub fn new(pdf: impl Into<PathBuf>) -> Self {
        Self {
            program: PathBuf::from("pdftoppm"),
            pdf: pdf.into(),
            password: None,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    fn args(&self, page_number: u32, clip: &Rect, dpi: u32, gray: bool, prefix: &Path) -> Vec<String> {
        let [x, y, w, h] = pixel_box(clip, dpi);
        let mut args = vec![
            "-png".to_string(),
            "-singlefile".to_string(),
            "-r".to_string(),
            dpi.to_string(),
            "-f".to_string(),
            page_number.to_string(),
            "-l".to_string(),
            page_number.to_string(),
            "-x".to_string(),
            x.to_string(),
            "-y".to_string(),
            y.to_string(),
            "-W".to_string(),
            w.to_string(),
            "-H".to_string(),
            h.to_string(),
        ];
        if gray {
            args.push("-gray".to_string());
        }
        if let Some(ref password) = self.password {
            args.extend([
                "-opw".to_string(),
                password.clone(),
                "-upw".to_string(),
                password.clone(),
            ]);
        }
        args.push(self.pdf.display().to_string());
        args.push(prefix.display().to_string());
        args
    }
}

/// Crop box in pixels: x, y, width, height (at least one pixel each).
fn pixel_box(clip: &Rect, dpi: u32) -> [i64; 4] {
    let scale = dpi as f32 / 72.0;
    let px = clip.transform(&crate::geometry::Matrix::scale(scale, scale)).round_out();
    let x = px.x0.max(0.0) as i64;
    let y = px.y0.max(0.0) as i64;
    let w = ((px.x1 as i64) - x).max(1);
    let h = ((px.y1 as i64) - y).max(1);
    [x, y, w, h]
}

impl RegionRenderer for PdftoppmRenderer {
    fn render_region(&self, page_number: u32, clip: &Rect, dpi: u32, gray: bool) -> Result<Vec<u8>> {
        let dir = TempDir::new()?;
        let prefix = dir.path().join("region");
        let output = Command::new(&self.program)
            .args(self.args(page_number, clip, dpi, gray, &prefix))
            .output()
            .map_err(|e| tool_error(&self.program, e.to_string()))?;
        if !output.status.success() {
            return Err(tool_error(
                &self.program,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let png = prefix.with_extension("png");
        if !png.exists() {
            return Err(tool_error(
                &self.program,
                format!("no output written to {}", png.display()),
            ));
        }
        Ok(std::fs::read(png)?)
    }
}
