//! Operand access with syntax checking.

use crate::backend::{ContentOp, PdfValue};
use crate::error::{Error, Result};
use crate::geometry::{Matrix, Point};

pub(crate) fn syntax_error(op: &ContentOp, index: usize, message: impl Into<String>) -> Error {
    Error::ContentSyntax {
        operator: op.operator.clone(),
        index,
        message: message.into(),
    }
}

/// Exactly `N` numeric operands.
pub(crate) fn numbers<const N: usize>(op: &ContentOp, index: usize) -> Result<[f32; N]> {
    if op.operands.len() != N {
        return Err(syntax_error(
            op,
            index,
            format!("expected {} operands, found {}", N, op.operands.len()),
        ));
    }
    let mut out = [0.0; N];
    for (slot, value) in out.iter_mut().zip(&op.operands) {
        *slot = value
            .as_number()
            .ok_or_else(|| syntax_error(op, index, format!("expected a number, found {:?}", value)))?;
    }
    Ok(out)
}

pub(crate) fn number(op: &ContentOp, index: usize) -> Result<f32> {
    numbers::<1>(op, index).map(|[n]| n)
}

pub(crate) fn point(op: &ContentOp, index: usize) -> Result<(f32, f32)> {
    numbers::<2>(op, index).map(|[x, y]| (x, y))
}

pub(crate) fn matrix(op: &ContentOp, index: usize) -> Result<Matrix> {
    numbers::<6>(op, index).map(|[a, b, c, d, e, f]| Matrix::new(a, b, c, d, e, f))
}

/// The numeric operands of a variable-arity operator, ignoring trailing names
/// (pattern names of `scn`).
pub(crate) fn leading_numbers(op: &ContentOp) -> Vec<f32> {
    op.operands.iter().map_while(PdfValue::as_number).collect()
}

/// Name operand at `pos`.
pub(crate) fn name_at<'a>(op: &'a ContentOp, index: usize, pos: usize) -> Result<&'a [u8]> {
    op.operands
        .get(pos)
        .and_then(PdfValue::as_name)
        .ok_or_else(|| syntax_error(op, index, format!("expected a name at operand {}", pos + 1)))
}

/// String operand at `pos`.
pub(crate) fn string_at<'a>(op: &'a ContentOp, index: usize, pos: usize) -> Result<&'a [u8]> {
    match op.operands.get(pos) {
        Some(PdfValue::Str(s)) => Ok(s),
        _ => Err(syntax_error(
            op,
            index,
            format!("expected a string at operand {}", pos + 1),
        )),
    }
}

pub(crate) fn transform(x: f32, y: f32, m: &Matrix) -> Point {
    Point::new(x, y).transform(m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_arity() {
        let op = ContentOp::new("re", vec![PdfValue::Integer(1), PdfValue::Real(2.5)]);
        let err = numbers::<4>(&op, 9).unwrap_err();
        match err {
            Error::ContentSyntax {
                operator, index, ..
            } => {
                assert_eq!(operator, "re");
                assert_eq!(index, 9);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(point(&op, 0).unwrap(), (1.0, 2.5));
    }

    #[test]
    fn test_numbers_type() {
        let op = ContentOp::new("w", vec![PdfValue::name(b"X")]);
        assert!(number(&op, 0).is_err());
    }

    #[test]
    fn test_leading_numbers_stop_at_name() {
        let op = ContentOp::new(
            "scn",
            vec![PdfValue::Real(0.5), PdfValue::name(b"P0")],
        );
        assert_eq!(leading_numbers(&op), vec![0.5]);
    }
}
