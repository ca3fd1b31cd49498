//! Content stream scanning.
//!
//! Content streams are decoded through `lopdf::content` into crate-owned
//! [`ContentOp`] values; the scanners here never see library types.
//!
//! - [`state`]: the `q`/`Q` graphics-state stack
//! - [`paths`]: vector drawings in page coordinates
//! - [`text`]: text spans with font, size, colour and per-character boxes
//! - [`strip`]: removal of text-showing operators

mod ops;
pub mod paths;
pub mod state;
pub mod strip;
pub mod text;

pub use crate::backend::{decode_content as decode, encode_content as encode, ContentOp, PdfValue};
pub use paths::{extract_paths, DrawPath, PaintKind, PathItem};
pub use state::{Color, GraphicsStack, GraphicsState, TextState};
pub use strip::{format_ops, strip_text, FontFilter, StripResult};
pub use text::{scan_text, scan_text_ops, TextChar, TextSpan};
