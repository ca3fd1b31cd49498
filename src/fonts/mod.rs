//! Fonts: standard-14 metrics, the document font inventory and font
//! replacement.

pub mod inventory;
pub mod metrics;
pub mod replace;

pub use inventory::{
    default_mapping, font_inventory, normalize_font_name, read_mapping, write_mapping, FontMapping,
    FontRecord,
};
pub use metrics::{encode_win_ansi, win_ansi_code, FontWidths, StandardFont};
pub use replace::{replace_fonts, FontReplacer, ReplaceOptions, ReplaceReport};
