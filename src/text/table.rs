//! Simple tables: words distributed into columns, or spans placed into the
//! cells of a ruled grid.

use serde::{Deserialize, Serialize};

use super::words::Word;
use crate::content::TextSpan;
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::graphics::GridLines;
use crate::output::write_record;

/// A table of text cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Rows top to bottom, every row has the same number of cells
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of columns (based on first row).
    pub fn column_count(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One record per row; cells holding the delimiter, quotes or line
    /// breaks are quoted.
    pub fn to_delimited(&self, delimiter: char) -> String {
        let mut out = String::new();
        for row in &self.rows {
            let cells: Vec<&str> = row.iter().map(String::as_str).collect();
            out.push_str(&write_record(&cells, delimiter));
            out.push('\n');
        }
        out
    }
}

/// Where the table is and how its columns are split.
#[derive(Debug, Clone, PartialEq)]
pub struct TableOptions {
    /// Rectangle enclosing the table
    pub bbox: Rect,
    /// x coordinates of column borders. When empty the table has a single
    /// column spanning the rectangle.
    pub columns: Vec<f32>,
}

impl TableOptions {
    pub fn new(bbox: Rect) -> Self {
        Self {
            bbox,
            columns: Vec::new(),
        }
    }

    pub fn with_columns(mut self, columns: Vec<f32>) -> Self {
        self.columns = columns;
        self
    }

    /// Column borders including the left and right edge of the table.
    fn borders(&self, area: &Rect) -> Vec<f32> {
        let mut borders: Vec<f32> = self
            .columns
            .iter()
            .copied()
            .filter(|c| c.is_finite())
            .collect();
        borders.sort_by(f32::total_cmp);
        if borders.first().map_or(true, |first| area.x0 < *first) {
            borders.insert(0, area.x0);
        }
        if borders.last().map_or(true, |last| area.x1 > *last) {
            borders.push(area.x1);
        }
        borders
    }
}

/// Parse the words inside `options.bbox` into a table.
///
/// Coordinates are rounded outwards to whole points. Words with the same top
/// coordinate form a row; a word belongs to the column whose right border
/// lies right of the word's left edge. Words in the same cell are joined by
/// a space.
pub fn parse_table(words: &[Word], options: &TableOptions) -> Table {
    let area = options.bbox.normalize().round_out();
    if area.is_empty() || !area.is_valid() {
        log::warn!("Table rectangle {:?} is empty", options.bbox);
        return Table::default();
    }
    let borders = options.borders(&area);
    let ncols = borders.len() - 1;

    let mut cells: Vec<(f32, f32, usize, &str)> = words
        .iter()
        .filter_map(|w| {
            let r = w.bbox.round_out();
            if !area.contains(&r) {
                return None;
            }
            let col = borders[1..]
                .iter()
                .position(|b| r.x0 < *b)
                .unwrap_or(0)
                .min(ncols - 1);
            Some((r.y0, r.x0, col, w.text.as_str()))
        })
        .collect();
    if cells.is_empty() {
        log::warn!("No text found in table rectangle");
        return Table::default();
    }
    cells.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut current_y = None;
    for (y, _, col, text) in cells {
        if current_y != Some(y) {
            rows.push(vec![String::new(); ncols]);
            current_y = Some(y);
        }
        if let Some(cell) = rows.last_mut().and_then(|row| row.get_mut(col)) {
            if !cell.is_empty() {
                cell.push(' ');
            }
            cell.push_str(text);
        }
    }
    Table { rows }
}

/// Place spans into the cells of a ruled grid.
///
/// Spans are visited bottom to top edge, then left to right, and appended to
/// the text of their cell, so multi-line cells keep their reading order.
/// Blank spans are ignored. A span that fits no cell is an error.
pub fn grid_table(spans: &[TextSpan], grid: &GridLines) -> Result<Table> {
    let (nrows, ncols) = grid.shape();
    let mut rows = vec![vec![String::new(); ncols]; nrows];

    let mut ordered: Vec<&TextSpan> = spans.iter().filter(|s| !s.text.trim().is_empty()).collect();
    ordered.sort_by(|a, b| {
        a.bbox
            .y1
            .total_cmp(&b.bbox.y1)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });

    for span in ordered {
        let (row, col) = grid.cell_of(&span.bbox).ok_or_else(|| {
            Error::TableLayout(format!(
                "no cell found for '{}' at {:?}",
                span.text, span.bbox
            ))
        })?;
        rows[row][col].push_str(&span.text);
    }
    Ok(Table { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Color, TextChar};
    use crate::geometry::Point;

    fn word(text: &str, x0: f32, y0: f32) -> Word {
        Word {
            text: text.to_string(),
            bbox: Rect::new(x0, y0, x0 + 6.0 * text.len() as f32, y0 + 10.0),
            span: 0,
        }
    }

    fn span(text: &str, bbox: Rect) -> TextSpan {
        TextSpan {
            text: text.to_string(),
            font: "Helvetica".to_string(),
            font_ref: "F1".to_string(),
            size: 10.0,
            color: Color::BLACK,
            origin: Point::new(bbox.x0, bbox.y1),
            bbox,
            chars: Vec::<TextChar>::new(),
            page: 1,
            seqno: 0,
        }
    }

    #[test]
    fn test_parse_table_with_columns() {
        let words = vec![
            word("Name", 10.2, 100.3),
            word("Qty", 110.0, 100.0),
            word("Apple", 10.0, 120.0),
            word("pie", 50.0, 120.0),
            word("3", 110.0, 120.0),
            word("outside", 10.0, 400.0),
        ];
        let table = parse_table(
            &words,
            &TableOptions::new(Rect::new(0.0, 90.0, 200.0, 200.0)).with_columns(vec![100.0]),
        );
        assert_eq!(
            table.rows,
            vec![
                vec!["Name".to_string(), "Qty".to_string()],
                vec!["Apple pie".to_string(), "3".to_string()],
            ]
        );
        assert_eq!(table.to_delimited(';'), "Name;Qty\nApple pie;3\n");
    }

    #[test]
    fn test_parse_table_without_columns() {
        let words = vec![word("a", 10.0, 10.0), word("b", 40.0, 10.0)];
        let table = parse_table(&words, &TableOptions::new(Rect::new(0.0, 0.0, 100.0, 50.0)));
        assert_eq!(table.column_count(), 1);
        assert_eq!(table.rows[0][0], "a b");
    }

    #[test]
    fn test_parse_table_empty_rect() {
        let words = vec![word("a", 10.0, 10.0)];
        assert!(parse_table(&words, &TableOptions::new(Rect::new(5.0, 5.0, 5.0, 50.0))).is_empty());
    }

    #[test]
    fn test_grid_table() {
        let grid = GridLines {
            columns: vec![0.0, 100.0, 200.0],
            rows: vec![0.0, 30.0, 60.0],
        };
        let spans = vec![
            span("B2", Rect::new(110.0, 35.0, 130.0, 45.0)),
            span("A1 ", Rect::new(10.0, 5.0, 30.0, 15.0)),
            span("more", Rect::new(10.0, 16.0, 40.0, 26.0)),
            span(" ", Rect::new(90.0, 5.0, 120.0, 15.0)),
        ];
        let table = grid_table(&spans, &grid).unwrap();
        assert_eq!(table.to_delimited(';'), "A1 more;\n;B2\n");
    }

    #[test]
    fn test_delimited_cells_are_quoted() {
        let table = Table {
            rows: vec![
                vec!["Total; net".to_string(), "12".to_string()],
                vec!["say \"hi\"".to_string(), String::new()],
            ],
        };
        assert_eq!(
            table.to_delimited(';'),
            "\"Total; net\";12\n\"say \"\"hi\"\"\";\n"
        );
        assert_eq!(table.to_delimited(','), "Total; net,12\n\"say \"\"hi\"\"\",\n");
    }

    #[test]
    fn test_grid_table_span_outside_cells() {
        let grid = GridLines {
            columns: vec![0.0, 100.0],
            rows: vec![0.0, 30.0],
        };
        let spans = vec![span("wide", Rect::new(50.0, 5.0, 150.0, 15.0))];
        let err = grid_table(&spans, &grid).unwrap_err();
        assert!(matches!(err, Error::TableLayout(_)));
    }
}
