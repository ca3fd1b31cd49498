//! Rectangle joining.
//!
//! Reduces a set of rectangles by merging neighbours: rectangles whose
//! closed areas are no farther apart than a tolerance. Lines (degenerate
//! rectangles) take part like any other rectangle.

use std::cmp::Ordering;

use crate::geometry::Rect;

/// Options for [`join_rects`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinOptions {
    /// Maximum distance between two rectangles that still counts as
    /// neighbouring (0 = touching or overlapping)
    pub tolerance: f32,
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self { tolerance: 2.0 }
    }
}

impl JoinOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance.max(0.0);
        self
    }
}

/// Whether the minimum distance between the points of `a` and `b` is at
/// most `tolerance`.
pub fn are_neighbors(a: &Rect, b: &Rect, tolerance: f32) -> bool {
    a.distance(b) <= tolerance
}

fn reading_order(a: &Rect, b: &Rect) -> Ordering {
    let (ka, kb) = (a.reading_key(), b.reading_key());
    ka.0.total_cmp(&kb.0)
        .then(ka.1.total_cmp(&kb.1))
        .then(a.y0.total_cmp(&b.y0))
        .then(a.x1.total_cmp(&b.x1))
}

/// Merge neighbouring rectangles until no two results are neighbours.
///
/// The output is sorted by bottom then left coordinate and contains no
/// duplicates. Every input rectangle is contained in exactly one output
/// rectangle, and joining the output again returns it unchanged.
pub fn join_rects(rects: &[Rect], options: JoinOptions) -> Vec<Rect> {
    let tolerance = options.tolerance.max(0.0);
    let mut work: Vec<Rect> = rects
        .iter()
        .filter(|r| {
            let finite = [r.x0, r.y0, r.x1, r.y1].iter().all(|v| v.is_finite());
            if !finite {
                log::warn!("Ignoring non-finite rectangle {:?}", r);
            }
            finite
        })
        .map(Rect::normalize)
        .collect();
    work.sort_by(reading_order);
    work.reverse();

    let mut result: Vec<Rect> = Vec::new();
    while let Some(mut joined) = work.pop() {
        loop {
            let before = work.len();
            work.retain(|other| {
                if are_neighbors(&joined, other, tolerance) {
                    joined = joined.union(other);
                    false
                } else {
                    true
                }
            });
            if work.len() == before {
                break;
            }
        }
        result.push(joined);
    }

    // growth may have turned earlier results into neighbours
    'merge: loop {
        for i in 0..result.len() {
            for j in (i + 1)..result.len() {
                if are_neighbors(&result[i], &result[j], tolerance) {
                    let other = result.swap_remove(j);
                    result[i] = result[i].union(&other);
                    continue 'merge;
                }
            }
        }
        break;
    }

    result.sort_by(reading_order);
    result.dedup();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join(rects: &[Rect], tolerance: f32) -> Vec<Rect> {
        join_rects(rects, JoinOptions::new().with_tolerance(tolerance))
    }

    fn check_properties(input: &[Rect], output: &[Rect], tolerance: f32) {
        for (i, a) in output.iter().enumerate() {
            for b in &output[i + 1..] {
                assert!(!are_neighbors(a, b, tolerance), "{:?} and {:?} touch", a, b);
            }
        }
        for r in input {
            let holders = output.iter().filter(|o| o.contains(r)).count();
            assert_eq!(holders, 1, "{:?} is in {} outputs", r, holders);
        }
        assert_eq!(join(output, tolerance), output);
    }

    #[test]
    fn test_empty_input() {
        assert!(join(&[], 2.0).is_empty());
    }

    #[test]
    fn test_neighbors_within_tolerance() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(11.5, 0.0, 20.0, 10.0);
        assert!(are_neighbors(&a, &b, 2.0));
        assert!(!are_neighbors(&a, &b, 1.0));
        assert!(are_neighbors(&b, &a, 2.0));
    }

    #[test]
    fn test_crossing_rects_are_neighbors() {
        // no corner of either lies inside the other
        let wide = Rect::new(0.0, 10.0, 100.0, 20.0);
        let tall = Rect::new(40.0, 0.0, 50.0, 100.0);
        assert!(are_neighbors(&wide, &tall, 0.0));
        assert_eq!(join(&[wide, tall], 0.0), vec![Rect::new(0.0, 0.0, 100.0, 100.0)]);
    }

    #[test]
    fn test_lines_join_into_box() {
        let lines = [
            Rect::new(0.0, 0.0, 50.0, 0.0),
            Rect::new(50.0, 0.0, 50.0, 30.0),
            Rect::new(0.0, 30.0, 50.0, 30.0),
            Rect::new(0.0, 0.0, 0.0, 30.0),
        ];
        let out = join(&lines, 0.0);
        assert_eq!(out, vec![Rect::new(0.0, 0.0, 50.0, 30.0)]);
        check_properties(&lines, &out, 0.0);
    }

    #[test]
    fn test_separate_groups_stay_separate() {
        let input = [
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(11.0, 0.0, 20.0, 10.0),
            Rect::new(100.0, 100.0, 110.0, 110.0),
            Rect::new(0.0, 200.0, 5.0, 205.0),
        ];
        let out = join(&input, 2.0);
        assert_eq!(
            out,
            vec![
                Rect::new(0.0, 0.0, 20.0, 10.0),
                Rect::new(100.0, 100.0, 110.0, 110.0),
                Rect::new(0.0, 200.0, 5.0, 205.0),
            ]
        );
        check_properties(&input, &out, 2.0);
    }

    #[test]
    fn test_growth_merges_earlier_results() {
        // the first rect has no neighbour of its own, but the union of the
        // other two ends up next to it
        let input = [
            Rect::new(0.0, 0.0, 10.0, 2.0),
            Rect::new(28.0, 2.5, 30.0, 19.0),
            Rect::new(10.5, 20.0, 30.0, 25.0),
        ];
        assert!(!are_neighbors(&input[0], &input[1], 1.0));
        assert!(!are_neighbors(&input[0], &input[2], 1.0));
        let out = join(&input, 1.0);
        assert_eq!(out, vec![Rect::new(0.0, 0.0, 30.0, 25.0)]);
        check_properties(&input, &out, 1.0);
    }

    #[test]
    fn test_duplicates_and_containment() {
        let r = Rect::new(10.0, 10.0, 20.0, 20.0);
        let inner = Rect::new(12.0, 12.0, 13.0, 13.0);
        let out = join(&[r, r, inner], 0.0);
        assert_eq!(out, vec![r]);
    }

    #[test]
    fn test_grid_of_rects_properties() {
        let mut input = Vec::new();
        for i in 0..12 {
            for j in 0..9 {
                let x = (i * 7 % 23) as f32 * 9.0;
                let y = (j * 5 % 17) as f32 * 11.0;
                input.push(Rect::new(x, y, x + 4.0 + (i % 3) as f32, y + 3.0 + (j % 4) as f32));
            }
        }
        for tolerance in [0.0, 1.5, 4.0] {
            let out = join(&input, tolerance);
            check_properties(&input, &out, tolerance);
        }
    }
}
