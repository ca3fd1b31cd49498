//! Benchmarks for content stream scanning.
//!
//! Run with: cargo bench
//!
//! These benchmarks use synthetic pages: generated drawings for path
//! extraction and joining, and text2pdf output for span extraction.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pdfsmith::backend::decode_content;
use pdfsmith::content::extract_paths;
use pdfsmith::graphics::{join_rects, JoinOptions};
use pdfsmith::pages::PageGeometry;
use pdfsmith::{Rect, TextToPdf};

/// A grid of small filled squares, `n` per side.
fn create_drawing(n: usize) -> Vec<u8> {
    let mut content = String::from("0 0 1 rg\n");
    for row in 0..n {
        for col in 0..n {
            content.push_str(&format!("{} {} 4 4 re f\n", 20 + col * 5, 20 + row * 5));
        }
    }
    content.into_bytes()
}

/// Benchmark PDF format detection.
fn bench_format_detection(c: &mut Criterion) {
    let pdf_data = b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n1 0 obj\n<< >>\nendobj\n".to_vec();
    let non_pdf_data = b"Not a PDF file at all, just random text content";

    c.bench_function("detect_valid_pdf", |b| {
        b.iter(|| pdfsmith::detect_format_from_bytes(black_box(&pdf_data)).unwrap());
    });

    c.bench_function("detect_non_pdf", |b| {
        b.iter(|| pdfsmith::detect_format_from_bytes(black_box(non_pdf_data)).is_err());
    });
}

/// Benchmark path extraction at various sizes.
fn bench_path_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_extraction");
    let page = PageGeometry::letter(1);

    for n in [10, 40, 100].iter() {
        let ops = decode_content(&create_drawing(*n)).unwrap();
        group.bench_function(format!("{}_paths", n * n), |b| {
            b.iter(|| extract_paths(black_box(&ops), &page).unwrap());
        });
    }

    group.finish();
}

/// Benchmark rectangle joining; touching squares collapse into one region.
fn bench_join_rects(c: &mut Criterion) {
    let mut group = c.benchmark_group("join_rects");

    for n in [10, 30].iter() {
        let rects: Vec<Rect> = (0..*n)
            .flat_map(|row| {
                (0..*n).map(move |col| {
                    let (x, y) = (col as f32 * 5.0, row as f32 * 5.0);
                    Rect::new(x, y, x + 4.0, y + 4.0)
                })
            })
            .collect();
        group.bench_function(format!("{}_rects", n * n), |b| {
            b.iter(|| join_rects(black_box(&rects), JoinOptions::new().with_tolerance(2.0)));
        });
    }

    group.finish();
}

/// Benchmark span extraction on a full text page.
fn bench_text_spans(c: &mut Criterion) {
    let text: String = (1..=60)
        .map(|i| format!("Line {} of the benchmark page with some words to measure.\n", i))
        .collect();
    let doc = TextToPdf::new().convert(&text, "bench.txt").unwrap();

    c.bench_function("page_spans", |b| {
        b.iter(|| pdfsmith::text::page_spans(black_box(&doc), 1).unwrap());
    });

    c.bench_function("page_lines", |b| {
        b.iter(|| pdfsmith::text::page_lines(black_box(&doc), 1).unwrap());
    });
}

criterion_group!(
    benches,
    bench_format_detection,
    bench_path_extraction,
    bench_join_rects,
    bench_text_spans,
);
criterion_main!(benches);
