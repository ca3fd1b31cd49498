//! pdfsmith CLI - PDF recipes on the command line

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdfsmith::embedded::{extract_embedded, list_embedded, EmbeddedTotals};
use pdfsmith::fonts::{
    default_mapping, font_inventory, read_mapping, replace_fonts, write_mapping, FontReplacer,
    ReplaceOptions,
};
use pdfsmith::graphics::{document_paths, export_regions, gridlines, page_paths, page_regions, RegionOptions};
use pdfsmith::images::{extract_images, list_images, ImageFilter};
use pdfsmith::metadata::{metadata_from_csv, metadata_to_csv, read_metadata, write_metadata};
use pdfsmith::ocr::{OcrFallback, OcrOptions, PdftoppmRenderer, TesseractCli};
use pdfsmith::outline::{read_toc, toc_from_csv, toc_to_csv, write_toc};
use pdfsmith::text::{
    document_spans, grid_table, lookup_keywords, page_spans, page_text, page_words, parse_table,
    search_for, ClipMode, KeywordQuery, TableOptions,
};
use pdfsmith::{
    open_with_options, to_json, JsonFormat, LoadOptions, LopdfBackend, PageSelection, PdfBackend,
    Rect, TextToPdf,
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "pdfsmith")]
#[command(author = "pdfsmith contributors")]
#[command(version)]
#[command(about = "PDF recipes: text, drawings, figures, OCR fallback, fonts and page surgery", long_about = None)]
struct Cli {
    /// Password for encrypted documents
    #[arg(long, global = true, env = "PDFSMITH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Skip failing pages and items instead of stopping
    #[arg(long, global = true)]
    lenient: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show document information
    Info {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Text spans with font, size, colour and boxes (JSON)
    Spans {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Words with their boxes (JSON)
    Words {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[arg(long)]
        pages: Option<String>,

        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[arg(long)]
        compact: bool,
    },

    /// Plain text, optionally restricted to a rectangle
    Text {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[arg(long)]
        pages: Option<String>,

        /// Clip rectangle "x0,y0,x1,y1" in page coordinates
        #[arg(long)]
        clip: Option<String>,

        /// Which words the clip keeps
        #[arg(long, value_enum, default_value = "contained")]
        mode: ClipArg,

        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Find text and print the hit rectangles
    Search {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Text to look for (case-insensitive)
        needle: String,

        #[arg(long)]
        pages: Option<String>,
    },

    /// Print the words following keywords ("KEY" or "KEY:+N")
    Keywords {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[arg(required = true)]
        keywords: Vec<String>,

        /// Page to search
        #[arg(long, default_value = "1")]
        page: u32,
    },

    /// Extract a table inside a rectangle
    Table {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Table rectangle "x0,y0,x1,y1" in page coordinates
        #[arg(long)]
        rect: String,

        #[arg(long, default_value = "1")]
        page: u32,

        /// Column borders "x1,x2,..."
        #[arg(long)]
        columns: Option<String>,

        /// Use the ruling lines of the page to find cells
        #[arg(long, conflicts_with = "columns")]
        grid: bool,

        /// CSV delimiter
        #[arg(short, long, default_value = ";")]
        delimiter: char,

        /// Output file
        #[arg(short, long, value_name = "FILE", default_value = "output.csv")]
        output: PathBuf,
    },

    /// Vector drawings of the pages (JSON)
    Drawings {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[arg(long)]
        pages: Option<String>,

        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[arg(long)]
        compact: bool,

        /// Scan pages in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Detect figures made of vector graphics and save them as images
    Graphics {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[arg(long)]
        pages: Option<String>,

        /// How paths are joined
        #[arg(long, value_enum, default_value = "neighborhood")]
        mode: RegionArg,

        /// Resolution of the saved images
        #[arg(long)]
        dpi: Option<u32>,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,

        /// Only list the regions
        #[arg(long)]
        list: bool,

        /// Renderer program
        #[arg(long, env = "PDFSMITH_PDFTOPPM", default_value = "pdftoppm")]
        pdftoppm: PathBuf,
    },

    /// Re-read text with undecodable characters using OCR
    Ocr {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[arg(long)]
        pages: Option<String>,

        /// Tesseract language
        #[arg(long, default_value = "eng")]
        language: String,

        /// Rendering resolution
        #[arg(long, default_value = "288")]
        dpi: u32,

        /// Write the repaired spans as JSON
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[arg(long, env = "PDFSMITH_TESSERACT", default_value = "tesseract")]
        tesseract: PathBuf,

        #[arg(long, env = "PDFSMITH_PDFTOPPM", default_value = "pdftoppm")]
        pdftoppm: PathBuf,
    },

    /// Font inventory and replacement
    Fonts {
        #[command(subcommand)]
        command: FontsCommand,
    },

    /// Table of contents export and import
    Toc {
        #[command(subcommand)]
        command: TocCommand,
    },

    /// Metadata export and import
    Metadata {
        #[command(subcommand)]
        command: MetadataCommand,
    },

    /// List form fields
    Fields {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// List named destinations
    Names {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Embedded files
    Embedded {
        #[command(subcommand)]
        command: EmbeddedCommand,
    },

    /// Extract images
    Images {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = "output")]
        output: PathBuf,

        /// Keep small and single-coloured images too
        #[arg(long)]
        all: bool,

        /// Only list the images
        #[arg(long)]
        list: bool,
    },

    /// Set page rotation to zero keeping the page appearance
    Derotate {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[arg(long)]
        pages: Option<String>,

        /// Output file [default: <FILE>-rot0.pdf]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Remove annotations
    StripAnnots {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Keep form field widgets
        #[arg(long)]
        keep_widgets: bool,

        /// Output file [default: <FILE>-noannots.pdf]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Join multiple content streams per page into one
    CombineContents {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file [default: <FILE>-clean.pdf]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Keep only some pages
    Select {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Pages to keep (e.g., "1-3,7")
        #[arg(long)]
        pages: String,

        /// Output file [default: <FILE>-selected.pdf]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Convert a text file to PDF
    Text2pdf {
        #[arg(value_name = "TEXTFILE")]
        input: PathBuf,

        #[arg(long, default_value = "10")]
        font_size: f32,

        /// Output file [default: <TEXTFILE>.pdf]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum FontsCommand {
    /// Write the editable font mapping file
    List {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file [default: <FILE>-fontnames.json]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Replace fonts according to a mapping file
    Replace {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Mapping file [default: <FILE>-fontnames.json]
        #[arg(short, long, value_name = "FILE")]
        mapping: Option<PathBuf>,

        #[arg(long)]
        pages: Option<String>,

        /// Keep the original font size even when text gets wider
        #[arg(long)]
        no_shrink: bool,

        /// Output file [default: <FILE>-new.pdf]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum TocCommand {
    /// Write the outline as "level;title;page;top" lines
    Export {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[arg(short, long, default_value = ";")]
        delimiter: char,

        #[arg(short, long, value_name = "FILE", default_value = "output.csv")]
        output: PathBuf,
    },

    /// Replace the outline from a delimited file
    Import {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[arg(long, value_name = "CSV")]
        csv: PathBuf,

        #[arg(short, long, default_value = ";")]
        delimiter: char,

        /// Output file [default: <FILE>-toc.pdf]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum MetadataCommand {
    /// Write "key;value" lines
    Export {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[arg(short, long, default_value = ";")]
        delimiter: char,

        #[arg(short, long, value_name = "FILE", default_value = "output.csv")]
        output: PathBuf,
    },

    /// Update metadata from "key;value" lines
    Import {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[arg(long, value_name = "CSV")]
        csv: PathBuf,

        #[arg(short, long, default_value = ";")]
        delimiter: char,

        /// Also delete the XML metadata stream
        #[arg(short = 'x', long)]
        delete_xml: bool,

        /// Output file [default: <FILE>-meta.pdf]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum EmbeddedCommand {
    /// List embedded files with sizes
    List {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Save an embedded file
    Extract {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Name of the embedded file
        name: String,

        /// Output file [default: the stored file name]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ClipArg {
    /// Words completely inside the rectangle
    Contained,
    /// Words touching the rectangle
    Intersecting,
}

impl From<ClipArg> for ClipMode {
    fn from(arg: ClipArg) -> Self {
        match arg {
            ClipArg::Contained => ClipMode::Contained,
            ClipArg::Intersecting => ClipMode::Intersecting,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum RegionArg {
    /// Paths lying within 2 points of each other
    Neighborhood,
    /// Paths touching once enlarged by 1 point
    Touching,
}

impl From<RegionArg> for RegionOptions {
    fn from(arg: RegionArg) -> Self {
        match arg {
            RegionArg::Neighborhood => RegionOptions::neighborhood(),
            RegionArg::Touching => RegionOptions::touching(),
        }
    }
}

/// Settings shared by all subcommands.
struct Global {
    password: Option<String>,
    lenient: bool,
}

impl Global {
    fn options(&self, pages: Option<&str>) -> Result<LoadOptions, Box<dyn std::error::Error>> {
        let mut options = LoadOptions::new().with_pages(parse_pages(pages)?);
        if let Some(ref password) = self.password {
            options = options.with_password(password.clone());
        }
        if self.lenient {
            options = options.lenient();
        }
        Ok(options)
    }

    /// `pdftoppm` for `input`, with the document password when one is set.
    fn renderer(&self, input: &Path, program: &Path) -> PdftoppmRenderer {
        let renderer = PdftoppmRenderer::new(input).with_program(program);
        match self.password {
            Some(ref password) => renderer.with_password(password.clone()),
            None => renderer,
        }
    }

    fn open(&self, input: &Path, pages: Option<&str>) -> Result<(LopdfBackend, LoadOptions), Box<dyn std::error::Error>> {
        let options = self.options(pages)?;
        let doc = open_with_options(input, &options)?;
        Ok((doc, options))
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let global = Global {
        password: cli.password,
        lenient: cli.lenient,
    };

    let result = match cli.command {
        Commands::Info { input } => cmd_info(&global, &input),
        Commands::Spans {
            input,
            pages,
            output,
            compact,
        } => cmd_spans(&global, &input, pages.as_deref(), output.as_deref(), compact),
        Commands::Words {
            input,
            pages,
            output,
            compact,
        } => cmd_words(&global, &input, pages.as_deref(), output.as_deref(), compact),
        Commands::Text {
            input,
            pages,
            clip,
            mode,
            output,
        } => cmd_text(&global, &input, pages.as_deref(), clip.as_deref(), mode, output.as_deref()),
        Commands::Search {
            input,
            needle,
            pages,
        } => cmd_search(&global, &input, &needle, pages.as_deref()),
        Commands::Keywords {
            input,
            keywords,
            page,
        } => cmd_keywords(&global, &input, &keywords, page),
        Commands::Table {
            input,
            rect,
            page,
            columns,
            grid,
            delimiter,
            output,
        } => cmd_table(
            &global,
            &input,
            &rect,
            page,
            columns.as_deref(),
            grid,
            delimiter,
            &output,
        ),
        Commands::Drawings {
            input,
            pages,
            output,
            compact,
            parallel,
        } => cmd_drawings(&global, &input, pages.as_deref(), output.as_deref(), compact, parallel),
        Commands::Graphics {
            input,
            pages,
            mode,
            dpi,
            output,
            list,
            pdftoppm,
        } => cmd_graphics(&global, &input, pages.as_deref(), mode, dpi, &output, list, &pdftoppm),
        Commands::Ocr {
            input,
            pages,
            language,
            dpi,
            output,
            tesseract,
            pdftoppm,
        } => cmd_ocr(
            &global,
            &input,
            pages.as_deref(),
            &language,
            dpi,
            output.as_deref(),
            &tesseract,
            &pdftoppm,
        ),
        Commands::Fonts { command } => match command {
            FontsCommand::List { input, output } => cmd_fonts_list(&global, &input, output),
            FontsCommand::Replace {
                input,
                mapping,
                pages,
                no_shrink,
                output,
            } => cmd_fonts_replace(&global, &input, mapping, pages.as_deref(), no_shrink, output),
        },
        Commands::Toc { command } => match command {
            TocCommand::Export {
                input,
                delimiter,
                output,
            } => cmd_toc_export(&global, &input, delimiter, &output),
            TocCommand::Import {
                input,
                csv,
                delimiter,
                output,
            } => cmd_toc_import(&global, &input, &csv, delimiter, output),
        },
        Commands::Metadata { command } => match command {
            MetadataCommand::Export {
                input,
                delimiter,
                output,
            } => cmd_metadata_export(&global, &input, delimiter, &output),
            MetadataCommand::Import {
                input,
                csv,
                delimiter,
                delete_xml,
                output,
            } => cmd_metadata_import(&global, &input, &csv, delimiter, delete_xml, output),
        },
        Commands::Fields { input } => cmd_fields(&global, &input),
        Commands::Names { input, json } => cmd_names(&global, &input, json),
        Commands::Embedded { command } => match command {
            EmbeddedCommand::List { input } => cmd_embedded_list(&global, &input),
            EmbeddedCommand::Extract {
                input,
                name,
                output,
            } => cmd_embedded_extract(&global, &input, &name, output),
        },
        Commands::Images {
            input,
            output,
            all,
            list,
        } => cmd_images(&global, &input, &output, all, list),
        Commands::Derotate {
            input,
            pages,
            output,
        } => cmd_derotate(&global, &input, pages.as_deref(), output),
        Commands::StripAnnots {
            input,
            keep_widgets,
            output,
        } => cmd_strip_annots(&global, &input, keep_widgets, output),
        Commands::CombineContents { input, output } => cmd_combine(&global, &input, output),
        Commands::Select {
            input,
            pages,
            output,
        } => cmd_select(&global, &input, &pages, output),
        Commands::Text2pdf {
            input,
            font_size,
            output,
        } => cmd_text2pdf(&input, font_size, output),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_pages(pages: Option<&str>) -> Result<PageSelection, Box<dyn std::error::Error>> {
    match pages {
        Some(p) => Ok(PageSelection::parse(p).map_err(|e| format!("Invalid page range: {}", e))?),
        None => Ok(PageSelection::All),
    }
}

fn parse_numbers(s: &str) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
    s.split(',')
        .map(|v| {
            v.trim()
                .parse::<f32>()
                .map_err(|_| format!("'{}' is not a number", v.trim()).into())
        })
        .collect()
}

fn parse_rect(s: &str) -> Result<Rect, Box<dyn std::error::Error>> {
    match parse_numbers(s)?.as_slice() {
        [x0, y0, x1, y1] => Ok(Rect::new(*x0, *y0, *x1, *y1)),
        _ => Err(format!("'{}' is not a rectangle \"x0,y0,x1,y1\"", s).into()),
    }
}

/// `<dir>/<stem><suffix>` next to the input.
fn sibling(input: &Path, suffix: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{}{}", stem, suffix))
}

fn emit(output: Option<&Path>, text: &str) -> CliResult {
    if let Some(path) = output {
        fs::write(path, text)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", text);
    }
    Ok(())
}

fn json_format(compact: bool) -> JsonFormat {
    if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    }
}

fn save(doc: &mut LopdfBackend, path: &Path) -> CliResult {
    doc.save(path)?;
    println!("{} {}", "Saved to".green(), path.display());
    Ok(())
}

fn page_progress(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

fn cmd_info(global: &Global, input: &Path) -> CliResult {
    let (doc, _) = global.open(input, None)?;
    let meta = read_metadata(&doc);

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Pages".bold(), doc.page_count());
    for (key, value) in meta.entries() {
        if !value.is_empty() {
            println!("{}: {}", key.bold(), value);
        }
    }

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Fonts".bold(), font_inventory(&doc)?.len());
    println!("{}: {}", "Images".bold(), list_images(&doc).len());
    println!("{}: {}", "Embedded files".bold(), list_embedded(&doc)?.len());
    println!("{}: {}", "Form fields".bold(), pdfsmith::forms::list_fields(&doc)?.len());
    println!("{}: {}", "Bookmarks".bold(), read_toc(&doc)?.len());

    Ok(())
}

fn cmd_spans(global: &Global, input: &Path, pages: Option<&str>, output: Option<&Path>, compact: bool) -> CliResult {
    let (doc, options) = global.open(input, pages)?;
    let spans = document_spans(&doc, &options)?;
    emit(output, &to_json(&spans, json_format(compact))?)
}

fn cmd_words(global: &Global, input: &Path, pages: Option<&str>, output: Option<&Path>, compact: bool) -> CliResult {
    let (doc, options) = global.open(input, pages)?;
    let mut words = Vec::new();
    for number in options.pages.resolve(doc.page_count())? {
        if let Some(w) = options
            .error_mode
            .handle(format_args!("page {}", number), page_words(&doc, number))?
        {
            words.push((number, w));
        }
    }
    emit(output, &to_json(&words, json_format(compact))?)
}

fn cmd_text(
    global: &Global,
    input: &Path,
    pages: Option<&str>,
    clip: Option<&str>,
    mode: ClipArg,
    output: Option<&Path>,
) -> CliResult {
    let (doc, options) = global.open(input, pages)?;
    let clip = clip.map(parse_rect).transpose()?;
    let mut texts = Vec::new();
    for number in options.pages.resolve(doc.page_count())? {
        if let Some(text) = options
            .error_mode
            .handle(format_args!("page {}", number), page_text(&doc, number, clip, mode.into()))?
        {
            texts.push(text);
        }
    }
    emit(output, &texts.join("\n\x0c"))
}

fn cmd_search(global: &Global, input: &Path, needle: &str, pages: Option<&str>) -> CliResult {
    let (doc, options) = global.open(input, pages)?;
    let mut total = 0;
    for (number, spans) in document_spans(&doc, &options)? {
        for hit in search_for(&spans, needle) {
            println!(
                "{} {}: {:.1}, {:.1}, {:.1}, {:.1}",
                "page".dimmed(),
                number,
                hit.x0,
                hit.y0,
                hit.x1,
                hit.y1
            );
            total += 1;
        }
    }
    println!("{} {} hit(s) for '{}'", "Done!".green().bold(), total, needle);
    Ok(())
}

fn cmd_keywords(global: &Global, input: &Path, keywords: &[String], page: u32) -> CliResult {
    let (doc, _) = global.open(input, None)?;
    let queries: Vec<KeywordQuery> = keywords.iter().map(|k| KeywordQuery::parse(k)).collect();
    let words = page_words(&doc, page)?;
    for found in lookup_keywords(&words, &queries) {
        match found.value {
            Some(value) => println!("{}: {}", found.keyword.bold(), value),
            None => println!("{}: {}", found.keyword.bold(), "(not found)".yellow()),
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_table(
    global: &Global,
    input: &Path,
    rect: &str,
    page: u32,
    columns: Option<&str>,
    grid: bool,
    delimiter: char,
    output: &Path,
) -> CliResult {
    let (doc, _) = global.open(input, None)?;
    let bbox = parse_rect(rect)?;
    let table = if grid {
        let lines = gridlines(&page_paths(&doc, page)?, &bbox);
        let spans: Vec<_> = page_spans(&doc, page)?
            .into_iter()
            .filter(|s| bbox.contains(&s.bbox))
            .collect();
        grid_table(&spans, &lines)?
    } else {
        let mut options = TableOptions::new(bbox);
        if let Some(columns) = columns {
            options = options.with_columns(parse_numbers(columns)?);
        }
        parse_table(&page_words(&doc, page)?, &options)
    };
    fs::write(output, table.to_delimited(delimiter))?;
    println!(
        "{} {} row(s), {} column(s) to {}",
        "Saved".green(),
        table.row_count(),
        table.column_count(),
        output.display()
    );
    Ok(())
}

fn cmd_drawings(
    global: &Global,
    input: &Path,
    pages: Option<&str>,
    output: Option<&Path>,
    compact: bool,
    parallel: bool,
) -> CliResult {
    let (doc, options) = global.open(input, pages)?;
    let paths = document_paths(&doc, &options.with_parallel(parallel))?;
    emit(output, &to_json(&paths, json_format(compact))?)
}

#[allow(clippy::too_many_arguments)]
fn cmd_graphics(
    global: &Global,
    input: &Path,
    pages: Option<&str>,
    mode: RegionArg,
    dpi: Option<u32>,
    output: &Path,
    list: bool,
    pdftoppm: &Path,
) -> CliResult {
    let (doc, options) = global.open(input, pages)?;
    let mut region_options: RegionOptions = mode.into();
    if let Some(dpi) = dpi {
        region_options = region_options.with_dpi(dpi);
    }
    let renderer = global.renderer(input, pdftoppm);
    if !list {
        fs::create_dir_all(output)?;
    }

    let numbers = options.pages.resolve(doc.page_count())?;
    let pb = page_progress(numbers.len() as u64);
    let mut total = 0;
    for number in numbers {
        pb.set_message(format!("page {}", number));
        let regions = options
            .error_mode
            .handle(format_args!("page {}", number), page_regions(&doc, number, &region_options))?
            .unwrap_or_default();
        if list {
            for r in &regions {
                pb.println(format!("page {}: {:.1}, {:.1}, {:.1}, {:.1}", number, r.x0, r.y0, r.x1, r.y1));
            }
        } else {
            total += export_regions(&renderer, number, &regions, &region_options, output)?.len();
        }
        pb.inc(1);
    }
    pb.finish_with_message("Done!");
    if !list {
        println!("{} {} image(s) in {}", "Saved".green(), total, output.display());
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_ocr(
    global: &Global,
    input: &Path,
    pages: Option<&str>,
    language: &str,
    dpi: u32,
    output: Option<&Path>,
    tesseract: &Path,
    pdftoppm: &Path,
) -> CliResult {
    let (doc, options) = global.open(input, pages)?;
    let engine = TesseractCli::new().with_program(tesseract).with_language(language);
    let renderer = global.renderer(input, pdftoppm);
    let mut fallback = OcrFallback::new(engine, renderer).with_options(OcrOptions::new().with_dpi(dpi));

    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Scanning text...");
    let report = fallback.repair_document(&doc, &options)?;
    pb.finish_and_clear();

    for repair in &report.repairs {
        println!(
            "{} {}: '{}' -> '{}'",
            "page".dimmed(),
            repair.page,
            repair.before,
            repair.after.green()
        );
    }
    let stats = report.stats;
    println!(
        "{} {} OCR call(s), {} failed, avg render {:?}, avg OCR {:?}",
        "Done!".green().bold(),
        stats.invocations,
        stats.failures,
        stats.average_render_time(),
        stats.average_ocr_time()
    );
    if let Some(path) = output {
        fs::write(path, to_json(&report, JsonFormat::Pretty)?)?;
        println!("{} {}", "Saved to".green(), path.display());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Fonts, outline, metadata
// ---------------------------------------------------------------------------

fn cmd_fonts_list(global: &Global, input: &Path, output: Option<PathBuf>) -> CliResult {
    let (doc, _) = global.open(input, None)?;
    let fonts = font_inventory(&doc)?;
    for font in &fonts {
        println!("{} ({})", font.names.join(", ").bold(), font.info.dimmed());
    }
    let path = output.unwrap_or_else(|| sibling(input, "-fontnames.json"));
    write_mapping(&path, &default_mapping(&fonts))?;
    println!("{} {}", "Saved to".green(), path.display());
    Ok(())
}

fn cmd_fonts_replace(
    global: &Global,
    input: &Path,
    mapping: Option<PathBuf>,
    pages: Option<&str>,
    no_shrink: bool,
    output: Option<PathBuf>,
) -> CliResult {
    let (mut doc, _) = global.open(input, None)?;
    let mapping = mapping.unwrap_or_else(|| sibling(input, "-fontnames.json"));
    let replacer = FontReplacer::from_mappings(&read_mapping(&mapping)?)?;
    if replacer.is_empty() {
        println!("{}", "Nothing to replace: every font is kept".yellow());
        return Ok(());
    }
    let options = ReplaceOptions::new()
        .with_pages(parse_pages(pages)?)
        .with_shrink_to_fit(!no_shrink);
    let report = replace_fonts(&mut doc, &replacer, &options)?;
    println!(
        "{} {} span(s) on {} page(s) rewritten with {}",
        "Replaced".green(),
        report.spans,
        report.pages.len(),
        report.fonts.join(", ")
    );
    save(&mut doc, &output.unwrap_or_else(|| sibling(input, "-new.pdf")))
}

fn cmd_toc_export(global: &Global, input: &Path, delimiter: char, output: &Path) -> CliResult {
    let (doc, _) = global.open(input, None)?;
    let toc = read_toc(&doc)?;
    fs::write(output, toc_to_csv(&toc, delimiter))?;
    println!("{} {} entries to {}", "Saved".green(), toc.len(), output.display());
    Ok(())
}

fn cmd_toc_import(global: &Global, input: &Path, csv: &Path, delimiter: char, output: Option<PathBuf>) -> CliResult {
    let (mut doc, _) = global.open(input, None)?;
    let toc = toc_from_csv(&fs::read_to_string(csv)?, delimiter)?;
    write_toc(&mut doc, &toc)?;
    println!("{} {} entries", "Imported".green(), toc.len());
    save(&mut doc, &output.unwrap_or_else(|| sibling(input, "-toc.pdf")))
}

fn cmd_metadata_export(global: &Global, input: &Path, delimiter: char, output: &Path) -> CliResult {
    let (doc, _) = global.open(input, None)?;
    fs::write(output, metadata_to_csv(&read_metadata(&doc), delimiter))?;
    println!("{} {}", "Saved to".green(), output.display());
    Ok(())
}

fn cmd_metadata_import(
    global: &Global,
    input: &Path,
    csv: &Path,
    delimiter: char,
    delete_xml: bool,
    output: Option<PathBuf>,
) -> CliResult {
    let (mut doc, _) = global.open(input, None)?;
    let old = read_metadata(&doc);
    let new = metadata_from_csv(&fs::read_to_string(csv)?, delimiter, &old)?;
    for ((key, before), (_, after)) in old.entries().into_iter().zip(new.entries()) {
        if before != after {
            println!("{}: {} -> {}", key.bold(), before.dimmed(), after);
        }
    }
    write_metadata(&mut doc, &new, delete_xml)?;
    save(&mut doc, &output.unwrap_or_else(|| sibling(input, "-meta.pdf")))
}

// ---------------------------------------------------------------------------
// Document parts
// ---------------------------------------------------------------------------

fn cmd_fields(global: &Global, input: &Path) -> CliResult {
    let (doc, _) = global.open(input, None)?;
    if !pdfsmith::forms::is_form(&doc) {
        return Err(format!("'{}' has no form fields", input.display()).into());
    }
    let line = "-".repeat(80);
    let mut page = 0;
    for field in pdfsmith::forms::list_fields(&doc)? {
        if field.page != page {
            page = field.page;
            println!("{}", format!("Fields on page {}", page).cyan().bold());
        }
        println!("{}", line.dimmed());
        println!("field_name = {:?}", field.name);
        println!("field_type = {}", field.field_type);
        println!("field_value = {:?}", field.value);
        let names = field.flag_names();
        let flags = if names.is_empty() {
            "(none)".to_string()
        } else {
            format!("({})", names.join(", "))
        };
        println!("field_flags = {} {}", field.flags, flags);
        println!(
            "rect = {:.1}, {:.1}, {:.1}, {:.1}",
            field.rect.x0, field.rect.y0, field.rect.x1, field.rect.y1
        );
    }
    Ok(())
}

fn cmd_names(global: &Global, input: &Path, json: bool) -> CliResult {
    let (doc, _) = global.open(input, None)?;
    let names = pdfsmith::names::resolve_names(&doc)?;
    if json {
        println!("{}", to_json(&names, JsonFormat::Pretty)?);
        return Ok(());
    }
    for (name, dest) in &names {
        let page = dest.page.map(|p| p.to_string()).unwrap_or_else(|| "?".to_string());
        match dest.to {
            Some(to) => println!("{}: page {} {} ({:.1}, {:.1})", name.bold(), page, dest.kind, to.x, to.y),
            None => println!("{}: page {} {}", name.bold(), page, dest.kind),
        }
    }
    println!("{} {} named destination(s)", "Done!".green().bold(), names.len());
    Ok(())
}

fn cmd_embedded_list(global: &Global, input: &Path) -> CliResult {
    let (doc, _) = global.open(input, None)?;
    let files = list_embedded(&doc)?;
    if files.is_empty() {
        return Err(format!("no embedded files in '{}'", input.display()).into());
    }
    let name_len = files.iter().map(|f| f.name.chars().count()).max().unwrap_or(0) + 4;
    let file_len = files.iter().map(|f| f.filename.chars().count()).max().unwrap_or(0) + 4;
    let header = format!("{:<name_len$}{:<file_len$}{:>10}{:>11}", "Name", "Filename", "Length", "Size");
    let line = "-".repeat(header.len());
    println!("{}\n{}\n{}", line, header.bold(), line);
    for f in &files {
        println!("{:<name_len$}{:<file_len$}{:>10}{:>11}", f.name, f.filename, f.length, f.size);
    }
    println!("{}", line);
    let totals = EmbeddedTotals::of(&files);
    println!("{} embedded files in '{}'. Totals:", totals.count, input.display());
    println!(
        "File lengths: {}, compressed: {}, ratio: {:.2}% (savings: {:.2}%).",
        totals.length,
        totals.size,
        totals.ratio() * 100.0,
        totals.savings() * 100.0
    );
    println!("{}", line);
    Ok(())
}

fn cmd_embedded_extract(global: &Global, input: &Path, name: &str, output: Option<PathBuf>) -> CliResult {
    let (doc, _) = global.open(input, None)?;
    let path = match output {
        Some(path) => path,
        None => {
            let filename = list_embedded(&doc)?
                .into_iter()
                .find(|f| f.name == name)
                .map(|f| f.filename)
                .unwrap_or_else(|| name.to_string());
            // never write outside the current directory
            PathBuf::from(Path::new(&filename).file_name().unwrap_or_default())
        }
    };
    fs::write(&path, extract_embedded(&doc, name)?)?;
    println!("{} {}", "Saved to".green(), path.display());
    Ok(())
}

fn cmd_images(global: &Global, input: &Path, output: &Path, all: bool, list: bool) -> CliResult {
    let (doc, options) = global.open(input, None)?;
    if list {
        for image in list_images(&doc) {
            println!(
                "{:>6} {}x{} {} bpc {} {} ({} bytes)",
                image.xref,
                image.width,
                image.height,
                image.bits_per_component,
                image.color_space,
                image.filter,
                image.length
            );
        }
        return Ok(());
    }
    fs::create_dir_all(output)?;
    let filter = if all {
        ImageFilter::none()
    } else {
        ImageFilter::significant()
    };
    let found = list_images(&doc).len();
    let written = extract_images(&doc, output, &filter, &options)?;
    for path in &written {
        println!("{} {}", "Extracted".green(), path.display());
    }
    println!("\n{} {} of {} images extracted", "Done!".green().bold(), written.len(), found);
    Ok(())
}

// ---------------------------------------------------------------------------
// Page surgery
// ---------------------------------------------------------------------------

fn cmd_derotate(global: &Global, input: &Path, pages: Option<&str>, output: Option<PathBuf>) -> CliResult {
    let (mut doc, options) = global.open(input, pages)?;
    let changed = pdfsmith::maintenance::derotate_pages(&mut doc, &options.pages)?;
    println!("{} {} page(s)", "Derotated".green(), changed.len());
    save(&mut doc, &output.unwrap_or_else(|| sibling(input, "-rot0.pdf")))
}

fn cmd_strip_annots(global: &Global, input: &Path, keep_widgets: bool, output: Option<PathBuf>) -> CliResult {
    let (mut doc, _) = global.open(input, None)?;
    let removed = pdfsmith::maintenance::strip_annotations(&mut doc, keep_widgets)?;
    println!("{} {} annotation(s)", "Removed".green(), removed);
    save(&mut doc, &output.unwrap_or_else(|| sibling(input, "-noannots.pdf")))
}

fn cmd_combine(global: &Global, input: &Path, output: Option<PathBuf>) -> CliResult {
    let (mut doc, _) = global.open(input, None)?;
    let changed = pdfsmith::maintenance::combine_contents(&mut doc)?;
    println!("{} {} page(s)", "Combined contents of".green(), changed);
    save(&mut doc, &output.unwrap_or_else(|| sibling(input, "-clean.pdf")))
}

fn cmd_select(global: &Global, input: &Path, pages: &str, output: Option<PathBuf>) -> CliResult {
    let (mut doc, options) = global.open(input, Some(pages))?;
    let kept = pdfsmith::maintenance::select_pages(&mut doc, &options.pages)?;
    println!("{} {} page(s)", "Kept".green(), kept.len());
    save(&mut doc, &output.unwrap_or_else(|| sibling(input, "-selected.pdf")))
}

fn cmd_text2pdf(input: &Path, font_size: f32, output: Option<PathBuf>) -> CliResult {
    let text = fs::read_to_string(input)?;
    let converter = TextToPdf::new().with_font_size(font_size);
    let name = input.file_name().unwrap_or_default().to_string_lossy();
    let mut doc = converter.convert(&text, &name)?;
    println!(
        "{} lines, {} lines per page, {} page(s)",
        text.lines().count(),
        converter.lines_per_page(),
        doc.page_count()
    );
    let path = output.unwrap_or_else(|| {
        let mut name = input.as_os_str().to_owned();
        name.push(".pdf");
        PathBuf::from(name)
    });
    save(&mut doc, &path)
}

fn cmd_version() {
    println!("{} {}", "pdfsmith".cyan().bold(), pdfsmith::VERSION);
    println!("PDF recipes: text, drawings, figures, OCR fallback, fonts and page surgery");
    println!();
    println!("License: MIT");
}
