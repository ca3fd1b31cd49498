//! Tesseract command-line OCR engine.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use super::{tool_error, OcrEngine};
use crate::error::Result;

/// Runs `tesseract stdin stdout --psm <psm> -l <language>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TesseractCli {
    pub program: PathBuf,
    pub language: String,
    /// Page segmentation mode; 7 treats the image as a single text line
    pub psm: u8,
}

impl TesseractCli {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_psm(mut self, psm: u8) -> Self {
        self.psm = psm;
        self
    }

    fn args(&self) -> Vec<String> {
        vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "--psm".to_string(),
            self.psm.to_string(),
            "-l".to_string(),
            self.language.clone(),
        ]
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self {
            program: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            psm: 7,
        }
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, png: &[u8]) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| tool_error(&self.program, e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(png)?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(tool_error(
                &self.program,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(clean_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Strip the line break and form feed tesseract appends.
fn clean_output(text: &str) -> String {
    text.trim_end_matches(['\n', '\r', '\x0c']).to_string()
}
