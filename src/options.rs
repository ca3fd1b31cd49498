//! Document loading options.

use crate::pages::PageSelection;

/// Options for opening a document and running per-page operations on it.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Error handling mode
    pub error_mode: ErrorMode,

    /// Whether read-only per-page extraction may use parallel processing
    pub parallel: bool,

    /// Page selection (which pages to visit)
    pub pages: PageSelection,

    /// Password for encrypted documents
    pub password: Option<String>,
}

impl LoadOptions {
    /// Create new load options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (skip failing pages and items).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    /// Set password for encrypted documents.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Strict,
            parallel: false,
            pages: PageSelection::All,
            password: None,
        }
    }
}

/// Error handling mode for per-page and per-item failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on the first error
    #[default]
    Strict,
    /// Log the failure, skip the page or item and continue
    Lenient,
}

impl ErrorMode {
    /// Apply the mode to a fallible per-item result.
    ///
    /// Strict mode propagates the error; lenient mode logs it and yields `None`.
    pub fn handle<T>(self, what: impl std::fmt::Display, result: crate::Result<T>) -> crate::Result<Option<T>> {
        match (self, result) {
            (_, Ok(v)) => Ok(Some(v)),
            (ErrorMode::Strict, Err(e)) => Err(e),
            (ErrorMode::Lenient, Err(e)) => {
                log::warn!("Skipping {}: {}", what, e);
                Ok(None)
            }
        }
    }
}
