//! Console reporting for pipeline and tool output
//!
//! Captured output from external tools is re-echoed line by line: ordinary
//! lines go to stdout verbatim, error-classified lines go to stderr. A line
//! containing one of the recognized error markers opens error mode; every
//! following line stays error-classified until a line containing the
//! `FAILED` terminator closes it. The same classification serves the test
//! summary reporter and the pipeline's own failure reporting.

/// Marker words that open error classification
pub const ERROR_MARKERS: &[&str] = &["error:", "FAILED"];

/// A line containing this word closes error mode again
const ERROR_TERMINATOR: &str = "FAILED";

/// Classification level of an echoed line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

/// Classify captured tool output line by line.
///
/// Pure function over the raw text; no side effects. The returned slices
/// borrow from the input and preserve its line order.
pub fn classify_lines(text: &str) -> Vec<(Level, &str)> {
    let mut classified = Vec::new();
    let mut err_mode = false;

    for line in text.lines() {
        if ERROR_MARKERS.iter().any(|m| line.contains(m)) || err_mode {
            classified.push((Level::Error, line));
            err_mode = !line.contains(ERROR_TERMINATOR);
        } else {
            classified.push((Level::Info, line));
        }
    }

    classified
}

/// Console sink for pipeline messages and re-echoed tool output
#[derive(Debug, Clone, Copy)]
pub struct ConsoleLog {
    verbose: bool,
}

impl ConsoleLog {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Informational message
    pub fn info(&self, msg: &str) {
        println!("{}", msg);
    }

    /// Error-level message
    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg);
    }

    /// Diagnostic message, only shown with --verbose
    pub fn debug(&self, msg: &str) {
        if self.verbose {
            eprintln!("{}", msg);
        }
    }

    /// Re-echo captured tool output with error classification applied
    pub fn echo_classified(&self, text: &str) {
        for (level, line) in classify_lines(text) {
            match level {
                Level::Info => println!("    {}", line),
                Level::Error => eprintln!("    {}", line),
            }
        }
    }
}
