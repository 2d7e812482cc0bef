//! Public Output API - plain line output for commands
//!
//! Progress and status lines go to stdout, failures to stderr. The handle
//! is cheap to clone and safe to share across tasks; lines are written
//! whole, so concurrent writers do not interleave mid-line.

/// Line-oriented output handle.
#[derive(Clone, Default)]
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    /// Print an informational line.
    pub fn info(&self, msg: &str) {
        println!("{msg}");
    }

    /// Print a completion line.
    pub fn success(&self, msg: &str) {
        println!("{msg}");
    }

    /// Print an error line to stderr.
    pub fn error(&self, msg: &str) {
        eprintln!("{msg}");
    }
}
