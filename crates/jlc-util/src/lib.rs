//! Shared infrastructure used by every compiler phase: the non-fatal
//! diagnostics sink and the process exit codes.

mod diagnostics;
mod exit_code;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use exit_code::ExitCode;
