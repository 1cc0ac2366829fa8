use std::path::PathBuf;

use jlc_gen::GenError;
use jlc_par::ParseError;
use jlc_sem::SemError;
use jlc_util::ExitCode;
use thiserror::Error;

/// Top-level error type for one driver invocation. Each variant maps to
/// exactly one of the exit codes the command-line contract promises.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("could not read \"{path}\": {source}")]
    Read { path: PathBuf, #[source] source: std::io::Error },
    #[error("could not write \"{path}\": {source}")]
    Write { path: PathBuf, #[source] source: std::io::Error },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Sem(#[from] SemError),
    #[error(transparent)]
    Gen(#[from] GenError),
}

impl DriverError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            DriverError::Read { .. } | DriverError::Write { .. } => ExitCode::FileError,
            DriverError::Parse(ParseError::Lex(_)) => ExitCode::LexError,
            DriverError::Parse(_) => ExitCode::ParseError,
            DriverError::Sem(_) | DriverError::Gen(_) => ExitCode::SemanticError,
        }
    }

    /// The line to print on the compiler's own diagnostic stream, or `None`
    /// for failures (file I/O) that fall outside that three-prefix contract.
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            DriverError::Read { .. } | DriverError::Write { .. } => None,
            DriverError::Parse(ParseError::Lex(lex)) => Some(format!("Syntax error: {lex}")),
            DriverError::Parse(e) => Some(e.to_string()),
            DriverError::Sem(e) => Some(e.to_string()),
            DriverError::Gen(e) => Some(e.to_string()),
        }
    }
}
