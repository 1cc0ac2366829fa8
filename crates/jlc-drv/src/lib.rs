//! Driver: wires the four compiler phases together, handles file I/O, and
//! exposes the command-line contract. Carries no compiler semantics of its
//! own; just orchestration.

mod error;

pub use error::DriverError;

use std::path::PathBuf;

use clap::Parser;
use jlc_par::{ClassId, ClassList};
use jlc_util::Diagnostics;

/// `jlc <file1> [file2 ...]` — one JL source file per class.
#[derive(Parser, Debug)]
#[command(name = "jlc", version, about = "Compiles JL source files to stack-VM assembly")]
pub struct Cli {
    /// Source files to compile, one class per file
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Raise logging verbosity (stack for more: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Runs the full pipeline for one invocation: parse every file, finalise the
/// combined class list, generate and write one `.vm` file per class.
pub fn run(cli: &Cli) -> Result<(), DriverError> {
    let mut classes = ClassList::new();

    for path in &cli.files {
        tracing::info!(file = %path.display(), "reading source file");
        let source = std::fs::read_to_string(path)
            .map_err(|source| DriverError::Read { path: path.clone(), source })?;

        tracing::debug!(file = %path.display(), "parsing");
        let class = jlc_par::parse_class(&source)?;
        classes.push(class);
    }

    tracing::debug!(classes = classes.classes.len(), "finalising symbol tables");
    jlc_sem::finalise(&mut classes)?;

    let mut diagnostics = Diagnostics::new();
    for index in 0..classes.classes.len() {
        let class_id = ClassId(index);
        let class_name = classes.get(class_id).name.clone();

        tracing::debug!(class = %class_name, "generating code");
        let vm_text = jlc_gen::generate_class(&classes, class_id, &mut diagnostics)?;

        let output_path = PathBuf::from(format!("{class_name}.vm"));
        std::fs::write(&output_path, vm_text)
            .map_err(|source| DriverError::Write { path: output_path.clone(), source })?;
        tracing::info!(file = %output_path.display(), "wrote output");
    }

    diagnostics
        .emit(std::io::stderr())
        .map_err(|source| DriverError::Write { path: PathBuf::from("<stderr>"), source })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_error_maps_to_exit_code_one() {
        let cli = Cli { files: vec![PathBuf::from("/nonexistent/does-not-exist.jl")], verbose: 0 };
        let err = run(&cli).unwrap_err();
        assert_eq!(err.exit_code(), jlc_util::ExitCode::FileError);
        assert!(err.diagnostic().is_none());
    }
}
