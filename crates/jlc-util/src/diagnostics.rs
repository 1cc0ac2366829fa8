use std::fmt;

/// Severity of a non-fatal diagnostic. Fatal errors never pass through here;
/// they are returned as `Err` from the phase that detected them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
}

/// A single non-fatal finding, already formatted the way the external
/// interface requires: `Semantic warning in class "<n>": <message>! (line N)`.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub class_name: String,
    pub message: String,
    pub line: u32,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.severity {
            Severity::Warning => "warning",
        };
        write!(
            f,
            "Semantic {kind} in class \"{}\": {}! (line {})",
            self.class_name, self.message, self.line
        )
    }
}

/// Accumulates warnings raised by the finaliser and code generator without
/// aborting compilation. Collected in order, flushed by the driver once the
/// whole pipeline has run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, class_name: impl Into<String>, line: u32, message: impl Into<String>) {
        self.warnings.push(Diagnostic {
            severity: Severity::Warning,
            class_name: class_name.into(),
            message: message.into(),
            line,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.warnings.iter()
    }

    /// Writes every accumulated warning to `w`, one per line, in the order raised.
    pub fn emit(&self, mut w: impl std::io::Write) -> std::io::Result<()> {
        for diagnostic in &self.warnings {
            writeln!(w, "{diagnostic}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_warning_with_class_and_line() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn("Main", 12, "Variable used before being initialised");
        let mut buf = Vec::new();
        diagnostics.emit(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "Semantic warning in class \"Main\": Variable used before being initialised! (line 12)\n"
        );
    }

    #[test]
    fn empty_sink_emits_nothing() {
        let diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());
    }
}
