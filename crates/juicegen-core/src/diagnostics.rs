use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Parse,
    Config,
    Lookup,
    Validate,
    Format,
    Emit,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticCode {
    JG0001ParseError,
    JG0100ConfigError,
    JG0200LookupError,
    JG0300SignatureError,
    JG0400UnsupportedVersion,
    JG0500FormatError,
    JG0600IoError,
    JG0901InternalBug,
}

impl DiagnosticCode {
    pub fn code_str(self) -> &'static str {
        match self {
            DiagnosticCode::JG0001ParseError => "JG0001",
            DiagnosticCode::JG0100ConfigError => "JG0100",
            DiagnosticCode::JG0200LookupError => "JG0200",
            DiagnosticCode::JG0300SignatureError => "JG0300",
            DiagnosticCode::JG0400UnsupportedVersion => "JG0400",
            DiagnosticCode::JG0500FormatError => "JG0500",
            DiagnosticCode::JG0600IoError => "JG0600",
            DiagnosticCode::JG0901InternalBug => "JG0901",
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            DiagnosticCode::JG0001ParseError => "failed to parse Go source",
            DiagnosticCode::JG0100ConfigError => "invalid statement configuration",
            DiagnosticCode::JG0200LookupError => "statement not found",
            DiagnosticCode::JG0300SignatureError => "method signature does not fit its statement",
            DiagnosticCode::JG0400UnsupportedVersion => "unsupported API version",
            DiagnosticCode::JG0500FormatError => "generated source failed canonical formatting",
            DiagnosticCode::JG0600IoError => "failed to write generated output",
            DiagnosticCode::JG0901InternalBug => "internal juicegen bug",
        }
    }

    pub fn default_help(self) -> Option<&'static str> {
        match self {
            DiagnosticCode::JG0200LookupError => Some(
                "Declare a statement whose id matches the method name under the interface namespace, or pass --namespace.",
            ),
            DiagnosticCode::JG0300SignatureError => Some(
                "Read methods look like `M(ctx context.Context, ...) (T, error)`; write methods return `error` or `(sql.Result, error)`.",
            ),
            DiagnosticCode::JG0400UnsupportedVersion => Some("Use --api-version v1 or v2."),
            DiagnosticCode::JG0901InternalBug => Some(
                "This is a bug in juicegen. Please report it with the interface and mapper files.",
            ),
            _ => None,
        }
    }

    pub fn phase(self) -> Phase {
        match self {
            DiagnosticCode::JG0001ParseError => Phase::Parse,
            DiagnosticCode::JG0100ConfigError => Phase::Config,
            DiagnosticCode::JG0200LookupError => Phase::Lookup,
            DiagnosticCode::JG0300SignatureError => Phase::Validate,
            DiagnosticCode::JG0400UnsupportedVersion => Phase::Config,
            DiagnosticCode::JG0500FormatError => Phase::Format,
            DiagnosticCode::JG0600IoError => Phase::Emit,
            DiagnosticCode::JG0901InternalBug => Phase::Internal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub phase: Phase,
    pub severity: Severity,
    pub message: String,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            phase: code.phase(),
            severity: Severity::Error,
            message: message.into(),
            help: code.default_help().map(|s| s.to_string()),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::error(DiagnosticCode::JG0001ParseError, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::error(DiagnosticCode::JG0100ConfigError, message)
    }

    pub fn lookup(message: impl Into<String>) -> Self {
        Self::error(DiagnosticCode::JG0200LookupError, message)
    }

    pub fn signature(message: impl Into<String>) -> Self {
        Self::error(DiagnosticCode::JG0300SignatureError, message)
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::error(DiagnosticCode::JG0500FormatError, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?} {:?}: {}",
            self.code.code_str(),
            self.phase,
            self.severity,
            self.message
        )?;
        if let Some(help) = &self.help {
            write!(f, "\n  help: {help}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Returns the diagnostic carried by `err`, if any layer of it is one.
pub fn diagnostic_of(err: &anyhow::Error) -> Option<&Diagnostic> {
    err.chain().find_map(|e| e.downcast_ref::<Diagnostic>())
}

pub fn render_diagnostics_md() -> String {
    let mut rows: Vec<(String, Phase, Severity, String, String)> = Vec::new();
    for code in all_codes() {
        rows.push((
            code.code_str().to_string(),
            code.phase(),
            Severity::Error,
            code.default_message().to_string(),
            code.default_help().unwrap_or("").to_string(),
        ));
    }
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = String::new();
    out.push_str("# juicegen diagnostics catalog\n\n");
    out.push_str("This document is generated from `crates/juicegen-core/src/diagnostics.rs`.\n\n");
    out.push_str("| Code | Phase | Severity | Message | Help |\n");
    out.push_str("| ---- | ----- | -------- | ------- | ---- |\n");
    for (code, phase, sev, msg, help) in rows {
        out.push_str(&format!(
            "| {code} | {phase:?} | {sev:?} | {msg} | {help} |\n"
        ));
    }
    out
}

fn all_codes() -> &'static [DiagnosticCode] {
    &[
        DiagnosticCode::JG0001ParseError,
        DiagnosticCode::JG0100ConfigError,
        DiagnosticCode::JG0200LookupError,
        DiagnosticCode::JG0300SignatureError,
        DiagnosticCode::JG0400UnsupportedVersion,
        DiagnosticCode::JG0500FormatError,
        DiagnosticCode::JG0600IoError,
        DiagnosticCode::JG0901InternalBug,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_phase_and_help() {
        let d = Diagnostic::signature("Get: second result must be error");
        let text = d.to_string();
        assert!(text.starts_with("JG0300 Validate Error: Get: second result must be error"));
        assert!(text.contains("\n  help: "), "{text}");
    }

    #[test]
    fn diagnostic_survives_anyhow_context() {
        let err = anyhow::Error::new(Diagnostic::lookup("statement not found: ns.Get"))
            .context("generate UserRepository");
        let d = diagnostic_of(&err).expect("diagnostic in chain");
        assert_eq!(d.code, DiagnosticCode::JG0200LookupError);
    }

    #[test]
    fn catalog_lists_every_code_once() {
        let md = render_diagnostics_md();
        for code in all_codes() {
            assert_eq!(md.matches(code.code_str()).count(), 1, "{}", code.code_str());
        }
    }
}
