//! Convert analyzer error records to LSP diagnostics

use std::path::Path;

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range};

use crate::grammar::records::ErrorRecord;
use crate::grammar::table::normalize_path;

/// Analyzer severity codes.
const SEVERITY_ERROR: u8 = 1;
const SEVERITY_FATAL: u8 = 2;
const SEVERITY_WARNING: u8 = 3;

/// The canonical one-line form of an analyzer error, shown in the client log
/// and as the diagnostic message.
pub fn error_detail(error: &ErrorRecord) -> String {
    let location = if error.first_line >= 0 {
        format!("({} -- {})", error.first_line, error.last_line)
    } else {
        format!("({})", error.last_line)
    };
    let kind = match error.error_type {
        SEVERITY_WARNING => "warning",
        SEVERITY_FATAL => "fatal error",
        _ => "error",
    };

    format!(
        "{}{} : {} {:03}: {}",
        error.file_name.display(),
        location,
        kind,
        error.error_id,
        error.error_message.replace('\n', "")
    )
}

/// Convert one error record to a diagnostic. The analyzer reports 1-based
/// lines, with -1 as "no start line"; the range then collapses to the last
/// line.
pub fn error_to_diagnostic(error: &ErrorRecord) -> Diagnostic {
    let last_line = error.last_line.max(1) as u32 - 1;
    let first_line = if error.first_line != -1 {
        error.first_line.max(1) as u32 - 1
    } else {
        last_line
    };

    let severity = if error.error_type == SEVERITY_WARNING {
        DiagnosticSeverity::WARNING
    } else {
        DiagnosticSeverity::ERROR
    };

    Diagnostic {
        range: Range::new(
            Position::new(first_line, 0),
            Position::new(last_line, u32::MAX),
        ),
        severity: Some(severity),
        source: Some("pawn".to_string()),
        message: error_detail(error),
        ..Default::default()
    }
}

/// Diagnostics of one pass for a single document.
pub fn diagnostics_for_document(errors: &[ErrorRecord], document: &Path) -> Vec<Diagnostic> {
    let document = normalize_path(document);
    errors
        .iter()
        .filter(|e| normalize_path(&e.file_name) == document)
        .map(error_to_diagnostic)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(first: i64, last: i64, error_type: u8) -> ErrorRecord {
        ErrorRecord {
            file_name: PathBuf::from("/proj/main.pwn"),
            error_id: 17,
            first_line: first,
            last_line: last,
            error_type,
            error_message: "undefined symbol\n".to_string(),
        }
    }

    #[test]
    fn test_error_detail_format() {
        assert_eq!(
            error_detail(&record(3, 5, SEVERITY_ERROR)),
            "/proj/main.pwn(3 -- 5) : error 017: undefined symbol"
        );
        assert_eq!(
            error_detail(&record(-1, 4, SEVERITY_WARNING)),
            "/proj/main.pwn(4) : warning 017: undefined symbol"
        );
        assert_eq!(
            error_detail(&record(-1, 1, SEVERITY_FATAL)),
            "/proj/main.pwn(1) : fatal error 017: undefined symbol"
        );
    }

    #[test]
    fn test_range_and_severity() {
        let diag = error_to_diagnostic(&record(3, 5, SEVERITY_ERROR));
        assert_eq!(diag.range.start, Position::new(2, 0));
        assert_eq!(diag.range.end.line, 4);
        assert_eq!(diag.severity, Some(DiagnosticSeverity::ERROR));

        let diag = error_to_diagnostic(&record(-1, 4, SEVERITY_WARNING));
        assert_eq!(diag.range.start.line, 3);
        assert_eq!(diag.severity, Some(DiagnosticSeverity::WARNING));
    }

    #[test]
    fn test_diagnostics_filtered_by_document() {
        let errors = vec![record(1, 1, SEVERITY_ERROR), {
            let mut other = record(2, 2, SEVERITY_ERROR);
            other.file_name = PathBuf::from("/proj/include/util.inc");
            other
        }];

        let diags = diagnostics_for_document(&errors, Path::new("/proj/./main.pwn"));
        assert_eq!(diags.len(), 1);
    }
}
