//! diag.rs — Diagnostics du compilateur externe.
//!
//! En mode non-pretty, `tsc` écrit une ligne par diagnostic :
//!
//! ```text
//! chemin/fichier.ts(42,5): error TS2304: Cannot find name 'foo'.
//! error TS5023: Unknown compiler option '--frobnicate'.
//! ```
//!
//! On reconnaît la forme localisée et la forme globale ; les lignes de bruit
//! (résumés, blancs) ne produisent rien. Un diagnostic n'est jamais une
//! erreur de passe : il est remonté, loggé, et la compilation continue.

use std::fmt;

/// Gravité d'un diagnostic compilateur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Un diagnostic structuré du compilateur.
///
/// Les champs de localisation sont absents pour les diagnostics globaux
/// (option inconnue, fichier de config illisible…).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub col: Option<u32>,
    /// Code du diagnostic, ex. `TS2304`.
    pub code: Option<String>,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    /// Reconnaît une ligne de sortie `tsc`. `None` pour le bruit.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        // Forme localisée : `chemin(l,c): error TSnnnn: message`.
        for (needle, severity) in [
            ("): error TS", Severity::Error),
            ("): warning TS", Severity::Warning),
        ] {
            if let Some(idx) = line.find(needle) {
                let loc = &line[..idx];
                let open = loc.rfind('(')?;
                let file = &loc[..open];
                let mut coords = loc[open + 1..].splitn(2, ',');
                let l: u32 = coords.next()?.trim().parse().ok()?;
                let c: u32 = coords.next()?.trim().parse().ok()?;
                // `needle.len() - 2` ramène sur le "TS" du code.
                let rest = &line[idx + needle.len() - 2..];
                let colon = rest.find(':')?;
                return Some(Self {
                    file: Some(file.to_string()),
                    line: Some(l),
                    col: Some(c),
                    code: Some(rest[..colon].trim().to_string()),
                    severity,
                    message: rest[colon + 1..].trim().to_string(),
                });
            }
        }

        // Forme globale : `error TSnnnn: message`.
        for (prefix, severity) in [("error TS", Severity::Error), ("warning TS", Severity::Warning)]
        {
            if let Some(rest) = line.strip_prefix(prefix) {
                let colon = rest.find(':')?;
                return Some(Self {
                    file: None,
                    line: None,
                    col: None,
                    code: Some(format!("TS{}", rest[..colon].trim())),
                    severity,
                    message: rest[colon + 1..].trim().to_string(),
                });
            }
        }

        None
    }

    /// Message complet, au format que `tsc` emploie lui-même.
    pub fn formatted(&self) -> String {
        match (&self.file, self.line, self.col, &self.code) {
            (Some(file), Some(line), Some(col), Some(code)) => {
                format!("{file}({line},{col}): {} {code}: {}", self.severity, self.message)
            }
            (_, _, _, Some(code)) => format!("{} {code}: {}", self.severity, self.message),
            _ => format!("{}: {}", self.severity, self.message),
        }
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_located_error() {
        let d = Diagnostic::parse_line(
            "src/a.ts(12,5): error TS2304: Cannot find name 'foo'.",
        )
        .unwrap();
        assert_eq!(d.file.as_deref(), Some("src/a.ts"));
        assert_eq!(d.line, Some(12));
        assert_eq!(d.col, Some(5));
        assert_eq!(d.code.as_deref(), Some("TS2304"));
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "Cannot find name 'foo'.");
    }

    #[test]
    fn parse_located_warning() {
        let d = Diagnostic::parse_line("lib/b.ts(3,1): warning TS6133: 'x' is declared but never used.")
            .unwrap();
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.code.as_deref(), Some("TS6133"));
    }

    #[test]
    fn parse_global_error() {
        let d = Diagnostic::parse_line("error TS5023: Unknown compiler option '--frobnicate'.")
            .unwrap();
        assert!(d.file.is_none());
        assert!(d.line.is_none());
        assert_eq!(d.code.as_deref(), Some("TS5023"));
        assert_eq!(d.message, "Unknown compiler option '--frobnicate'.");
    }

    #[test]
    fn message_keeps_its_own_colons() {
        let d = Diagnostic::parse_line(
            "a.ts(1,1): error TS2322: Type 'string' is not assignable to type: number.",
        )
        .unwrap();
        assert_eq!(d.message, "Type 'string' is not assignable to type: number.");
    }

    #[test]
    fn noise_is_skipped() {
        for line in ["", "   ", "Found 2 errors.", "Compilation complete. Watching for file changes."] {
            assert!(Diagnostic::parse_line(line).is_none(), "{line:?}");
        }
    }

    #[test]
    fn formatted_reproduces_the_tsc_shape() {
        let line = "src/a.ts(12,5): error TS2304: Cannot find name 'foo'.";
        let d = Diagnostic::parse_line(line).unwrap();
        assert_eq!(d.formatted(), line);
    }

    #[test]
    fn formatted_global_has_no_location() {
        let line = "error TS5023: Unknown compiler option '--frobnicate'.";
        let d = Diagnostic::parse_line(line).unwrap();
        assert_eq!(d.formatted(), line);
    }
}
