//! Canonical file extensions for content types.

use derive_getters::Getters;

/// Preferred extension for types that map to several.
const PREFERRED: [(&str, &str); 3] = [
    ("image/jpeg", ".jpeg"),
    ("text/plain", ".txt"),
    ("text/html", ".html"),
];

/// Extensions resolved for a content type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Getters)]
pub struct Extensions {
    /// Canonical extension with leading dot, if the type is known
    primary: Option<String>,
    /// Every candidate when the type is ambiguous; empty otherwise
    all: Vec<String>,
}

impl Extensions {
    /// Split into `(primary, all)`.
    pub fn into_parts(self) -> (Option<String>, Vec<String>) {
        (self.primary, self.all)
    }
}

/// Resolve the extensions for `content_type`.
///
/// Parameters such as `; charset=utf-8` are ignored. A single candidate
/// becomes the primary extension. With several, all are recorded (sorted)
/// and the primary comes from the preference table, else the first.
pub fn resolve_extensions(content_type: &str) -> Extensions {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let mut candidates: Vec<String> = mime_guess::get_mime_extensions_str(&essence)
        .unwrap_or_default()
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect();
    candidates.sort();
    candidates.dedup();

    match candidates.len() {
        0 => Extensions::default(),
        1 => Extensions {
            primary: candidates.pop(),
            all: Vec::new(),
        },
        _ => {
            let primary = PREFERRED
                .iter()
                .find(|(mime, _)| *mime == essence)
                .map(|(_, ext)| ext.to_string())
                .or_else(|| candidates.first().cloned());
            Extensions {
                primary,
                all: candidates,
            }
        }
    }
}
