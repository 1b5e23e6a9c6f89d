//! Content-Type inference for served files.

use std::path::Path;

/// Suffixes whose generic MIME mapping is wrong or missing on some
/// platforms. Checked in order before the generic table.
pub const DEFAULT_OVERRIDES: &[(&str, &str)] = &[
    (".wasm", "application/wasm"),
    (".js", "application/javascript"),
    (".json", "application/json"),
];

pub const FALLBACK_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone)]
pub struct MimeResolver {
    overrides: &'static [(&'static str, &'static str)],
}

impl Default for MimeResolver {
    fn default() -> Self {
        Self {
            overrides: DEFAULT_OVERRIDES,
        }
    }
}

impl MimeResolver {
    pub fn with_overrides(overrides: &'static [(&'static str, &'static str)]) -> Self {
        Self { overrides }
    }

    /// Content type for `path`. The first matching override wins,
    /// otherwise the extension table decides.
    pub fn content_type(&self, path: &Path) -> &'static str {
        let name = path.to_string_lossy();
        self.overrides
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix))
            .map(|(_, mime)| *mime)
            .unwrap_or_else(|| {
                mime_guess::from_path(path)
                    .first_raw()
                    .unwrap_or(FALLBACK_TYPE)
            })
    }
}
