use anyhow::Context;
use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs;
use std::io::Write;
use std::path::Path;

pub const GZIP: &str = "gzip";

pub const DEFAULT_COMPRESSIBLE: &[&str] = &[
    "application/javascript",
    "application/wasm",
    "application/json",
    "text/html",
    "text/css",
    "text/plain",
];

/// Which responses get gzipped, and how hard.
#[derive(Debug, Clone)]
pub struct CompressionPolicy {
    types: &'static [&'static str],
    level: Compression,
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self {
            types: DEFAULT_COMPRESSIBLE,
            level: Compression::new(6),
        }
    }
}

impl CompressionPolicy {
    pub fn is_eligible(&self, content_type: &str) -> bool {
        self.types.contains(&content_type)
    }

    pub fn level(&self) -> u32 {
        self.level.level()
    }

    /// Reads the whole file and gzips it into a fresh buffer.
    pub fn compress_file(&self, path: &Path) -> anyhow::Result<Bytes> {
        let content =
            fs::read(path).with_context(|| format!("can't read {}", path.display()))?;
        self.compress(&content)
    }

    pub fn compress(&self, content: &[u8]) -> anyhow::Result<Bytes> {
        let mut encoder = GzEncoder::new(Vec::with_capacity(content.len() / 2), self.level);
        encoder.write_all(content).context("gzip encoding failed")?;
        let compressed = encoder.finish().context("gzip encoding failed")?;
        Ok(Bytes::from(compressed))
    }
}

/// Plain substring check, no q-value parsing: `gzip;q=0` still counts.
pub fn accepts_gzip(accept_encoding: Option<&str>) -> bool {
    accept_encoding.is_some_and(|v| v.contains(GZIP))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn gunzip(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        GzDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn accept_encoding_substring() {
        assert!(accepts_gzip(Some("gzip")));
        assert!(accepts_gzip(Some("deflate, gzip, br")));
        assert!(accepts_gzip(Some("x-gzip")));
        assert!(accepts_gzip(Some("gzip;q=0")));
        assert!(!accepts_gzip(Some("GZIP")));
        assert!(!accepts_gzip(Some("br, deflate")));
        assert!(!accepts_gzip(Some("")));
        assert!(!accepts_gzip(None));
    }

    #[test]
    fn eligible_types() {
        let policy = CompressionPolicy::default();
        for t in DEFAULT_COMPRESSIBLE {
            assert!(policy.is_eligible(t), "{t}");
        }
        assert!(!policy.is_eligible("image/png"));
        assert!(!policy.is_eligible("font/woff2"));
        assert!(!policy.is_eligible("text/javascript"));
        assert!(!policy.is_eligible("text/html; charset=utf-8"));
        assert_eq!(policy.level(), 6);
    }

    #[test]
    fn compression_is_deterministic_and_lossless() {
        let policy = CompressionPolicy::default();
        let content = "console.log('hello');\n".repeat(200);

        let first = policy.compress(content.as_bytes()).unwrap();
        let second = policy.compress(content.as_bytes()).unwrap();

        assert_eq!(first, second);
        assert!(first.len() < content.len());
        assert_eq!(gunzip(&first), content.as_bytes());
    }

    #[test]
    fn empty_input_still_produces_gzip_stream() {
        let compressed = CompressionPolicy::default().compress(b"").unwrap();
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
        assert!(gunzip(&compressed).is_empty());
    }

    #[test]
    fn compress_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = CompressionPolicy::default()
            .compress_file(&dir.path().join("nope.js"))
            .unwrap_err();
        assert!(err.to_string().contains("nope.js"));
    }
}
