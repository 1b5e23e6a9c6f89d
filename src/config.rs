use crate::http::compression::CompressionPolicy;
use crate::http::mime::MimeResolver;
use anyhow::{Context, bail};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;

/// Served root, relative to the directory holding the executable.
pub const WEB_DIR: &str = "build/web";

/// Everything the server needs, fixed at startup and shared read-only
/// between connections.
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub root: PathBuf,
    pub mime: MimeResolver,
    pub compression: CompressionPolicy,
    /// How long an idle connection waits for its next request.
    pub keep_alive_timeout: Duration,
}

impl Config {
    pub fn new(root: impl Into<PathBuf>, addr: SocketAddr) -> Config {
        Config {
            addr,
            root: root.into(),
            mime: MimeResolver::default(),
            compression: CompressionPolicy::default(),
            keep_alive_timeout: Duration::from_secs(5),
        }
    }

    /// Builds the config from the command line (program name already
    /// skipped): an optional port, everything after it ignored.
    pub fn from_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Config> {
        let port = match args.next() {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("invalid port {:?}", raw))?,
            None => DEFAULT_PORT,
        };

        let exe = std::env::current_exe().context("can't locate the executable")?;
        let exe_dir = exe
            .parent()
            .context("executable has no parent directory")?;

        Ok(Config::new(
            exe_dir.join(WEB_DIR),
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
        ))
    }

    /// Fails when the served root is missing or not a directory.
    pub fn validate(&self) -> anyhow::Result<()> {
        check_root(&self.root)
    }
}

fn check_root(root: &Path) -> anyhow::Result<()> {
    let meta = std::fs::metadata(root)
        .with_context(|| format!("served root {} is not accessible", root.display()))?;
    if !meta.is_dir() {
        bail!("served root {} is not a directory", root.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn default_port_and_root() {
        let config = Config::from_args(args(&[])).unwrap();
        assert_eq!(config.addr, "0.0.0.0:8080".parse().unwrap());
        assert!(config.root.ends_with("build/web"));
        assert_eq!(config.compression.level(), 6);
    }

    #[test]
    fn port_argument() {
        let config = Config::from_args(args(&["9000", "ignored"])).unwrap();
        assert_eq!(config.addr.port(), 9000);
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(Config::from_args(args(&["http"])).is_err());
        assert!(Config::from_args(args(&["70000"])).is_err());
    }

    #[test]
    fn validate_root() {
        let dir = tempfile::tempdir().unwrap();
        let addr = "127.0.0.1:0".parse().unwrap();

        assert!(Config::new(dir.path(), addr).validate().is_ok());
        assert!(Config::new(dir.path().join("missing"), addr).validate().is_err());

        let file = dir.path().join("file");
        std::fs::write(&file, "x").unwrap();
        assert!(Config::new(file, addr).validate().is_err());
    }
}
