use crate::config::Config;
use crate::http::method::Method;
use crate::http::status::Status;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::io::{self, BufRead, Read};
use std::str::FromStr;
use thiserror::Error;

const MAX_LINE: usize = 65536;
const MAX_HEADERS: usize = 100;

static REQUEST_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<method>[^\s]+) (?P<target>[^\s]+) HTTP/(?P<major>\d+)\.(?P<minor>\d+)$")
        .unwrap()
});

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("connection error: {0}")]
    Io(#[from] io::Error),
    #[error("Bad request syntax ({0:?})")]
    BadRequestLine(String),
    #[error("Invalid HTTP version ({0})")]
    UnsupportedVersion(String),
    #[error("Request line too long")]
    LineTooLong,
    #[error("Line too long")]
    HeaderTooLong,
    #[error("Too many headers")]
    TooManyHeaders,
    #[error("Bad header line ({0:?})")]
    BadHeader(String),
    #[error("Bad Content-Length ({0:?})")]
    BadContentLength(String),
}

impl RequestError {
    /// Status to answer with, `None` when the connection itself failed.
    pub fn status(&self) -> Option<Status> {
        match self {
            RequestError::Io(_) => None,
            RequestError::UnsupportedVersion(_) => Some(Status::HTTP_VERSION_NOT_SUPPORTED),
            RequestError::LineTooLong => Some(Status::URI_TOO_LONG),
            RequestError::HeaderTooLong | RequestError::TooManyHeaders => {
                Some(Status::HEADER_FIELDS_TOO_LARGE)
            }
            RequestError::BadRequestLine(_)
            | RequestError::BadHeader(_)
            | RequestError::BadContentLength(_) => Some(Status::BAD_REQUEST),
        }
    }
}

#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub target: String,
    pub version: (u8, u8),
    pub headers: HashMap<String, String>,
}

impl Request {
    pub fn get_header(&self, k: &str) -> Option<&str> {
        self.headers.get(&k.to_lowercase()).map(|v| v.as_str())
    }

    pub fn request_line(&self) -> String {
        format!(
            "{} {} HTTP/{}.{}",
            self.method.as_str(),
            self.target,
            self.version.0,
            self.version.1
        )
    }

    pub fn keep_alive(&self) -> bool {
        if self.get_header("transfer-encoding").is_some() {
            return false;
        }
        let connection = self.get_header("connection").map(|v| v.to_ascii_lowercase());
        match (self.version, connection.as_deref()) {
            (_, Some("close")) => false,
            ((1, 0), Some("keep-alive")) => true,
            ((1, 0), _) => false,
            _ => true,
        }
    }

    /// Reads one request head off `rdr` and discards any
    /// `Content-Length` body. `Ok(None)` means the peer closed the
    /// connection before sending anything.
    pub fn read_from(rdr: &mut impl BufRead) -> Result<Option<Request>, RequestError> {
        let mut raw = Vec::new();
        let first_line = loop {
            let n = read_raw_line(rdr, &mut raw)?;
            if n == 0 {
                return Ok(None);
            }
            if raw.len() > MAX_LINE {
                return Err(RequestError::LineTooLong);
            }
            let line = raw.trim_ascii();
            if !line.is_empty() {
                break String::from_utf8_lossy(line).into_owned();
            }
        };

        let caps = REQUEST_LINE_RE
            .captures(&first_line)
            .ok_or_else(|| RequestError::BadRequestLine(first_line.clone()))?;

        let version = match (caps["major"].parse::<u8>(), caps["minor"].parse::<u8>()) {
            (Ok(1), Ok(minor)) => (1, minor.min(1)),
            (Ok(major), Ok(_)) if major >= 2 => {
                return Err(RequestError::UnsupportedVersion(
                    first_line.rsplit(' ').next().unwrap_or_default().to_string(),
                ));
            }
            _ => return Err(RequestError::BadRequestLine(first_line.clone())),
        };

        // infallible, unknown methods land in `Method::Other`
        let method = Method::from_str(&caps["method"])
            .unwrap_or_else(|_| Method::Other(caps["method"].to_string()));
        let target = caps["target"].to_string();

        let mut headers: HashMap<String, String> = HashMap::new();
        loop {
            let n = read_raw_line(rdr, &mut raw)?;
            if raw.len() > MAX_LINE {
                return Err(RequestError::HeaderTooLong);
            }
            let line = latin1(&raw);
            if n == 0 || line.trim_ascii().is_empty() {
                break;
            }
            if headers.len() >= MAX_HEADERS {
                return Err(RequestError::TooManyHeaders);
            }

            let (k, v) = line
                .trim_ascii()
                .split_once(':')
                .ok_or_else(|| RequestError::BadHeader(line.trim_ascii().to_string()))?;
            // first occurrence wins
            headers
                .entry(k.trim_ascii().to_lowercase())
                .or_insert_with(|| v.trim_ascii().to_string());
        }

        if let Some(value) = headers.get("content-length") {
            let len: u64 = value
                .parse()
                .map_err(|_| RequestError::BadContentLength(value.clone()))?;
            io::copy(&mut rdr.by_ref().take(len), &mut io::sink())?;
        }

        Ok(Some(Request {
            method,
            target,
            version,
            headers,
        }))
    }
}

/// Reads up to `MAX_LINE + 1` bytes through the next `\n` into `buf`.
fn read_raw_line(rdr: &mut impl BufRead, buf: &mut Vec<u8>) -> io::Result<usize> {
    buf.clear();
    rdr.by_ref().take(MAX_LINE as u64 + 1).read_until(b'\n', buf)
}

/// Header bytes are ISO-8859-1, every byte maps to one char.
fn latin1(raw: &[u8]) -> String {
    raw.iter().map(|&b| char::from(b)).collect()
}

/// What a handler sees: the parsed request plus the server's settings.
#[derive(Debug)]
pub struct RequestContext<'a> {
    request: &'a Request,
    config: &'a Config,
}

impl<'a> RequestContext<'a> {
    pub fn new(request: &'a Request, config: &'a Config) -> RequestContext<'a> {
        RequestContext { request, config }
    }

    pub fn get_header(&self, k: &str) -> Option<&str> {
        self.request.get_header(k)
    }

    pub fn request(&self) -> &Request {
        self.request
    }

    pub fn config(&self) -> &Config {
        self.config
    }
}
