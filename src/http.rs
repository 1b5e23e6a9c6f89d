use crate::http::status::Status;
use bytes::Bytes;
use std::fs::File;
use std::io::{self, Read, Write};

pub mod compression;
pub mod files;
pub mod handler;
pub mod method;
pub mod middleware;
pub mod mime;
pub mod request;
pub mod server;
pub mod status;

#[derive(Debug)]
pub enum Body {
    Empty,
    Full(Bytes),
    /// Streamed straight from disk; `len` is the size announced in
    /// `Content-Length`.
    File { file: File, len: u64 },
}

impl Body {
    pub fn len(&self) -> Option<u64> {
        match self {
            Body::Empty => None,
            Body::Full(b) => Some(b.len() as u64),
            Body::File { len, .. } => Some(*len),
        }
    }
}

#[derive(Debug)]
pub struct Response {
    pub status: Status,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl Response {
    pub fn from_parts(status: Status, headers: Vec<(String, String)>, body: Body) -> Response {
        Response {
            status,
            headers,
            body,
        }
    }

    pub fn with_header(mut self, k: impl Into<String>, v: impl Into<String>) -> Response {
        self.headers.push((k.into(), v.into()));
        self
    }

    pub fn header(&self, k: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(k))
            .map(|(_, v)| v.as_str())
    }

    pub fn closes_connection(&self) -> bool {
        self.header("connection")
            .is_some_and(|v| v.eq_ignore_ascii_case("close"))
    }

    /// Writes status line, headers and (unless `include_body` is false)
    /// the body. Returns the number of body bytes written.
    pub fn write_to(self, w: &mut impl Write, include_body: bool) -> io::Result<u64> {
        w.write_all(&serialize_head(&self))?;
        if !include_body {
            return Ok(0);
        }

        match self.body {
            Body::Empty => Ok(0),
            Body::Full(content) => {
                w.write_all(&content)?;
                Ok(content.len() as u64)
            }
            Body::File { file, len } => {
                let copied = io::copy(&mut file.take(len), w)?;
                if copied != len {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("file shrank while sending: {copied} of {len} bytes"),
                    ));
                }
                Ok(copied)
            }
        }
    }
}

pub fn serialize_head(response: &Response) -> Vec<u8> {
    let mut head = Vec::with_capacity(64 + response.headers.len() * 32);

    head.extend(
        format!(
            "HTTP/1.1 {} {}\r\n",
            response.status.code_num, response.status.message
        )
        .as_bytes(),
    );

    for (key, value) in &response.headers {
        head.extend(format!("{}: {}\r\n", key, value).as_bytes());
    }

    if let Some(len) = response.body.len() {
        if response.header("content-length").is_none() {
            head.extend(format!("Content-Length: {}\r\n", len).as_bytes());
        }
    }
    head.extend(b"\r\n");

    head
}

pub fn ok(content_type: &str, content: Bytes) -> Response {
    Response::from_parts(
        Status::OK,
        vec![("Content-Type".to_string(), content_type.to_string())],
        Body::Full(content),
    )
}

/// Small HTML error page. The connection is closed after it is sent.
pub fn error(status: Status, message: &str) -> Response {
    let page = format!(
        "<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Error response</title>\n</head>\n<body>\n<h1>{} {}</h1>\n<p>{}</p>\n\
         </body>\n</html>\n",
        status.code_num,
        status.message,
        files::html_escape(message)
    );

    Response::from_parts(
        status,
        vec![
            ("Content-Type".to_string(), "text/html;charset=utf-8".to_string()),
            ("Connection".to_string(), "close".to_string()),
        ],
        Body::Full(Bytes::from(page)),
    )
}

pub fn not_found() -> Response {
    error(Status::NOT_FOUND, "File not found")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(response: Response, include_body: bool) -> String {
        let mut out = Vec::new();
        response.write_to(&mut out, include_body).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn full_body_gets_content_length() {
        let text = render(ok("text/plain", Bytes::from_static(b"hello")), true);
        assert_eq!(
            text,
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\nhello"
        );
    }

    #[test]
    fn head_only_keeps_length_but_drops_body() {
        let text = render(ok("text/plain", Bytes::from_static(b"hello")), false);
        assert!(text.ends_with("Content-Length: 5\r\n\r\n"));
    }

    #[test]
    fn explicit_content_length_is_not_duplicated() {
        let response = Response::from_parts(Status::MOVED_PERMANENTLY, Vec::new(), Body::Empty)
            .with_header("Location", "/sub/")
            .with_header("Content-Length", "0");
        let text = render(response, true);
        assert_eq!(text.matches("Content-Length").count(), 1);
        assert!(text.starts_with("HTTP/1.1 301 Moved Permanently\r\n"));
    }

    #[test]
    fn empty_body_has_no_length() {
        let response = Response::from_parts(Status::NOT_MODIFIED, Vec::new(), Body::Empty);
        assert_eq!(render(response, true), "HTTP/1.1 304 Not Modified\r\n\r\n");
    }

    #[test]
    fn file_body_is_streamed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"from disk").unwrap();
        let file = File::open(&path).unwrap();

        let response = Response::from_parts(Status::OK, Vec::new(), Body::File { file, len: 9 });
        let mut out = Vec::new();
        assert_eq!(response.write_to(&mut out, true).unwrap(), 9);
        assert!(out.ends_with(b"\r\n\r\nfrom disk"));
    }

    #[test]
    fn error_pages_close_and_escape() {
        let response = error(Status::NOT_IMPLEMENTED, "Unsupported method ('<X>')");
        assert!(response.closes_connection());
        assert_eq!(response.header("content-type"), Some("text/html;charset=utf-8"));
        let text = render(response, true);
        assert!(text.contains("501 Not Implemented"));
        assert!(text.contains("&lt;X&gt;"));
    }
}
