//! Plain static file serving: path translation, directory handling and
//! conditional GET. Bodies are streamed from disk, never compressed.

use crate::http::request::RequestContext;
use crate::http::status::Status;
use crate::http::{Body, Response, error, not_found, ok};
use bytes::Bytes;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

pub const INDEX_FILES: &[&str] = &["index.html", "index.htm"];

/// Characters left alone when building listing hrefs.
const HREF: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

/// A request target mapped onto the served root.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    /// Filesystem path, always inside the root.
    pub path: PathBuf,
    /// Path part of the URL, still percent-encoded.
    pub url_path: String,
    pub query: Option<String>,
    pub trailing_slash: bool,
    /// False when a segment holds a backslash or NUL; such targets are
    /// never served.
    pub valid: bool,
}

/// Maps a request target onto `root`. Query and fragment are dropped,
/// the rest is percent-decoded and normalized; `..` never climbs above
/// the root.
pub fn resolve(root: &Path, target: &str) -> Target {
    let (without_fragment, _) = target.split_once('#').unwrap_or((target, ""));
    let (url_path, query) = match without_fragment.split_once('?') {
        Some((p, q)) => (p, Some(q.to_string())),
        None => (without_fragment, None),
    };

    let trailing_slash = url_path.trim_end().ends_with('/');
    let decoded = percent_decode_str(url_path).decode_utf8_lossy();

    let mut valid = true;
    let mut parts: Vec<&str> = Vec::new();
    for part in decoded.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            p => {
                valid &= !p.contains(['\\', '\0']);
                parts.push(p);
            }
        }
    }

    let mut path = root.to_path_buf();
    path.extend(parts);

    Target {
        path,
        url_path: url_path.to_string(),
        query,
        trailing_slash,
        valid,
    }
}

/// GET and HEAD without compression.
pub fn serve(ctx: &RequestContext) -> Response {
    let config = ctx.config();
    let target = resolve(&config.root, &ctx.request().target);
    if !target.valid {
        return not_found();
    }
    let mut path = target.path.clone();

    if path.is_dir() {
        if !target.trailing_slash {
            let mut location = format!("{}/", target.url_path);
            if let Some(q) = &target.query {
                location.push('?');
                location.push_str(q);
            }
            return Response::from_parts(Status::MOVED_PERMANENTLY, Vec::new(), Body::Empty)
                .with_header("Location", location)
                .with_header("Content-Length", "0");
        }

        let index = INDEX_FILES
            .iter()
            .map(|index| path.join(index))
            .find(|p| p.is_file());
        match index {
            Some(index) => path = index,
            None => return list_directory(&path, &target),
        }
    } else if target.trailing_slash {
        return not_found();
    }

    let file = match File::open(&path) {
        Ok(f) => f,
        Err(e) => {
            debug!("can't open {}: {}", path.display(), e);
            return not_found();
        }
    };
    let meta = match file.metadata() {
        Ok(m) if m.is_file() => m,
        _ => return not_found(),
    };

    let modified = meta.modified().ok().map(truncate_to_seconds);
    if let Some(modified) = modified {
        if not_modified_since(ctx, modified) {
            return Response::from_parts(Status::NOT_MODIFIED, Vec::new(), Body::Empty);
        }
    }

    let mut response = Response::from_parts(
        Status::OK,
        vec![(
            "Content-Type".to_string(),
            config.mime.content_type(&path).to_string(),
        )],
        Body::File {
            file,
            len: meta.len(),
        },
    );
    if let Some(modified) = modified {
        response = response.with_header("Last-Modified", httpdate::fmt_http_date(modified));
    }
    response
}

fn not_modified_since(ctx: &RequestContext, modified: SystemTime) -> bool {
    if ctx.get_header("if-none-match").is_some() {
        return false;
    }
    ctx.get_header("if-modified-since")
        .and_then(|v| httpdate::parse_http_date(v).ok())
        .is_some_and(|since| modified <= since)
}

fn truncate_to_seconds(t: SystemTime) -> SystemTime {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => UNIX_EPOCH + Duration::from_secs(d.as_secs()),
        Err(_) => t,
    }
}

fn list_directory(dir: &Path, target: &Target) -> Response {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("can't list {}: {}", dir.display(), e);
            return error(Status::NOT_FOUND, "No permission to list directory");
        }
    };

    let mut names: Vec<(String, String)> = entries
        .filter_map(Result::ok)
        .map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = entry.file_type().ok();
            let is_symlink = file_type.is_some_and(|t| t.is_symlink());
            let is_dir = entry.path().is_dir();

            let (display, link) = if is_dir {
                (format!("{name}/"), format!("{name}/"))
            } else if is_symlink {
                (format!("{name}@"), name)
            } else {
                (name.clone(), name)
            };
            (display, link)
        })
        .collect();
    names.sort_by_key(|(display, _)| display.to_lowercase());

    let display_path = html_escape(&percent_decode_str(&target.url_path).decode_utf8_lossy());
    let mut page = format!(
        "<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Directory listing for {display_path}</title>\n</head>\n<body>\n\
         <h1>Directory listing for {display_path}</h1>\n<hr>\n<ul>\n"
    );
    for (display, link) in &names {
        page.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            utf8_percent_encode(link, HREF),
            html_escape(display)
        ));
    }
    page.push_str("</ul>\n<hr>\n</body>\n</html>\n");

    ok("text/html; charset=utf-8", Bytes::from(page))
}

pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}
