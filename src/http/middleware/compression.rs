use crate::http::compression::accepts_gzip;
use crate::http::files;
use crate::http::middleware::{Middleware, Next};
use crate::http::request::RequestContext;
use crate::http::status::Status;
use crate::http::{Body, Response};
use tracing::error;

/// Serves eligible files gzipped when the client asks for it and hands
/// everything else to the next link of the chain.
pub struct GzipMw {}

impl Middleware for GzipMw {
    fn handle(&self, ctx: &RequestContext, next: Next) -> Response {
        if !accepts_gzip(ctx.get_header("accept-encoding")) {
            return next.run(ctx);
        }

        let config = ctx.config();
        let target = files::resolve(&config.root, &ctx.request().target);
        if !target.valid {
            return next.run(ctx);
        }
        let path = if target.path.is_dir() {
            target.path.join("index.html")
        } else if target.trailing_slash {
            return next.run(ctx);
        } else {
            target.path
        };

        if !path.is_file() {
            return next.run(ctx);
        }

        let content_type = config.mime.content_type(&path);
        if !config.compression.is_eligible(content_type) {
            return next.run(ctx);
        }

        match config.compression.compress_file(&path) {
            Ok(compressed) => Response::from_parts(
                Status::OK,
                vec![
                    ("Content-Type".to_string(), content_type.to_string()),
                    ("Content-Encoding".to_string(), "gzip".to_string()),
                    ("Cache-Control".to_string(), "no-cache".to_string()),
                ],
                Body::Full(compressed),
            ),
            Err(e) => {
                error!("Error serving {}: {:#}", ctx.request().target, e);
                next.run(ctx)
            }
        }
    }
}
