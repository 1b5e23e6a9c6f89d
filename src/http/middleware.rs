use crate::http::Response;
use crate::http::handler::HandlerFunc;
use crate::http::request::RequestContext;

pub mod compression;

pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: &RequestContext, next: Next) -> Response;
}

/// The rest of the chain after the current middleware, ending in the
/// handler.
pub struct Next<'a> {
    pub(crate) middlewares: &'a [Box<dyn Middleware>],
    pub(crate) handler: &'a HandlerFunc,
}

impl<'a> Next<'a> {
    pub fn new(middlewares: &'a [Box<dyn Middleware>], handler: &'a HandlerFunc) -> Next<'a> {
        Next {
            middlewares,
            handler,
        }
    }

    pub fn run(self, ctx: &RequestContext) -> Response {
        if let Some((first, rest)) = self.middlewares.split_first() {
            let next = Next {
                middlewares: rest,
                handler: self.handler,
            };
            first.handle(ctx, next)
        } else {
            (self.handler)(ctx)
        }
    }
}
