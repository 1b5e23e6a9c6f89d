use crate::concurrency::Spawner;
use crate::config::Config;
use crate::http;
use crate::http::files;
use crate::http::handler::HandlerFunc;
use crate::http::method::Method;
use crate::http::middleware::compression::GzipMw;
use crate::http::middleware::{Middleware, Next};
use crate::http::request::{Request, RequestContext, RequestError};
use crate::http::status::Status;
use crate::http::Response;
use anyhow::Context;
use std::io::{self, BufReader, BufWriter, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, error, info, warn};

const SERVER_NAME: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub struct Server {
    listener: TcpListener,
    config: Arc<Config>,
    files: HandlerFunc,
    middlewares: Vec<Box<dyn Middleware>>,
}

impl Server {
    fn new(listener: TcpListener, config: Arc<Config>) -> Server {
        let mut s = Server {
            listener,
            config,
            files: Box::new(files::serve),
            middlewares: Vec::new(),
        };

        s.add_middleware(Box::new(GzipMw {}));
        s
    }

    pub fn bind(config: Config) -> anyhow::Result<Server> {
        let listener = TcpListener::bind(config.addr)
            .with_context(|| format!("can't bind {}", config.addr))?;
        Ok(Server::new(listener, Arc::new(config)))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn add_middleware(&mut self, m: Box<dyn Middleware>) {
        self.middlewares.push(m);
    }

    /// Accepts connections forever, one worker thread each.
    pub fn run(self) -> anyhow::Result<()> {
        let server = Arc::new(self);
        let mut spawner = Spawner::new("conn");

        for stream in server.listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("accept failed: {}", e);
                    continue;
                }
            };

            let thread_server = Arc::clone(&server);
            if let Err(e) = spawner.execute(move || thread_server.process_incoming(stream)) {
                error!("can't start connection worker: {}", e);
            }
        }
        Ok(())
    }

    fn process_incoming(&self, stream: TcpStream) {
        let peer = match stream.peer_addr() {
            Ok(peer) => peer,
            Err(e) => {
                debug!("connection gone before it was served: {}", e);
                return;
            }
        };
        debug!("accepted new connection from {}", peer);

        if let Err(e) = self.serve_connection(stream, peer) {
            warn!("{} - connection dropped: {}", peer.ip(), e);
        }
    }

    /// Keep-alive loop: one request, one response, until either side
    /// wants to stop.
    fn serve_connection(&self, stream: TcpStream, peer: SocketAddr) -> io::Result<()> {
        stream.set_read_timeout(Some(self.config.keep_alive_timeout))?;
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = BufWriter::new(stream);

        loop {
            let request = match Request::read_from(&mut reader) {
                Ok(Some(request)) => request,
                Ok(None) => return Ok(()),
                Err(RequestError::Io(e)) => {
                    debug!("{} - closing: {}", peer.ip(), e);
                    return Ok(());
                }
                Err(e) => {
                    let status = e.status().unwrap_or(Status::BAD_REQUEST);
                    let response = with_common_headers(http::error(status, &e.to_string()));
                    let size = response.write_to(&mut writer, true)?;
                    writer.flush()?;
                    info!("{} - \"-\" {} {}", peer.ip(), status.code_num, size);
                    return Ok(());
                }
            };

            let keep_alive = request.keep_alive();
            let mut response = with_common_headers(self.dispatch(&request));
            if !keep_alive && !response.closes_connection() {
                response = response.with_header("Connection", "close");
            } else if keep_alive && request.version == (1, 0) && !response.closes_connection() {
                response = response.with_header("Connection", "keep-alive");
            }
            let closes = response.closes_connection();
            let status = response.status;

            let size = response.write_to(&mut writer, request.method != Method::HEAD)?;
            writer.flush()?;
            info!(
                "{} - \"{}\" {} {}",
                peer.ip(),
                request.request_line(),
                status.code_num,
                size
            );

            if closes {
                return Ok(());
            }
        }
    }

    fn dispatch(&self, request: &Request) -> Response {
        let ctx = RequestContext::new(request, &self.config);

        match request.method {
            Method::GET => Next::new(&self.middlewares, &self.files).run(&ctx),
            Method::HEAD => (self.files)(&ctx),
            ref other => http::error(
                Status::NOT_IMPLEMENTED,
                &format!("Unsupported method ('{}')", other.as_str()),
            ),
        }
    }
}

fn with_common_headers(response: Response) -> Response {
    response
        .with_header("Server", SERVER_NAME)
        .with_header("Date", httpdate::fmt_http_date(SystemTime::now()))
}
