use gzserve::config::Config;
use gzserve::http::server::Server;
use tracing::info;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stdout)
        .init();

    let config = Config::from_args(std::env::args().skip(1))?;
    config.validate()?;

    let server = Server::bind(config.clone())?;
    info!(
        "Serving {} at http://{}",
        config.root.display(),
        server.local_addr()?
    );

    server.run()
}
