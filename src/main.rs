use clap::Parser;
use plinth_lsp::Backend;
use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

/// Language server for PHP component templates.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Log level for the server's own messages (overridden by RUST_LOG).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Listen on 127.0.0.1:<PORT> instead of stdio.
    #[arg(long, value_name = "PORT")]
    tcp: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // stdout carries the protocol; logs go to stderr.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("plinth_lsp={}", args.log_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    match args.tcp {
        Some(port) => serve_tcp(port).await,
        None => {
            tracing::info!("starting Plinth on stdio");
            let (service, socket) = LspService::new(Backend::new);
            Server::new(tokio::io::stdin(), tokio::io::stdout(), socket)
                .serve(service)
                .await;
            Ok(())
        }
    }
}

async fn serve_tcp(port: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    tracing::info!("listening on 127.0.0.1:{port}");

    let (stream, addr) = listener.accept().await?;
    tracing::info!("accepted connection from {addr}");

    let (read, write) = tokio::io::split(stream);
    let (service, socket) = LspService::new(Backend::new);
    Server::new(read, write, socket).serve(service).await;
    Ok(())
}
