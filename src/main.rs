//! Pawn language server binary entry point
//!
//! The server communicates over stdin/stdout using the Language Server
//! Protocol; logging goes to stderr so the transport stays clean.

use clap::Parser;
use tower_lsp::{LspService, Server};

use pawnls::PawnLanguageServer;

/// Language server for the Pawn scripting language
#[derive(Parser, Debug)]
#[command(name = "pawnls", version, about)]
struct Cli {
    /// Communicate over stdio (the default transport; accepted for editor
    /// compatibility)
    #[arg(long)]
    stdio: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    tracing::debug!(stdio = cli.stdio, "starting language server");

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(PawnLanguageServer::new);

    Server::new(stdin, stdout, socket).serve(service).await;
}
