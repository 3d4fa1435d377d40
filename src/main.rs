//! CLI entry point: parse a handful of flags, wire up logging, then hand a
//! stdio [`Connection`] to the server loop and exit with whatever code it
//! returns.

use clap::Parser;
use lsp_server::Connection;

use contract_lsp::server::LanguageServer;

/// Language server for the contract language, speaking LSP over stdio.
#[derive(Parser, Debug)]
#[command(name = "contract-lsp", version, about)]
struct Args {
    /// Print the server version and exit.
    #[arg(long)]
    version: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if args.version {
        println!("contract-lsp {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let (connection, io_threads) = Connection::stdio();
    let server = LanguageServer::new(connection);

    let exit_code = match server.run() {
        Ok(code) => code,
        Err(err) => {
            log::error!("server loop exited with error: {err}");
            1
        }
    };

    if let Err(err) = io_threads.join() {
        log::error!("io threads failed to join: {err}");
    }

    std::process::exit(exit_code);
}
