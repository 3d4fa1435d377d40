#![allow(dead_code)]

//! Library crate backing the `contract-lsp` binary: a synchronous, single-threaded
//! language server that mediates between an IDE client and a smart-contract compiler
//! frontend over framed JSON-RPC (LSP).

pub mod compiler;
pub mod document_store;
pub mod error;
pub mod frontend;
pub mod handlers;
pub mod helpers;
pub mod locator;
pub mod position;
pub mod references;
pub mod server;
pub mod settings;

pub use error::ServerError;
pub use server::LanguageServer;
