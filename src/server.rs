//! Server loop and dispatch: the LSP lifecycle state machine, the
//! per-method dispatch table, and document-change handling. A single
//! synchronous loop over one `Connection` — no background analysis thread,
//! since recompilation here is cheap enough to run inline.

use std::error::Error;
use std::path::PathBuf;

use lsp_server::{Connection, ErrorCode, Message, Notification, Request, RequestId, Response, ResponseError};
use lsp_types::{
    DidChangeConfigurationParams, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, InitializeParams, LogTraceParams, OneOf, PublishDiagnosticsParams,
    ServerCapabilities, SetTraceParams, TextDocumentSyncCapability, TextDocumentSyncKind,
    TextDocumentSyncOptions, TraceValue, Url,
};

use crate::compiler::CompileDriver;
use crate::document_store::DocumentStore;
use crate::frontend::reference::ReferenceFrontend;
use crate::handlers;
use crate::settings::{apply_configuration, Remapping, Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifecycleState {
    Uninitialized,
    Running,
    ShutdownRequested,
    Exited,
}

/// Everything a query handler needs to answer a request. Handlers only ever
/// borrow this immutably; compilation happens in [`LanguageServer`] alone.
pub struct GlobalState {
    pub(crate) documents: DocumentStore,
    pub(crate) compiler: CompileDriver,
    pub(crate) settings: Settings,
    pub(crate) remappings: Vec<Remapping>,
    pub(crate) root: Option<Url>,
    /// Absolute directory established at `initialize`; relative paths
    /// inside `documents`/the compile driver resolve against this.
    pub(crate) base_path: Option<PathBuf>,
    trace_level: TraceValue,
}

impl GlobalState {
    fn new() -> Self {
        Self {
            documents: DocumentStore::new(),
            compiler: CompileDriver::new(Box::new(ReferenceFrontend::new())),
            settings: Settings::default(),
            remappings: Vec::new(),
            root: None,
            base_path: None,
            trace_level: TraceValue::Off,
        }
    }

    fn recompile_and_publish(&mut self, connection: &Connection) -> Result<(), Box<dyn Error>> {
        let sources = self.documents.snapshot(self.base_path.as_deref());
        let published = self.compiler.compile_source(
            &self.settings,
            &self.remappings,
            &sources,
            self.base_path.as_deref(),
        );
        log::debug!("recompiled {} document(s)", sources.len());
        self.trace(connection, format!("recompiled {} document(s)", sources.len()))?;
        for params in published {
            send_notification(connection, "textDocument/publishDiagnostics", params)?;
        }
        Ok(())
    }

    /// Mirrors a trace string to the client as `$/logTrace` when the client
    /// asked for tracing (`trace_level`); internal logging via `log::debug!`
    /// happens regardless, as a separate sink.
    fn trace(&self, connection: &Connection, message: String) -> Result<(), Box<dyn Error>> {
        if self.trace_level == TraceValue::Off {
            return Ok(());
        }
        let params = LogTraceParams { message, verbose: None };
        let notification = Notification {
            method: "$/logTrace".to_string(),
            params: serde_json::to_value(params)?,
        };
        connection.sender.send(Message::Notification(notification))?;
        Ok(())
    }
}

pub struct LanguageServer {
    connection: Connection,
    state: LifecycleState,
    global: GlobalState,
}

impl LanguageServer {
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            state: LifecycleState::Uninitialized,
            global: GlobalState::new(),
        }
    }

    fn capabilities() -> ServerCapabilities {
        ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::INCREMENTAL),
                will_save: None,
                will_save_wait_until: None,
                save: None,
            })),
            definition_provider: Some(OneOf::Left(true)),
            implementation_provider: Some(lsp_types::ImplementationProviderCapability::Simple(true)),
            references_provider: Some(OneOf::Left(true)),
            document_highlight_provider: Some(OneOf::Left(true)),
            hover_provider: Some(lsp_types::HoverProviderCapability::Simple(true)),
            ..Default::default()
        }
    }

    /// Runs the server to completion. Returns the process exit code: 0 if
    /// `shutdown` was requested before `exit`, 1 otherwise.
    pub fn run(mut self) -> Result<i32, Box<dyn Error>> {
        loop {
            let msg = match self.connection.receiver.recv() {
                Ok(msg) => msg,
                Err(_) => return Ok(1),
            };
            match msg {
                Message::Request(req) => {
                    if let Some(code) = self.handle_request(req)? {
                        return Ok(code);
                    }
                }
                Message::Notification(notif) => {
                    if let Some(code) = self.handle_notification(notif)? {
                        return Ok(code);
                    }
                }
                Message::Response(_) => {}
            }
        }
    }

    /// Returns `Some(exit_code)` once `exit` has been received.
    fn handle_request(&mut self, req: Request) -> Result<Option<i32>, Box<dyn Error>> {
        if req.method == "initialize" {
            let response = self.handle_initialize(&req)?;
            self.connection.sender.send(Message::Response(response))?;
            self.state = LifecycleState::Running;
            return Ok(None);
        }

        let response = match self.state {
            LifecycleState::Uninitialized => not_initialized(&req.id),
            LifecycleState::ShutdownRequested | LifecycleState::Exited => invalid_request(&req.id),
            LifecycleState::Running if req.method == "shutdown" => {
                self.state = LifecycleState::ShutdownRequested;
                Response {
                    id: req.id.clone(),
                    result: Some(serde_json::Value::Null),
                    error: None,
                }
            }
            LifecycleState::Running => {
                let method = req.method.clone();
                self.dispatch(&method, req)
            }
        };
        self.connection.sender.send(Message::Response(response))?;
        Ok(None)
    }

    fn handle_initialize(&mut self, req: &Request) -> Result<Response, Box<dyn Error>> {
        let params: InitializeParams = serde_json::from_value(req.params.clone())?;

        // `rootUri` is authoritative; `rootPath` is deprecated and only
        // consulted when `rootUri` is absent.
        #[allow(deprecated)]
        {
            self.global.root = params
                .root_uri
                .clone()
                .or_else(|| params.root_path.as_deref().and_then(|p| Url::from_file_path(p).ok()));
        }
        self.global.base_path = self.global.root.as_ref().and_then(|uri| uri.to_file_path().ok());

        if let Some(options) = &params.initialization_options {
            apply_configuration(&mut self.global.settings, &mut self.global.remappings, options);
        }

        self.global.trace_level = params.trace.unwrap_or(TraceValue::Off);

        let result = lsp_types::InitializeResult {
            capabilities: Self::capabilities(),
            server_info: Some(lsp_types::ServerInfo {
                name: "contract-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        };
        Ok(Response {
            id: req.id.clone(),
            result: Some(serde_json::to_value(result)?),
            error: None,
        })
    }

    fn dispatch(&self, method: &str, req: Request) -> Response {
        match method {
            "textDocument/definition" => handlers::handle_definition(req, &self.global),
            "textDocument/implementation" => handlers::handle_implementation(req, &self.global),
            "textDocument/references" => handlers::handle_references(req, &self.global),
            "textDocument/documentHighlight" => handlers::handle_document_highlight(req, &self.global),
            "textDocument/hover" => handlers::handle_hover(req, &self.global),
            _ => Response {
                id: req.id.clone(),
                result: None,
                error: Some(ResponseError {
                    code: ErrorCode::MethodNotFound as i32,
                    message: format!("unsupported method: {method}"),
                    data: None,
                }),
            },
        }
    }

    /// Returns `Some(exit_code)` once `exit` has been received.
    fn handle_notification(&mut self, notif: Notification) -> Result<Option<i32>, Box<dyn Error>> {
        match notif.method.as_str() {
            "exit" => {
                let code = if self.state == LifecycleState::ShutdownRequested { 0 } else { 1 };
                self.state = LifecycleState::Exited;
                return Ok(Some(code));
            }
            _ if self.state == LifecycleState::Uninitialized => {
                // Nothing but `exit` is meaningful before `initialize`.
            }
            _ if self.state == LifecycleState::ShutdownRequested => {
                // Every notification but `exit` is dropped once shutdown has
                // been requested.
            }
            "initialized" => {}
            "$/setTrace" => {
                let params: SetTraceParams = serde_json::from_value(notif.params)?;
                self.global.trace_level = params.value;
            }
            "textDocument/didOpen" => {
                let params: DidOpenTextDocumentParams = serde_json::from_value(notif.params)?;
                self.global.documents.open(
                    params.text_document.uri,
                    params.text_document.version,
                    params.text_document.text,
                );
                self.global.recompile_and_publish(&self.connection)?;
            }
            "textDocument/didChange" => {
                let params: DidChangeTextDocumentParams = serde_json::from_value(notif.params)?;
                if params.content_changes.is_empty() {
                    return Ok(None);
                }
                for change in params.content_changes {
                    match change.range {
                        Some(range) => {
                            self.global.documents.range_update(
                                &params.text_document.uri,
                                params.text_document.version,
                                range,
                                &change.text,
                            )?;
                        }
                        None => {
                            self.global.documents.full_update(
                                &params.text_document.uri,
                                params.text_document.version,
                                change.text,
                            )?;
                        }
                    }
                }
                self.global.recompile_and_publish(&self.connection)?;
            }
            "textDocument/didClose" => {
                let params: DidCloseTextDocumentParams = serde_json::from_value(notif.params)?;
                self.global.documents.close(&params.text_document.uri);
            }
            "workspace/didChangeConfiguration" => {
                let params: DidChangeConfigurationParams = serde_json::from_value(notif.params)?;
                apply_configuration(&mut self.global.settings, &mut self.global.remappings, &params.settings);
                self.global.recompile_and_publish(&self.connection)?;
            }
            _ => {}
        }
        Ok(None)
    }
}

fn not_initialized(id: &RequestId) -> Response {
    Response {
        id: id.clone(),
        result: None,
        error: Some(ResponseError {
            code: ErrorCode::ServerNotInitialized as i32,
            message: "server is not initialized".to_string(),
            data: None,
        }),
    }
}

/// Every request but `exit` is rejected once `shutdown` has been requested.
fn invalid_request(id: &RequestId) -> Response {
    Response {
        id: id.clone(),
        result: None,
        error: Some(ResponseError {
            code: ErrorCode::InvalidRequest as i32,
            message: "shutdown has been requested".to_string(),
            data: None,
        }),
    }
}

fn send_notification(connection: &Connection, method: &str, params: PublishDiagnosticsParams) -> Result<(), Box<dyn Error>> {
    let notification = Notification {
        method: method.to_string(),
        params: serde_json::to_value(params)?,
    };
    connection.sender.send(Message::Notification(notification))?;
    Ok(())
}
