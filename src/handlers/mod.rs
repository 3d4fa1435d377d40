//! Query handlers: one function per `textDocument/*` request the
//! server answers. Each takes the already-parsed request plus a read-only
//! view of server state and returns a [`Response`] — no handler mutates
//! anything, since compilation happens only on document-change handling in
//! [`crate::server`].

mod definition;
mod document_highlight;
mod hover;
mod implementation;
mod references;

pub use definition::handle_definition;
pub use document_highlight::handle_document_highlight;
pub use hover::handle_hover;
pub use implementation::handle_implementation;
pub use references::handle_references;

use lsp_server::{ErrorCode, Request, Response};
use lsp_types::{Position, Url};

use crate::document_store::{denormalize_path, normalize_path};
use crate::error::ServerError;
use crate::frontend::{AstUnit, NodeId, SourceLocation};
use crate::helpers::error_response;
use crate::server::GlobalState;

/// Rejects a request whose `uri` isn't a `file://` uri with `InvalidParams`
/// — the one malformed-params case `locate` itself can't tell apart from
/// "document not open".
pub(crate) fn require_file_uri(req: &Request, uri: &Url) -> Result<(), Response> {
    if uri.scheme() == "file" {
        Ok(())
    } else {
        let err = ServerError::UnsupportedUri(uri.to_string());
        Err(error_response(req, ErrorCode::InvalidParams, err.to_string()))
    }
}

/// The AST unit and located node for a `textDocument/*` position request, or
/// `None` if the document isn't open, hasn't compiled, or the position is
/// out of the unit's range.
pub(crate) fn locate(state: &GlobalState, uri: &Url, position: Position) -> Option<(&AstUnit, NodeId)> {
    let path = uri.to_file_path().ok()?;
    let path = normalize_path(&path, state.base_path.as_deref());
    let doc = state.documents.get(uri).ok()?;
    let unit = state.compiler.result().units.get(&path)?;
    let offset = crate::position::translate_position(&doc.text, position).ok()?;
    let node_id = crate::locator::locate(unit, offset)?;
    Some((unit, node_id))
}

/// The declaration a located node resolves to: itself, if it already is one,
/// else the first of [`resolved_declarations`]. Handlers that only ever need
/// one declaration (hover, document highlight) use this.
pub(crate) fn resolved_declaration(unit: &AstUnit, node_id: NodeId) -> Option<NodeId> {
    resolved_declarations(unit, node_id).into_iter().next()
}

/// Every declaration a located node resolves to: referenced plus, when
/// ambiguous, candidates. A `Declaration` node
/// resolves to itself; an `Identifier` may carry both a primary referenced
/// declaration and, when ambiguous, a set of candidates; `IdentifierPath`
/// and `MemberAccess` resolve to a single referenced declaration, if bound.
pub(crate) fn resolved_declarations(unit: &AstUnit, node_id: NodeId) -> Vec<NodeId> {
    use crate::frontend::NodeKind;
    match &unit.node(node_id).kind {
        NodeKind::Declaration { .. } => vec![node_id],
        NodeKind::Identifier { referenced_declaration, candidate_declarations } => {
            let mut out: Vec<NodeId> = referenced_declaration.iter().copied().collect();
            for candidate in candidate_declarations {
                if !out.contains(candidate) {
                    out.push(*candidate);
                }
            }
            out
        }
        NodeKind::IdentifierPath { referenced_declaration } => referenced_declaration.iter().copied().collect(),
        NodeKind::MemberAccess { referenced_declaration, .. } => referenced_declaration.iter().copied().collect(),
        NodeKind::ImportDirective { .. } | NodeKind::Other => Vec::new(),
    }
}

/// The location of an import directive's target: a single location at
/// offset 0 of the imported source, or an empty list if unresolved, or
/// `None` if `node_id` isn't an import directive at all.
pub(crate) fn import_target_location(state: &GlobalState, unit: &AstUnit, node_id: NodeId) -> Option<Vec<lsp_types::Location>> {
    use crate::frontend::NodeKind;
    let NodeKind::ImportDirective { resolved_source_id, .. } = &unit.node(node_id).kind else {
        return None;
    };
    let Some(source_id) = resolved_source_id else {
        return Some(Vec::new());
    };
    let table = &state.compiler.result().sources;
    let path = table.path(*source_id);
    let text = table.text(*source_id);
    let Some(uri) = Url::from_file_path(denormalize_path(path, state.base_path.as_deref())).ok() else {
        return Some(Vec::new());
    };
    let start = crate::position::position_of(text, 0);
    Some(vec![lsp_types::Location { uri, range: lsp_types::Range { start, end: start } }])
}

/// Converts a node's name location (or its full location, if it isn't a
/// declaration) into an LSP `Location`, resolving the source id back to a
/// file uri through the compiler's source table.
pub(crate) fn location_of(state: &GlobalState, unit: &AstUnit, node_id: NodeId) -> Option<lsp_types::Location> {
    use crate::frontend::NodeKind;
    let node = unit.node(node_id);
    let location = match &node.kind {
        NodeKind::Declaration { name_location, .. } => *name_location,
        _ => node.location,
    };
    let table = &state.compiler.result().sources;
    let path = table.path(location.source_id);
    let text = table.text(location.source_id);
    let uri = Url::from_file_path(denormalize_path(path, state.base_path.as_deref())).ok()?;
    Some(lsp_types::Location {
        uri,
        range: lsp_types::Range {
            start: crate::position::position_of(text, location.start),
            end: crate::position::position_of(text, location.end),
        },
    })
}

/// Converts a raw [`SourceLocation`] (as returned by the reference
/// collector) into an LSP `Location`.
pub(crate) fn location_from(state: &GlobalState, location: SourceLocation) -> Option<lsp_types::Location> {
    let table = &state.compiler.result().sources;
    let path = table.path(location.source_id);
    let text = table.text(location.source_id);
    let uri = Url::from_file_path(denormalize_path(path, state.base_path.as_deref())).ok()?;
    Some(lsp_types::Location {
        uri,
        range: lsp_types::Range {
            start: crate::position::position_of(text, location.start),
            end: crate::position::position_of(text, location.end),
        },
    })
}
