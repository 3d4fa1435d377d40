use lsp_server::{Request, Response};
use lsp_types::{GotoImplementationParams, GotoImplementationResponse};

use super::{locate, location_of, require_file_uri, resolved_declarations};
use crate::frontend::{AstUnit, NodeId, NodeKind};
use crate::helpers::{null_response, success_response, try_parse_params};
use crate::server::GlobalState;

/// `textDocument/implementation`: every declaration sharing the resolved
/// declaration's name — an interface function's concrete overrides are
/// declared under the same name in the reference frontend's symbol table,
/// so this doubles as the overload set.
fn sibling_declarations(unit: &AstUnit, declaration: NodeId) -> Vec<NodeId> {
    let NodeKind::Declaration { name, .. } = &unit.node(declaration).kind else {
        return vec![declaration];
    };
    let matches: Vec<NodeId> = unit
        .nodes
        .iter()
        .filter(|n| matches!(&n.kind, NodeKind::Declaration { name: other, .. } if other == name))
        .map(|n| n.id)
        .collect();
    if matches.is_empty() {
        vec![declaration]
    } else {
        matches
    }
}

pub fn handle_implementation(req: Request, state: &GlobalState) -> Response {
    let params: GotoImplementationParams = match try_parse_params(&req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let uri = params.text_document_position_params.text_document.uri.clone();
    let position = params.text_document_position_params.position;
    if let Err(resp) = require_file_uri(&req, &uri) {
        return resp;
    }

    let Some((unit, node_id)) = locate(state, &uri, position) else {
        return null_response(&req);
    };
    let decls = resolved_declarations(unit, node_id);
    if decls.is_empty() {
        return null_response(&req);
    }

    let mut seen = Vec::new();
    for decl in decls {
        for id in sibling_declarations(unit, decl) {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
    }
    let locations: Vec<_> = seen.into_iter().filter_map(|id| location_of(state, unit, id)).collect();

    if locations.is_empty() {
        return null_response(&req);
    }
    success_response(&req, GotoImplementationResponse::Array(locations))
}
