use lsp_server::{Request, Response};
use lsp_types::{Location, ReferenceParams};

use super::{locate, location_from, require_file_uri, resolved_declarations};
use crate::helpers::{null_response, success_response, try_parse_params};
use crate::references::collect_references;
use crate::server::GlobalState;

/// `textDocument/references`: every use of every declaration the node under
/// the cursor resolves to, honoring `context.includeDeclaration`.
pub fn handle_references(req: Request, state: &GlobalState) -> Response {
    let params: ReferenceParams = match try_parse_params(&req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let uri = params.text_document_position.text_document.uri.clone();
    let position = params.text_document_position.position;
    let include_declaration = params.context.include_declaration;
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

    let locations: Vec<Location> = decls
        .into_iter()
        .flat_map(|decl| collect_references(unit, decl, include_declaration))
        .filter_map(|loc| location_from(state, loc))
        .collect();

    success_response(&req, locations)
}
