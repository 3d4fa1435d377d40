use lsp_server::{Request, Response};
use lsp_types::{GotoDefinitionParams, GotoDefinitionResponse};

use super::{import_target_location, locate, location_of, require_file_uri, resolved_declarations};
use crate::helpers::{null_response, success_response, try_parse_params};
use crate::server::GlobalState;

/// `textDocument/definition`: an import directive resolves to
/// its imported source; otherwise every declaration the node under the
/// cursor resolves to (referenced plus, for an ambiguous identifier, its
/// candidates).
pub fn handle_definition(req: Request, state: &GlobalState) -> Response {
    let params: GotoDefinitionParams = match try_parse_params(&req) {
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

    if let Some(locations) = import_target_location(state, unit, node_id) {
        return success_response(&req, GotoDefinitionResponse::Array(locations));
    }

    let locations: Vec<_> = resolved_declarations(unit, node_id)
        .into_iter()
        .filter_map(|decl| location_of(state, unit, decl))
        .collect();
    if locations.is_empty() {
        return null_response(&req);
    }
    success_response(&req, GotoDefinitionResponse::Array(locations))
}
