use lsp_server::{Request, Response};
use lsp_types::{DocumentHighlight, DocumentHighlightKind, DocumentHighlightParams, Range};

use super::{locate, require_file_uri, resolved_declarations};
use crate::helpers::{null_response, success_response, try_parse_params};
use crate::position::position_of;
use crate::references::collect_references;
use crate::server::GlobalState;

/// `textDocument/documentHighlight`: every use of every declaration the node
/// under the cursor resolves to, within the current file only (unlike
/// `references`, this never crosses files).
pub fn handle_document_highlight(req: Request, state: &GlobalState) -> Response {
    let params: DocumentHighlightParams = match try_parse_params(&req) {
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
    let Ok(doc) = state.documents.get(&uri) else {
        return null_response(&req);
    };

    let highlights: Vec<DocumentHighlight> = decls
        .into_iter()
        .flat_map(|decl| collect_references(unit, decl, true))
        .filter(|loc| loc.source_id == unit.source_id)
        .map(|loc| DocumentHighlight {
            range: Range {
                start: position_of(&doc.text, loc.start),
                end: position_of(&doc.text, loc.end),
            },
            kind: Some(DocumentHighlightKind::TEXT),
        })
        .collect();

    success_response(&req, highlights)
}
