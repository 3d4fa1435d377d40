use lsp_server::{Request, Response};
use lsp_types::{Hover, HoverContents, HoverParams, MarkupContent, MarkupKind, Range};

use super::{locate, require_file_uri, resolved_declaration};
use crate::frontend::{AstUnit, DeclarationKind, NodeId, NodeKind};
use crate::helpers::{null_response, success_response, try_parse_params};
use crate::position::position_of;
use crate::server::GlobalState;

fn describe(kind: DeclarationKind) -> &'static str {
    match kind {
        DeclarationKind::Contract => "contract",
        DeclarationKind::Interface => "interface",
        DeclarationKind::Library => "library",
        DeclarationKind::Struct => "struct",
        DeclarationKind::Enum => "enum",
        DeclarationKind::EnumValue => "enum value",
        DeclarationKind::Event => "event",
        DeclarationKind::Modifier => "modifier",
        DeclarationKind::Function => "function",
        DeclarationKind::Parameter => "parameter",
        DeclarationKind::StateVariable => "state variable",
        DeclarationKind::Variable => "variable",
    }
}

/// A documented declaration shows its documentation text; an undocumented
/// one falls back to a short type string (kind plus name).
fn render(unit: &AstUnit, declaration: NodeId) -> Option<String> {
    match &unit.node(declaration).kind {
        NodeKind::Declaration { documentation: Some(doc), .. } if !doc.is_empty() => Some(doc.clone()),
        NodeKind::Declaration { name, kind, .. } => Some(format!("{} `{}`", describe(*kind), name)),
        _ => None,
    }
}

/// `textDocument/hover`: a one-line summary of the declaration the node
/// under the cursor resolves to.
pub fn handle_hover(req: Request, state: &GlobalState) -> Response {
    let params: HoverParams = match try_parse_params(&req) {
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
    let Some(decl) = resolved_declaration(unit, node_id) else {
        return null_response(&req);
    };
    let Some(text) = render(unit, decl) else {
        return null_response(&req);
    };

    let node = unit.node(node_id);
    let doc_text = match state.documents.get(&uri) {
        Ok(d) => &d.text,
        Err(_) => return null_response(&req),
    };
    let range = Range {
        start: position_of(doc_text, node.location.start),
        end: position_of(doc_text, node.location.end),
    };

    success_response(
        &req,
        Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: text,
            }),
            range: Some(range),
        },
    )
}
