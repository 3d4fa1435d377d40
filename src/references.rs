//! Reference collector: given a declaration, finds every
//! location in one AST unit that names it. A pure function over an
//! [`AstUnit`] — no I/O, no server state.

use crate::frontend::{AstUnit, NodeId, NodeKind, SourceLocation};

/// Every location in `unit` that refers to `declaration`: each
/// `Identifier`/`IdentifierPath`/`MemberAccess` node whose
/// `referenced_declaration` matches it, or (for an `Identifier`) whose
/// `candidate_declarations` include it — an overloaded name binds
/// `referenced_declaration` to only one candidate, so a use that resolves
/// ambiguously still counts as a reference to every overload it could mean
/// — plus (when `include_declaration`) the declaration's own name location.
pub fn collect_references(unit: &AstUnit, declaration: NodeId, include_declaration: bool) -> Vec<SourceLocation> {
    let mut locations = Vec::new();

    for node in &unit.nodes {
        match &node.kind {
            NodeKind::Identifier { referenced_declaration, candidate_declarations, .. }
                if *referenced_declaration == Some(declaration) || candidate_declarations.contains(&declaration) =>
            {
                locations.push(node.location);
            }
            NodeKind::IdentifierPath { referenced_declaration: Some(d), .. } if *d == declaration => {
                locations.push(node.location);
            }
            NodeKind::MemberAccess { referenced_declaration: Some(d), .. } if *d == declaration => {
                locations.push(node.location);
            }
            NodeKind::Declaration { name_location, .. } if include_declaration && node.id == declaration => {
                locations.push(*name_location);
            }
            _ => {}
        }
    }

    locations.sort_by_key(|loc| loc.start);
    locations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::reference::ReferenceFrontend;
    use crate::frontend::{AnalysisLevel, CompilerFrontend};
    use std::collections::HashMap;

    fn compile(src: &str) -> AstUnit {
        let mut frontend = ReferenceFrontend::new();
        let mut sources = HashMap::new();
        sources.insert("a.src".to_string(), src.to_string());
        frontend.set_sources(&sources);
        let mut result = frontend.compile_to(AnalysisLevel::Analysis);
        result.units.remove("a.src").unwrap()
    }

    fn declaration_named<'a>(unit: &'a AstUnit, name: &str) -> NodeId {
        unit.nodes
            .iter()
            .find(|n| matches!(&n.kind, NodeKind::Declaration { name: n_name, .. } if n_name == name))
            .unwrap()
            .id
    }

    #[test]
    fn collects_every_use_of_a_state_variable() {
        let src = "contract Foo { uint256 total; function get() public { total; total; } }";
        let unit = compile(src);
        let decl = declaration_named(&unit, "total");
        let refs = collect_references(&unit, decl, false);
        assert_eq!(refs.len(), 2);
    }

    #[test]
    fn include_declaration_adds_the_name_location() {
        let src = "contract Foo { uint256 total; function get() public { total; } }";
        let unit = compile(src);
        let decl = declaration_named(&unit, "total");
        let without = collect_references(&unit, decl, false).len();
        let with = collect_references(&unit, decl, true).len();
        assert_eq!(with, without + 1);
    }

    #[test]
    fn unreferenced_declaration_yields_no_results() {
        let src = "contract Foo { uint256 total; }";
        let unit = compile(src);
        let decl = declaration_named(&unit, "total");
        assert!(collect_references(&unit, decl, false).is_empty());
    }

    #[test]
    fn overloaded_declaration_is_found_via_candidates() {
        let src = "contract Foo { function transfer() public {} function transfer() public { transfer(); } }";
        let unit = compile(src);
        let declarations: Vec<NodeId> = unit
            .nodes
            .iter()
            .filter(|n| matches!(&n.kind, NodeKind::Declaration { name, .. } if name == "transfer"))
            .map(|n| n.id)
            .collect();
        assert_eq!(declarations.len(), 2);
        // `referenced_declaration` always binds to the first overload; the
        // call site must still turn up when asking about the second.
        let refs = collect_references(&unit, declarations[1], false);
        assert_eq!(refs.len(), 1);
    }
}
