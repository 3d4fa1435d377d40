//! AST locator: finds the smallest node enclosing a byte offset.
//! Pure function over an already-compiled [`AstUnit`] — no I/O, no server
//! state — so query handlers can call it directly.

use crate::frontend::{AstUnit, NodeId};

/// The id of the smallest node in `unit` whose range contains `offset`,
/// preferring a child over its parent whenever both contain it. `None` if
/// `offset` falls outside the unit's root range entirely.
pub fn locate(unit: &AstUnit, offset: usize) -> Option<NodeId> {
    let mut current = unit.root;
    if !unit.node(current).location.contains(offset) {
        return None;
    }
    loop {
        let node = unit.node(current);
        match node
            .children
            .iter()
            .find(|&&child| unit.node(child).location.contains(offset))
        {
            Some(&child) => current = child,
            None => return Some(current),
        }
    }
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

    #[test]
    fn locates_the_innermost_declaration() {
        let src = "contract Foo { function bar() public {} }";
        let unit = compile(src);
        let offset = src.find("bar").unwrap();
        let id = locate(&unit, offset).unwrap();
        match &unit.node(id).kind {
            crate::frontend::NodeKind::Declaration { name, .. } => assert_eq!(name, "bar"),
            other => panic!("expected a declaration node, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_offset_locates_nothing() {
        let unit = compile("contract Foo {}");
        assert!(locate(&unit, 10_000).is_none());
    }
}
