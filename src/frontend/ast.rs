//! The AST shape the compiler frontend hands back to the core: an arena,
//! with source text kept as reference-counted immutable buffers. Nodes are
//! stored flat in a `Vec` and referenced by index so the locator and
//! reference collector never hold a raw borrow across a `compile()`
//! boundary.

use std::collections::HashMap;
use std::rc::Rc;

pub type NodeId = usize;
pub type SourceId = usize;

/// A (start, end, stream) triple identifying a byte range in one source file.
/// `source_id` indexes into the [`SourceTable`] rather than back-pointing
/// into the AST, so locations stay valid independent of which unit holds them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub start: usize,
    pub end: usize,
    pub source_id: SourceId,
}

impl SourceLocation {
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Contract,
    Interface,
    Library,
    Struct,
    Enum,
    EnumValue,
    Event,
    Modifier,
    Function,
    Parameter,
    StateVariable,
    Variable,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Introduces a named entity. `location` on the owning [`Node`] is the
    /// full declaration range; `name_location` is just the identifier token.
    Declaration {
        name: String,
        kind: DeclarationKind,
        name_location: SourceLocation,
        documentation: Option<String>,
    },
    /// Refers to a declaration by unqualified name.
    Identifier {
        name: String,
        referenced_declaration: Option<NodeId>,
        candidate_declarations: Vec<NodeId>,
    },
    /// A dotted chain of names resolving to one declaration (e.g. an
    /// inheritance specifier `Base.Helper`).
    IdentifierPath {
        segments: Vec<String>,
        referenced_declaration: Option<NodeId>,
    },
    /// `expression.member`.
    MemberAccess {
        member_name: String,
        referenced_declaration: Option<NodeId>,
    },
    ImportDirective {
        imported_path: String,
        resolved_source_id: Option<SourceId>,
    },
    /// Structural-only node (file root, statement, block) with no semantic
    /// annotation of its own.
    Other,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub location: SourceLocation,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// One compiled source file: a flat node arena plus the id of its root.
#[derive(Debug, Clone)]
pub struct AstUnit {
    pub source_id: SourceId,
    pub path: String,
    pub root: NodeId,
    pub nodes: Vec<Node>,
}

impl AstUnit {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Pre-order walk: parent, then children in declaration order.
    pub fn walk(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack = vec![self.root];
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            let node = &self.nodes[id];
            for &child in node.children.iter().rev() {
                stack.push(child);
            }
            Some(id)
        })
    }
}

/// Shared immutable text of every source the frontend was given; many AST
/// nodes across many units reference the same entry.
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    paths: Vec<String>,
    texts: Vec<Rc<str>>,
    by_path: HashMap<String, SourceId>,
}

impl SourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, path: &str, text: &str) -> SourceId {
        if let Some(&id) = self.by_path.get(path) {
            self.texts[id] = Rc::from(text);
            return id;
        }
        let id = self.paths.len();
        self.paths.push(path.to_string());
        self.texts.push(Rc::from(text));
        self.by_path.insert(path.to_string(), id);
        id
    }

    pub fn path(&self, id: SourceId) -> &str {
        &self.paths[id]
    }

    pub fn text(&self, id: SourceId) -> &str {
        &self.texts[id]
    }

    pub fn id_of(&self, path: &str) -> Option<SourceId> {
        self.by_path.get(path).copied()
    }
}
