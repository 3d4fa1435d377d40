//! A small, self-contained stand-in for the real compiler frontend.
//! `ReferenceFrontend` tokenizes each source, recognizes a handful of
//! declaration forms (`contract`/`interface`/`library`, `struct`, `enum`,
//! `event`, `modifier`, `function`, state/local variables, `import`) and
//! binds plain identifiers, member accesses and inheritance paths back to
//! them. It exists so the rest of the server (locator, reference collector,
//! query handlers) has a real AST to walk without depending on an external
//! compiler binding; swapping in a production frontend means implementing
//! [`CompilerFrontend`] and nothing else.

use std::collections::HashMap;

use regex::Regex;

use super::ast::{AstUnit, DeclarationKind, Node, NodeId, NodeKind, SourceLocation, SourceTable};
use super::{AnalysisLevel, CompileResult, CompilerFrontend, Diagnostic, Severity};
use crate::settings::{Remapping, Settings};

#[derive(Debug, Clone)]
struct Tok {
    text: String,
    start: usize,
    end: usize,
}

/// Blanks out line comments, block comments and string contents with ASCII
/// spaces (byte-for-byte, so offsets never shift) while leaving import path
/// literals available to a separate pass that needs the string contents.
fn mask(source: &str) -> Vec<u8> {
    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    out[i] = b' ';
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                out[i] = b' ';
                out[i + 1] = b' ';
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    if bytes[i] != b'\n' {
                        out[i] = b' ';
                    }
                    i += 1;
                }
                if i + 1 < bytes.len() {
                    out[i] = b' ';
                    out[i + 1] = b' ';
                    i += 2;
                }
            }
            b'"' => {
                out[i] = b' ';
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] != b'\n' {
                        out[i] = b' ';
                    }
                    i += 1;
                }
                if i < bytes.len() {
                    out[i] = b' ';
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    out
}

fn tokenize(masked: &str) -> Vec<Tok> {
    let re = Regex::new(r"[A-Za-z_][A-Za-z0-9_]*|[{}()\[\];,.=]").expect("static regex");
    re.find_iter(masked)
        .map(|m| Tok {
            text: m.as_str().to_string(),
            start: m.start(),
            end: m.end(),
        })
        .collect()
}

const KEYWORDS: &[&str] = &[
    "contract", "interface", "library", "struct", "enum", "event", "modifier", "function",
    "import", "is", "public", "private", "internal", "external", "view", "pure", "returns",
    "memory", "storage", "calldata", "override", "virtual", "payable", "constant", "immutable",
];

fn is_keyword(text: &str) -> bool {
    KEYWORDS.contains(&text)
}

struct PendingDecl {
    name: String,
    kind: DeclarationKind,
    name_start: usize,
    name_end: usize,
    decl_start: usize,
}

/// Builds one [`AstUnit`] from a single source file.
struct Builder<'a> {
    source: &'a str,
    tokens: Vec<Tok>,
    nodes: Vec<Node>,
    source_id: usize,
    /// name -> every declaration of that name, in declaration order.
    symbols: HashMap<String, Vec<NodeId>>,
}

impl<'a> Builder<'a> {
    fn push_node(&mut self, kind: NodeKind, location: SourceLocation) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            id,
            kind,
            location,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn loc(&self, start: usize, end: usize) -> SourceLocation {
        SourceLocation {
            start,
            end,
            source_id: self.source_id,
        }
    }

    fn declare(&mut self, pending: PendingDecl, end: usize) -> NodeId {
        let name_location = self.loc(pending.name_start, pending.name_end);
        let id = self.push_node(
            NodeKind::Declaration {
                name: pending.name.clone(),
                kind: pending.kind,
                name_location,
                documentation: None,
            },
            self.loc(pending.decl_start, end),
        );
        self.symbols.entry(pending.name).or_default().push(id);
        id
    }

    /// Index of the token matching the opener at `open_idx`, tracking brace
    /// nesting for `{}` / `()`.
    fn matching_close(&self, open_idx: usize, open: &str, close: &str) -> Option<usize> {
        let mut depth = 0i32;
        for (i, tok) in self.tokens.iter().enumerate().skip(open_idx) {
            if tok.text == open {
                depth += 1;
            } else if tok.text == close {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
        }
        None
    }

    fn next_semicolon(&self, from: usize) -> Option<usize> {
        self.tokens[from..]
            .iter()
            .position(|t| t.text == ";")
            .map(|p| from + p)
    }

    fn import_directives(&mut self) {
        let re = Regex::new(r#"import\s+"([^"]+)"\s*;"#).expect("static regex");
        for cap in re.captures_iter(self.source) {
            let whole = cap.get(0).unwrap();
            let path = cap.get(1).unwrap().as_str().to_string();
            self.push_node(
                NodeKind::ImportDirective {
                    imported_path: path,
                    resolved_source_id: None,
                },
                self.loc(whole.start(), whole.end()),
            );
        }
    }

    /// First pass: find every declaration-introducing keyword and record
    /// its full extent and name token.
    fn collect_declarations(&mut self) -> Vec<(NodeId, usize, usize)> {
        let mut decls = Vec::new(); // (node, body_open, body_close) for scoped decls
        let mut i = 0usize;
        while i < self.tokens.len() {
            let kw = self.tokens[i].text.as_str();
            let kind = match kw {
                "contract" => Some(DeclarationKind::Contract),
                "interface" => Some(DeclarationKind::Interface),
                "library" => Some(DeclarationKind::Library),
                "struct" => Some(DeclarationKind::Struct),
                "enum" => Some(DeclarationKind::Enum),
                "event" => Some(DeclarationKind::Event),
                "modifier" => Some(DeclarationKind::Modifier),
                "function" => Some(DeclarationKind::Function),
                _ => None,
            };
            let Some(kind) = kind else {
                i += 1;
                continue;
            };
            let decl_start = self.tokens[i].start;
            let Some(name_tok) = self.tokens.get(i + 1).filter(|t| !is_keyword(&t.text)) else {
                i += 1;
                continue;
            };
            let pending = PendingDecl {
                name: name_tok.text.clone(),
                kind,
                name_start: name_tok.start,
                name_end: name_tok.end,
                decl_start,
            };

            // Find the body: a `{...}` block for types/functions-with-body,
            // or a bare `;` for prototype-only events/interface functions.
            let mut j = i + 2;
            let mut paren_close = None;
            if self.tokens.get(j).map(|t| t.text.as_str()) == Some("(") {
                paren_close = self.matching_close(j, "(", ")");
                j = paren_close.map(|p| p + 1).unwrap_or(j);
            }
            let brace_open = self.tokens[j..].iter().position(|t| t.text == "{").map(|p| j + p);
            let semicolon = self.next_semicolon(j);
            let (end_idx, body_range) = match (brace_open, semicolon) {
                (Some(b), Some(s)) if b < s => {
                    let close = self.matching_close(b, "{", "}").unwrap_or(b);
                    (close, Some((b, close)))
                }
                (_, Some(s)) => (s, None),
                (Some(b), None) => {
                    let close = self.matching_close(b, "{", "}").unwrap_or(b);
                    (close, Some((b, close)))
                }
                (None, None) => (self.tokens.len().saturating_sub(1), None),
            };
            let end_byte = self.tokens.get(end_idx).map(|t| t.end).unwrap_or(self.source.len());
            let node = self.declare(pending, end_byte);

            if kind == DeclarationKind::Enum {
                if let Some((open, close)) = body_range {
                    let members: Vec<Tok> = self.tokens[open + 1..close].to_vec();
                    for tok in &members {
                        if tok.text == "," || tok.text == "{" {
                            continue;
                        }
                        if !is_keyword(&tok.text) {
                            let pending = PendingDecl {
                                name: tok.text.clone(),
                                kind: DeclarationKind::EnumValue,
                                name_start: tok.start,
                                name_end: tok.end,
                                decl_start: tok.start,
                            };
                            let member_end = tok.end;
                            self.declare(pending, member_end);
                        }
                    }
                }
            }

            if kind == DeclarationKind::Function {
                if let Some(params_close) = paren_close {
                    self.collect_parameters(i + 2, params_close, node);
                }
            }

            if let Some((open, close)) = body_range {
                decls.push((node, open, close));
            }
            i = end_idx + 1;
        }
        decls
    }

    /// `(uint256 amount, address to)` style parameter lists: `TYPE NAME`
    /// pairs, declared as [`DeclarationKind::Parameter`].
    fn collect_parameters(&mut self, open: usize, close: usize, _owner: NodeId) {
        let params: Vec<Tok> = self.tokens[open + 1..close].to_vec();
        let mut i = 0usize;
        while i < params.len() {
            if params[i].text == "," {
                i += 1;
                continue;
            }
            // Walk a comma-separated group, the last non-keyword identifier
            // before the comma/end is the parameter name.
            let mut j = i;
            let mut last_ident: Option<&Tok> = None;
            while j < params.len() && params[j].text != "," {
                if !is_keyword(&params[j].text) && params[j].text.chars().next().map_or(false, |c| c.is_alphabetic() || c == '_') {
                    last_ident = Some(&params[j]);
                }
                j += 1;
            }
            if let Some(tok) = last_ident {
                let pending = PendingDecl {
                    name: tok.text.clone(),
                    kind: DeclarationKind::Parameter,
                    name_start: tok.start,
                    name_end: tok.end,
                    decl_start: tok.start,
                };
                let end = tok.end;
                self.declare(pending, end);
            }
            i = j + 1;
        }
    }

    /// `TYPE NAME (= ...)? ;` at top level of a contract body or function
    /// body, heuristically recognized as a variable declaration.
    fn collect_variables(&mut self, start: usize, end: usize, kind: DeclarationKind) {
        let mut depth = 0i32;
        let mut i = start;
        while i < end {
            match self.tokens[i].text.as_str() {
                "{" | "(" | "[" => depth += 1,
                "}" | ")" | "]" => depth -= 1,
                _ => {}
            }
            if depth == 0
                && !is_keyword(&self.tokens[i].text)
                && self.tokens[i].text.chars().next().map_or(false, |c| c.is_alphabetic() || c == '_')
            {
                if let Some(next) = self.tokens.get(i + 1) {
                    if !is_keyword(&next.text)
                        && next.text.chars().next().map_or(false, |c| c.is_alphabetic() || c == '_')
                    {
                        // two bare identifiers back to back: `Type name`
                        let after = self.tokens.get(i + 2).map(|t| t.text.as_str());
                        if after == Some(";") || after == Some("=") {
                            let semi = self.next_semicolon(i + 2).unwrap_or(end);
                            let pending = PendingDecl {
                                name: next.text.clone(),
                                kind,
                                name_start: next.start,
                                name_end: next.end,
                                decl_start: self.tokens[i].start,
                            };
                            let decl_end = self.tokens.get(semi).map(|t| t.end).unwrap_or(next.end);
                            self.declare(pending, decl_end);
                            i = semi + 1;
                            continue;
                        }
                    }
                }
            }
            i += 1;
        }
    }

    /// Reports unbalanced `(){}[]` as a diagnostic. This is the only syntax
    /// check this stand-in frontend performs; a real one would do far more.
    fn check_balance(&self) -> Vec<Diagnostic> {
        let mut stack: Vec<(char, usize, usize)> = Vec::new();
        let mut out = Vec::new();
        for tok in &self.tokens {
            let c = match tok.text.as_str() {
                "(" | "{" | "[" => Some(tok.text.chars().next().unwrap()),
                _ => None,
            };
            if let Some(open) = c {
                stack.push((open, tok.start, tok.end));
                continue;
            }
            let expected = match tok.text.as_str() {
                ")" => Some('('),
                "}" => Some('{'),
                "]" => Some('['),
                _ => None,
            };
            if let Some(expected) = expected {
                match stack.pop() {
                    Some((open, _, _)) if open == expected => {}
                    _ => out.push(self.unbalanced(tok.start, tok.end)),
                }
            }
        }
        for (_, start, end) in stack {
            out.push(self.unbalanced(start, end));
        }
        out
    }

    fn unbalanced(&self, start: usize, end: usize) -> Diagnostic {
        Diagnostic {
            severity: Severity::Error,
            message: "unbalanced delimiter".to_string(),
            location: self.loc(start, end),
            code: None,
            related: Vec::new(),
        }
    }

    fn name_tokens_consumed(&self) -> std::collections::HashSet<(usize, usize)> {
        self.nodes
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::Declaration { name_location, .. } => {
                    Some((name_location.start, name_location.end))
                }
                _ => None,
            })
            .collect()
    }

    /// Second pass: bind every remaining identifier/member-access token to
    /// a declaration, if one by that name exists.
    fn bind_references(&mut self) {
        let consumed = self.name_tokens_consumed();
        let mut i = 0usize;
        while i < self.tokens.len() {
            let tok_text = self.tokens[i].text.clone();
            let tok_start = self.tokens[i].start;
            let tok_end = self.tokens[i].end;
            let is_ident = tok_text.chars().next().map_or(false, |c| c.is_alphabetic() || c == '_');
            if !is_ident || is_keyword(&tok_text) || consumed.contains(&(tok_start, tok_end)) {
                i += 1;
                continue;
            }

            // Inheritance path: `is A.B.C` / `is A`
            if i > 0 && self.tokens[i - 1].text == "is" {
                let (segments, last) = self.collect_dotted_path(i);
                let referenced = segments.last().and_then(|s| self.resolve(s));
                let end_byte = self.tokens[last].end;
                self.push_node(
                    NodeKind::IdentifierPath {
                        segments,
                        referenced_declaration: referenced,
                    },
                    self.loc(tok_start, end_byte),
                );
                i = last + 1;
                continue;
            }

            // Member access: `a . b`
            if self.tokens.get(i + 1).map(|t| t.text.as_str()) == Some(".")
                && self
                    .tokens
                    .get(i + 2)
                    .map_or(false, |t| t.text.chars().next().map_or(false, |c| c.is_alphabetic() || c == '_'))
            {
                let member_text = self.tokens[i + 2].text.clone();
                let member_end = self.tokens[i + 2].end;
                let member_ref = self.resolve(&member_text);
                let receiver_ref = self.resolve(&tok_text);
                let receiver_candidates = self.candidates(&tok_text);
                self.push_node(
                    NodeKind::Identifier {
                        name: tok_text.clone(),
                        referenced_declaration: receiver_ref,
                        candidate_declarations: receiver_candidates,
                    },
                    self.loc(tok_start, tok_end),
                );
                self.push_node(
                    NodeKind::MemberAccess {
                        member_name: member_text,
                        referenced_declaration: member_ref,
                    },
                    self.loc(tok_start, member_end),
                );
                i += 3;
                continue;
            }

            let referenced_declaration = self.resolve(&tok_text);
            let candidate_declarations = self.candidates(&tok_text);
            self.push_node(
                NodeKind::Identifier {
                    name: tok_text,
                    referenced_declaration,
                    candidate_declarations,
                },
                self.loc(tok_start, tok_end),
            );
            i += 1;
        }
    }

    fn collect_dotted_path(&self, start: usize) -> (Vec<String>, usize) {
        let mut segments = vec![self.tokens[start].text.clone()];
        let mut i = start + 1;
        let mut last = start;
        while self.tokens.get(i).map(|t| t.text.as_str()) == Some(".") {
            if let Some(next) = self.tokens.get(i + 1) {
                segments.push(next.text.clone());
                last = i + 1;
                i += 2;
            } else {
                break;
            }
        }
        (segments, last)
    }

    fn resolve(&self, name: &str) -> Option<NodeId> {
        self.symbols.get(name).and_then(|ids| ids.first()).copied()
    }

    fn candidates(&self, name: &str) -> Vec<NodeId> {
        self.symbols.get(name).cloned().unwrap_or_default()
    }

    /// Parents every node under the file root by containment: the smallest
    /// already-placed node whose range contains the candidate's range.
    fn link_tree(&mut self, root: NodeId) {
        let mut order: Vec<NodeId> = (0..self.nodes.len()).filter(|&id| id != root).collect();
        order.sort_by_key(|&id| (self.nodes[id].location.start, std::cmp::Reverse(self.nodes[id].location.end)));
        for id in order {
            let loc = self.nodes[id].location;
            let mut best: Option<NodeId> = None;
            for &candidate in self.nodes[root].children.iter() {
                if self.contains_chain(candidate, loc) {
                    best = Some(candidate);
                    break;
                }
            }
            let parent = best.unwrap_or(root);
            self.attach(parent, id, loc);
        }
    }

    fn contains_chain(&self, node: NodeId, loc: SourceLocation) -> bool {
        self.nodes[node].location.start <= loc.start && loc.end <= self.nodes[node].location.end
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, loc: SourceLocation) {
        // descend into the deepest existing child that still contains loc
        let mut current = parent;
        loop {
            let next = self.nodes[current]
                .children
                .iter()
                .copied()
                .find(|&c| c != child && self.contains_chain(c, loc));
            match next {
                Some(n) if n != child => current = n,
                _ => break,
            }
        }
        self.nodes[child].parent = Some(current);
        self.nodes[current].children.push(child);
    }
}

/// A self-contained analyzer standing in for a real compiler frontend. See
/// the module docs for why this exists and what it deliberately does not do.
#[derive(Default)]
pub struct ReferenceFrontend {
    sources: HashMap<String, String>,
    settings: Settings,
    remappings: Vec<Remapping>,
}

impl ReferenceFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    fn compile_unit(&self, path: &str, text: &str, table: &mut SourceTable) -> (AstUnit, Vec<Diagnostic>) {
        let source_id = table.intern(path, text);
        let masked = mask(text);
        let masked_str = std::str::from_utf8(&masked).expect("mask preserves utf8 validity");
        let tokens = tokenize(masked_str);

        let mut builder = Builder {
            source: text,
            tokens,
            nodes: Vec::new(),
            source_id,
            symbols: HashMap::new(),
        };

        let root = builder.push_node(
            NodeKind::Other,
            SourceLocation { start: 0, end: text.len(), source_id },
        );

        builder.import_directives();
        let scoped = builder.collect_declarations();
        for (node, open, close) in &scoped {
            let kind = match &builder.nodes[*node].kind {
                NodeKind::Declaration { kind: DeclarationKind::Function, .. } => DeclarationKind::Variable,
                _ => DeclarationKind::StateVariable,
            };
            builder.collect_variables(*open, *close, kind);
        }
        builder.bind_references();
        builder.link_tree(root);
        let diagnostics = builder.check_balance();

        (
            AstUnit {
                source_id,
                path: path.to_string(),
                root,
                nodes: builder.nodes,
            },
            diagnostics,
        )
    }
}

impl CompilerFrontend for ReferenceFrontend {
    fn reset(&mut self) {
        self.sources.clear();
    }

    fn configure(&mut self, settings: &Settings, remappings: &[Remapping]) {
        self.settings = settings.clone();
        self.remappings = remappings.to_vec();
    }

    fn set_sources(&mut self, sources: &HashMap<String, String>) {
        self.sources = sources.clone();
    }

    fn compile_to(&mut self, _level: AnalysisLevel) -> CompileResult {
        let mut table = SourceTable::new();
        let mut units = HashMap::new();
        let mut diagnostics: Vec<Diagnostic> = Vec::new();

        for (path, text) in &self.sources {
            let (unit, unit_diagnostics) = self.compile_unit(path, text, &mut table);
            diagnostics.extend(unit_diagnostics);
            units.insert(path.clone(), unit);
        }

        CompileResult { units, diagnostics, sources: table }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(src: &str) -> AstUnit {
        let mut frontend = ReferenceFrontend::new();
        let mut sources = HashMap::new();
        sources.insert("a.src".to_string(), src.to_string());
        frontend.set_sources(&sources);
        let mut result = frontend.compile_to(AnalysisLevel::Analysis);
        result.units.remove("a.src").unwrap()
    }

    fn diagnostics_for(src: &str) -> Vec<Diagnostic> {
        let mut frontend = ReferenceFrontend::new();
        let mut sources = HashMap::new();
        sources.insert("a.src".to_string(), src.to_string());
        frontend.set_sources(&sources);
        frontend.compile_to(AnalysisLevel::Analysis).diagnostics
    }

    #[test]
    fn finds_contract_and_function_declarations() {
        let unit = compile("contract Foo { function bar() public {} }");
        let names: Vec<_> = unit
            .nodes
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::Declaration { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect();
        assert!(names.contains(&"Foo".to_string()));
        assert!(names.contains(&"bar".to_string()));
    }

    #[test]
    fn binds_identifier_to_state_variable() {
        let src = "contract Foo { uint256 total; function get() public { total; } }";
        let unit = compile(src);
        let total_decl = unit
            .nodes
            .iter()
            .find(|n| matches!(&n.kind, NodeKind::Declaration { name, .. } if name == "total"))
            .unwrap()
            .id;
        let found = unit.nodes.iter().any(|n| {
            matches!(&n.kind, NodeKind::Identifier { name, referenced_declaration: Some(d), .. }
                if name == "total" && *d == total_decl)
        });
        assert!(found, "expected an identifier referencing the state variable declaration");
    }

    #[test]
    fn binds_member_access() {
        let src = "contract Foo { function bar() public { msg.sender; } }";
        let unit = compile(src);
        assert!(unit
            .nodes
            .iter()
            .any(|n| matches!(&n.kind, NodeKind::MemberAccess { member_name, .. } if member_name == "sender")));
    }

    #[test]
    fn records_import_directive() {
        let unit = compile("import \"./Lib.src\";\ncontract Foo {}");
        assert!(unit
            .nodes
            .iter()
            .any(|n| matches!(&n.kind, NodeKind::ImportDirective { imported_path, .. } if imported_path == "./Lib.src")));
    }

    #[test]
    fn balanced_source_has_no_diagnostics() {
        let diagnostics = diagnostics_for("contract Foo { function bar() public {} }");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn unclosed_brace_reports_error_diagnostic() {
        let diagnostics = diagnostics_for("contract Foo { function bar() public {}");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Error);
    }

    #[test]
    fn stray_closing_brace_reports_error_diagnostic() {
        let diagnostics = diagnostics_for("contract Foo { function bar() public {} } }");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Error);
    }
}
