//! The compiler frontend boundary: consumes a set of source files plus
//! compile settings, produces a typed AST and a diagnostic list. This
//! module defines that contract as a trait and ships one concrete,
//! self-contained implementation (see [`reference`]) so the server is
//! runnable and testable without an external compiler binding.

pub mod ast;
pub mod reference;

use std::collections::HashMap;

pub use ast::{AstUnit, DeclarationKind, Node, NodeId, NodeKind, SourceId, SourceLocation, SourceTable};

use crate::settings::{Remapping, Settings};

/// How far compilation should proceed. The core never asks for code
/// generation: a typed AST only, no bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisLevel {
    Parsing,
    Analysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error = 1,
    Warning = 2,
    Info = 3,
    Hint = 4,
}

#[derive(Debug, Clone)]
pub struct RelatedInformation {
    pub source_id: SourceId,
    pub location: SourceLocation,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: SourceLocation,
    pub code: Option<u64>,
    pub related: Vec<RelatedInformation>,
}

pub const DIAGNOSTIC_SOURCE: &str = "solc-like";

#[derive(Debug, Clone, Default)]
pub struct CompileResult {
    pub units: HashMap<String, AstUnit>,
    pub diagnostics: Vec<Diagnostic>,
    /// The interned source text backing every location in every unit above.
    pub sources: SourceTable,
}

/// The external compiler collaborator. The
/// [`crate::compiler::CompileDriver`] depends only on this trait.
pub trait CompilerFrontend {
    /// Discards any prior compilation state.
    fn reset(&mut self);
    /// Installs settings and import remappings for the next compile.
    fn configure(&mut self, settings: &Settings, remappings: &[Remapping]);
    /// Installs the full source snapshot for the next compile.
    fn set_sources(&mut self, sources: &HashMap<String, String>);
    /// Runs compilation up to `level` and returns the AST + diagnostics.
    fn compile_to(&mut self, level: AnalysisLevel) -> CompileResult;
}
