//! The compile driver: owns the [`CompilerFrontend`], tracks
//! which documents it was last given, and turns a `CompileResult` into the
//! `publishDiagnostics` notifications the client expects.

use std::collections::HashMap;
use std::path::Path;

use lsp_types::{
    Diagnostic as LspDiagnostic, DiagnosticRelatedInformation, DiagnosticSeverity, Location,
    PublishDiagnosticsParams, Range, Url,
};

use crate::document_store::denormalize_path;
use crate::frontend::{
    AnalysisLevel, CompileResult, CompilerFrontend, Diagnostic, Severity, SourceId, SourceTable,
};
use crate::position::position_of;
use crate::settings::{Remapping, Settings};

/// Wraps a [`CompilerFrontend`] and remembers the last successful result so
/// the locator, reference collector and query handlers can all read it.
pub struct CompileDriver {
    frontend: Box<dyn CompilerFrontend>,
    last_result: CompileResult,
}

impl CompileDriver {
    pub fn new(frontend: Box<dyn CompilerFrontend>) -> Self {
        Self {
            frontend,
            last_result: CompileResult::default(),
        }
    }

    pub fn result(&self) -> &CompileResult {
        &self.last_result
    }

    /// Re-runs compilation over the full known source set and returns
    /// whether it produced a usable AST unit for `path`.
    pub fn compile(
        &mut self,
        settings: &Settings,
        remappings: &[Remapping],
        sources: &HashMap<String, String>,
        path: &str,
    ) -> bool {
        self.compile_all(settings, remappings, sources);
        self.last_result.units.contains_key(path)
    }

    /// Re-runs compilation and builds the `publishDiagnostics` notification
    /// for every source the frontend returned diagnostics for, plus every
    /// source that has no diagnostics left (so a client-visible error clears).
    pub fn compile_source(
        &mut self,
        settings: &Settings,
        remappings: &[Remapping],
        sources: &HashMap<String, String>,
        base_path: Option<&Path>,
    ) -> Vec<PublishDiagnosticsParams> {
        self.compile_all(settings, remappings, sources);

        let mut by_source: HashMap<SourceId, Vec<&Diagnostic>> = HashMap::new();
        for diag in &self.last_result.diagnostics {
            by_source.entry(diag.location.source_id).or_default().push(diag);
        }

        let table = &self.last_result.sources;
        let mut out = Vec::new();
        for (path, _) in sources {
            let Some(source_id) = table.id_of(path) else {
                continue;
            };
            let text = table.text(source_id);
            let diags = by_source.get(&source_id).cloned().unwrap_or_default();
            let lsp_diags = diags
                .into_iter()
                .map(|d| to_lsp_diagnostic(d, text, table, base_path))
                .collect();
            let uri = match Url::from_file_path(denormalize_path(path, base_path)) {
                Ok(u) => u,
                Err(_) => continue,
            };
            out.push(PublishDiagnosticsParams {
                uri,
                diagnostics: lsp_diags,
                version: None,
            });
        }
        out
    }

    fn compile_all(&mut self, settings: &Settings, remappings: &[Remapping], sources: &HashMap<String, String>) {
        self.frontend.reset();
        self.frontend.configure(settings, remappings);
        self.frontend.set_sources(sources);
        self.last_result = self.frontend.compile_to(AnalysisLevel::Analysis);
    }
}

fn to_lsp_diagnostic(diag: &Diagnostic, text: &str, table: &SourceTable, base_path: Option<&Path>) -> LspDiagnostic {
    let range = Range {
        start: position_of(text, diag.location.start),
        end: position_of(text, diag.location.end),
    };
    let related = if diag.related.is_empty() {
        None
    } else {
        Some(
            diag.related
                .iter()
                .filter_map(|r| {
                    let path = table.path(r.source_id);
                    let uri = Url::from_file_path(denormalize_path(path, base_path)).ok()?;
                    let related_text = table.text(r.source_id);
                    Some(DiagnosticRelatedInformation {
                        location: Location {
                            uri,
                            range: Range {
                                start: position_of(related_text, r.location.start),
                                end: position_of(related_text, r.location.end),
                            },
                        },
                        message: r.message.clone(),
                    })
                })
                .collect(),
        )
    };

    LspDiagnostic {
        range,
        severity: Some(to_lsp_severity(diag.severity)),
        code: diag.code.map(|c| lsp_types::NumberOrString::Number(c as i32)),
        code_description: None,
        source: Some(crate::frontend::DIAGNOSTIC_SOURCE.to_string()),
        message: diag.message.clone(),
        related_information: related,
        tags: None,
        data: None,
    }
}

/// Collapses every compiler-reported severity to one of two LSP outcomes:
/// errors of any kind to `ERROR`, warnings to `WARNING`. Anything else the
/// frontend might report (info, hint) is treated as an error rather than
/// silently downgraded to an easily-ignored severity.
fn to_lsp_severity(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Error | Severity::Info | Severity::Hint => DiagnosticSeverity::ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::reference::ReferenceFrontend;

    fn driver() -> CompileDriver {
        CompileDriver::new(Box::new(ReferenceFrontend::new()))
    }

    #[test]
    fn compile_reports_unit_for_known_path() {
        let mut driver = driver();
        let settings = Settings::default();
        let remappings = Vec::new();
        let mut sources = HashMap::new();
        sources.insert("/a.src".to_string(), "contract Foo {}".to_string());
        assert!(driver.compile(&settings, &remappings, &sources, "/a.src"));
        assert!(!driver.compile(&settings, &remappings, &sources, "/missing.src"));
    }

    #[test]
    fn compile_source_emits_one_publish_per_known_file() {
        let mut driver = driver();
        let settings = Settings::default();
        let remappings = Vec::new();
        let mut sources = HashMap::new();
        sources.insert("/a.src".to_string(), "contract Foo {}".to_string());
        let published = driver.compile_source(&settings, &remappings, &sources, None);
        assert_eq!(published.len(), 1);
        assert!(published[0].diagnostics.is_empty());
    }

    #[test]
    fn severity_collapses_to_error_or_warning_only() {
        assert_eq!(to_lsp_severity(Severity::Error), DiagnosticSeverity::ERROR);
        assert_eq!(to_lsp_severity(Severity::Warning), DiagnosticSeverity::WARNING);
        assert_eq!(to_lsp_severity(Severity::Info), DiagnosticSeverity::ERROR);
        assert_eq!(to_lsp_severity(Severity::Hint), DiagnosticSeverity::ERROR);
    }
}
