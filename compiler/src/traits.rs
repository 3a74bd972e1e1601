use std::path::PathBuf;

use dsdlc_schema::{CompoundType, TypeRegistry};

use crate::context::TemplateContext;
use crate::error::DsdlcError;

/// Which of the two generated artifacts a render call produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Header,
    Code,
}

/// Result of one parse run.
pub struct ParsedSet {
    /// Types to compile, from the source directories.
    pub compiled: Vec<CompoundType>,
    /// Every known type, compiled or referenced.
    pub registry: TypeRegistry,
}

/// Whatever turns definition files into a validated type graph. The
/// compiler core depends only on this seam, never on a concrete parser.
pub trait SchemaParser {
    fn parse(
        &self,
        source_dirs: &[PathBuf],
        search_dirs: &[PathBuf],
    ) -> Result<ParsedSet, DsdlcError>;
}

/// The text substitution facility producing header and code text. The
/// entire per-type state is handed over in the context; engines must not
/// rely on any ambient helper state.
pub trait TemplateEngine {
    fn render(&self, kind: ArtifactKind, context: &TemplateContext) -> Result<String, DsdlcError>;
}
