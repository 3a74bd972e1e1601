use std::path::PathBuf;

use tracing::info;

use crate::assembler;
use crate::emitter::{self, EmitReport};
use crate::error::DsdlcError;
use crate::resolver;
use crate::traits::{SchemaParser, TemplateEngine};

/// Inputs of one compile run.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Root namespace directories whose types are compiled.
    pub source_dirs: Vec<PathBuf>,
    /// Root namespace directories with referenced types only.
    pub search_dirs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub header_only: bool,
}

/// Runs one full compile: parse, resolve the declaration order, assemble
/// every type, emit. Strictly sequential and fail-fast; the first error
/// aborts the run.
pub fn compile(
    parser: &dyn SchemaParser,
    engine: &dyn TemplateEngine,
    options: &CompileOptions,
) -> Result<EmitReport, DsdlcError> {
    let parsed = parser.parse(&options.source_dirs, &options.search_dirs)?;
    if parsed.compiled.is_empty() {
        return Err(DsdlcError::NoDefinitions);
    }
    info!(types = parsed.compiled.len(), "parsed type definitions");

    let ordered = resolver::order(&parsed.compiled)?;
    let mut assembled = Vec::with_capacity(ordered.len());
    for ty in ordered {
        assembled.push(assembler::assemble(ty)?);
    }

    let report = emitter::emit(&assembled, engine, &options.output_dir, options.header_only)?;
    info!(
        written = report.written,
        unchanged = report.unchanged,
        "emission complete"
    );
    Ok(report)
}
