use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::assembler::AssembledType;
use crate::context::TemplateContext;
use crate::error::DsdlcError;
use crate::traits::{ArtifactKind, TemplateEngine};

/// File-level outcome of one emission pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EmitReport {
    pub written: usize,
    pub unchanged: usize,
}

/// Strips trailing whitespace per line and caps runs of blank lines at
/// two. Applied to every artifact on every run so regeneration is
/// byte-stable.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 2 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn join_relative(root: &Path, relative: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in relative.split('/') {
        path.push(part);
    }
    path
}

/// Writes `content` unless the file already holds exactly these bytes.
/// Skipping the write keeps modification times stable for downstream
/// incremental builds.
fn write_if_changed(
    path: &Path,
    content: &str,
    report: &mut EmitReport,
) -> Result<(), DsdlcError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if let Ok(existing) = fs::read(path) {
        if existing == content.as_bytes() {
            debug!(path = %path.display(), "unchanged, skipping write");
            report.unchanged += 1;
            return Ok(());
        }
    }
    fs::write(path, content)?;
    report.written += 1;
    Ok(())
}

/// Emits every assembled type, in the given (resolved) order. The first
/// failure aborts the pass; files already written this run stay, which
/// the lazy-write contract makes safe.
pub fn emit(
    ordered: &[AssembledType],
    engine: &dyn TemplateEngine,
    output_root: &Path,
    header_only: bool,
) -> Result<EmitReport, DsdlcError> {
    let mut report = EmitReport::default();
    fs::create_dir_all(output_root)?;

    for ty in ordered {
        info!(type_name = %ty.full_name, "generating");
        let context = TemplateContext { ty, header_only };
        let header_text = normalize(&engine.render(ArtifactKind::Header, &context)?);
        let code_text = normalize(&engine.render(ArtifactKind::Code, &context)?);

        let header_path = join_relative(output_root, &ty.header_filename);
        if header_only {
            // One combined artifact, one idempotent write. Re-normalized
            // so the seam between the two texts obeys the blank-line cap.
            let combined = normalize(&format!("{header_text}\n{code_text}"));
            write_if_changed(&header_path, &combined, &mut report)?;
        } else {
            write_if_changed(&header_path, &header_text, &mut report)?;
            let code_path = join_relative(output_root, &ty.code_filename);
            write_if_changed(&code_path, &code_text, &mut report)?;
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;
    use dsdlc_schema::CompoundType;

    /// Renders fixed text so tests can focus on the write behavior.
    struct FixedEngine;

    impl TemplateEngine for FixedEngine {
        fn render(
            &self,
            kind: ArtifactKind,
            context: &TemplateContext,
        ) -> Result<String, DsdlcError> {
            let label = match kind {
                ArtifactKind::Header => "header",
                ArtifactKind::Code => "code",
            };
            Ok(format!("// {} for {}\n", label, context.ty.full_name))
        }
    }

    fn assembled(full_name: &str) -> AssembledType {
        assemble(&CompoundType::message(full_name)).unwrap()
    }

    #[test]
    fn test_normalize_strips_trailing_whitespace() {
        assert_eq!(normalize("int a;   \nint b;\t\n"), "int a;\nint b;\n");
    }

    #[test]
    fn test_normalize_caps_blank_runs_at_two() {
        assert_eq!(normalize("a\n\n\n\n\nb\n"), "a\n\n\nb\n");
        // Two blank lines survive untouched.
        assert_eq!(normalize("a\n\n\nb\n"), "a\n\n\nb\n");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize("x  \n\n\n\n\ny\n");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_emit_writes_header_and_code_files() {
        let out = tempfile::tempdir().unwrap();
        let types = vec![assembled("uavcan.protocol.NodeStatus")];
        let report = emit(&types, &FixedEngine, out.path(), false).unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(report.unchanged, 0);

        let header = out.path().join("uavcan/protocol/NodeStatus.h");
        let code = out.path().join("uavcan/protocol/protocol_NodeStatus.c");
        assert!(header.is_file());
        assert!(code.is_file());
        assert_eq!(
            fs::read_to_string(&header).unwrap(),
            "// header for uavcan.protocol.NodeStatus\n"
        );
    }

    #[test]
    fn test_second_run_writes_nothing() {
        let out = tempfile::tempdir().unwrap();
        let types = vec![assembled("ns.First"), assembled("ns.Second")];
        let first = emit(&types, &FixedEngine, out.path(), false).unwrap();
        assert_eq!(first.written, 4);

        let second = emit(&types, &FixedEngine, out.path(), false).unwrap();
        assert_eq!(second.written, 0);
        assert_eq!(second.unchanged, 4);
    }

    #[test]
    fn test_header_only_appends_code_into_header() {
        let out = tempfile::tempdir().unwrap();
        let types = vec![assembled("ns.Solo")];
        let report = emit(&types, &FixedEngine, out.path(), true).unwrap();
        assert_eq!(report.written, 1);
        assert!(!out.path().join("ns/ns_Solo.c").exists());

        let header = fs::read_to_string(out.path().join("ns/Solo.h")).unwrap();
        assert!(header.contains("// header for ns.Solo"));
        assert!(header.contains("// code for ns.Solo"));

        // Still idempotent in header-only mode.
        let second = emit(&types, &FixedEngine, out.path(), true).unwrap();
        assert_eq!(second.written, 0);
        assert_eq!(second.unchanged, 1);
    }

    #[test]
    fn test_changed_content_is_rewritten() {
        let out = tempfile::tempdir().unwrap();
        let types = vec![assembled("ns.Solo")];
        emit(&types, &FixedEngine, out.path(), false).unwrap();

        let header = out.path().join("ns/Solo.h");
        fs::write(&header, "stale\n").unwrap();
        let report = emit(&types, &FixedEngine, out.path(), false).unwrap();
        assert_eq!(report.written, 1);
        assert_eq!(report.unchanged, 1);
    }
}
