use dsdlc_schema::CompoundKind;

use crate::assembler::{AssembledType, SectionView};
use crate::context::TemplateContext;
use crate::error::DsdlcError;
use crate::traits::{ArtifactKind, TemplateEngine};

/// Built-in renderer producing C header and source text from an
/// assembled type. Declarations and constants only; wire codecs are the
/// business of whatever consumes the generated tree.
pub struct CGenerator;

impl TemplateEngine for CGenerator {
    fn render(&self, kind: ArtifactKind, context: &TemplateContext) -> Result<String, DsdlcError> {
        match kind {
            ArtifactKind::Header => Ok(render_header(context)),
            ArtifactKind::Code => Ok(render_code(context)),
        }
    }
}

fn banner(ty: &AssembledType) -> String {
    let attributes = ty.all_attribute_names().join(", ");
    let mut lines = vec![
        "/*".to_string(),
        " * Autogenerated from a DSDL definition. Do not edit.".to_string(),
        format!(" * Source type: {}", ty.full_name),
    ];
    if !attributes.is_empty() {
        lines.push(format!(" * Attributes: {attributes}"));
    }
    lines.push(" */".to_string());
    lines.join("\n")
}

/// Smallest C integer holding a dynamic array length counter.
fn len_c_type(len_prefix_bits: u32) -> &'static str {
    match len_prefix_bits {
        0..=8 => "uint8_t",
        9..=16 => "uint16_t",
        _ => "uint32_t",
    }
}

fn push_constants(prefix: &str, section: &SectionView, lines: &mut Vec<String>) {
    for constant in &section.constants {
        lines.push(format!(
            "#define {}_{} {} // {}",
            prefix,
            constant.name.to_uppercase(),
            constant.c_value,
            constant.resolved.comment
        ));
    }
    if !section.constants.is_empty() {
        lines.push(String::new());
    }
}

fn push_struct(struct_name: &str, section: &SectionView, lines: &mut Vec<String>) {
    lines.push("typedef struct {".to_string());

    if let Some(bits) = section.union_tag_bits {
        lines.push(format!("    uint8_t union_tag; // union tag, bit len {bits}"));
        lines.push("    union {".to_string());
        push_members(section, 2, lines);
        lines.push("    };".to_string());
    } else {
        push_members(section, 1, lines);
    }

    lines.push(format!("}} {struct_name};"));
}

fn push_members(section: &SectionView, depth: usize, lines: &mut Vec<String>) {
    let pad = "    ".repeat(depth);
    for field in &section.fields {
        let r = &field.resolved;
        if field.void {
            lines.push(format!("{pad}// {}", r.comment));
        } else if let Some(array) = r.array.as_ref().filter(|a| a.dynamic) {
            lines.push(format!(
                "{pad}struct {{ {} len; {} data{}; }} {}; // {}",
                len_c_type(array.len_prefix_bits),
                r.c_type,
                r.post_type,
                field.name,
                r.comment
            ));
        } else if r.comment.is_empty() {
            lines.push(format!("{pad}{} {}{};", r.c_type, field.name, r.post_type));
        } else {
            lines.push(format!(
                "{pad}{} {}{}; // {}",
                r.c_type, field.name, r.post_type, r.comment
            ));
        }
    }
}

fn render_header(context: &TemplateContext) -> String {
    let ty = context.ty;
    let mut lines: Vec<String> = Vec::new();

    lines.push(banner(ty));
    if !context.header_only {
        lines.push(format!("// Paired source file: {}", ty.code_filename));
    }
    lines.push(format!("#ifndef {}", ty.include_guard));
    lines.push(format!("#define {}", ty.include_guard));
    lines.push(String::new());
    lines.push("#include <stdbool.h>".to_string());
    lines.push("#include <stdint.h>".to_string());
    for include in &ty.includes {
        lines.push(format!("#include \"{include}\""));
    }
    lines.push(String::new());
    lines.push("#ifdef __cplusplus".to_string());
    lines.push("extern \"C\" {".to_string());
    lines.push("#endif".to_string());
    lines.push(String::new());

    if let Some(dtid) = ty.default_dtid {
        lines.push(format!("#define {}_ID {}", ty.macro_name, dtid));
    }
    lines.push(format!(
        "#define {}_NAME \"{}\"",
        ty.macro_name, ty.full_name
    ));
    lines.push(String::new());

    match ty.kind {
        CompoundKind::Message => {
            if let Some(section) = &ty.message {
                push_constants(&ty.macro_name, section, &mut lines);
                push_struct(&ty.c_name, section, &mut lines);
            }
        }
        CompoundKind::Service => {
            if let Some(section) = &ty.request {
                push_constants(&format!("{}_REQUEST", ty.macro_name), section, &mut lines);
                push_struct(&format!("{}Request", ty.c_name), section, &mut lines);
                lines.push(String::new());
            }
            if let Some(section) = &ty.response {
                push_constants(&format!("{}_RESPONSE", ty.macro_name), section, &mut lines);
                push_struct(&format!("{}Response", ty.c_name), section, &mut lines);
            }
        }
    }

    lines.push(String::new());
    if !context.header_only {
        lines.push(format!("extern const char {}_name[];", ty.c_name));
        lines.push(String::new());
    }
    lines.push("#ifdef __cplusplus".to_string());
    lines.push("}".to_string());
    lines.push("#endif".to_string());
    lines.push(String::new());
    lines.push(format!("#endif // {}", ty.include_guard));
    lines.push(String::new());

    lines.join("\n")
}

fn render_code(context: &TemplateContext) -> String {
    let ty = context.ty;
    let mut lines: Vec<String> = Vec::new();

    if context.header_only {
        // Appended into the header; the symbol must stay local to each
        // including translation unit.
        lines.push(format!(
            "static const char {}_name[] = \"{}\";",
            ty.c_name, ty.full_name
        ));
    } else {
        lines.push(banner(ty));
        lines.push(format!("#include \"{}\"", ty.header_filename));
        lines.push(String::new());
        lines.push(format!(
            "const char {}_name[] = \"{}\";",
            ty.c_name, ty.full_name
        ));
    }
    lines.push(String::new());

    lines.join("\n")
}
