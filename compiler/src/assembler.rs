use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use dsdlc_schema::{CompoundKind, CompoundType, Constant, Field, FieldType, PrimitiveKind};

use crate::error::DsdlcError;
use crate::mapper::{self, ResolvedFieldView};
use crate::utils::{bit_length, quote};

lazy_static! {
    static ref INTEGER_LITERAL: Regex = Regex::new(r"^[+-]?\d+$").unwrap();
    static ref FLOAT_LITERAL: Regex =
        Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").unwrap();
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldView {
    pub name: String,
    pub index: usize,
    pub last: bool,
    pub void: bool,
    pub resolved: ResolvedFieldView,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConstantView {
    pub name: String,
    /// Literal formatted for C, `U`-suffixed for unsigned kinds.
    pub c_value: String,
    pub resolved: ResolvedFieldView,
}

/// One field/constant section: the whole type for messages, request or
/// response for services.
#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub fields: Vec<FieldView>,
    pub constants: Vec<ConstantView>,
    pub has_array: bool,
    pub has_float16: bool,
    /// Minimal tag width when the union flag is in effect; a union with
    /// no fields needs no tag.
    pub union_tag_bits: Option<u32>,
}

/// Everything the emitter and templates need to know about one compound
/// type. Built fresh per compile run; the schema stays untouched.
#[derive(Debug, Clone, Serialize)]
pub struct AssembledType {
    pub full_name: String,
    pub short_name: String,
    pub namespace: Vec<String>,
    /// Full name with dots replaced by underscores.
    pub c_name: String,
    /// Uppercased underscore name, the prefix of every generated macro.
    pub macro_name: String,
    pub include_guard: String,
    /// Both filenames are output-root relative with `/` separators.
    pub header_filename: String,
    pub code_filename: String,
    pub kind: CompoundKind,
    pub default_dtid: Option<u32>,
    /// Sorted, duplicate-free header filenames of referenced types.
    pub includes: Vec<String>,
    pub message: Option<SectionView>,
    pub request: Option<SectionView>,
    pub response: Option<SectionView>,
}

impl AssembledType {
    /// Field and constant names across every section, request before
    /// response. Used for documentation banners and signatures.
    pub fn all_attribute_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for section in [&self.message, &self.request, &self.response]
            .into_iter()
            .flatten()
        {
            names.extend(section.fields.iter().filter_map(|f| {
                if f.void {
                    None
                } else {
                    Some(f.name.as_str())
                }
            }));
            names.extend(section.constants.iter().map(|c| c.name.as_str()));
        }
        names
    }
}

/// Header filename of a compound type, output-root relative.
pub fn header_filename(full_name: &str) -> String {
    format!("{}.h", full_name.replace('.', "/"))
}

/// Code filename of a compound type. The basename is prefixed with the
/// enclosing namespace segment so sibling namespaces cannot collide.
fn code_filename(namespace: &[&str], short_name: &str) -> Option<String> {
    let enclosing = namespace.last()?;
    Some(format!(
        "{}/{}_{}.c",
        namespace.join("/"),
        enclosing,
        short_name
    ))
}

fn detect_include(ty: &FieldType) -> Option<String> {
    match ty {
        FieldType::Compound { full_name } => Some(header_filename(full_name)),
        FieldType::Array { element, .. } => detect_include(element),
        FieldType::Primitive { .. } | FieldType::Void { .. } => None,
    }
}

fn assemble_constant(constant: &Constant, type_name: &str) -> Result<ConstantView, DsdlcError> {
    let resolved = mapper::map(&constant.ty)?;
    let kind = match constant.ty {
        FieldType::Primitive { kind, .. } => kind,
        _ => {
            return Err(DsdlcError::UnsupportedTypeKind(format!(
                "constant {}.{} of non-primitive type",
                type_name, constant.name
            )))
        }
    };

    let c_value = match kind {
        PrimitiveKind::Float => {
            if !FLOAT_LITERAL.is_match(&constant.value) {
                return Err(DsdlcError::ConstantLiteral {
                    name: format!("{}.{}", type_name, constant.name),
                    expected: "floating point",
                    value: quote(&constant.value),
                });
            }
            constant.value.clone()
        }
        other => {
            if !INTEGER_LITERAL.is_match(&constant.value) {
                return Err(DsdlcError::ConstantLiteral {
                    name: format!("{}.{}", type_name, constant.name),
                    expected: "integer",
                    value: quote(&constant.value),
                });
            }
            if other == PrimitiveKind::UnsignedInt {
                format!("{}U", constant.value)
            } else {
                constant.value.clone()
            }
        }
    };

    Ok(ConstantView {
        name: constant.name.clone(),
        c_value,
        resolved,
    })
}

fn assemble_section(
    fields: &[Field],
    constants: &[Constant],
    is_union: bool,
    type_name: &str,
) -> Result<SectionView, DsdlcError> {
    let count = fields.len();
    let mut views = Vec::with_capacity(count);
    let mut has_array = false;
    let mut has_float16 = false;

    for (index, field) in fields.iter().enumerate() {
        let resolved = mapper::map(&field.ty)?;
        if resolved.array.is_some() {
            has_array = true;
        }
        // Arrays of float16 do not count; only direct fields need the
        // half-precision conversion helpers.
        if resolved.array.is_none() && resolved.half_precision {
            has_float16 = true;
        }
        let void = matches!(field.ty, FieldType::Void { .. });
        views.push(FieldView {
            name: field.name.clone(),
            index,
            last: index + 1 == count,
            void,
            resolved,
        });
    }

    let mut constant_views = Vec::with_capacity(constants.len());
    for constant in constants {
        constant_views.push(assemble_constant(constant, type_name)?);
    }

    let union_tag_bits = if is_union && count > 0 {
        Some(bit_length(count as u64))
    } else {
        None
    };

    Ok(SectionView {
        fields: views,
        constants: constant_views,
        has_array,
        has_float16,
        union_tag_bits,
    })
}

/// Derives the whole-type generation metadata for one compound type.
pub fn assemble(ty: &CompoundType) -> Result<AssembledType, DsdlcError> {
    let namespace = ty.namespace_components();
    if namespace.is_empty() {
        return Err(DsdlcError::MissingNamespace(ty.full_name.clone()));
    }
    let short_name = ty.short_name().to_string();
    let c_name = ty.full_name.replace('.', "_");
    let macro_name = c_name.to_uppercase();
    let include_guard = format!("__{macro_name}");
    let header = header_filename(&ty.full_name);
    let code = code_filename(&namespace, &short_name)
        .ok_or_else(|| DsdlcError::MissingNamespace(ty.full_name.clone()))?;

    let includes: Vec<String> = ty
        .all_fields()
        .filter_map(|f| detect_include(&f.ty))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let (message, request, response) = match ty.kind {
        CompoundKind::Message => (
            Some(assemble_section(
                &ty.fields,
                &ty.constants,
                ty.is_union,
                &ty.full_name,
            )?),
            None,
            None,
        ),
        CompoundKind::Service => (
            None,
            Some(assemble_section(
                &ty.request_fields,
                &ty.request_constants,
                ty.request_union,
                &ty.full_name,
            )?),
            Some(assemble_section(
                &ty.response_fields,
                &ty.response_constants,
                ty.response_union,
                &ty.full_name,
            )?),
        ),
    };

    Ok(AssembledType {
        full_name: ty.full_name.clone(),
        short_name,
        namespace: namespace.iter().map(|s| s.to_string()).collect(),
        c_name,
        macro_name,
        include_guard,
        header_filename: header,
        code_filename: code,
        kind: ty.kind,
        default_dtid: ty.default_dtid,
        includes,
        message,
        request,
        response,
    })
}
