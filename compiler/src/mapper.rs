use serde::Serialize;

use dsdlc_schema::{ArrayMode, CastMode, FieldType, PrimitiveKind};

use crate::error::DsdlcError;
use crate::utils::bit_length;

/// Target representation of one schema field or constant type. Derived
/// per compile run; the parsed schema is never touched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedFieldView {
    /// C spelling of the base type. A compound's underscore name, empty
    /// for void fields.
    pub c_type: String,
    /// Suffix placed after the member name, `"[8]"` for arrays.
    pub post_type: String,
    /// Comment carried onto the generated member.
    pub comment: String,
    /// Declared bit length (the element's, for arrays; 0 for compounds).
    pub bitlen: u32,
    /// Largest value representable in the declared bit length.
    pub max_value: u128,
    pub signed: bool,
    pub saturate: bool,
    /// Set for 16-bit floats, which ride in a 32-bit `float`.
    pub half_precision: bool,
    pub array: Option<ArrayView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayView {
    pub max_size: u64,
    pub dynamic: bool,
    /// Bits needed to encode a length up to `max_size`.
    pub len_prefix_bits: u32,
}

/// Smallest supported width >= the declared bit length.
fn expand_to_next_full(bitlen: u32) -> Result<u32, DsdlcError> {
    match bitlen {
        1..=8 => Ok(8),
        9..=16 => Ok(16),
        17..=32 => Ok(32),
        33..=64 => Ok(64),
        other => Err(DsdlcError::UnsupportedTypeKind(format!(
            "integer bit length {other}"
        ))),
    }
}

fn max_value(bitlen: u32, unsigned: bool) -> u128 {
    if unsigned {
        (1u128 << bitlen) - 1
    } else {
        (1u128 << (bitlen - 1)) - 1
    }
}

fn cast_label(cast_mode: CastMode) -> &'static str {
    match cast_mode {
        CastMode::Saturated => "Saturate",
        CastMode::Truncated => "Truncate",
    }
}

/// Maps one schema type to its target representation. Pure function of
/// the input.
pub fn map(ty: &FieldType) -> Result<ResolvedFieldView, DsdlcError> {
    match ty {
        FieldType::Primitive {
            kind,
            bitlen,
            cast_mode,
        } => map_primitive(*kind, *bitlen, *cast_mode),

        FieldType::Array {
            element,
            mode,
            max_size,
        } => {
            let inner = map(element)?;
            let mode_label = match mode {
                ArrayMode::Static => "Static Array",
                ArrayMode::Dynamic => "Dynamic Array",
            };
            Ok(ResolvedFieldView {
                c_type: inner.c_type,
                post_type: format!("[{max_size}]"),
                comment: format!("{} {}bit[{}] max items", mode_label, inner.bitlen, max_size),
                bitlen: inner.bitlen,
                max_value: inner.max_value,
                signed: inner.signed,
                saturate: inner.saturate,
                half_precision: inner.half_precision,
                array: Some(ArrayView {
                    max_size: *max_size,
                    dynamic: *mode == ArrayMode::Dynamic,
                    len_prefix_bits: bit_length(*max_size),
                }),
            })
        }

        // Opaque named reference; the layout is whatever the referenced
        // type resolves to.
        FieldType::Compound { full_name } => Ok(ResolvedFieldView {
            c_type: full_name.replace('.', "_"),
            post_type: String::new(),
            comment: String::new(),
            bitlen: 0,
            max_value: 0,
            signed: false,
            saturate: false,
            half_precision: false,
            array: None,
        }),

        FieldType::Void { bitlen } => Ok(ResolvedFieldView {
            c_type: String::new(),
            post_type: String::new(),
            comment: format!("void{bitlen}"),
            bitlen: *bitlen,
            max_value: 0,
            signed: false,
            saturate: false,
            half_precision: false,
            array: None,
        }),
    }
}

fn map_primitive(
    kind: PrimitiveKind,
    bitlen: u32,
    cast_mode: CastMode,
) -> Result<ResolvedFieldView, DsdlcError> {
    match kind {
        PrimitiveKind::Float => {
            let c_type = match bitlen {
                16 | 32 => "float",
                64 => "double",
                other => {
                    return Err(DsdlcError::UnsupportedTypeKind(format!(
                        "float bit length {other}"
                    )))
                }
            };
            Ok(ResolvedFieldView {
                c_type: c_type.to_string(),
                post_type: String::new(),
                comment: format!("float{} {}", bitlen, cast_label(cast_mode)),
                bitlen,
                max_value: max_value(bitlen, false),
                signed: false,
                // Floats never saturate, whatever the declared cast mode.
                saturate: false,
                half_precision: bitlen == 16,
                array: None,
            })
        }

        PrimitiveKind::Bool => Ok(ResolvedFieldView {
            c_type: "bool".to_string(),
            post_type: String::new(),
            comment: format!("bit len {bitlen}"),
            bitlen,
            max_value: max_value(bitlen, true),
            signed: false,
            saturate: false,
            half_precision: false,
            array: None,
        }),

        PrimitiveKind::UnsignedInt | PrimitiveKind::SignedInt => {
            let signed = kind == PrimitiveKind::SignedInt;
            let width = expand_to_next_full(bitlen)?;
            // A full-width field cannot receive an out-of-range value,
            // so an exact fit turns saturation off even when requested.
            let saturate = cast_mode == CastMode::Saturated && width != bitlen;
            Ok(ResolvedFieldView {
                c_type: format!("{}{}_t", if signed { "int" } else { "uint" }, width),
                post_type: String::new(),
                comment: format!("bit len {bitlen}"),
                bitlen,
                max_value: max_value(bitlen, !signed),
                signed,
                saturate,
                half_precision: false,
                array: None,
            })
        }
    }
}
