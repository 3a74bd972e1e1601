use std::fs;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

use dsdlc_schema::{
    ArrayMode, CastMode, CompoundType, Constant, Field, FieldType, PrimitiveKind, TypeRegistry,
};

use crate::error::DsdlcError;
use crate::traits::{ParsedSet, SchemaParser};
use crate::utils::quote;

lazy_static! {
    static ref FILE_NAME: Regex =
        Regex::new(r"^(?:(\d+)\.)?([A-Za-z_][A-Za-z0-9_]*)\.uavcan$").unwrap();
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref PRIMITIVE: Regex = Regex::new(r"^(uint|int|float)(\d+)$").unwrap();
    static ref VOID: Regex = Regex::new(r"^void(\d+)$").unwrap();
    static ref ARRAY: Regex = Regex::new(r"^(.+?)\[(<=?)?(\d+)\]$").unwrap();
    static ref COMPOUND_NAME: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap();
}

/// Parses DSDL definition directories into the schema model. One
/// `.uavcan` file per type; the directory layout is the namespace.
pub struct DsdlParser;

impl SchemaParser for DsdlParser {
    fn parse(
        &self,
        source_dirs: &[PathBuf],
        search_dirs: &[PathBuf],
    ) -> Result<ParsedSet, DsdlcError> {
        let mut registry = TypeRegistry::new();
        let mut compiled = Vec::new();

        for dir in source_dirs {
            for ty in parse_namespace_dir(dir)? {
                if registry.insert(ty.clone()).is_some() {
                    return Err(DsdlcError::DuplicateType(ty.full_name));
                }
                compiled.push(ty);
            }
        }
        for dir in search_dirs {
            for ty in parse_namespace_dir(dir)? {
                // Source directories are usually searchable too; a name
                // already compiled is simply the same definition again.
                if !registry.contains(&ty.full_name) {
                    registry.insert(ty);
                }
            }
        }

        verify_references(&registry)?;
        Ok(ParsedSet { compiled, registry })
    }
}

/// Every compound reference must resolve to a known type.
fn verify_references(registry: &TypeRegistry) -> Result<(), DsdlcError> {
    fn referenced_name(ty: &FieldType) -> Option<&str> {
        match ty {
            FieldType::Compound { full_name } => Some(full_name),
            FieldType::Array { element, .. } => referenced_name(element),
            FieldType::Primitive { .. } | FieldType::Void { .. } => None,
        }
    }

    for ty in registry.iter() {
        for field in ty.all_fields() {
            if let Some(name) = referenced_name(&field.ty) {
                if !registry.contains(name) {
                    return Err(DsdlcError::SchemaParse {
                        file: ty.full_name.clone(),
                        msg: format!(
                            "the type {} is not defined for field {}",
                            quote(name),
                            quote(&field.name)
                        ),
                    });
                }
            }
        }
    }
    Ok(())
}

fn parse_namespace_dir(root: &Path) -> Result<Vec<CompoundType>, DsdlcError> {
    let root_component = root
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| IDENTIFIER.is_match(n))
        .ok_or_else(|| DsdlcError::SchemaParse {
            file: root.display().to_string(),
            msg: "not a namespace directory".to_string(),
        })?;

    let mut out = Vec::new();
    walk(root, root_component, &mut out)?;
    // Filesystem enumeration order is not portable; pin it down.
    out.sort_by(|a, b| a.full_name.cmp(&b.full_name));
    Ok(out)
}

fn walk(dir: &Path, namespace: &str, out: &mut Vec<CompoundType>) -> Result<(), DsdlcError> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            if let Some(segment) = path.file_name().and_then(|n| n.to_str()) {
                if IDENTIFIER.is_match(segment) {
                    walk(&path, &format!("{namespace}.{segment}"), out)?;
                }
            }
        } else if path.extension().map(|e| e == "uavcan").unwrap_or(false) {
            out.push(parse_file(&path, namespace)?);
        }
    }
    Ok(())
}

fn parse_file(path: &Path, namespace: &str) -> Result<CompoundType, DsdlcError> {
    let source = path.display().to_string();
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let caps = FILE_NAME
        .captures(file_name)
        .ok_or_else(|| DsdlcError::SchemaParse {
            file: source.clone(),
            msg: format!("invalid definition file name {}", quote(file_name)),
        })?;

    let default_dtid = match caps.get(1) {
        Some(m) => Some(m.as_str().parse::<u32>().map_err(|_| {
            DsdlcError::SchemaParse {
                file: source.clone(),
                msg: format!("invalid data type id {}", quote(m.as_str())),
            }
        })?),
        None => None,
    };
    let full_name = format!("{}.{}", namespace, &caps[2]);
    let text = fs::read_to_string(path)?;
    parse_definition(&full_name, default_dtid, &source, &text)
}

#[derive(Default)]
struct Section {
    fields: Vec<Field>,
    constants: Vec<Constant>,
    is_union: bool,
}

/// Parses one definition text. `source` only labels error messages, so
/// tests can feed strings directly.
pub fn parse_definition(
    full_name: &str,
    default_dtid: Option<u32>,
    source: &str,
    text: &str,
) -> Result<CompoundType, DsdlcError> {
    let namespace = full_name
        .rsplit_once('.')
        .map(|(ns, _)| ns)
        .ok_or_else(|| DsdlcError::MissingNamespace(full_name.to_string()))?;

    let err = |line: usize, msg: String| DsdlcError::SchemaParse {
        file: source.to_string(),
        msg: format!("line {line}: {msg}"),
    };

    let mut first = Section::default();
    let mut second: Option<Section> = None;

    for (index, raw) in text.lines().enumerate() {
        let lineno = index + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        if line == "---" {
            if second.is_some() {
                return Err(err(lineno, "more than one response section".to_string()));
            }
            second = Some(Section::default());
            continue;
        }

        let section = second.as_mut().unwrap_or(&mut first);
        if let Some(directive) = line.strip_prefix('@') {
            match directive.trim() {
                "union" => section.is_union = true,
                other => return Err(err(lineno, format!("unknown directive {}", quote(other)))),
            }
            continue;
        }

        parse_attribute(line, namespace, section).map_err(|msg| err(lineno, msg))?;
    }

    let mut ty = match second {
        None => CompoundType::message(full_name),
        Some(_) => CompoundType::service(full_name),
    };
    ty.default_dtid = default_dtid;
    match second {
        None => {
            ty.fields = first.fields;
            ty.constants = first.constants;
            ty.is_union = first.is_union;
        }
        Some(response) => {
            ty.request_fields = first.fields;
            ty.request_constants = first.constants;
            ty.request_union = first.is_union;
            ty.response_fields = response.fields;
            ty.response_constants = response.constants;
            ty.response_union = response.is_union;
        }
    }
    Ok(ty)
}

fn parse_attribute(line: &str, namespace: &str, section: &mut Section) -> Result<(), String> {
    let mut tokens: Vec<&str> = line.split_whitespace().collect();

    let cast_mode = match tokens.first() {
        Some(&"saturated") => {
            tokens.remove(0);
            Some(CastMode::Saturated)
        }
        Some(&"truncated") => {
            tokens.remove(0);
            Some(CastMode::Truncated)
        }
        _ => None,
    };

    let Some(&type_token) = tokens.first() else {
        return Err("missing type".to_string());
    };
    tokens.remove(0);
    let ty = parse_type_token(type_token, cast_mode, namespace)?;

    match tokens.as_slice() {
        // A bare void occupies bits without a name.
        [] => {
            if !matches!(ty, FieldType::Void { .. }) {
                return Err(format!("field of type {} needs a name", quote(type_token)));
            }
            section.fields.push(Field {
                name: String::new(),
                ty,
            });
            Ok(())
        }
        [name] => {
            if matches!(ty, FieldType::Void { .. }) {
                return Err(format!("void field cannot be named {}", quote(name)));
            }
            if !IDENTIFIER.is_match(name) {
                return Err(format!("invalid field name {}", quote(name)));
            }
            section.fields.push(Field {
                name: (*name).to_string(),
                ty,
            });
            Ok(())
        }
        [name, "=", value] => {
            if !matches!(ty, FieldType::Primitive { .. }) {
                return Err(format!(
                    "constant {} must have a primitive type",
                    quote(name)
                ));
            }
            if !IDENTIFIER.is_match(name) {
                return Err(format!("invalid constant name {}", quote(name)));
            }
            section.constants.push(Constant {
                name: (*name).to_string(),
                ty,
                value: (*value).to_string(),
            });
            Ok(())
        }
        _ => Err(format!("cannot parse attribute {}", quote(line))),
    }
}

fn parse_type_token(
    token: &str,
    cast_mode: Option<CastMode>,
    namespace: &str,
) -> Result<FieldType, String> {
    if let Some(caps) = ARRAY.captures(token) {
        let element = parse_scalar_token(&caps[1], cast_mode, namespace)?;
        if matches!(element, FieldType::Void { .. }) {
            return Err("void fields cannot be arrays".to_string());
        }
        let bound: u64 = caps[3]
            .parse()
            .map_err(|_| format!("invalid array size {}", quote(&caps[3])))?;
        let (mode, max_size) = match caps.get(2).map(|m| m.as_str()) {
            None => (ArrayMode::Static, bound),
            Some("<=") => (ArrayMode::Dynamic, bound),
            _ => (ArrayMode::Dynamic, bound.saturating_sub(1)),
        };
        if max_size == 0 {
            return Err(format!("array size of {} must be positive", quote(token)));
        }
        Ok(FieldType::Array {
            element: Box::new(element),
            mode,
            max_size,
        })
    } else {
        parse_scalar_token(token, cast_mode, namespace)
    }
}

fn parse_scalar_token(
    token: &str,
    cast_mode: Option<CastMode>,
    namespace: &str,
) -> Result<FieldType, String> {
    if token == "bool" {
        return Ok(FieldType::Primitive {
            kind: PrimitiveKind::Bool,
            bitlen: 1,
            cast_mode: cast_mode.unwrap_or(CastMode::Saturated),
        });
    }

    if let Some(caps) = VOID.captures(token) {
        if cast_mode.is_some() {
            return Err(format!("cast mode cannot be applied to {}", quote(token)));
        }
        let bitlen = parse_bitlen(&caps[1], token)?;
        return Ok(FieldType::Void { bitlen });
    }

    if let Some(caps) = PRIMITIVE.captures(token) {
        let bitlen = parse_bitlen(&caps[2], token)?;
        let kind = match &caps[1] {
            "uint" => PrimitiveKind::UnsignedInt,
            "int" => PrimitiveKind::SignedInt,
            _ => {
                if !matches!(bitlen, 16 | 32 | 64) {
                    return Err(format!("unsupported float width {}", quote(token)));
                }
                PrimitiveKind::Float
            }
        };
        return Ok(FieldType::Primitive {
            kind,
            bitlen,
            cast_mode: cast_mode.unwrap_or(CastMode::Saturated),
        });
    }

    if COMPOUND_NAME.is_match(token) {
        if cast_mode.is_some() {
            return Err(format!(
                "cast mode cannot be applied to compound type {}",
                quote(token)
            ));
        }
        let full_name = if token.contains('.') {
            token.to_string()
        } else {
            // Undotted references live in the namespace of the
            // referencing type.
            format!("{namespace}.{token}")
        };
        return Ok(FieldType::Compound { full_name });
    }

    Err(format!("unknown type {}", quote(token)))
}

fn parse_bitlen(digits: &str, token: &str) -> Result<u32, String> {
    let bitlen: u32 = digits
        .parse()
        .map_err(|_| format!("invalid bit length in {}", quote(token)))?;
    if !(1..=64).contains(&bitlen) {
        return Err(format!("bit length of {} must be within 1..64", quote(token)));
    }
    Ok(bitlen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsdlc_schema::CompoundKind;

    #[test]
    fn test_parse_message_definition() {
        let text = "
            # Abridged node status.
            uint32 uptime_sec
            uint2 health          # 0 = ok
            truncated uint16 vendor_specific_status_code

            uint2 HEALTH_OK = 0
        ";
        let ty =
            parse_definition("uavcan.protocol.NodeStatus", Some(341), "test", text).unwrap();
        assert_eq!(ty.kind, CompoundKind::Message);
        assert_eq!(ty.default_dtid, Some(341));
        assert_eq!(ty.fields.len(), 3);
        assert_eq!(ty.fields[0].name, "uptime_sec");
        assert_eq!(
            ty.fields[1].ty,
            FieldType::Primitive {
                kind: PrimitiveKind::UnsignedInt,
                bitlen: 2,
                cast_mode: CastMode::Saturated,
            }
        );
        assert_eq!(
            ty.fields[2].ty,
            FieldType::Primitive {
                kind: PrimitiveKind::UnsignedInt,
                bitlen: 16,
                cast_mode: CastMode::Truncated,
            }
        );
        assert_eq!(ty.constants.len(), 1);
        assert_eq!(ty.constants[0].name, "HEALTH_OK");
        assert_eq!(ty.constants[0].value, "0");
    }

    #[test]
    fn test_parse_service_definition() {
        let text = "
            uint7 node_id
            ---
            NodeStatus status
            uavcan.Timestamp stamp
        ";
        let ty = parse_definition("uavcan.protocol.GetNodeInfo", Some(1), "test", text).unwrap();
        assert_eq!(ty.kind, CompoundKind::Service);
        assert_eq!(ty.request_fields.len(), 1);
        assert_eq!(ty.response_fields.len(), 2);
        // Undotted reference picks up the referencing namespace.
        assert_eq!(
            ty.response_fields[0].ty,
            FieldType::Compound {
                full_name: "uavcan.protocol.NodeStatus".into()
            }
        );
        assert_eq!(
            ty.response_fields[1].ty,
            FieldType::Compound {
                full_name: "uavcan.Timestamp".into()
            }
        );
    }

    #[test]
    fn test_parse_union_directive() {
        let text = "
            @union
            uint8 a
            uint16 b
        ";
        let ty = parse_definition("ns.Pick", None, "test", text).unwrap();
        assert!(ty.is_union);
    }

    #[test]
    fn test_parse_array_suffixes() {
        let ty = parse_definition(
            "ns.Arrays",
            None,
            "test",
            "uint8[4] fixed\nuint8[<=100] capped\nuint8[<100] open\n",
        )
        .unwrap();
        assert_eq!(
            ty.fields[0].ty,
            FieldType::Array {
                element: Box::new(FieldType::Primitive {
                    kind: PrimitiveKind::UnsignedInt,
                    bitlen: 8,
                    cast_mode: CastMode::Saturated,
                }),
                mode: ArrayMode::Static,
                max_size: 4,
            }
        );
        match &ty.fields[1].ty {
            FieldType::Array { mode, max_size, .. } => {
                assert_eq!(*mode, ArrayMode::Dynamic);
                assert_eq!(*max_size, 100);
            }
            other => panic!("expected array, got {other:?}"),
        }
        match &ty.fields[2].ty {
            FieldType::Array { max_size, .. } => assert_eq!(*max_size, 99),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_void_fields() {
        let ty = parse_definition("ns.Padded", None, "test", "uint5 value\nvoid3\n").unwrap();
        assert_eq!(ty.fields[1].name, "");
        assert_eq!(ty.fields[1].ty, FieldType::Void { bitlen: 3 });

        let err = parse_definition("ns.Padded", None, "test", "void3 pad\n").unwrap_err();
        assert!(matches!(err, DsdlcError::SchemaParse { .. }));
    }

    #[test]
    fn test_parse_rejects_zero_sized_array() {
        let err = parse_definition("ns.Bad", None, "test", "uint8[<1] none\n").unwrap_err();
        match err {
            DsdlcError::SchemaParse { msg, .. } => assert!(msg.contains("line 1")),
            other => panic!("expected SchemaParse, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_directive() {
        let err = parse_definition("ns.Bad", None, "test", "@frozen\n").unwrap_err();
        assert!(matches!(err, DsdlcError::SchemaParse { .. }));
    }

    #[test]
    fn test_parse_rejects_cast_mode_on_compound() {
        let err =
            parse_definition("ns.Bad", None, "test", "saturated ns.Other field\n").unwrap_err();
        assert!(matches!(err, DsdlcError::SchemaParse { .. }));
    }

    #[test]
    fn test_parse_rejects_oversized_bitlen() {
        let err = parse_definition("ns.Bad", None, "test", "uint65 wide\n").unwrap_err();
        assert!(matches!(err, DsdlcError::SchemaParse { .. }));
    }

    #[test]
    fn test_filename_grammar() {
        let caps = FILE_NAME.captures("341.NodeStatus.uavcan").unwrap();
        assert_eq!(&caps[1], "341");
        assert_eq!(&caps[2], "NodeStatus");

        let caps = FILE_NAME.captures("Timestamp.uavcan").unwrap();
        assert!(caps.get(1).is_none());
        assert_eq!(&caps[2], "Timestamp");

        assert!(FILE_NAME.captures("NodeStatus.txt").is_none());
    }
}
