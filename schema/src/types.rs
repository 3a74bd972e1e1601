use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrimitiveKind {
    Bool,
    UnsignedInt,
    SignedInt,
    Float,
}

/// Policy for values that do not fit the declared bit length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CastMode {
    Saturated,
    Truncated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArrayMode {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompoundKind {
    Message,
    Service,
}

/// The type of one field or constant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FieldType {
    Primitive {
        kind: PrimitiveKind,
        bitlen: u32,
        cast_mode: CastMode,
    },
    Array {
        element: Box<FieldType>,
        mode: ArrayMode,
        max_size: u64,
    },
    /// Reference to another compound type by full dotted name.
    Compound { full_name: String },
    /// Nameless padding field occupying `bitlen` bits on the wire.
    Void { bitlen: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    /// Empty for void fields.
    pub name: String,
    pub ty: FieldType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constant {
    pub name: String,
    /// Always a `FieldType::Primitive`.
    pub ty: FieldType,
    /// Literal text as written in the definition file.
    pub value: String,
}

/// One schema-defined message or service type.
///
/// Messages use `fields`/`constants`/`is_union`; services use the
/// request/response lists instead and leave the message lists empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompoundType {
    /// Full dotted name, unique within a compile run.
    pub full_name: String,
    pub kind: CompoundKind,
    pub default_dtid: Option<u32>,

    pub fields: Vec<Field>,
    pub constants: Vec<Constant>,
    pub is_union: bool,

    pub request_fields: Vec<Field>,
    pub request_constants: Vec<Constant>,
    pub request_union: bool,

    pub response_fields: Vec<Field>,
    pub response_constants: Vec<Constant>,
    pub response_union: bool,
}

impl CompoundType {
    pub fn message(full_name: impl Into<String>) -> Self {
        CompoundType {
            full_name: full_name.into(),
            kind: CompoundKind::Message,
            default_dtid: None,
            fields: Vec::new(),
            constants: Vec::new(),
            is_union: false,
            request_fields: Vec::new(),
            request_constants: Vec::new(),
            request_union: false,
            response_fields: Vec::new(),
            response_constants: Vec::new(),
            response_union: false,
        }
    }

    pub fn service(full_name: impl Into<String>) -> Self {
        CompoundType {
            kind: CompoundKind::Service,
            ..CompoundType::message(full_name)
        }
    }

    /// Last component of the full dotted name.
    pub fn short_name(&self) -> &str {
        self.full_name.rsplit('.').next().unwrap_or(&self.full_name)
    }

    /// Everything before the last dot, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.full_name.rsplit_once('.').map(|(ns, _)| ns)
    }

    pub fn namespace_components(&self) -> Vec<&str> {
        self.namespace()
            .map(|ns| ns.split('.').collect())
            .unwrap_or_default()
    }

    /// Fields across every section: message fields for messages, request
    /// followed by response for services.
    pub fn all_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields
            .iter()
            .chain(self.request_fields.iter())
            .chain(self.response_fields.iter())
    }

    pub fn all_constants(&self) -> impl Iterator<Item = &Constant> {
        self.constants
            .iter()
            .chain(self.request_constants.iter())
            .chain(self.response_constants.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_helpers() {
        let t = CompoundType::message("uavcan.protocol.NodeStatus");
        assert_eq!(t.short_name(), "NodeStatus");
        assert_eq!(t.namespace(), Some("uavcan.protocol"));
        assert_eq!(t.namespace_components(), vec!["uavcan", "protocol"]);
    }

    #[test]
    fn test_all_fields_spans_service_sections() {
        let mut t = CompoundType::service("uavcan.protocol.GetNodeInfo");
        t.request_fields.push(Field {
            name: "node_id".into(),
            ty: FieldType::Primitive {
                kind: PrimitiveKind::UnsignedInt,
                bitlen: 7,
                cast_mode: CastMode::Saturated,
            },
        });
        t.response_fields.push(Field {
            name: "status".into(),
            ty: FieldType::Compound {
                full_name: "uavcan.protocol.NodeStatus".into(),
            },
        });

        let names: Vec<&str> = t.all_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["node_id", "status"]);
    }
}
