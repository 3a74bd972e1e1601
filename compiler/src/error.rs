use thiserror::Error;

#[derive(Debug, Error)]
pub enum DsdlcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Schema parse error in {file}: {msg}")]
    SchemaParse { file: String, msg: String },

    #[error("No type definitions were found")]
    NoDefinitions,

    #[error("The type {0} is defined twice")]
    DuplicateType(String),

    #[error("The type {0} is not inside a namespace")]
    MissingNamespace(String),

    #[error("Cyclic dependency between types: {}", .members.join(", "))]
    CyclicDependency { members: Vec<String> },

    #[error("Unsupported type kind: {0}")]
    UnsupportedTypeKind(String),

    #[error("Constant {name} has a malformed {expected} literal {value}")]
    ConstantLiteral {
        name: String,
        expected: &'static str,
        value: String,
    },

    #[error("Template rendering failed for {type_name}: {msg}")]
    Template { type_name: String, msg: String },
}
