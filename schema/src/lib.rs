//! Data model for parsed DSDL type graphs.
//!
//! A compile run produces this graph once and treats it as immutable
//! input; everything derived from it (target representations, include
//! lists, declaration order) lives in separate view objects owned by the
//! compiler.
//!
//! ```
//! use dsdlc_schema::*;
//!
//! let mut status = CompoundType::message("uavcan.protocol.NodeStatus");
//! status.fields.push(Field {
//!     name: "uptime_sec".to_owned(),
//!     ty: FieldType::Primitive {
//!         kind: PrimitiveKind::UnsignedInt,
//!         bitlen: 32,
//!         cast_mode: CastMode::Saturated,
//!     },
//! });
//!
//! assert_eq!(status.short_name(), "NodeStatus");
//! assert_eq!(status.namespace(), Some("uavcan.protocol"));
//! ```

pub mod registry;
pub mod types;

pub use registry::*;
pub use types::*;
