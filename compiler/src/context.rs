use serde::Serialize;
use serde_json::Value;

use crate::assembler::AssembledType;
use crate::error::DsdlcError;

/// Everything a template render gets to see, passed by value. Engines
/// never reach back into compiler state.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext<'a> {
    #[serde(rename = "type")]
    pub ty: &'a AssembledType,
    pub header_only: bool,
}

impl TemplateContext<'_> {
    /// Untyped view for engines that substitute from key/value data.
    pub fn to_value(&self) -> Result<Value, DsdlcError> {
        serde_json::to_value(self).map_err(|e| DsdlcError::Template {
            type_name: self.ty.full_name.clone(),
            msg: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;
    use dsdlc_schema::CompoundType;

    #[test]
    fn test_context_serializes_to_json() {
        let assembled = assemble(&CompoundType::message("ns.Empty")).unwrap();
        let context = TemplateContext {
            ty: &assembled,
            header_only: true,
        };
        let value = context.to_value().unwrap();
        assert_eq!(value["header_only"], true);
        assert_eq!(value["type"]["c_name"], "ns_Empty");
    }
}
