use std::collections::{BTreeMap, BTreeSet};

use dsdlc_schema::{CompoundType, FieldType};

use crate::error::DsdlcError;

/// Direct compound dependencies of one type, unwrapping array elements.
fn direct_dependencies(ty: &CompoundType) -> BTreeSet<String> {
    fn visit(ty: &FieldType, out: &mut BTreeSet<String>) {
        match ty {
            FieldType::Compound { full_name } => {
                out.insert(full_name.clone());
            }
            FieldType::Array { element, .. } => visit(element, out),
            FieldType::Primitive { .. } | FieldType::Void { .. } => {}
        }
    }

    let mut out = BTreeSet::new();
    for field in ty.all_fields() {
        visit(&field.ty, &mut out);
    }
    out
}

/// Orders `types` so every type appears after the compound types it
/// references. Kahn-style reduction: repeatedly take the type with no
/// unresolved dependencies and strike it from the remaining sets. Ties
/// are broken by lexicographic full-name order so the same input always
/// yields the same declaration order.
///
/// Dependencies on names outside `types` come from search directories
/// and impose no ordering constraint. A graph where no progress can be
/// made is cyclic; the error names the types still entangled and no
/// partial order is returned.
pub fn order(types: &[CompoundType]) -> Result<Vec<&CompoundType>, DsdlcError> {
    let by_name: BTreeMap<&str, &CompoundType> =
        types.iter().map(|t| (t.full_name.as_str(), t)).collect();
    if by_name.len() != types.len() {
        let mut seen = BTreeSet::new();
        for t in types {
            if !seen.insert(t.full_name.as_str()) {
                return Err(DsdlcError::DuplicateType(t.full_name.clone()));
            }
        }
    }

    let mut pending: BTreeMap<&str, BTreeSet<String>> = types
        .iter()
        .map(|t| {
            let deps = direct_dependencies(t)
                .into_iter()
                .filter(|dep| by_name.contains_key(dep.as_str()))
                .collect();
            (t.full_name.as_str(), deps)
        })
        .collect();

    let mut ordered = Vec::with_capacity(types.len());
    while !pending.is_empty() {
        let ready = pending
            .iter()
            .find(|(_, deps)| deps.is_empty())
            .map(|(name, _)| *name);
        let Some(name) = ready else {
            let members = pending.keys().map(|n| n.to_string()).collect();
            return Err(DsdlcError::CyclicDependency { members });
        };
        pending.remove(name);
        for deps in pending.values_mut() {
            deps.remove(name);
        }
        ordered.push(by_name[name]);
    }
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsdlc_schema::{ArrayMode, Field};

    fn compound_field(name: &str, target: &str) -> Field {
        Field {
            name: name.into(),
            ty: FieldType::Compound {
                full_name: target.into(),
            },
        }
    }

    fn message(full_name: &str, deps: &[&str]) -> CompoundType {
        let mut t = CompoundType::message(full_name);
        for (i, dep) in deps.iter().enumerate() {
            t.fields.push(compound_field(&format!("f{i}"), dep));
        }
        t
    }

    #[test]
    fn test_chain_orders_dependencies_first() {
        let types = vec![
            message("ns.C", &["ns.B"]),
            message("ns.A", &[]),
            message("ns.B", &["ns.A"]),
        ];
        let order: Vec<&str> = order(&types)
            .unwrap()
            .iter()
            .map(|t| t.full_name.as_str())
            .collect();
        assert_eq!(order, vec!["ns.A", "ns.B", "ns.C"]);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let types = vec![message("ns.A", &["ns.B"]), message("ns.B", &["ns.A"])];
        let err = order(&types).unwrap_err();
        match err {
            DsdlcError::CyclicDependency { members } => {
                assert_eq!(members, vec!["ns.A".to_string(), "ns.B".to_string()]);
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let types = vec![message("ns.A", &["ns.A"])];
        assert!(matches!(
            order(&types),
            Err(DsdlcError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_ties_break_lexicographically() {
        // No edges at all: the order must still be fully determined.
        let types = vec![
            message("ns.Zeta", &[]),
            message("ns.Alpha", &[]),
            message("ns.Mid", &[]),
        ];
        let order: Vec<&str> = order(&types)
            .unwrap()
            .iter()
            .map(|t| t.full_name.as_str())
            .collect();
        assert_eq!(order, vec!["ns.Alpha", "ns.Mid", "ns.Zeta"]);
    }

    #[test]
    fn test_dependency_through_array_element() {
        let mut outer = CompoundType::message("ns.Outer");
        outer.fields.push(Field {
            name: "items".into(),
            ty: FieldType::Array {
                element: Box::new(FieldType::Compound {
                    full_name: "ns.Item".into(),
                }),
                mode: ArrayMode::Dynamic,
                max_size: 16,
            },
        });
        let types = vec![outer, message("ns.Item", &[])];
        let order: Vec<&str> = order(&types)
            .unwrap()
            .iter()
            .map(|t| t.full_name.as_str())
            .collect();
        assert_eq!(order, vec!["ns.Item", "ns.Outer"]);
    }

    #[test]
    fn test_unknown_dependency_does_not_constrain() {
        // ns.Ext lives in a search directory and is not compiled here.
        let types = vec![message("ns.Solo", &["ns.Ext"])];
        let order = order(&types).unwrap();
        assert_eq!(order.len(), 1);
    }

    #[test]
    fn test_service_dependencies_span_both_sections() {
        let mut svc = CompoundType::service("ns.Fetch");
        svc.request_fields.push(compound_field("req", "ns.Req"));
        svc.response_fields.push(compound_field("res", "ns.Res"));
        let types = vec![svc, message("ns.Res", &[]), message("ns.Req", &[])];
        let order: Vec<&str> = order(&types)
            .unwrap()
            .iter()
            .map(|t| t.full_name.as_str())
            .collect();
        assert_eq!(order, vec!["ns.Req", "ns.Res", "ns.Fetch"]);
    }
}
