//! End-to-end compilation tests: CNL text in, operation streams out.

use cnl_core::{
    node_order_from_cnl,
    operation::{AttributePayload, Operation},
    parse_cnl,
    schema::{AttributeTypeDef, NodeTypeDef, RelationTypeDef, SchemaRegistry},
    validate_operations,
};
use test_log::test;

/// A registry with the chemistry vocabulary most tests lean on.
fn chemistry_registry() -> SchemaRegistry {
    let registry = SchemaRegistry::create();
    registry.register_node_type(NodeTypeDef {
        name: "Element".to_string(),
        description: None,
        parents: vec![],
    });
    registry.register_node_type(NodeTypeDef {
        name: "Molecule".to_string(),
        description: None,
        parents: vec![],
    });
    registry.register_relation_type(RelationTypeDef {
        name: "made_of".to_string(),
        inverse_name: Some("makes_up".to_string()),
        aliases: vec!["made of".to_string()],
        domain: vec!["Molecule".to_string()],
        range: vec!["Element".to_string()],
    });
    registry.register_attribute_type(AttributeTypeDef {
        name: "number of protons".to_string(),
        data_type: Some("integer".to_string()),
        unit: None,
        scope: vec![],
    });
    registry.register_attribute_type(AttributeTypeDef {
        name: "charge".to_string(),
        data_type: None,
        unit: None,
        scope: vec![],
    });
    registry
}

#[test]
fn test_basic_node_and_attribute() {
    let registry = chemistry_registry();
    let result = parse_cnl("# Hydrogen [Element]\nhas number of protons: 1;\n", &registry);

    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.operations.len(), 2);
    match &result.operations[0] {
        Operation::AddNode(p) => {
            assert_eq!(p.id, "hydrogen");
            assert_eq!(p.role, "Element");
            assert!(p.explicit_role);
        }
        other => panic!("expected addNode first, got {other:?}"),
    }
    match &result.operations[1] {
        Operation::AddAttribute(p) => {
            assert_eq!(p.source, "hydrogen");
            assert_eq!(p.name, "number of protons");
            assert_eq!(p.value, "1");
            assert_eq!(p.morph, "basic");
        }
        other => panic!("expected addAttribute second, got {other:?}"),
    }
}

#[test]
fn test_morph_scoped_attribute() {
    let registry = chemistry_registry();
    let result = parse_cnl(
        "# Hydrogen [Element]\n## Hydrogen ion\nhas charge: 1;\n",
        &registry,
    );

    let morph = result
        .operations
        .iter()
        .find_map(|op| match op {
            Operation::AddMorph(p) => Some(p),
            _ => None,
        })
        .expect("morph declared");
    assert_eq!(morph.node_id, "hydrogen");
    assert_eq!(morph.name, "Hydrogen ion");

    let attribute = result
        .operations
        .iter()
        .find_map(|op| match op {
            Operation::AddAttribute(p) => Some(p),
            _ => None,
        })
        .expect("attribute declared");
    assert_eq!(attribute.source, "hydrogen");
    assert_eq!(attribute.morph, "Hydrogen ion");
}

#[test]
fn test_implicit_relation_target() {
    let registry = chemistry_registry();
    let result = parse_cnl("# Node A\n<knows> Node B;\n", &registry);

    let implicit = result
        .operations
        .iter()
        .find_map(|op| match op {
            Operation::AddNode(p) if p.id == "node_b" => Some(p),
            _ => None,
        })
        .expect("implicit target node emitted");
    assert_eq!(implicit.role, "individual");
    assert!(!implicit.explicit_role);

    let relation = result
        .operations
        .iter()
        .find_map(|op| match op {
            Operation::AddRelation(p) => Some(p),
            _ => None,
        })
        .expect("relation emitted");
    assert_eq!(relation.source, "node_a");
    assert_eq!(relation.target, "node_b");
    assert_eq!(relation.name, "knows");
}

#[test]
fn test_relation_forces_source_and_target_roles() {
    let registry = chemistry_registry();
    let result = parse_cnl("# Water\n<made of> Hydrogen;\n", &registry);

    tracing::info!("operations: {:#?}", result.operations);
    let water = result
        .operations
        .iter()
        .find_map(|op| match op {
            Operation::AddNode(p) if p.id == "water" => Some(p),
            _ => None,
        })
        .expect("source node");
    // Domain of made_of retypes the undeclared source.
    assert_eq!(water.role, "Molecule");

    let hydrogen = result
        .operations
        .iter()
        .find_map(|op| match op {
            Operation::AddNode(p) if p.id == "hydrogen" => Some(p),
            _ => None,
        })
        .expect("implicit target node");
    assert_eq!(hydrogen.role, "Element");
    assert!(result.errors.is_empty(), "{:?}", result.errors);
}

#[test]
fn test_is_a_alias_infers_class_target() {
    let registry = chemistry_registry();
    let result = parse_cnl("# Water\n<is a> Liquid;\n", &registry);

    let liquid = result
        .operations
        .iter()
        .find_map(|op| match op {
            Operation::AddNode(p) if p.id == "liquid" => Some(p),
            _ => None,
        })
        .expect("implicit class node");
    assert_eq!(liquid.role, "class");
    assert!(result
        .operations
        .iter()
        .any(|op| matches!(op, Operation::AddRelation(p) if p.name == "is_a")));
}

#[test]
fn test_malformed_lines_skip_with_diagnostics() {
    let registry = chemistry_registry();
    let text = "# Hydrogen [Element]\nthis line is not a statement\nhas charge: 1;\n";
    let result = parse_cnl(text, &registry);

    // Compilation is total: the good statement still lands.
    assert!(result
        .operations
        .iter()
        .any(|op| matches!(op, Operation::AddAttribute(p) if p.name == "charge")));
    let skipped: Vec<_> = result.skipped_lines().collect();
    assert_eq!(skipped.len(), 1);
}

#[test]
fn test_descriptions_become_updates() {
    let registry = chemistry_registry();
    let text = "# Hydrogen [Element]\n```description\nThe lightest element.\n```\n\
        ```graph-description\nA tiny chemistry graph.\n```\n";
    let result = parse_cnl(text, &registry);

    assert!(result.operations.iter().any(|op| matches!(
        op,
        Operation::UpdateNode(p)
            if p.id == "hydrogen" && p.description.as_deref() == Some("The lightest element.")
    )));
    // Graph description always trails the stream.
    match result.operations.last() {
        Some(Operation::UpdateGraphDescription(p)) => {
            assert_eq!(p.description, "A tiny chemistry graph.");
        }
        other => panic!("expected trailing updateGraphDescription, got {other:?}"),
    }
}

#[test]
fn test_deterministic_output() {
    let registry = chemistry_registry();
    let text = "# Water\n<made of> Hydrogen;\n<made of> Oxygen;\nhas charge: 0;\n\
        # Hydrogen [Element]\nhas number of protons: 1;\n";
    let first = parse_cnl(text, &registry);
    let second = parse_cnl(text, &registry);
    assert_eq!(first.operations, second.operations);
}

#[test]
fn test_id_stability_with_adjective() {
    let registry = chemistry_registry();
    let plain = parse_cnl("# Water [Molecule]\n", &registry);
    assert!(matches!(&plain.operations[0], Operation::AddNode(p) if p.id == "water"));

    let heavy = parse_cnl("# **Heavy** Water [Molecule]\n", &registry);
    match &heavy.operations[0] {
        Operation::AddNode(p) => {
            assert_eq!(p.id, "heavy_water");
            assert_eq!(p.base_name, "Water");
            assert_eq!(p.adjective.as_deref(), Some("Heavy"));
        }
        other => panic!("expected addNode, got {other:?}"),
    }
}

#[test]
fn test_unknown_relation_is_advisory() {
    let registry = chemistry_registry();
    let result = parse_cnl("# Water\n<dissolves> Salt;\n", &registry);

    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("dissolves"));
    assert!(result
        .operations
        .iter()
        .any(|op| matches!(op, Operation::AddRelation(p) if p.name == "dissolves")));
}

#[test]
fn test_mindmap_mode_builds_hierarchy() {
    let registry = chemistry_registry();
    let text = "<! MindMap Mode: made_of>\n# Water\n## Hydrogen\n## Oxygen\nhas charge: 0;\n";
    let result = parse_cnl(text, &registry);

    let relations: Vec<_> = result
        .operations
        .iter()
        .filter_map(|op| match op {
            Operation::AddRelation(p) => Some((p.source.as_str(), p.target.as_str())),
            _ => None,
        })
        .collect();
    assert_eq!(relations, vec![("water", "hydrogen"), ("water", "oxygen")]);
    // Mindmap mode carries no attribute statements.
    assert!(!result
        .operations
        .iter()
        .any(|op| matches!(op, Operation::AddAttribute(_))));
    assert!(result.skipped_lines().count() > 0);
}

#[test]
fn test_node_order_from_cnl() {
    let text = "# Water\n## Frozen\n# Hydrogen\n# Oxygen\n# Water\n";
    assert_eq!(
        node_order_from_cnl(text),
        vec!["water", "hydrogen", "oxygen"]
    );
}

#[test]
fn test_strict_validation_flags_untyped_nodes() {
    let registry = chemistry_registry();
    let result = parse_cnl("# Mystery\n# Hydrogen [Element]\n", &registry);
    let strict = validate_operations(&result.operations, &registry, true);
    assert_eq!(strict.len(), 1);
    assert!(strict[0].message.contains("mystery"));
}

#[test]
fn test_operations_serialize_with_camel_case_tags() {
    let registry = chemistry_registry();
    let result = parse_cnl("# Hydrogen [Element]\nhas charge: 1;\n", &registry);
    let json = result.to_json().expect("serializable");
    assert!(json.contains("\"addNode\""));
    assert!(json.contains("\"addAttribute\""));

    let attribute: AttributePayload = serde_json::from_value(
        serde_json::to_value(&result.operations[1]).expect("value")["payload"].clone(),
    )
    .expect("payload round-trips");
    assert_eq!(attribute.name, "charge");
}
