//! Serialization tests for the graph model

use serde_json::{json, Value};

fn node_fixture() -> Value {
    json!({
        "id": "UN",
        "label": "United Nations",
        "kind": "Organization",
        "properties": {
            "founded": 1945,
            "headquarters": "New York",
            "charter_signed": true
        }
    })
}

fn link_fixture() -> Value {
    json!({
        "source": "UN",
        "target": "Organization",
        "predicate": "rdf:type",
        "label": "type"
    })
}

#[cfg(test)]
mod serialization_tests {
    use super::*;
    use crate::graph::{Link, Node, NodeId, NodeKind, PropertyValue};

    #[test]
    fn node_id_serializes_as_string() {
        let id = NodeId::from_string("person:ada");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"person:ada\"");
    }

    #[test]
    fn node_deserializes_from_fixture() {
        let node: Node = serde_json::from_value(node_fixture()).unwrap();
        assert_eq!(node.id.as_str(), "UN");
        assert_eq!(node.kind, NodeKind::Organization);
        assert_eq!(node.properties["founded"], PropertyValue::Int(1945));
        assert_eq!(
            node.properties["headquarters"],
            PropertyValue::String("New York".to_string())
        );
        assert_eq!(node.properties["charter_signed"], PropertyValue::Bool(true));
    }

    #[test]
    fn node_without_properties_omits_field() {
        let node = Node::new("ada", "Ada", NodeKind::Person);
        let json = serde_json::to_value(&node).unwrap();
        assert!(json.get("properties").is_none());
        assert_eq!(json["kind"], "Person");
    }

    #[test]
    fn link_ontology_flag_defaults_to_false() {
        let link: Link = serde_json::from_value(link_fixture()).unwrap();
        assert_eq!(link.predicate, "rdf:type");
        assert!(!link.is_ontology_link);
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("person".parse::<NodeKind>().unwrap(), NodeKind::Person);
        assert_eq!(" ORGANISATION ".parse::<NodeKind>().unwrap(), NodeKind::Organization);
        assert!("spaceship".parse::<NodeKind>().is_err());
    }

    #[test]
    fn float_property_survives_round_trip() {
        let node = Node::new("x", "X", NodeKind::Artifact)
            .with_property("weight", PropertyValue::Float(2.5));
        let json = serde_json::to_string(&node).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }
}
