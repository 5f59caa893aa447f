//! JSON-LD projection of the canonical graph
//!
//! One object per node: `@id`, `@type` (the node kind), `name` (the label),
//! node properties as literals, and one property per outgoing predicate
//! whose value is the target id. Parallel links sharing a predicate from
//! one source collapse to the last target; the projection is lossy.
//!
//! `@id`, `@type` and `name` always come from the node itself. A property
//! named like a JSON-LD keyword or an outgoing predicate is left out.

use super::store::EntityStore;
use serde_json::{json, Map, Value};

const NAME_KEY: &str = "name";

/// Build the JSON-LD document for a store.
pub fn to_json_ld(store: &EntityStore) -> Value {
    let graph: Vec<Value> = store
        .nodes()
        .iter()
        .map(|node| {
            let mut object = Map::new();

            for (key, value) in &node.properties {
                if key.starts_with('@') || key == NAME_KEY {
                    continue;
                }
                if let Ok(value) = serde_json::to_value(value) {
                    object.insert(key.clone(), value);
                }
            }

            for link in store.outgoing(&node.id) {
                object.insert(
                    link.predicate.clone(),
                    Value::String(link.target.to_string()),
                );
            }

            object.insert("@id".to_string(), Value::String(node.id.to_string()));
            object.insert("@type".to_string(), Value::String(node.kind.to_string()));
            object.insert(NAME_KEY.to_string(), Value::String(node.label.clone()));

            Value::Object(object)
        })
        .collect();

    json!({
        "@context": {
            "rdf": "http://www.w3.org/1999/02/22-rdf-syntax-ns#",
            "rdfs": "http://www.w3.org/2000/01/rdf-schema#",
            "schema": "http://schema.org/",
            "name": "schema:name"
        },
        "@graph": graph
    })
}

/// Pretty-printed JSON-LD text.
pub fn to_json_ld_string(store: &EntityStore) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&to_json_ld(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Link, Node, NodeKind, PropertyValue};

    fn find<'a>(doc: &'a Value, id: &str) -> &'a Value {
        doc["@graph"]
            .as_array()
            .unwrap()
            .iter()
            .find(|o| o["@id"] == id)
            .unwrap()
    }

    #[test]
    fn node_object_carries_id_type_name_and_links() {
        let mut store = EntityStore::seeded();
        store.merge(
            vec![
                Node::new("UN", "United Nations", NodeKind::Organization)
                    .with_property("founded", PropertyValue::Int(1945)),
                Node::new("NY", "New York", NodeKind::Location),
            ],
            vec![Link::new("UN", "NY", "schema:location")],
        );

        let doc = to_json_ld(&store);
        let un = find(&doc, "UN");
        assert_eq!(un["@type"], "Organization");
        assert_eq!(un["name"], "United Nations");
        assert_eq!(un["founded"], 1945);
        assert_eq!(un["schema:location"], "NY");
        assert_eq!(un["rdf:type"], "Organization");
    }

    #[test]
    fn properties_cannot_override_identity_or_links() {
        let mut store = EntityStore::seeded();
        store.merge(
            vec![
                Node::new("UN", "United Nations", NodeKind::Organization)
                    .with_property("@id", PropertyValue::String("hijacked".into()))
                    .with_property("@type", PropertyValue::String("Thing".into()))
                    .with_property("name", PropertyValue::String("UNO".into()))
                    .with_property("schema:location", PropertyValue::String("Geneva".into()))
                    .with_property("acronym", PropertyValue::String("UN".into())),
                Node::new("NY", "New York", NodeKind::Location),
            ],
            vec![Link::new("UN", "NY", "schema:location")],
        );

        let doc = to_json_ld(&store);
        let graph = doc["@graph"].as_array().unwrap();
        assert!(graph.iter().all(|o| o["@id"] != "hijacked"));

        let un = find(&doc, "UN");
        assert_eq!(un["@type"], "Organization");
        assert_eq!(un["name"], "United Nations");
        assert_eq!(un["schema:location"], "NY");
        assert_eq!(un["acronym"], "UN");
    }

    #[test]
    fn parallel_links_collapse_to_one_property() {
        let mut store = EntityStore::seeded();
        store.merge(
            vec![
                Node::new("ada", "Ada", NodeKind::Person),
                Node::new("a", "A", NodeKind::Organization),
                Node::new("b", "B", NodeKind::Organization),
            ],
            vec![
                Link::new("ada", "a", "org:memberOf"),
                Link::new("ada", "b", "org:memberOf"),
            ],
        );

        let doc = to_json_ld(&store);
        let ada = find(&doc, "ada");
        assert_eq!(ada["org:memberOf"], "b");
        assert_eq!(store.outgoing(&"ada".into()).count(), 3);
    }

    #[test]
    fn graph_lists_every_node_in_insertion_order() {
        let store = EntityStore::seeded();
        let doc = to_json_ld(&store);
        let ids: Vec<_> = doc["@graph"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["@id"].as_str().unwrap().to_string())
            .collect();
        let expected: Vec<_> = store.nodes().iter().map(|n| n.id.to_string()).collect();
        assert_eq!(ids, expected);
        assert!(doc["@context"]["rdfs"].is_string());
    }
}
