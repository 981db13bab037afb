//! Graph store backed by a Gremlin server.
//!
//! Every mutation is a parameterized script: ids, labels, property keys and
//! values all travel as bindings. List properties use `list` cardinality so
//! that `has('list', 'a')` matches any element; scalars use `single`.
//!
//! Multi-properties alone lose list shape: a one-element list reads back as
//! a scalar and an empty list not at all. The upsert therefore records list
//! keys in the reserved `list_properties` property (and keys stored as JSON
//! text in `json_properties`), and `fetch_vertex` uses them to restore it.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;

use crate::client::{decode_items, graphson, BindingAllocator, Bindings, GremlinExecutor};
use crate::schema::labels::{JSON_PROPERTIES, LIST_PROPERTIES};
use crate::schema::{LinkKind, PropertyBag, PropertyValue};

use super::{Edge, GraphStore, StoreError, Vertex};

pub struct GremlinGraphStore<E> {
    executor: E,
}

impl<E: GremlinExecutor> GremlinGraphStore<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    async fn run(&self, script: Script) -> Result<Vec<Value>, StoreError> {
        log::debug!("Graph mutation: {}", script.text);
        let payload = self.executor.execute(&script.text, &script.bindings).await?;
        Ok(decode_items(&payload)?)
    }

    async fn count(&self, script: Script) -> Result<u64, StoreError> {
        let items = self.run(script).await?;
        graphson::as_count(&items)
            .ok_or_else(|| StoreError::MalformedResult(format!("expected a count, got {:?}", items)))
    }
}

/// A script and its bindings.
struct Script {
    text: String,
    bindings: Bindings,
}

impl Script {
    fn new(text: String, allocator: BindingAllocator) -> Self {
        Self {
            text,
            bindings: allocator.into_bindings(),
        }
    }
}

/// Binding value for one list element or scalar. Objects are stored as
/// JSON text, graph backends do not agree on map-valued properties.
fn element_binding(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Object(_) => Value::String(value.to_json().to_string()),
        other => other.to_json(),
    }
}

/// Lists holding objects or nested lists store every element as JSON text.
fn needs_json(items: &[PropertyValue]) -> bool {
    items
        .iter()
        .any(|item| matches!(item, PropertyValue::List(_) | PropertyValue::Object(_)))
}

/// Update the shape markers of the key bound as `key`.
fn shape_marker(key: &str, list: bool, json: bool) -> String {
    let mut text = format!(
        ".sideEffect(properties('{}', '{}').hasValue({}).drop())",
        LIST_PROPERTIES, JSON_PROPERTIES, key
    );
    if list {
        text.push_str(&format!(".property(list, '{}', {})", LIST_PROPERTIES, key));
    }
    if json {
        text.push_str(&format!(".property(list, '{}', {})", JSON_PROPERTIES, key));
    }
    text
}

/// Create or merge the vertex, then report its label. Properties are only
/// written when the stored label is the requested one.
fn upsert_script(vertex: &Vertex) -> Script {
    let mut b = BindingAllocator::new();
    let id = b.bind(vertex.id.as_str());
    let label = b.bind(vertex.label.as_str());

    let mut writes = String::from("identity()");
    for (key, value) in &vertex.properties {
        let key_name = b.bind(key.as_str());
        match value {
            PropertyValue::List(items) => {
                let json = needs_json(items);
                writes.push_str(&format!(".sideEffect(properties({}).drop())", key_name));
                for item in items {
                    let element = if json {
                        Value::String(item.to_json().to_string())
                    } else {
                        element_binding(item)
                    };
                    let value_name = b.bind(element);
                    writes.push_str(&format!(".property(list, {}, {})", key_name, value_name));
                }
                writes.push_str(&shape_marker(&key_name, true, json));
            }
            scalar => {
                let value_name = b.bind(element_binding(scalar));
                writes.push_str(&format!(".property(single, {}, {})", key_name, value_name));
                writes.push_str(&shape_marker(&key_name, false, false));
            }
        }
    }

    let text = format!(
        "g.V({id}).fold().coalesce(unfold(), addV({label}).property(id, {id}))\
         .choose(hasLabel({label}), {writes}, identity()).label()",
        id = id,
        label = label,
        writes = writes
    );
    Script::new(text, b)
}

fn exists_script(id: &str) -> Script {
    let mut b = BindingAllocator::new();
    let id = b.bind(id);
    Script::new(format!("g.V({}).count()", id), b)
}

fn fetch_vertex_script(id: &str) -> Script {
    let mut b = BindingAllocator::new();
    let id = b.bind(id);
    Script::new(
        format!(
            "g.V({}).project('label', 'properties').by(label).by(properties().group().by(key).by(value().fold()))",
            id
        ),
        b,
    )
}

fn create_edge_script(edge: &Edge) -> Script {
    let mut b = BindingAllocator::new();
    let source = b.bind(edge.source.as_str());
    let target = b.bind(edge.target.as_str());
    let kind = b.bind(edge.kind.as_str());
    Script::new(
        format!(
            "g.V({}).as('s').V({}).addE({}).from('s').count()",
            source, target, kind
        ),
        b,
    )
}

fn outgoing_edges_script(source: &str) -> Script {
    let mut b = BindingAllocator::new();
    let source = b.bind(source);
    Script::new(
        format!(
            "g.V({}).outE().project('kind', 'target').by(label).by(inV().id())",
            source
        ),
        b,
    )
}

fn count_vertices_script(ids: &BTreeSet<String>) -> Script {
    let mut b = BindingAllocator::new();
    let ids_name = b.bind(ids.iter().cloned().collect::<Vec<_>>());
    Script::new(format!("g.V().hasId(within({})).count()", ids_name), b)
}

/// Drop stale `kind` edges, then add the missing ones in the same script.
/// An empty target set only drops.
fn reconcile_script(source: &str, kind: LinkKind, targets: &BTreeSet<String>) -> Script {
    let mut b = BindingAllocator::new();
    let s = b.bind(source);
    let k = b.bind(kind.as_str());

    if targets.is_empty() {
        return Script::new(
            format!("g.V({s}).outE({k}).drop().iterate(); g.V({s}).count()", s = s, k = k),
            b,
        );
    }

    let t = b.bind(targets.iter().cloned().collect::<Vec<_>>());
    // drop stale edges, collapse duplicates, add the absent ones
    let text = format!(
        "g.V({s}).outE({k}).where(inV().not(hasId(within({t})))).drop().iterate(); \
         g.V({s}).outE({k}).group().by(inV().id()).unfold().select(values)\
         .range(local, 1, -1).unfold().drop().iterate(); \
         g.V({s}).as('s').V().hasId(within({t}))\
         .not(__.inE({k}).where(outV().hasId({s}))).addE({k}).from('s').count()",
        s = s,
        k = k,
        t = t
    );
    Script::new(text, b)
}

fn drop_vertex_script(id: &str) -> Script {
    let mut b = BindingAllocator::new();
    let id = b.bind(id);
    Script::new(format!("g.V({}).drop().iterate(); g.V({}).count()", id, id), b)
}

fn marked_keys(properties: &serde_json::Map<String, Value>, marker: &str) -> BTreeSet<String> {
    properties
        .get(marker)
        .and_then(Value::as_array)
        .map(|keys| keys.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

fn decode_json_elements(values: &Value) -> Result<Value, String> {
    let Some(items) = values.as_array() else {
        return Ok(values.clone());
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(text) => {
                serde_json::from_str(text).map_err(|e| format!("bad JSON element: {}", e))
            }
            other => Ok(other.clone()),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

/// Turn the `properties` map of `fetch_vertex_script` back into a bag, with
/// list shapes restored from the markers. The markers themselves are dropped.
fn properties_from_result(properties: &serde_json::Map<String, Value>) -> Result<PropertyBag, StoreError> {
    let lists = marked_keys(properties, LIST_PROPERTIES);
    let json = marked_keys(properties, JSON_PROPERTIES);

    let mut bag = PropertyBag::new();
    for (key, values) in properties {
        if key == LIST_PROPERTIES || key == JSON_PROPERTIES {
            continue;
        }
        let malformed = |reason: String| StoreError::MalformedResult(format!("property {}: {}", key, reason));
        let values = if json.contains(key) {
            decode_json_elements(values).map_err(malformed)?
        } else {
            values.clone()
        };
        let decoded = PropertyValue::from_json(&values).map_err(malformed)?;
        let value = match decoded {
            Some(PropertyValue::List(mut items)) if items.len() == 1 && !lists.contains(key) => items.remove(0),
            Some(other) => other,
            None => continue,
        };
        bag.insert(key.clone(), value);
    }
    // empty lists have no property values left on the vertex
    for key in lists {
        bag.entry(key).or_insert_with(|| PropertyValue::List(Vec::new()));
    }
    Ok(bag)
}

#[async_trait]
impl<E: GremlinExecutor> GraphStore for GremlinGraphStore<E> {
    async fn upsert_vertex(&self, vertex: &Vertex) -> Result<(), StoreError> {
        let items = self.run(upsert_script(vertex)).await?;
        match items.first().and_then(Value::as_str) {
            Some(label) if label == vertex.label => Ok(()),
            Some(existing) => Err(StoreError::LabelConflict {
                id: vertex.id.clone(),
                existing: existing.to_string(),
                requested: vertex.label.clone(),
            }),
            None => Err(StoreError::MalformedResult(format!(
                "expected the vertex label, got {:?}",
                items
            ))),
        }
    }

    async fn vertex_exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.count(exists_script(id)).await? > 0)
    }

    async fn fetch_vertex(&self, id: &str) -> Result<Option<Vertex>, StoreError> {
        let items = self.run(fetch_vertex_script(id)).await?;
        let Some(item) = items.into_iter().next() else {
            return Ok(None);
        };
        let label = item
            .get("label")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::MalformedResult(format!("vertex without label: {}", item)))?;
        let properties = match item.get("properties") {
            Some(Value::Object(map)) => properties_from_result(map)?,
            _ => PropertyBag::new(),
        };
        Ok(Some(Vertex {
            id: id.to_string(),
            label: label.to_string(),
            properties,
        }))
    }

    async fn create_edge(&self, edge: &Edge) -> Result<(), StoreError> {
        match self.count(create_edge_script(edge)).await? {
            0 => Err(StoreError::MissingEndpoint {
                from: edge.source.clone(),
                to: edge.target.clone(),
            }),
            _ => Ok(()),
        }
    }

    async fn outgoing_edges(&self, source: &str) -> Result<Vec<Edge>, StoreError> {
        let items = self.run(outgoing_edges_script(source)).await?;
        items
            .iter()
            .map(|item| {
                let kind = item
                    .get("kind")
                    .and_then(Value::as_str)
                    .and_then(|k| k.parse::<LinkKind>().ok());
                let target = item.get("target").map(|t| match t {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                });
                match (kind, target) {
                    (Some(kind), Some(target)) => Ok(Edge {
                        source: source.to_string(),
                        target,
                        kind,
                    }),
                    _ => Err(StoreError::MalformedResult(format!("unexpected edge row {}", item))),
                }
            })
            .collect()
    }

    async fn reconcile_edges(
        &self,
        source: &str,
        kind: LinkKind,
        targets: &BTreeSet<String>,
    ) -> Result<(), StoreError> {
        // check endpoints first so a failure leaves the edge set untouched
        let mut endpoints = targets.clone();
        endpoints.insert(source.to_string());
        let found = self.count(count_vertices_script(&endpoints)).await?;
        if found < endpoints.len() as u64 {
            return Err(StoreError::MissingEndpoint {
                from: source.to_string(),
                to: targets.iter().cloned().collect::<Vec<_>>().join(","),
            });
        }
        self.count(reconcile_script(source, kind, targets)).await.map(|_| ())
    }

    async fn drop_vertex(&self, id: &str) -> Result<(), StoreError> {
        self.count(drop_vertex_script(id)).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ExecutionError, MockGremlinExecutor};
    use bytes::Bytes;
    use serde_json::json;

    fn vertex() -> Vertex {
        let mut properties = PropertyBag::new();
        properties.insert("display_name".to_string(), "port".into());
        properties.insert(
            "list".to_string(),
            PropertyValue::List(vec!["a".into(), "b".into()]),
        );
        Vertex {
            id: "vmi-1".to_string(),
            label: "virtual_machine_interface".to_string(),
            properties,
        }
    }

    #[test]
    fn test_upsert_script_binds_everything() {
        let script = upsert_script(&vertex());
        assert!(!script.text.contains("vmi-1"));
        assert!(!script.text.contains("virtual_machine_interface"));
        assert!(!script.text.contains("display_name"));
        assert!(script.text.starts_with(
            "g.V(_b0).fold().coalesce(unfold(), addV(_b1).property(id, _b0)).choose(hasLabel(_b1), identity()"
        ));
        assert!(script.text.ends_with(", identity()).label()"));
        assert!(script.text.contains(".property(single, _b2, _b3)"));
        assert!(script.text.contains(".sideEffect(properties(_b4).drop()).property(list, _b4, _b5).property(list, _b4, _b6)"));
        assert_eq!(script.bindings["_b0"], json!("vmi-1"));
        assert_eq!(script.bindings["_b6"], json!("b"));
    }

    #[test]
    fn test_object_list_elements_are_json_text() {
        let mut object = std::collections::BTreeMap::new();
        object.insert("ip".to_string(), PropertyValue::from("10.0.0.1"));
        assert_eq!(
            element_binding(&PropertyValue::Object(object)),
            json!(r#"{"ip":"10.0.0.1"}"#)
        );
    }

    #[test]
    fn test_upsert_script_marks_list_shapes() {
        let script = upsert_script(&vertex());
        assert!(script.text.contains(
            ".property(single, _b2, _b3).sideEffect(properties('list_properties', 'json_properties').hasValue(_b2).drop())"
        ));
        assert!(script.text.contains(".property(list, _b4, _b6).sideEffect(properties('list_properties', 'json_properties').hasValue(_b4).drop()).property(list, 'list_properties', _b4)"));
        assert!(!script.text.contains("'json_properties', _b"));
    }

    #[tokio::test]
    async fn test_upsert_with_other_label_conflicts() {
        let mut executor = MockGremlinExecutor::new();
        executor
            .expect_execute()
            .withf(|query, _| query.contains(".choose(hasLabel(_b1)"))
            .times(1)
            .returning(|_, _| Ok(Bytes::from_static(br#"["virtual_network"]"#)));

        let store = GremlinGraphStore::new(executor);
        assert_eq!(
            store.upsert_vertex(&vertex()).await,
            Err(StoreError::LabelConflict {
                id: "vmi-1".to_string(),
                existing: "virtual_network".to_string(),
                requested: "virtual_machine_interface".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_upsert_with_same_label() {
        let mut executor = MockGremlinExecutor::new();
        executor
            .expect_execute()
            .returning(|_, _| Ok(Bytes::from_static(br#"["virtual_machine_interface"]"#)));

        let store = GremlinGraphStore::new(executor);
        assert_eq!(store.upsert_vertex(&vertex()).await, Ok(()));
    }

    #[test]
    fn test_reconcile_without_targets_only_drops() {
        let script = reconcile_script("vmi-1", LinkKind::Ref, &BTreeSet::new());
        assert!(!script.text.contains("addE"));
        assert!(script.text.contains(".outE(_b1).drop()"));
    }

    #[test]
    fn test_properties_from_result() {
        let map = json!({"name": ["port"], "list": ["a", "b"], "n": [3]});
        let bag = properties_from_result(map.as_object().unwrap()).unwrap();
        assert_eq!(bag["name"], PropertyValue::from("port"));
        assert_eq!(bag["n"], PropertyValue::Int(3));
        assert_eq!(bag["list"], PropertyValue::List(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn test_properties_from_result_restores_list_shapes() {
        let map = json!({
            "names": ["a"],
            "fixed_ips": [r#"{"ip_address":"10.0.0.1"}"#, r#""10.0.0.2""#],
            "list_properties": ["names", "fixed_ips", "tags"],
            "json_properties": ["fixed_ips"]
        });
        let bag = properties_from_result(map.as_object().unwrap()).unwrap();

        let mut ip = std::collections::BTreeMap::new();
        ip.insert("ip_address".to_string(), PropertyValue::from("10.0.0.1"));
        assert_eq!(bag["names"], PropertyValue::List(vec!["a".into()]));
        assert_eq!(bag["tags"], PropertyValue::List(Vec::new()));
        assert_eq!(
            bag["fixed_ips"],
            PropertyValue::List(vec![PropertyValue::Object(ip), "10.0.0.2".into()])
        );
        assert!(!bag.contains_key("list_properties"));
        assert!(!bag.contains_key("json_properties"));
    }

    #[tokio::test]
    async fn test_list_shapes_survive_import_and_derive() {
        use crate::import::Importer;
        use crate::record::ResourceRecord;

        let mut ip = std::collections::BTreeMap::new();
        ip.insert("ip_address".to_string(), PropertyValue::from("10.0.0.1"));
        let record = ResourceRecord::new("vmi-1", "virtual_machine_interface")
            .with_property("display_name", "port".into())
            .with_property("names", PropertyValue::List(vec!["a".into()]))
            .with_property("tags", PropertyValue::List(Vec::new()))
            .with_property("fixed_ips", PropertyValue::List(vec![PropertyValue::Object(ip)]));

        let mut executor = MockGremlinExecutor::new();
        executor
            .expect_execute()
            .withf(|query, bindings| {
                query.contains(".choose(hasLabel(")
                    && query.contains(".property(list, 'json_properties', ")
                    && bindings
                        .values()
                        .any(|v| v == &json!(r#"{"ip_address":"10.0.0.1"}"#))
            })
            .times(1)
            .returning(|_, _| Ok(Bytes::from_static(br#"["virtual_machine_interface"]"#)));
        executor
            .expect_execute()
            .withf(|query, _| query.contains(".project('label', 'properties')"))
            .times(1)
            .returning(|_, _| {
                Ok(Bytes::from(
                    json!([{
                        "label": "virtual_machine_interface",
                        "properties": {
                            "display_name": ["port"],
                            "names": ["a"],
                            "fixed_ips": [r#"{"ip_address":"10.0.0.1"}"#],
                            "updated": [1700000000],
                            "list_properties": ["fixed_ips", "names", "tags"],
                            "json_properties": ["fixed_ips"]
                        }
                    }])
                    .to_string(),
                ))
            });
        executor
            .expect_execute()
            .withf(|query, _| query.contains(".outE().project("))
            .times(1)
            .returning(|_, _| Ok(Bytes::new()));

        let importer = Importer::new(GremlinGraphStore::new(executor));
        importer.create(&record).await.unwrap();
        let derived = importer.derive_record("vmi-1").await.unwrap().unwrap();
        assert!(derived.equivalent_to(&record), "{:?}", derived);
    }

    #[tokio::test]
    async fn test_exists_reads_count() {
        let mut executor = MockGremlinExecutor::new();
        executor
            .expect_execute()
            .withf(|query, bindings| query == "g.V(_b0).count()" && bindings["_b0"] == json!("vmi-1"))
            .times(1)
            .returning(|_, _| Ok(Bytes::from_static(b"[1]")));

        let store = GremlinGraphStore::new(executor);
        assert!(store.vertex_exists("vmi-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_edge_with_missing_endpoint() {
        let mut executor = MockGremlinExecutor::new();
        executor
            .expect_execute()
            .returning(|_, _| Ok(Bytes::from_static(b"[0]")));

        let store = GremlinGraphStore::new(executor);
        let edge = Edge {
            source: "a".to_string(),
            target: "b".to_string(),
            kind: LinkKind::Parent,
        };
        assert_eq!(
            store.create_edge(&edge).await,
            Err(StoreError::MissingEndpoint {
                from: "a".to_string(),
                to: "b".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_reconcile_checks_endpoints_first() {
        let mut executor = MockGremlinExecutor::new();
        executor
            .expect_execute()
            .withf(|query, _| query.starts_with("g.V().hasId(within("))
            .times(1)
            .returning(|_, _| Ok(Bytes::from_static(b"[1]")));

        let store = GremlinGraphStore::new(executor);
        let targets: BTreeSet<String> = ["vn-1".to_string()].into_iter().collect();
        assert!(matches!(
            store.reconcile_edges("vmi-1", LinkKind::Ref, &targets).await,
            Err(StoreError::MissingEndpoint { .. })
        ));
    }

    #[tokio::test]
    async fn test_execution_error_is_propagated() {
        let mut executor = MockGremlinExecutor::new();
        executor
            .expect_execute()
            .returning(|_, _| Err(ExecutionError::Closed));

        let store = GremlinGraphStore::new(executor);
        assert_eq!(
            store.drop_vertex("x").await,
            Err(StoreError::Execution(ExecutionError::Closed))
        );
    }

    #[tokio::test]
    async fn test_fetch_missing_vertex() {
        let mut executor = MockGremlinExecutor::new();
        executor
            .expect_execute()
            .returning(|_, _| Ok(Bytes::new()));

        let store = GremlinGraphStore::new(executor);
        assert_eq!(store.fetch_vertex("x").await, Ok(None));
    }
}
