//! Request-scoped side-channel serializer.

use std::collections::{HashMap, HashSet};

use edge_core::{ClientModule, IdAllocator, MountedNode, NodeId, RenderError};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::row::{escape_text_value, lazy_ref, module_ref, symbol_ref, FlightRow, RowTag};

/// Symbol marking a suspense boundary in the model tree.
pub const SUSPENSE_SYMBOL: &str = "react.suspense";

/// One side-channel unit.
///
/// `seq` is strictly increasing within a request and is the only valid
/// replay order. `target` is the boundary (or root) the record was emitted
/// for; shared rows carry the target that first needed them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightPushRecord {
    pub target: NodeId,
    pub seq: u64,
    pub row: FlightRow,
}

impl FlightPushRecord {
    /// Encoded row.
    pub fn encode(&self) -> String {
        self.row.encode()
    }
}

/// Converts evaluated subtrees into push records.
///
/// Symbols and client modules are written once per request as their own
/// rows and referenced by id afterwards. Every record that references a
/// shared row is emitted after it. A pending boundary inside a subtree is
/// written as a lazy reference; its own row follows when it resolves.
#[derive(Debug, Default)]
pub struct FlightSerializer {
    next_seq: u64,
    symbols: HashMap<&'static str, NodeId>,
    modules: HashMap<ClientModule, NodeId>,
    serialized: HashSet<NodeId>,
}

impl FlightSerializer {
    /// Create a serializer for one request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records for the initial tree: shared rows first, the root row last.
    pub fn serialize_root(
        &mut self,
        root: &MountedNode,
        ids: &mut IdAllocator,
    ) -> Result<Vec<FlightPushRecord>, RenderError> {
        self.serialize_model(root.id(), Some(root), ids)
    }

    /// Records for a settled boundary: newly needed shared rows first, the
    /// boundary's own row last. `None` content serializes as `null`.
    pub fn serialize_resolved(
        &mut self,
        boundary: NodeId,
        content: Option<&MountedNode>,
        ids: &mut IdAllocator,
    ) -> Result<Vec<FlightPushRecord>, RenderError> {
        self.serialize_model(boundary, content, ids)
    }

    /// Error row for a boundary whose failure was not contained.
    pub fn serialize_error(&mut self, boundary: NodeId, message: &str) -> FlightPushRecord {
        self.record(
            boundary,
            FlightRow::new(RowTag::Error, boundary, json!({ "message": message })),
        )
    }

    /// Number of records emitted so far.
    pub fn records_emitted(&self) -> u64 {
        self.next_seq
    }

    fn serialize_model(
        &mut self,
        target: NodeId,
        node: Option<&MountedNode>,
        ids: &mut IdAllocator,
    ) -> Result<Vec<FlightPushRecord>, RenderError> {
        if !self.serialized.insert(target) {
            return Err(RenderError::InvalidBoundaryState {
                boundary: target,
                reason: "already serialized".to_string(),
            });
        }

        let mut records = Vec::new();
        let value = match node {
            Some(node) => self.to_value(node, target, ids, &mut records),
            None => Value::Null,
        };
        let row = FlightRow::new(RowTag::Model, target, value);
        records.push(self.record(target, row));
        Ok(records)
    }

    fn to_value(
        &mut self,
        node: &MountedNode,
        target: NodeId,
        ids: &mut IdAllocator,
        deps: &mut Vec<FlightPushRecord>,
    ) -> Value {
        match node {
            MountedNode::Text { text, .. } => Value::String(escape_text_value(text)),
            MountedNode::Fragment { children, .. } => Value::Array(
                children
                    .iter()
                    .map(|c| self.to_value(c, target, ids, deps))
                    .collect(),
            ),
            MountedNode::Element {
                tag,
                attrs,
                children,
                ..
            } => {
                let mut props = Map::new();
                for (name, value) in attrs {
                    props.insert(name.clone(), Value::String(value.clone()));
                }
                if let Some(children) = self.children_value(children, target, ids, deps) {
                    props.insert("children".to_string(), children);
                }
                element(Value::String(tag.clone()), props)
            }
            MountedNode::Boundary { id, fallback } => {
                let symbol = self.symbol(SUSPENSE_SYMBOL, target, ids, deps);
                let mut props = Map::new();
                props.insert(
                    "fallback".to_string(),
                    self.to_value(fallback, target, ids, deps),
                );
                props.insert("children".to_string(), Value::String(lazy_ref(*id)));
                element(Value::String(symbol_ref(symbol)), props)
            }
            MountedNode::Client {
                module,
                props,
                children,
                ..
            } => {
                let module_id = self.module(module, target, ids, deps);
                let mut props = props.clone();
                if let Some(children) = self.children_value(children, target, ids, deps) {
                    props.insert("children".to_string(), children);
                }
                element(Value::String(module_ref(module_id)), props)
            }
        }
    }

    fn children_value(
        &mut self,
        children: &[MountedNode],
        target: NodeId,
        ids: &mut IdAllocator,
        deps: &mut Vec<FlightPushRecord>,
    ) -> Option<Value> {
        match children {
            [] => None,
            [only] => Some(self.to_value(only, target, ids, deps)),
            many => Some(Value::Array(
                many.iter()
                    .map(|c| self.to_value(c, target, ids, deps))
                    .collect(),
            )),
        }
    }

    fn symbol(
        &mut self,
        name: &'static str,
        target: NodeId,
        ids: &mut IdAllocator,
        deps: &mut Vec<FlightPushRecord>,
    ) -> NodeId {
        if let Some(id) = self.symbols.get(name) {
            return *id;
        }
        let id = ids.next_id();
        self.symbols.insert(name, id);
        let row = FlightRow::new(RowTag::Symbol, id, Value::String(name.to_string()));
        deps.push(self.record(target, row));
        id
    }

    fn module(
        &mut self,
        module: &ClientModule,
        target: NodeId,
        ids: &mut IdAllocator,
        deps: &mut Vec<FlightPushRecord>,
    ) -> NodeId {
        if let Some(id) = self.modules.get(module) {
            return *id;
        }
        let id = ids.next_id();
        self.modules.insert(module.clone(), id);
        let payload = json!({ "id": module.path, "name": module.export });
        deps.push(self.record(target, FlightRow::new(RowTag::Module, id, payload)));
        id
    }

    fn record(&mut self, target: NodeId, row: FlightRow) -> FlightPushRecord {
        let seq = self.next_seq;
        self.next_seq += 1;
        FlightPushRecord { target, seq, row }
    }
}

fn element(kind: Value, props: Map<String, Value>) -> Value {
    Value::Array(vec![
        Value::String("$".to_string()),
        kind,
        Value::Null,
        Value::Object(props),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(id: u32, s: &str) -> MountedNode {
        MountedNode::Text {
            id: NodeId(id),
            text: s.to_string(),
        }
    }

    fn boundary(id: u32, fallback: MountedNode) -> MountedNode {
        MountedNode::Boundary {
            id: NodeId(id),
            fallback: Box::new(fallback),
        }
    }

    fn client(id: u32, path: &str) -> MountedNode {
        MountedNode::Client {
            id: NodeId(id),
            module: ClientModule::new(path),
            props: Map::new(),
            children: vec![text(id + 1, "click")],
        }
    }

    /// Allocator positioned past the ids used by the fixtures.
    fn ids_from(n: u32) -> IdAllocator {
        let mut ids = IdAllocator::new();
        for _ in 0..n {
            ids.next_id();
        }
        ids
    }

    fn encoded(records: &[FlightPushRecord]) -> Vec<String> {
        records.iter().map(FlightPushRecord::encode).collect()
    }

    // === Root Tests ===

    #[test]
    fn test_root_with_pending_boundary() {
        let root = MountedNode::Element {
            id: NodeId(0),
            tag: "main".into(),
            attrs: vec![("class".into(), "page".into())],
            children: vec![boundary(1, text(2, "loading"))],
        };
        let mut ids = ids_from(3);
        let mut flight = FlightSerializer::new();

        let records = flight.serialize_root(&root, &mut ids).unwrap();
        assert_eq!(
            encoded(&records),
            vec![
                r#"S3:"react.suspense""#.to_string(),
                r#"J0:["$","main",null,{"children":["$","$S3",null,{"children":"$L1","fallback":"loading"}],"class":"page"}]"#.to_string(),
            ]
        );
        assert_eq!(records[0].seq, 0);
        assert_eq!(records[1].seq, 1);
        assert!(records.iter().all(|r| r.target == NodeId(0)));
    }

    #[test]
    fn test_fragment_and_text_escaping() {
        let root = MountedNode::Fragment {
            id: NodeId(0),
            children: vec![text(1, "$9"), text(2, "ok")],
        };
        let mut flight = FlightSerializer::new();
        let records = flight.serialize_root(&root, &mut ids_from(3)).unwrap();
        assert_eq!(encoded(&records), vec![r#"J0:["$$9","ok"]"#.to_string()]);
    }

    // === Resolution Tests ===

    #[test]
    fn test_resolved_row_uses_boundary_id() {
        let mut flight = FlightSerializer::new();
        let mut ids = ids_from(5);
        let records = flight
            .serialize_resolved(NodeId(1), Some(&text(4, "done")), &mut ids)
            .unwrap();
        assert_eq!(encoded(&records), vec![r#"J1:"done""#.to_string()]);
        assert_eq!(records[0].target, NodeId(1));
    }

    #[test]
    fn test_skipped_content_is_null() {
        let mut flight = FlightSerializer::new();
        let records = flight
            .serialize_resolved(NodeId(2), None, &mut ids_from(3))
            .unwrap();
        assert_eq!(encoded(&records), vec!["J2:null".to_string()]);
    }

    #[test]
    fn test_serializing_twice_fails() {
        let mut flight = FlightSerializer::new();
        let mut ids = ids_from(3);
        flight.serialize_resolved(NodeId(1), None, &mut ids).unwrap();
        let err = flight
            .serialize_resolved(NodeId(1), None, &mut ids)
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidBoundaryState { .. }));
    }

    #[test]
    fn test_error_row() {
        let mut flight = FlightSerializer::new();
        let record = flight.serialize_error(NodeId(7), "boom");
        assert_eq!(record.encode(), r#"E7:{"message":"boom"}"#);
    }

    // === Ordering Tests ===

    #[test]
    fn test_dependency_rows_precede_dependents() {
        let mut flight = FlightSerializer::new();
        let mut ids = ids_from(20);

        // Boundary 5 resolves first and introduces the module row.
        let first = flight
            .serialize_resolved(NodeId(5), Some(&client(10, "./Link.client")), &mut ids)
            .unwrap();
        // Boundary 3 resolves later and reuses it.
        let second = flight
            .serialize_resolved(NodeId(3), Some(&client(12, "./Link.client")), &mut ids)
            .unwrap();

        assert_eq!(
            encoded(&first),
            vec![
                r#"M20:{"id":"./Link.client","name":"default"}"#.to_string(),
                r#"J5:["$","$@20",null,{"children":"click"}]"#.to_string(),
            ]
        );
        assert_eq!(
            encoded(&second),
            vec![r#"J3:["$","$@20",null,{"children":"click"}]"#.to_string()]
        );

        let module_seq = first[0].seq;
        assert!(first[1].seq > module_seq);
        assert!(second[0].seq > module_seq);
    }

    #[test]
    fn test_sequence_strictly_increases() {
        let mut flight = FlightSerializer::new();
        let mut ids = ids_from(10);
        let mut all = Vec::new();
        let root = MountedNode::Fragment {
            id: NodeId(0),
            children: vec![boundary(1, text(2, "loading"))],
        };
        all.extend(flight.serialize_root(&root, &mut ids).unwrap());
        all.extend(
            flight
                .serialize_resolved(NodeId(1), Some(&boundary(3, text(4, "inner"))), &mut ids)
                .unwrap(),
        );
        all.push(flight.serialize_error(NodeId(3), "late"));

        let seqs: Vec<u64> = all.iter().map(|r| r.seq).collect();
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(flight.records_emitted(), all.len() as u64);
        // The suspense symbol is written once.
        let symbols = all.iter().filter(|r| r.row.tag == RowTag::Symbol).count();
        assert_eq!(symbols, 1);
    }
}
