//! Typed graph model: nodes, edges, attribute maps, and mutation API (§4.1).

use indexmap::{IndexMap, IndexSet};

use crate::error::{CoreError, CoreResult};

/// Handler kinds recognised by the validator and engine (§4.3).
pub const KNOWN_HANDLER_KINDS: &[&str] = &[
    "start",
    "exit",
    "codergen",
    "wait.human",
    "conditional",
    "parallel",
    "parallel.fan_in",
    "tool",
    "stack.manager_loop",
];

pub const KNOWN_SHAPES: &[&str] = &[
    "Mdiamond",
    "Msquare",
    "box",
    "diamond",
    "hexagon",
    "parallelogram",
    "component",
    "ellipse",
    "circle",
    "doublecircle",
    "plaintext",
    "record",
    "oval",
];

pub const KNOWN_FIDELITIES: &[&str] = &[
    "compact",
    "standard",
    "detailed",
    "comprehensive",
    "full",
    "truncate",
    "summary:low",
    "summary:medium",
    "summary:high",
];

/// A node's attribute map. Reads of absent keys are nil-safe (empty string).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attrs(IndexMap<String, String>);

impl Attrs {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn get(&self, key: &str) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn get_opt(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str).filter(|s| !s.is_empty())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn merge(&mut self, other: impl IntoIterator<Item = (String, String)>) {
        for (k, v) in other {
            self.0.insert(k, v);
        }
    }
}

impl FromIterator<(String, String)> for Attrs {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A graph node: an id plus its attribute map (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub attrs: Attrs,
}

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attrs: Attrs::new(),
        }
    }

    /// The handler kind this node resolves to (§4.3): explicit `type`, else
    /// inferred from `shape` for start/exit sentinels, else a bare codergen
    /// box, else empty (unknown).
    pub fn handler_kind(&self) -> String {
        let explicit = self.attrs.get("type");
        if !explicit.is_empty() {
            return explicit.to_string();
        }
        match self.attrs.get("shape") {
            "Mdiamond" => "start".to_string(),
            "Msquare" => "exit".to_string(),
            "box" => "codergen".to_string(),
            _ => String::new(),
        }
    }

    pub fn is_start(&self) -> bool {
        self.attrs.get("shape") == "Mdiamond" || self.attrs.get("type") == "start"
    }

    pub fn is_exit(&self) -> bool {
        self.attrs.get("shape") == "Msquare" || self.attrs.get("type") == "exit"
    }

    /// A codergen node is `type="codergen"`, or `shape="box"` with an empty
    /// `type` (§4.3).
    pub fn is_codergen(&self) -> bool {
        self.attrs.get("type") == "codergen"
            || (self.attrs.get("shape") == "box" && self.attrs.get("type").is_empty())
    }
}

/// A graph edge: endpoints, attrs, and a stable id (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub id: String,
    pub from: String,
    pub to: String,
    pub attrs: Attrs,
}

impl Edge {
    pub fn label(&self) -> &str {
        self.attrs.get("label")
    }

    pub fn condition(&self) -> &str {
        self.attrs.get("condition")
    }

    pub fn weight(&self) -> Option<u32> {
        self.attrs.get_opt("weight").and_then(|w| w.parse().ok())
    }
}

/// Named DAG: graph-level attrs, ordered edges, node-id → node map (§3).
#[derive(Debug, Clone)]
pub struct Graph {
    pub name: String,
    pub graph_attrs: Attrs,
    nodes: IndexMap<String, Node>,
    edges: Vec<Edge>,
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph_attrs: Attrs::new(),
            nodes: IndexMap::new(),
            edges: Vec::new(),
        }
    }

    pub fn add_node(&mut self, node: Node) -> CoreResult<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(CoreError::Duplicate(node.id));
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Removes a node, cascading removal of every incident edge.
    pub fn remove_node(&mut self, id: &str) -> CoreResult<Node> {
        let node = self
            .nodes
            .shift_remove(id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        self.edges.retain(|e| e.from != id && e.to != id);
        Ok(node)
    }

    pub fn add_edge(&mut self, mut edge: Edge) -> CoreResult<()> {
        if !self.nodes.contains_key(&edge.from) {
            return Err(CoreError::UnknownEndpoint(edge.from));
        }
        if !self.nodes.contains_key(&edge.to) {
            return Err(CoreError::UnknownEndpoint(edge.to));
        }
        if edge.id.is_empty() {
            edge.id = self.next_edge_id(&edge.from, &edge.to);
        }
        self.edges.push(edge);
        Ok(())
    }

    pub fn remove_edge(&mut self, edge_id: &str) -> CoreResult<Edge> {
        let pos = self
            .edges
            .iter()
            .position(|e| e.id == edge_id)
            .ok_or_else(|| CoreError::NotFound(edge_id.to_string()))?;
        Ok(self.edges.remove(pos))
    }

    pub fn update_node_attrs(
        &mut self,
        id: &str,
        updates: impl IntoIterator<Item = (String, String)>,
    ) -> CoreResult<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        node.attrs.merge(updates);
        Ok(())
    }

    pub fn update_edge_attrs(
        &mut self,
        edge_id: &str,
        updates: impl IntoIterator<Item = (String, String)>,
    ) -> CoreResult<()> {
        let edge = self
            .edges
            .iter_mut()
            .find(|e| e.id == edge_id)
            .ok_or_else(|| CoreError::NotFound(edge_id.to_string()))?;
        edge.attrs.merge(updates);
        Ok(())
    }

    pub fn update_graph_attrs(&mut self, updates: impl IntoIterator<Item = (String, String)>) {
        self.graph_attrs.merge(updates);
    }

    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn find_start_node(&self) -> Option<&Node> {
        self.nodes.values().find(|n| n.is_start())
    }

    pub fn find_exit_node(&self) -> Option<&Node> {
        self.nodes.values().find(|n| n.is_exit())
    }

    pub fn exit_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| n.is_exit())
    }

    /// Deterministic order: insertion order of first occurrence.
    pub fn node_ids(&self) -> impl Iterator<Item = &String> {
        self.nodes.keys()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn outgoing_edges(&self, id: &str) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.from == id).collect()
    }

    pub fn incoming_edges(&self, id: &str) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.to == id).collect()
    }

    fn next_edge_id(&self, from: &str, to: &str) -> String {
        let base = format!("{from}->{to}");
        let existing = self.edges.iter().filter(|e| e.from == from && e.to == to).count();
        if existing == 0 {
            base
        } else {
            format!("{base}#{existing}")
        }
    }

    /// Reassigns every edge id deterministically as `"from->to"` plus a
    /// disambiguating ordinal when the pair repeats, in edge-list order.
    pub fn assign_edge_ids(&mut self) {
        let mut seen: IndexMap<(String, String), usize> = IndexMap::new();
        for edge in &mut self.edges {
            let key = (edge.from.clone(), edge.to.clone());
            let count = seen.entry(key.clone()).or_insert(0);
            edge.id = if *count == 0 {
                format!("{}->{}", key.0, key.1)
            } else {
                format!("{}->{}#{}", key.0, key.1, count)
            };
            *count += 1;
        }
    }

    /// Every node reachable from `start_id` via a forward BFS over edges.
    pub fn reachable_from(&self, start_id: &str) -> IndexSet<String> {
        let mut seen = IndexSet::new();
        let mut queue = std::collections::VecDeque::new();
        if self.nodes.contains_key(start_id) {
            seen.insert(start_id.to_string());
            queue.push_back(start_id.to_string());
        }
        while let Some(current) = queue.pop_front() {
            for edge in self.outgoing_edges(&current) {
                if seen.insert(edge.to.clone()) {
                    queue.push_back(edge.to.clone());
                }
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_graph() -> Graph {
        let mut g = Graph::new("g");
        let mut s = Node::new("s");
        s.attrs.set("shape", "Mdiamond");
        let mut w = Node::new("w");
        w.attrs.set("shape", "box");
        w.attrs.set("prompt", "do");
        let mut e = Node::new("e");
        e.attrs.set("shape", "Msquare");
        g.add_node(s).unwrap();
        g.add_node(w).unwrap();
        g.add_node(e).unwrap();
        g.add_edge(Edge {
            id: String::new(),
            from: "s".into(),
            to: "w".into(),
            attrs: Attrs::new(),
        })
        .unwrap();
        g.add_edge(Edge {
            id: String::new(),
            from: "w".into(),
            to: "e".into(),
            attrs: Attrs::new(),
        })
        .unwrap();
        g
    }

    #[test]
    fn finds_start_and_exit() {
        let g = simple_graph();
        assert_eq!(g.find_start_node().unwrap().id, "s");
        assert_eq!(g.find_exit_node().unwrap().id, "e");
    }

    #[test]
    fn duplicate_node_rejected() {
        let mut g = simple_graph();
        assert!(matches!(g.add_node(Node::new("s")), Err(CoreError::Duplicate(_))));
    }

    #[test]
    fn unknown_endpoint_rejected() {
        let mut g = simple_graph();
        let err = g.add_edge(Edge {
            id: String::new(),
            from: "s".into(),
            to: "ghost".into(),
            attrs: Attrs::new(),
        });
        assert!(matches!(err, Err(CoreError::UnknownEndpoint(_))));
    }

    #[test]
    fn remove_node_cascades_edges() {
        let mut g = simple_graph();
        g.remove_node("w").unwrap();
        assert!(g.outgoing_edges("s").is_empty());
        assert!(g.incoming_edges("e").is_empty());
    }

    #[test]
    fn edge_ids_disambiguate_repeated_pairs() {
        let mut g = Graph::new("g");
        g.add_node(Node::new("a")).unwrap();
        g.add_node(Node::new("b")).unwrap();
        g.add_edge(Edge { id: String::new(), from: "a".into(), to: "b".into(), attrs: Attrs::new() })
            .unwrap();
        g.add_edge(Edge { id: String::new(), from: "a".into(), to: "b".into(), attrs: Attrs::new() })
            .unwrap();
        g.assign_edge_ids();
        let ids: Vec<_> = g.edges().iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, vec!["a->b".to_string(), "a->b#1".to_string()]);
    }

    #[test]
    fn reachability_bfs() {
        let mut g = simple_graph();
        g.add_node(Node::new("island")).unwrap();
        let reached = g.reachable_from("s");
        assert!(reached.contains("w"));
        assert!(reached.contains("e"));
        assert!(!reached.contains("island"));
    }

    #[test]
    fn node_ids_preserve_insertion_order() {
        let g = simple_graph();
        let ids: Vec<_> = g.node_ids().cloned().collect();
        assert_eq!(ids, vec!["s".to_string(), "w".to_string(), "e".to_string()]);
    }
}
