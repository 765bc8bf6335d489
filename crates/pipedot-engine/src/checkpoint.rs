//! Checkpointing (§4.6, §6): after each `stage.completed`, the engine writes
//! a checkpoint record; on resume the graph hash must match or the run is
//! rejected as [`crate::EngineError::ResumeIncompatible`].

use std::io::Write;
use std::path::PathBuf;

use indexmap::IndexMap;
use pipedot_core::{Graph, Outcome};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Hashes a graph's structural shape (node ids, edges, attrs) so a resumed
/// run can detect that the DOT source changed underneath it.
pub fn graph_hash(graph: &Graph) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    graph.name.hash(&mut hasher);
    for node in graph.nodes() {
        node.id.hash(&mut hasher);
        for (k, v) in node.attrs.iter() {
            k.hash(&mut hasher);
            v.hash(&mut hasher);
        }
    }
    for edge in graph.edges() {
        edge.from.hash(&mut hasher);
        edge.to.hash(&mut hasher);
        for (k, v) in edge.attrs.iter() {
            k.hash(&mut hasher);
            v.hash(&mut hasher);
        }
    }
    format!("{:016x}", hasher.finish())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub seq: u64,
    pub completed_node_ids: Vec<String>,
    pub last_node_id: Option<String>,
    pub outcomes: IndexMap<String, Outcome>,
    pub graph_hash: String,
}

impl Checkpoint {
    pub fn new(graph_hash: String) -> Self {
        Self {
            seq: 0,
            completed_node_ids: Vec::new(),
            last_node_id: None,
            outcomes: IndexMap::new(),
            graph_hash,
        }
    }

    pub fn with_next_node(mut self, node_id: impl Into<String>) -> Self {
        self.last_node_id = Some(node_id.into());
        self
    }
}

/// Pluggable checkpoint sink (§6: "pluggable; a reference implementation is
/// a single NDJSON file per pipeline").
pub trait CheckpointStore: Send + Sync {
    fn save(&mut self, checkpoint: &Checkpoint) -> EngineResult<()>;
    fn load_latest(&self) -> EngineResult<Option<Checkpoint>>;
}

/// Appends one JSON object per line; the latest record (by `seq`) wins on
/// load, matching the "single NDJSON file per pipeline" reference design.
pub struct NdjsonCheckpointStore {
    path: PathBuf,
    next_seq: u64,
}

impl NdjsonCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), next_seq: 0 }
    }
}

impl CheckpointStore for NdjsonCheckpointStore {
    fn save(&mut self, checkpoint: &Checkpoint) -> EngineResult<()> {
        let mut record = checkpoint.clone();
        record.seq = self.next_seq;
        self.next_seq += 1;
        let line = serde_json::to_string(&record)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    fn load_latest(&self) -> EngineResult<Option<Checkpoint>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let mut latest: Option<Checkpoint> = None;
        for line in contents.lines().filter(|l| !l.trim().is_empty()) {
            let record: Checkpoint = serde_json::from_str(line)
                .map_err(|e| EngineError::Checkpoint(e.to_string()))?;
            latest = Some(record);
        }
        Ok(latest)
    }
}

/// In-memory store used by tests and by callers that don't need durability
/// across process restarts.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    records: Vec<Checkpoint>,
}

impl CheckpointStore for MemoryCheckpointStore {
    fn save(&mut self, checkpoint: &Checkpoint) -> EngineResult<()> {
        let mut record = checkpoint.clone();
        record.seq = self.records.len() as u64;
        self.records.push(record);
        Ok(())
    }

    fn load_latest(&self) -> EngineResult<Option<Checkpoint>> {
        Ok(self.records.last().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips() {
        let mut store = MemoryCheckpointStore::default();
        let mut cp = Checkpoint::new("abc".to_string());
        cp.completed_node_ids.push("s".to_string());
        store.save(&cp).unwrap();
        let loaded = store.load_latest().unwrap().unwrap();
        assert_eq!(loaded.completed_node_ids, vec!["s".to_string()]);
        assert_eq!(loaded.graph_hash, "abc");
    }

    #[test]
    fn ndjson_store_round_trips_across_saves() {
        let dir = std::env::temp_dir().join(format!("pipedot-ckpt-test-{:x}", rand::random::<u64>()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("run.ndjson");
        let mut store = NdjsonCheckpointStore::new(&path);
        store.save(&Checkpoint::new("h1".to_string())).unwrap();
        let mut second = Checkpoint::new("h1".to_string());
        second.last_node_id = Some("w".to_string());
        store.save(&second).unwrap();
        let loaded = store.load_latest().unwrap().unwrap();
        assert_eq!(loaded.last_node_id, Some("w".to_string()));
        assert_eq!(loaded.seq, 1);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn graph_hash_changes_with_structure() {
        let mut g1 = Graph::new("g");
        g1.add_node(pipedot_core::Node::new("a")).unwrap();
        let mut g2 = Graph::new("g");
        g2.add_node(pipedot_core::Node::new("b")).unwrap();
        assert_ne!(graph_hash(&g1), graph_hash(&g2));
    }
}
