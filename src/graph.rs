// The script graph container.
//
// Nodes live in an id-keyed map — references between them are plain
// ids, never owning links, which is what lets control flow form cycles
// without any ownership knots. Alongside the nodes sits the entry
// table: the named roots a run can start from.

use std::collections::HashMap;
use std::{error, fmt};

use crate::codec::{self, NodeRecord, Writer};
use crate::node::{Node, UNLINKED};
use crate::registry;


// Errors from editor-facing graph manipulation.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphError {
    DuplicateId(u32),
    MissingId,
    UnknownNode(u32),
    BadSlot { node: u32, slot: usize },
    UnnamedEntry(u32),
    UnknownEntry(String),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::DuplicateId(id) => write!(f, "node id {} already in use", id),
            GraphError::MissingId => f.write_str("node has no id assigned"),
            GraphError::UnknownNode(id) => write!(f, "no node with id {}", id),
            GraphError::BadSlot { node, slot } => {
                write!(f, "node {} has no port slot {}", node, slot)
            }
            GraphError::UnnamedEntry(id) => {
                write!(f, "node {} needs a name to be an entry point", id)
            }
            GraphError::UnknownEntry(name) => write!(f, "no entry point {:?}", name),
        }
    }
}

impl error::Error for GraphError {}


// Errors reconstructing a graph from persisted records.
#[derive(Debug, PartialEq)]
pub enum LoadError {
    Codec(codec::Error),
    UnknownType(String),
    DuplicateId(u32),
    BadId(u32),
    DanglingRef { node: u32, target: u32 },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Codec(error) => write!(f, "codec error: {}", error),
            LoadError::UnknownType(name) => {
                write!(f, "node type {:?} is not registered", name)
            }
            LoadError::DuplicateId(id) => {
                write!(f, "duplicate node id {} in script", id)
            }
            LoadError::BadId(id) => write!(f, "node id {} is reserved", id),
            LoadError::DanglingRef { node, target } => {
                write!(f, "node {} references missing node {}", node, target)
            }
        }
    }
}

impl error::Error for LoadError {}

impl From<codec::Error> for LoadError {
    fn from(error: codec::Error) -> LoadError {
        LoadError::Codec(error)
    }
}


pub struct Graph {
    nodes: HashMap<u32, Box<dyn Node>>,
    entries: HashMap<String, u32>,
    next_id: u32,
}

impl Graph {
    pub fn new() -> Graph {
        Graph {
            nodes: HashMap::new(),
            entries: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // Node ids in ascending order.
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn node(&self, id: u32) -> Option<&dyn Node> {
        self.nodes.get(&id).map(|node| node.as_ref())
    }

    pub fn node_mut(&mut self, id: u32) -> Option<&mut (dyn Node + '_)> {
        match self.nodes.get_mut(&id) {
            Some(node) => Some(&mut **node),
            None => None,
        }
    }

    // Take ownership of a node under a freshly allocated id.
    pub fn add_node(&mut self, mut node: Box<dyn Node>) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        node.base_mut().id = id;
        self.nodes.insert(id, node);
        id
    }

    // Take ownership of a node that already carries its id (loading,
    // editor paste). Colliding and unassigned ids are rejected.
    pub fn insert_node(&mut self, node: Box<dyn Node>) -> Result<u32, GraphError> {
        let id = node.base().id;
        if id == UNLINKED {
            return Err(GraphError::MissingId);
        }
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateId(id));
        }
        self.next_id = self.next_id.max(id + 1);
        self.nodes.insert(id, node);
        Ok(id)
    }

    pub fn remove_node(&mut self, id: u32) -> Option<Box<dyn Node>> {
        let node = self.nodes.remove(&id)?;
        self.entries.retain(|_, entry| *entry != id);
        Some(node)
    }

    // Editor-style link setters: plain assignment into the ref lists.
    // Port type compatibility is deliberately not checked; the runtime
    // coerces whatever arrives.
    pub fn link_output(&mut self, from: u32, slot: usize, to: u32) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(&from)
            .ok_or(GraphError::UnknownNode(from))?;
        let output = node
            .base_mut()
            .outputs
            .get_mut(slot)
            .ok_or(GraphError::BadSlot { node: from, slot })?;
        output.id = to;
        Ok(())
    }

    pub fn link_argument(
        &mut self,
        from: u32,
        slot: usize,
        to: u32,
        value_id: u32,
    ) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(&from)
            .ok_or(GraphError::UnknownNode(from))?;
        let argument = node
            .base_mut()
            .arguments
            .get_mut(slot)
            .ok_or(GraphError::BadSlot { node: from, slot })?;
        argument.id = to;
        argument.value_id = value_id;
        Ok(())
    }

    // Register a node as a run root under its own name.
    pub fn register_entry(&mut self, id: u32) -> Result<(), GraphError> {
        let node = self.nodes.get(&id).ok_or(GraphError::UnknownNode(id))?;
        let name = node.base().name.clone();
        if name.is_empty() {
            return Err(GraphError::UnnamedEntry(id));
        }
        self.entries.insert(name, id);
        Ok(())
    }

    pub fn rename_entry(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
        let id = self
            .entries
            .remove(from)
            .ok_or_else(|| GraphError::UnknownEntry(String::from(from)))?;
        self.entries.insert(String::from(to), id);
        Ok(())
    }

    pub fn remove_entry(&mut self, name: &str) -> Option<u32> {
        self.entries.remove(name)
    }

    pub fn entry(&self, name: &str) -> Option<u32> {
        self.entries.get(name).copied()
    }

    pub fn entry_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    // Serialize every node into container records, ascending id order.
    pub fn write(&self) -> Vec<NodeRecord> {
        let mut records = Vec::with_capacity(self.nodes.len());
        for id in self.ids() {
            let node = &self.nodes[&id];
            let mut writer = Writer::with_capacity(node.data_size());
            node.write(&mut writer);
            records.push(NodeRecord {
                id,
                entry_point: self.entries.values().any(|&entry| entry == id),
                type_name: String::from(node.type_name()),
                name: node.base().name.clone(),
                payload: writer.into_bytes(),
            });
        }
        records
    }

    // Rebuild a graph from persisted records through the registry. An
    // unregistered type name fails the whole load.
    pub fn read(records: &[NodeRecord]) -> Result<Graph, LoadError> {
        let mut graph = Graph::new();
        for record in records {
            if record.id == UNLINKED {
                return Err(LoadError::BadId(record.id));
            }
            if graph.nodes.contains_key(&record.id) {
                return Err(LoadError::DuplicateId(record.id));
            }
            let mut node = match registry::load(&record.type_name, &record.payload) {
                None => {
                    log::warn!(
                        "script references unregistered node type {:?} (id {})",
                        record.type_name,
                        record.id
                    );
                    return Err(LoadError::UnknownType(record.type_name.clone()));
                }
                Some(Err(error)) => return Err(LoadError::Codec(error)),
                Some(Ok(node)) => node,
            };
            node.base_mut().id = record.id;
            node.base_mut().name = record.name.clone();
            graph.next_id = graph.next_id.max(record.id + 1);
            graph.nodes.insert(record.id, node);
            if record.entry_point {
                graph.entries.insert(record.name.clone(), record.id);
            }
            log::debug!("loaded node {} ({})", record.id, record.type_name);
        }
        graph.validate()?;
        Ok(graph)
    }

    // Every non-sentinel reference must resolve to a node.
    pub fn validate(&self) -> Result<(), LoadError> {
        for (&id, node) in &self.nodes {
            let base = node.base();
            for output in &base.outputs {
                if output.is_linked() && !self.nodes.contains_key(&output.id) {
                    return Err(LoadError::DanglingRef {
                        node: id,
                        target: output.id,
                    });
                }
            }
            for argument in &base.arguments {
                if argument.is_linked() && !self.nodes.contains_key(&argument.id) {
                    return Err(LoadError::DanglingRef {
                        node: id,
                        target: argument.id,
                    });
                }
            }
        }
        Ok(())
    }
}
