// Declarative script descriptions.
//
// Defines the RON file format the runner and the tests use to author
// graphs without the visual editor: a flat list of node declarations,
// linked by declaration index, lowered into a Graph through the same
// public model the editor uses. Binary .script containers remain the
// interchange format; this is the human-writable one.

use std::fmt;
use std::fs;

use serde::Deserialize;

use crate::graph::{Graph, GraphError, LoadError};
use crate::node::Node;
use crate::nodes::*;


#[derive(Deserialize, Debug)]
pub struct ScriptFile {
    pub nodes: Vec<NodeDecl>,
}

#[derive(Deserialize, Debug)]
pub struct NodeDecl {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub entry: bool,
    pub kind: NodeKind,
    // Control successors per output slot, as declaration indices.
    #[serde(default)]
    pub outputs: Vec<Option<u32>>,
    // Value sources per argument slot.
    #[serde(default)]
    pub args: Vec<Option<PortRef>>,
    #[serde(default)]
    pub pos: (f32, f32),
}

#[derive(Deserialize, Debug, Copy, Clone)]
pub struct PortRef {
    pub node: u32,
    #[serde(default)]
    pub port: u32,
}

#[derive(Deserialize, Debug, Clone)]
pub enum NodeKind {
    Entry,
    Condition,
    Loop { iterations: u32 },
    BooleanCompare { op: BooleanOperation },
    Not,
    NumberCompare { op: NumberOperation },
    Math { op: MathOperation },
    BooleanValue { value: bool },
    NumberValue { value: f32 },
    StringValue { value: String },
    Log,
    LoadBool,
    SaveBool,
    LoadNumber,
    SaveNumber,
    LoadString,
    SaveString,
}


#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(ron::error::SpannedError),
    Graph(GraphError),
    Validate(LoadError),
    BadTarget { node: u32, target: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(error) => write!(f, "io error: {}", error),
            ConfigError::Parse(error) => write!(f, "parse error: {}", error),
            ConfigError::Graph(error) => write!(f, "bad declaration: {}", error),
            ConfigError::Validate(error) => write!(f, "bad link: {}", error),
            ConfigError::BadTarget { node, target } => {
                write!(f, "declaration {} links to missing declaration {}", node, target)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<GraphError> for ConfigError {
    fn from(error: GraphError) -> ConfigError {
        ConfigError::Graph(error)
    }
}


fn instantiate(kind: &NodeKind) -> Box<dyn Node> {
    match kind {
        NodeKind::Entry => Box::new(EntryNode::new()),
        NodeKind::Condition => Box::new(Condition::new()),
        NodeKind::Loop { iterations } => Box::new(Loop::with_iterations(*iterations)),
        NodeKind::BooleanCompare { op } => Box::new(BooleanComparison::with_op(*op)),
        NodeKind::Not => Box::new(NotComparison::new()),
        NodeKind::NumberCompare { op } => Box::new(NumberComparison::with_op(*op)),
        NodeKind::Math { op } => Box::new(Math::with_op(*op)),
        NodeKind::BooleanValue { value } => Box::new(BooleanLiteral::with_value(*value)),
        NodeKind::NumberValue { value } => Box::new(NumberLiteral::with_value(*value)),
        NodeKind::StringValue { value } => Box::new(StringLiteral::with_value(value)),
        NodeKind::Log => Box::new(PrintLog::new()),
        NodeKind::LoadBool => Box::new(LoadBool::new()),
        NodeKind::SaveBool => Box::new(SaveBool::new()),
        NodeKind::LoadNumber => Box::new(LoadNumber::new()),
        NodeKind::SaveNumber => Box::new(SaveNumber::new()),
        NodeKind::LoadString => Box::new(LoadString::new()),
        NodeKind::SaveString => Box::new(SaveString::new()),
    }
}


// Lower a parsed description into a graph. Declarations get ids in
// order, so link targets are declaration indices.
pub fn build(file: &ScriptFile) -> Result<Graph, ConfigError> {
    let mut graph = Graph::new();
    let mut ids = Vec::with_capacity(file.nodes.len());
    for decl in &file.nodes {
        let mut node = instantiate(&decl.kind);
        node.base_mut().name = decl.name.clone();
        node.base_mut().pos_x = decl.pos.0;
        node.base_mut().pos_y = decl.pos.1;
        ids.push(graph.add_node(node));
    }

    for (index, decl) in file.nodes.iter().enumerate() {
        let from = ids[index];
        let resolve = |target: u32| -> Result<u32, ConfigError> {
            ids.get(target as usize)
                .copied()
                .ok_or(ConfigError::BadTarget { node: from, target })
        };
        for (slot, target) in decl.outputs.iter().enumerate() {
            if let Some(target) = target {
                graph.link_output(from, slot, resolve(*target)?)?;
            }
        }
        for (slot, source) in decl.args.iter().enumerate() {
            if let Some(source) = source {
                graph.link_argument(from, slot, resolve(source.node)?, source.port)?;
            }
        }
        if decl.entry {
            graph.register_entry(from)?;
        }
    }

    graph.validate().map_err(ConfigError::Validate)?;
    Ok(graph)
}

pub fn parse(text: &str) -> Result<ScriptFile, ConfigError> {
    ron::from_str(text).map_err(ConfigError::Parse)
}

pub fn load(path: &str) -> Result<Graph, ConfigError> {
    let text = fs::read_to_string(path).map_err(ConfigError::Io)?;
    build(&parse(&text)?)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::{RunResult, ScriptInstance};
    use std::cell::RefCell;
    use std::rc::Rc;

    const TICKER: &str = r#"
        (
            nodes: [
                (name: "Entry", entry: true, kind: Entry, outputs: [Some(1)]),
                (kind: Loop(iterations: 2), outputs: [Some(4), Some(2)]),
                (kind: Log, outputs: [None], args: [Some((node: 3))]),
                (kind: StringValue(value: "tick")),
                (kind: Log, args: [Some((node: 5, port: 0))]),
                (kind: StringValue(value: "done")),
            ],
        )
    "#;

    #[test]
    fn parses_and_runs() {
        let graph = build(&parse(TICKER).unwrap()).unwrap();
        assert_eq!(graph.len(), 6);
        assert_eq!(graph.entry("Entry"), Some(0));

        let mut instance = ScriptInstance::new(&graph);
        let transcript = Rc::new(RefCell::new(Vec::new()));
        let writer = transcript.clone();
        instance.set_sink(move |message| writer.borrow_mut().push(String::from(message)));
        assert_eq!(instance.run("Entry"), RunResult::Complete);
        assert_eq!(*transcript.borrow(), vec!["tick", "tick", "done"]);
    }

    #[test]
    fn positions_and_names_carry_over() {
        let file = parse(
            r#"(nodes: [(name: "Main", entry: true, kind: Entry, pos: (4.0, 8.0))])"#,
        )
        .unwrap();
        let graph = build(&file).unwrap();
        let node = graph.node(0).unwrap();
        assert_eq!(node.base().name, "Main");
        assert_eq!(node.base().pos_x, 4.0);
        assert_eq!(node.base().pos_y, 8.0);
    }

    #[test]
    fn out_of_range_target_is_an_error() {
        let file = parse(
            r#"(nodes: [(name: "Main", entry: true, kind: Entry, outputs: [Some(9)])])"#,
        )
        .unwrap();
        match build(&file) {
            Err(ConfigError::BadTarget { node: 0, target: 9 }) => {}
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn too_many_slots_is_an_error() {
        let file = parse(
            r#"(nodes: [(name: "Main", entry: true, kind: Entry, outputs: [Some(0), Some(0)])])"#,
        )
        .unwrap();
        assert!(build(&file).is_err());
    }

    #[test]
    fn entries_need_names() {
        let file = parse(r#"(nodes: [(entry: true, kind: Entry)])"#).unwrap();
        assert!(build(&file).is_err());
    }

    #[test]
    fn malformed_text_is_a_parse_error() {
        assert!(parse("(nodes: [wat]").is_err());
    }
}
