// The node protocol.
//
// A node is a vertex in the script graph. It carries the state every
// node shares (identity, ports, editor placement) in a NodeBase, and
// implements the Node trait for whatever behavior it adds on top:
// control-flow advance through `process`, demand-driven value
// production through `get_value`, and the binary codec for its
// persisted payload.

use crate::codec::{self, Reader, Writer};
use crate::value::{Value, ValueType};
use crate::vm::ScriptInstance;


// Id meaning "not linked to any node".
pub const UNLINKED: u32 = u32::MAX;


// A control-flow edge: which node runs next when this output is taken.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeRef {
    pub id: u32,
    pub name: String,
}

impl NodeRef {
    pub fn new(name: &str) -> NodeRef {
        NodeRef {
            id: UNLINKED,
            name: String::from(name),
        }
    }

    pub fn is_linked(&self) -> bool {
        self.id != UNLINKED
    }
}


// A typed value input: which node produces the value, and which of its
// value ports to ask for.
#[derive(Clone, Debug, PartialEq)]
pub struct ArgRef {
    pub id: u32,
    pub value_id: u32,
    pub value_type: ValueType,
    pub name: String,
}

impl ArgRef {
    pub fn new(value_type: ValueType, name: &str) -> ArgRef {
        ArgRef {
            id: UNLINKED,
            value_id: UNLINKED,
            value_type,
            name: String::from(name),
        }
    }

    pub fn is_linked(&self) -> bool {
        self.id != UNLINKED
    }
}


// A typed value output this node can produce on demand.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueDef {
    pub id: u32,
    pub value_type: ValueType,
    pub name: String,
}

impl ValueDef {
    pub fn new(value_type: ValueType, name: &str, id: u32) -> ValueDef {
        ValueDef {
            id,
            value_type,
            name: String::from(name),
        }
    }
}


// State common to every node, including the persisted prologue.
#[derive(Clone, Debug)]
pub struct NodeBase {
    pub id: u32,
    pub name: String,
    // True when control flow may land on this node. Pure producers
    // (literals, math, comparisons, loads) and run roots clear it.
    pub allows_entry: bool,
    pub outputs: Vec<NodeRef>,
    pub arguments: Vec<ArgRef>,
    pub values: Vec<ValueDef>,
    // Editor placement; the engine never looks at these.
    pub pos_x: f32,
    pub pos_y: f32,
}

impl NodeBase {
    pub fn new() -> NodeBase {
        NodeBase {
            id: UNLINKED,
            name: String::new(),
            allows_entry: true,
            outputs: Vec::new(),
            arguments: Vec::new(),
            values: Vec::new(),
            pos_x: 0.0,
            pos_y: 0.0,
        }
    }

    // Prologue layout, shared by every node type:
    //   u8  allows_entry
    //   u32 output count, then one u32 id per output
    //   u32 argument count, then one u32 id per argument
    //   f32 pos_x, f32 pos_y
    //
    // Port lists come from the node's constructor; reading only fills
    // in the link ids. Counts beyond the constructed arity are read
    // and dropped so a file from a newer catalog still scans.
    pub fn read(&mut self, reader: &mut Reader<'_>) -> Result<(), codec::Error> {
        self.allows_entry = reader.read_bool()?;
        let outputs = reader.read_u32()? as usize;
        for slot in 0..outputs {
            let id = reader.read_u32()?;
            if let Some(output) = self.outputs.get_mut(slot) {
                output.id = id;
            }
        }
        let arguments = reader.read_u32()? as usize;
        for slot in 0..arguments {
            let id = reader.read_u32()?;
            if let Some(argument) = self.arguments.get_mut(slot) {
                argument.id = id;
            }
        }
        self.pos_x = reader.read_f32()?;
        self.pos_y = reader.read_f32()?;
        Ok(())
    }

    pub fn write(&self, writer: &mut Writer) {
        writer.write_bool(self.allows_entry);
        writer.write_u32(self.outputs.len() as u32);
        for output in &self.outputs {
            writer.write_u32(output.id);
        }
        writer.write_u32(self.arguments.len() as u32);
        for argument in &self.arguments {
            writer.write_u32(argument.id);
        }
        writer.write_f32(self.pos_x);
        writer.write_f32(self.pos_y);
    }

    pub fn data_size(&self) -> usize {
        1 + 4 + 4 * self.outputs.len() + 4 + 4 * self.arguments.len() + 8
    }
}


// Capability interface the engine, the registry and the codec drive.
//
// `process` runs when control flow sits on the node: it may mutate the
// instance (globals, scratch, the return stack) and returns the output
// to follow, or None to end the current branch. `get_value` answers
// another node's demand for one of this node's declared values; it
// must not touch control flow. The default impls make a node pure
// (no control role, no values) with a prologue-only payload.
pub trait Node {
    fn base(&self) -> &NodeBase;
    fn base_mut(&mut self) -> &mut NodeBase;
    fn type_name(&self) -> &'static str;

    fn process(&self, _state: &mut ScriptInstance<'_>) -> Option<&NodeRef> {
        None
    }

    fn get_value(&self, _value_id: u32, _state: &ScriptInstance<'_>) -> Option<Value> {
        None
    }

    fn read(&mut self, reader: &mut Reader<'_>) -> Result<(), codec::Error> {
        self.base_mut().read(reader)
    }

    fn write(&self, writer: &mut Writer) {
        self.base().write(writer);
    }

    // Upper bound on the payload this node writes, so containers can
    // preallocate.
    fn data_size(&self) -> usize {
        self.base().data_size()
    }
}
