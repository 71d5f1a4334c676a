// The built-in node catalog.
//
// Seventeen node types: flow control (entry, condition, loop), the
// comparison and math producers, the three literals, the log node and
// variable load/save for each value type. Each one wires up its port
// lists in its constructor, implements whichever of process/get_value
// applies, and appends its payload after the common prologue.
//
// The persisted type-name strings are part of the file format; they
// must not change while existing .script files are in circulation.

use std::cell::Cell;

use serde::Deserialize;

use crate::codec::{self, Reader, Writer};
use crate::node::{ArgRef, Node, NodeBase, NodeRef, ValueDef};
use crate::value::{Value, ValueType};
use crate::vm::ScriptInstance;


// Operation selectors are persisted by index; declaration order is
// part of the file format.

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
pub enum BooleanOperation {
    And = 0,
    Or,
}

impl BooleanOperation {
    fn from_index(index: u32) -> Result<BooleanOperation, codec::Error> {
        match index {
            0 => Ok(BooleanOperation::And),
            1 => Ok(BooleanOperation::Or),
            _ => Err(codec::Error::BadOperation(index)),
        }
    }
}


#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
pub enum NumberOperation {
    GreaterThan = 0,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    Equal,
    NotEqual,
}

impl NumberOperation {
    fn from_index(index: u32) -> Result<NumberOperation, codec::Error> {
        match index {
            0 => Ok(NumberOperation::GreaterThan),
            1 => Ok(NumberOperation::GreaterThanEqual),
            2 => Ok(NumberOperation::LessThan),
            3 => Ok(NumberOperation::LessThanEqual),
            4 => Ok(NumberOperation::Equal),
            5 => Ok(NumberOperation::NotEqual),
            _ => Err(codec::Error::BadOperation(index)),
        }
    }
}


#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
pub enum MathOperation {
    Add = 0,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Pow,
}

impl MathOperation {
    fn from_index(index: u32) -> Result<MathOperation, codec::Error> {
        match index {
            0 => Ok(MathOperation::Add),
            1 => Ok(MathOperation::Subtract),
            2 => Ok(MathOperation::Multiply),
            3 => Ok(MathOperation::Divide),
            4 => Ok(MathOperation::Modulo),
            5 => Ok(MathOperation::Pow),
            _ => Err(codec::Error::BadOperation(index)),
        }
    }
}


// Factory pair in the shape the registry stores.
macro_rules! node_factory {
    ($type:ident, $name:literal) => {
        impl $type {
            pub const TYPE_NAME: &'static str = $name;

            pub fn create() -> Box<dyn Node> {
                Box::new($type::new())
            }

            pub fn load(data: &[u8]) -> Result<Box<dyn Node>, codec::Error> {
                let mut node = $type::new();
                let mut reader = Reader::new(data);
                Node::read(&mut node, &mut reader)?;
                Ok(Box::new(node))
            }
        }
    };
}


// ---------------------------------------------------------------- flow

// Run root. Not a control-flow target itself; the entry table points
// at it by name.
pub struct EntryNode {
    base: NodeBase,
}

impl EntryNode {
    pub fn new() -> EntryNode {
        let mut base = NodeBase::new();
        base.allows_entry = false;
        base.outputs.push(NodeRef::new("Out"));
        EntryNode { base }
    }
}

node_factory!(EntryNode, "EntryNode");

impl Node for EntryNode {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn process(&self, _state: &mut ScriptInstance<'_>) -> Option<&NodeRef> {
        Some(&self.base.outputs[0])
    }
}


// Two-way branch on a boolean argument. An unfetchable argument ends
// the branch.
pub struct Condition {
    base: NodeBase,
}

impl Condition {
    pub fn new() -> Condition {
        let mut base = NodeBase::new();
        base.outputs.push(NodeRef::new("True"));
        base.outputs.push(NodeRef::new("False"));
        base.arguments.push(ArgRef::new(ValueType::Boolean, "Condition"));
        Condition { base }
    }
}

node_factory!(Condition, "Condition");

impl Node for Condition {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn process(&self, state: &mut ScriptInstance<'_>) -> Option<&NodeRef> {
        let value = state.get_value(&self.base.arguments[0])?;
        if value.as_bool() {
            Some(&self.base.outputs[0])
        } else {
            Some(&self.base.outputs[1])
        }
    }
}


// Counted and/or condition-controlled loop. The iteration counter
// lives in the instance's per-node scratch, so the node itself stays
// shareable between instances; the Cycle branch pushes the loop onto
// the return stack so control comes back here when the body ends.
pub struct Loop {
    base: NodeBase,
    pub iterations: u32,
}

impl Loop {
    pub fn new() -> Loop {
        Loop::with_iterations(0)
    }

    pub fn with_iterations(iterations: u32) -> Loop {
        let mut base = NodeBase::new();
        base.outputs.push(NodeRef::new("Complete"));
        base.outputs.push(NodeRef::new("Cycle"));
        base.arguments.push(ArgRef::new(ValueType::Boolean, "Condition"));
        base.values.push(ValueDef::new(ValueType::Number, "Index", 0));
        Loop { base, iterations }
    }
}

node_factory!(Loop, "Loop");

impl Node for Loop {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn process(&self, state: &mut ScriptInstance<'_>) -> Option<&NodeRef> {
        let index = state
            .node_state
            .get(&self.base.id)
            .map(|previous| previous + 1)
            .unwrap_or(0);
        state.node_state.insert(self.base.id, index);

        if self.iterations > 0 && index as i64 >= i64::from(self.iterations) {
            return Some(&self.base.outputs[0]);
        }

        // With no iteration cap the condition is in charge; if that is
        // missing too there is nothing to keep the loop alive.
        let stop = match state.get_value(&self.base.arguments[0]) {
            Some(condition) => !condition.as_bool(),
            None => self.iterations == 0,
        };
        if stop {
            return Some(&self.base.outputs[0]);
        }

        state.push_return_node();
        Some(&self.base.outputs[1])
    }

    fn get_value(&self, _value_id: u32, state: &ScriptInstance<'_>) -> Option<Value> {
        let index = state.node_state.get(&self.base.id).copied().unwrap_or(0);
        Some(Value::Number(index as f32))
    }

    fn read(&mut self, reader: &mut Reader<'_>) -> Result<(), codec::Error> {
        self.base.read(reader)?;
        self.iterations = reader.read_u32()?;
        Ok(())
    }

    fn write(&self, writer: &mut Writer) {
        self.base.write(writer);
        writer.write_u32(self.iterations);
    }

    fn data_size(&self) -> usize {
        self.base.data_size() + 4
    }
}


// ---------------------------------------------------------- comparison

// AND/OR over two booleans. The last computed result is cached so a
// failed fetch leaves the previous answer observable.
pub struct BooleanComparison {
    base: NodeBase,
    pub op: BooleanOperation,
    result: Cell<bool>,
}

impl BooleanComparison {
    pub fn new() -> BooleanComparison {
        BooleanComparison::with_op(BooleanOperation::And)
    }

    pub fn with_op(op: BooleanOperation) -> BooleanComparison {
        let mut base = NodeBase::new();
        base.allows_entry = false;
        base.arguments.push(ArgRef::new(ValueType::Boolean, "A"));
        base.arguments.push(ArgRef::new(ValueType::Boolean, "B"));
        base.values.push(ValueDef::new(ValueType::Boolean, "Result", 0));
        BooleanComparison {
            base,
            op,
            result: Cell::new(false),
        }
    }
}

node_factory!(BooleanComparison, "BooleanComparison");

impl Node for BooleanComparison {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn get_value(&self, _value_id: u32, state: &ScriptInstance<'_>) -> Option<Value> {
        let a = state.get_value(&self.base.arguments[0]);
        let b = state.get_value(&self.base.arguments[1]);
        if let (Some(a), Some(b)) = (a, b) {
            let result = match self.op {
                BooleanOperation::And => a.as_bool() && b.as_bool(),
                BooleanOperation::Or => a.as_bool() || b.as_bool(),
            };
            self.result.set(result);
        }
        Some(Value::Boolean(self.result.get()))
    }

    fn read(&mut self, reader: &mut Reader<'_>) -> Result<(), codec::Error> {
        self.base.read(reader)?;
        self.op = BooleanOperation::from_index(reader.read_u32()?)?;
        Ok(())
    }

    fn write(&self, writer: &mut Writer) {
        self.base.write(writer);
        writer.write_u32(self.op as u32);
    }

    fn data_size(&self) -> usize {
        self.base.data_size() + 4
    }
}


// Logical negation. Unfetchable input reads as false.
pub struct NotComparison {
    base: NodeBase,
}

impl NotComparison {
    pub fn new() -> NotComparison {
        let mut base = NodeBase::new();
        base.allows_entry = false;
        base.arguments.push(ArgRef::new(ValueType::Boolean, "Input"));
        base.values.push(ValueDef::new(ValueType::Boolean, "Result", 0));
        NotComparison { base }
    }
}

node_factory!(NotComparison, "NotComparison");

impl Node for NotComparison {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn get_value(&self, _value_id: u32, state: &ScriptInstance<'_>) -> Option<Value> {
        let result = match state.get_value(&self.base.arguments[0]) {
            Some(value) => !value.as_bool(),
            None => false,
        };
        Some(Value::Boolean(result))
    }
}


// Relational test over two numbers; false whenever either side is
// missing.
pub struct NumberComparison {
    base: NodeBase,
    pub op: NumberOperation,
}

impl NumberComparison {
    pub fn new() -> NumberComparison {
        NumberComparison::with_op(NumberOperation::Equal)
    }

    pub fn with_op(op: NumberOperation) -> NumberComparison {
        let mut base = NodeBase::new();
        base.allows_entry = false;
        base.arguments.push(ArgRef::new(ValueType::Number, "A"));
        base.arguments.push(ArgRef::new(ValueType::Number, "B"));
        base.values.push(ValueDef::new(ValueType::Boolean, "Result", 0));
        NumberComparison { base, op }
    }
}

node_factory!(NumberComparison, "NumberComparison");

impl Node for NumberComparison {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn get_value(&self, _value_id: u32, state: &ScriptInstance<'_>) -> Option<Value> {
        let a = state.get_value(&self.base.arguments[0]);
        let b = state.get_value(&self.base.arguments[1]);
        let result = match (a, b) {
            (Some(a), Some(b)) => {
                let (a, b) = (a.as_number(), b.as_number());
                match self.op {
                    NumberOperation::GreaterThan => a > b,
                    NumberOperation::GreaterThanEqual => a >= b,
                    NumberOperation::LessThan => a < b,
                    NumberOperation::LessThanEqual => a <= b,
                    NumberOperation::Equal => a == b,
                    NumberOperation::NotEqual => a != b,
                }
            }
            _ => false,
        };
        Some(Value::Boolean(result))
    }

    fn read(&mut self, reader: &mut Reader<'_>) -> Result<(), codec::Error> {
        self.base.read(reader)?;
        self.op = NumberOperation::from_index(reader.read_u32()?)?;
        Ok(())
    }

    fn write(&self, writer: &mut Writer) {
        self.base.write(writer);
        writer.write_u32(self.op as u32);
    }

    fn data_size(&self) -> usize {
        self.base.data_size() + 4
    }
}


// ---------------------------------------------------------------- math

// Integer remainder on truncated operands; a zero divisor yields zero
// rather than faulting.
fn modulo(a: f32, b: f32) -> f32 {
    let divisor = b as i64;
    if divisor == 0 {
        return 0.0;
    }
    ((a as i64) % divisor) as f32
}


// Binary arithmetic over two numbers; 0.0 whenever either side is
// missing. Division is not trapped — IEEE infinities and NaN flow
// through like any other number.
pub struct Math {
    base: NodeBase,
    pub op: MathOperation,
}

impl Math {
    pub fn new() -> Math {
        Math::with_op(MathOperation::Add)
    }

    pub fn with_op(op: MathOperation) -> Math {
        let mut base = NodeBase::new();
        base.allows_entry = false;
        base.arguments.push(ArgRef::new(ValueType::Number, "A"));
        base.arguments.push(ArgRef::new(ValueType::Number, "B"));
        base.values.push(ValueDef::new(ValueType::Number, "Result", 0));
        Math { base, op }
    }
}

node_factory!(Math, "Math");

impl Node for Math {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn get_value(&self, _value_id: u32, state: &ScriptInstance<'_>) -> Option<Value> {
        let a = state.get_value(&self.base.arguments[0]);
        let b = state.get_value(&self.base.arguments[1]);
        let result = match (a, b) {
            (Some(a), Some(b)) => {
                let (a, b) = (a.as_number(), b.as_number());
                match self.op {
                    MathOperation::Add => a + b,
                    MathOperation::Subtract => a - b,
                    MathOperation::Multiply => a * b,
                    MathOperation::Divide => a / b,
                    MathOperation::Modulo => modulo(a, b),
                    MathOperation::Pow => a.powf(b),
                }
            }
            _ => 0.0,
        };
        Some(Value::Number(result))
    }

    fn read(&mut self, reader: &mut Reader<'_>) -> Result<(), codec::Error> {
        self.base.read(reader)?;
        self.op = MathOperation::from_index(reader.read_u32()?)?;
        Ok(())
    }

    fn write(&self, writer: &mut Writer) {
        self.base.write(writer);
        writer.write_u32(self.op as u32);
    }

    fn data_size(&self) -> usize {
        self.base.data_size() + 4
    }
}


// ------------------------------------------------------------ literals

pub struct BooleanLiteral {
    base: NodeBase,
    value: bool,
}

impl BooleanLiteral {
    pub fn new() -> BooleanLiteral {
        BooleanLiteral::with_value(false)
    }

    pub fn with_value(value: bool) -> BooleanLiteral {
        let mut base = NodeBase::new();
        base.allows_entry = false;
        base.values.push(ValueDef::new(ValueType::Boolean, "Value", 0));
        BooleanLiteral { base, value }
    }

    pub fn set_value(&mut self, value: bool) {
        self.value = value;
    }

    pub fn value(&self) -> bool {
        self.value
    }
}

node_factory!(BooleanLiteral, "BooleanLiteral");

impl Node for BooleanLiteral {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn get_value(&self, _value_id: u32, _state: &ScriptInstance<'_>) -> Option<Value> {
        Some(Value::Boolean(self.value))
    }

    fn read(&mut self, reader: &mut Reader<'_>) -> Result<(), codec::Error> {
        self.base.read(reader)?;
        self.value = reader.read_bool()?;
        Ok(())
    }

    fn write(&self, writer: &mut Writer) {
        self.base.write(writer);
        writer.write_bool(self.value);
    }

    fn data_size(&self) -> usize {
        self.base.data_size() + 1
    }
}


pub struct NumberLiteral {
    base: NodeBase,
    value: f32,
}

impl NumberLiteral {
    pub fn new() -> NumberLiteral {
        NumberLiteral::with_value(0.0)
    }

    pub fn with_value(value: f32) -> NumberLiteral {
        let mut base = NodeBase::new();
        base.allows_entry = false;
        base.values.push(ValueDef::new(ValueType::Number, "Value", 0));
        NumberLiteral { base, value }
    }

    pub fn set_value(&mut self, value: f32) {
        self.value = value;
    }

    pub fn value(&self) -> f32 {
        self.value
    }
}

node_factory!(NumberLiteral, "NumberLiteral");

impl Node for NumberLiteral {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn get_value(&self, _value_id: u32, _state: &ScriptInstance<'_>) -> Option<Value> {
        Some(Value::Number(self.value))
    }

    fn read(&mut self, reader: &mut Reader<'_>) -> Result<(), codec::Error> {
        self.base.read(reader)?;
        self.value = reader.read_f32()?;
        Ok(())
    }

    fn write(&self, writer: &mut Writer) {
        self.base.write(writer);
        writer.write_f32(self.value);
    }

    fn data_size(&self) -> usize {
        self.base.data_size() + 4
    }
}


pub struct StringLiteral {
    base: NodeBase,
    value: String,
}

impl StringLiteral {
    pub fn new() -> StringLiteral {
        StringLiteral::with_value("")
    }

    pub fn with_value(value: &str) -> StringLiteral {
        let mut base = NodeBase::new();
        base.allows_entry = false;
        base.values.push(ValueDef::new(ValueType::String, "Value", 0));
        StringLiteral {
            base,
            value: String::from(value),
        }
    }

    pub fn set_value(&mut self, value: &str) {
        self.value = String::from(value);
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

node_factory!(StringLiteral, "StringLiteral");

impl Node for StringLiteral {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn get_value(&self, _value_id: u32, _state: &ScriptInstance<'_>) -> Option<Value> {
        Some(Value::Str(self.value.clone()))
    }

    fn read(&mut self, reader: &mut Reader<'_>) -> Result<(), codec::Error> {
        self.base.read(reader)?;
        self.value = reader.read_string()?;
        Ok(())
    }

    fn write(&self, writer: &mut Writer) {
        self.base.write(writer);
        writer.write_string(&self.value);
    }

    fn data_size(&self) -> usize {
        self.base.data_size() + 4 + self.value.len()
    }
}


// ----------------------------------------------------------------- log

// Coerces its argument to a string and hands it to the installed log
// sink, then proceeds. A missing argument skips the sink call but
// does not stop the script.
pub struct PrintLog {
    base: NodeBase,
}

impl PrintLog {
    pub fn new() -> PrintLog {
        let mut base = NodeBase::new();
        base.outputs.push(NodeRef::new("Out"));
        base.arguments.push(ArgRef::new(ValueType::String, "Text"));
        PrintLog { base }
    }
}

node_factory!(PrintLog, "PrintLog");

impl Node for PrintLog {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn process(&self, state: &mut ScriptInstance<'_>) -> Option<&NodeRef> {
        if let Some(text) = state.get_value(&self.base.arguments[0]) {
            let message = text.as_string();
            state.emit_log(&message);
        }
        Some(&self.base.outputs[0])
    }
}


// ----------------------------------------------------------- variables

// Load nodes read the matching global store by name: an unknown name
// (or an unfetchable name argument) reads as the type's zero. Save
// nodes write the store when both arguments fetch and proceed either
// way.

pub struct LoadBool {
    base: NodeBase,
}

impl LoadBool {
    pub fn new() -> LoadBool {
        let mut base = NodeBase::new();
        base.allows_entry = false;
        base.arguments
            .push(ArgRef::new(ValueType::String, "VariableName"));
        base.values.push(ValueDef::new(ValueType::Boolean, "Value", 0));
        LoadBool { base }
    }
}

node_factory!(LoadBool, "LoadBool");

impl Node for LoadBool {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn get_value(&self, _value_id: u32, state: &ScriptInstance<'_>) -> Option<Value> {
        let value = match state.get_value(&self.base.arguments[0]) {
            Some(name) => state
                .bool_globals
                .get(&name.as_string())
                .copied()
                .unwrap_or(false),
            None => false,
        };
        Some(Value::Boolean(value))
    }
}


pub struct SaveBool {
    base: NodeBase,
}

impl SaveBool {
    pub fn new() -> SaveBool {
        let mut base = NodeBase::new();
        base.outputs.push(NodeRef::new("Out"));
        base.arguments
            .push(ArgRef::new(ValueType::String, "VariableName"));
        base.arguments.push(ArgRef::new(ValueType::Boolean, "Value"));
        SaveBool { base }
    }
}

node_factory!(SaveBool, "SaveBool");

impl Node for SaveBool {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn process(&self, state: &mut ScriptInstance<'_>) -> Option<&NodeRef> {
        let name = state.get_value(&self.base.arguments[0]);
        let value = state.get_value(&self.base.arguments[1]);
        if let (Some(name), Some(value)) = (name, value) {
            state.bool_globals.insert(name.as_string(), value.as_bool());
        }
        Some(&self.base.outputs[0])
    }
}


pub struct LoadNumber {
    base: NodeBase,
}

impl LoadNumber {
    pub fn new() -> LoadNumber {
        let mut base = NodeBase::new();
        base.allows_entry = false;
        base.arguments
            .push(ArgRef::new(ValueType::String, "VariableName"));
        base.values.push(ValueDef::new(ValueType::Number, "Value", 0));
        LoadNumber { base }
    }
}

node_factory!(LoadNumber, "LoadNumber");

impl Node for LoadNumber {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn get_value(&self, _value_id: u32, state: &ScriptInstance<'_>) -> Option<Value> {
        let value = match state.get_value(&self.base.arguments[0]) {
            Some(name) => state
                .num_globals
                .get(&name.as_string())
                .copied()
                .unwrap_or(0.0),
            None => 0.0,
        };
        Some(Value::Number(value))
    }
}


pub struct SaveNumber {
    base: NodeBase,
}

impl SaveNumber {
    pub fn new() -> SaveNumber {
        let mut base = NodeBase::new();
        base.outputs.push(NodeRef::new("Out"));
        base.arguments
            .push(ArgRef::new(ValueType::String, "VariableName"));
        base.arguments.push(ArgRef::new(ValueType::Number, "Value"));
        SaveNumber { base }
    }
}

node_factory!(SaveNumber, "SaveNumber");

impl Node for SaveNumber {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn process(&self, state: &mut ScriptInstance<'_>) -> Option<&NodeRef> {
        let name = state.get_value(&self.base.arguments[0]);
        let value = state.get_value(&self.base.arguments[1]);
        if let (Some(name), Some(value)) = (name, value) {
            state
                .num_globals
                .insert(name.as_string(), value.as_number());
        }
        Some(&self.base.outputs[0])
    }
}


pub struct LoadString {
    base: NodeBase,
}

impl LoadString {
    pub fn new() -> LoadString {
        let mut base = NodeBase::new();
        base.allows_entry = false;
        base.arguments
            .push(ArgRef::new(ValueType::String, "VariableName"));
        base.values.push(ValueDef::new(ValueType::String, "Value", 0));
        LoadString { base }
    }
}

node_factory!(LoadString, "LoadString");

impl Node for LoadString {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn get_value(&self, _value_id: u32, state: &ScriptInstance<'_>) -> Option<Value> {
        let value = match state.get_value(&self.base.arguments[0]) {
            Some(name) => state
                .string_globals
                .get(&name.as_string())
                .cloned()
                .unwrap_or_default(),
            None => String::new(),
        };
        Some(Value::Str(value))
    }
}


pub struct SaveString {
    base: NodeBase,
}

impl SaveString {
    pub fn new() -> SaveString {
        let mut base = NodeBase::new();
        base.outputs.push(NodeRef::new("Out"));
        base.arguments
            .push(ArgRef::new(ValueType::String, "VariableName"));
        base.arguments.push(ArgRef::new(ValueType::String, "Value"));
        SaveString { base }
    }
}

node_factory!(SaveString, "SaveString");

impl Node for SaveString {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn process(&self, state: &mut ScriptInstance<'_>) -> Option<&NodeRef> {
        let name = state.get_value(&self.base.arguments[0]);
        let value = state.get_value(&self.base.arguments[1]);
        if let (Some(name), Some(value)) = (name, value) {
            state
                .string_globals
                .insert(name.as_string(), value.as_string());
        }
        Some(&self.base.outputs[0])
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::node::UNLINKED;
    use crate::vm::ScriptInstance;

    // Build a graph holding one producer wired to the given literal
    // arguments, and return (graph, producer id).
    fn producer_graph(node: Box<dyn Node>, args: Vec<Box<dyn Node>>) -> (Graph, u32) {
        let mut graph = Graph::new();
        let producer = graph.add_node(node);
        for (slot, arg) in args.into_iter().enumerate() {
            let id = graph.add_node(arg);
            graph.link_argument(producer, slot, id, 0).unwrap();
        }
        (graph, producer)
    }

    fn fetch(graph: &Graph, id: u32) -> Option<Value> {
        let state = ScriptInstance::new(graph);
        graph.node(id).unwrap().get_value(0, &state)
    }

    fn number(value: f32) -> Box<dyn Node> {
        Box::new(NumberLiteral::with_value(value))
    }

    fn boolean(value: bool) -> Box<dyn Node> {
        Box::new(BooleanLiteral::with_value(value))
    }

    #[test]
    fn literals_emit_their_constants() {
        let (graph, id) = producer_graph(boolean(true), vec![]);
        assert_eq!(fetch(&graph, id), Some(Value::Boolean(true)));

        let (graph, id) = producer_graph(number(2.5), vec![]);
        assert_eq!(fetch(&graph, id), Some(Value::Number(2.5)));

        let (graph, id) =
            producer_graph(Box::new(StringLiteral::with_value("tick")), vec![]);
        assert_eq!(fetch(&graph, id), Some(Value::Str(String::from("tick"))));
    }

    #[test]
    fn boolean_comparison_ops() {
        for (op, a, b, expected) in &[
            (BooleanOperation::And, true, true, true),
            (BooleanOperation::And, true, false, false),
            (BooleanOperation::Or, false, false, false),
            (BooleanOperation::Or, false, true, true),
        ] {
            let (graph, id) = producer_graph(
                Box::new(BooleanComparison::with_op(*op)),
                vec![boolean(*a), boolean(*b)],
            );
            assert_eq!(fetch(&graph, id), Some(Value::Boolean(*expected)));
        }
    }

    #[test]
    fn boolean_comparison_keeps_last_result_on_missing_arg() {
        let (mut graph, id) = producer_graph(
            Box::new(BooleanComparison::with_op(BooleanOperation::And)),
            vec![boolean(true), boolean(true)],
        );
        assert_eq!(fetch(&graph, id), Some(Value::Boolean(true)));

        // Unlink B: the stale true survives the failed fetch.
        graph.link_argument(id, 1, UNLINKED, UNLINKED).unwrap();
        assert_eq!(fetch(&graph, id), Some(Value::Boolean(true)));
    }

    #[test]
    fn not_comparison_negates_and_defaults_false() {
        let (graph, id) =
            producer_graph(Box::new(NotComparison::new()), vec![boolean(false)]);
        assert_eq!(fetch(&graph, id), Some(Value::Boolean(true)));

        let (graph, id) = producer_graph(Box::new(NotComparison::new()), vec![]);
        assert_eq!(fetch(&graph, id), Some(Value::Boolean(false)));
    }

    #[test]
    fn number_comparison_ops() {
        use NumberOperation::*;
        for (op, a, b, expected) in &[
            (GreaterThan, 2.0, 1.0, true),
            (GreaterThan, 1.0, 2.0, false),
            (GreaterThanEqual, 2.0, 2.0, true),
            (LessThan, 1.0, 2.0, true),
            (LessThanEqual, 2.0, 2.0, true),
            (Equal, 2.0, 2.0, true),
            (Equal, 2.0, 3.0, false),
            (NotEqual, 2.0, 3.0, true),
        ] {
            let (graph, id) = producer_graph(
                Box::new(NumberComparison::with_op(*op)),
                vec![number(*a), number(*b)],
            );
            assert_eq!(
                fetch(&graph, id),
                Some(Value::Boolean(*expected)),
                "{:?} {} {}",
                op,
                a,
                b
            );
        }
    }

    #[test]
    fn number_comparison_missing_arg_is_false() {
        let (graph, id) = producer_graph(
            Box::new(NumberComparison::with_op(NumberOperation::Equal)),
            vec![number(1.0)],
        );
        assert_eq!(fetch(&graph, id), Some(Value::Boolean(false)));
    }

    #[test]
    fn math_ops() {
        use MathOperation::*;
        for (op, a, b, expected) in &[
            (Add, 2.0, 3.0, 5.0),
            (Subtract, 2.0, 3.0, -1.0),
            (Multiply, 2.0, 3.0, 6.0),
            (Divide, 6.0, 3.0, 2.0),
            (Modulo, 7.0, 3.0, 1.0),
            (Modulo, 7.5, 2.5, 1.0),
            (Pow, 2.0, 3.0, 8.0),
        ] {
            let (graph, id) = producer_graph(
                Box::new(Math::with_op(*op)),
                vec![number(*a), number(*b)],
            );
            assert_eq!(
                fetch(&graph, id),
                Some(Value::Number(*expected)),
                "{:?} {} {}",
                op,
                a,
                b
            );
        }
    }

    #[test]
    fn divide_by_zero_is_ieee() {
        let (graph, id) = producer_graph(
            Box::new(Math::with_op(MathOperation::Divide)),
            vec![number(1.0), number(0.0)],
        );
        match fetch(&graph, id) {
            Some(Value::Number(value)) => assert!(value.is_infinite()),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn modulo_by_zero_is_zero() {
        let (graph, id) = producer_graph(
            Box::new(Math::with_op(MathOperation::Modulo)),
            vec![number(5.0), number(0.0)],
        );
        assert_eq!(fetch(&graph, id), Some(Value::Number(0.0)));
    }

    #[test]
    fn math_missing_arg_is_zero() {
        let (graph, id) = producer_graph(
            Box::new(Math::with_op(MathOperation::Add)),
            vec![number(1.0)],
        );
        assert_eq!(fetch(&graph, id), Some(Value::Number(0.0)));
    }

    #[test]
    fn loads_read_zero_for_unknown_names() {
        let (graph, id) = producer_graph(
            Box::new(LoadNumber::new()),
            vec![Box::new(StringLiteral::with_value("missing"))],
        );
        assert_eq!(fetch(&graph, id), Some(Value::Number(0.0)));

        let (graph, id) = producer_graph(
            Box::new(LoadBool::new()),
            vec![Box::new(StringLiteral::with_value("missing"))],
        );
        assert_eq!(fetch(&graph, id), Some(Value::Boolean(false)));

        let (graph, id) = producer_graph(
            Box::new(LoadString::new()),
            vec![Box::new(StringLiteral::with_value("missing"))],
        );
        assert_eq!(fetch(&graph, id), Some(Value::Str(String::new())));
    }

    #[test]
    fn loads_with_missing_name_argument_read_zero() {
        let (graph, id) = producer_graph(Box::new(LoadNumber::new()), vec![]);
        assert_eq!(fetch(&graph, id), Some(Value::Number(0.0)));
    }

    #[test]
    fn save_writes_the_matching_store() {
        let (graph, id) = producer_graph(
            Box::new(SaveNumber::new()),
            vec![
                Box::new(StringLiteral::with_value("n")),
                number(42.0),
            ],
        );
        let mut state = ScriptInstance::new(&graph);
        graph.node(id).unwrap().process(&mut state);
        assert_eq!(state.num_globals.get("n"), Some(&42.0));
    }

    #[test]
    fn save_with_missing_value_skips_the_write_and_proceeds() {
        let (graph, id) = producer_graph(
            Box::new(SaveNumber::new()),
            vec![Box::new(StringLiteral::with_value("n"))],
        );
        let mut state = ScriptInstance::new(&graph);
        let next = graph.node(id).unwrap().process(&mut state);
        assert!(next.is_some());
        assert!(state.num_globals.is_empty());
    }

    #[test]
    fn loop_payload_round_trips() {
        let mut source = Loop::with_iterations(10);
        source.base_mut().outputs[0].id = 5;
        source.base_mut().outputs[1].id = 2;
        source.base_mut().pos_x = 1.0;

        let mut writer = Writer::with_capacity(Node::data_size(&source));
        Node::write(&source, &mut writer);
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), Node::data_size(&source));

        let restored = Loop::load(&bytes).unwrap();
        assert_eq!(restored.base().outputs[0].id, 5);
        assert_eq!(restored.base().outputs[1].id, 2);
        assert_eq!(restored.base().pos_x, 1.0);
        let mut reader = Reader::new(&bytes);
        let mut check = Loop::new();
        Node::read(&mut check, &mut reader).unwrap();
        assert_eq!(check.iterations, 10);
    }

    #[test]
    fn operation_payloads_round_trip() {
        let source = Math::with_op(MathOperation::Pow);
        let mut writer = Writer::new();
        Node::write(&source, &mut writer);
        let bytes = writer.into_bytes();

        let mut restored = Math::new();
        Node::read(&mut restored, &mut Reader::new(&bytes)).unwrap();
        assert_eq!(restored.op, MathOperation::Pow);
    }

    #[test]
    fn bad_operation_index_is_rejected() {
        let source = NumberComparison::with_op(NumberOperation::NotEqual);
        let mut writer = Writer::new();
        Node::write(&source, &mut writer);
        let mut bytes = writer.into_bytes();
        // Stamp an out-of-range operation over the payload tail.
        let end = bytes.len();
        bytes[end - 4..].copy_from_slice(&99u32.to_le_bytes());
        assert_eq!(
            NumberComparison::load(&bytes).err(),
            Some(codec::Error::BadOperation(99))
        );
    }

    #[test]
    fn string_literal_payload_round_trips() {
        let source = StringLiteral::with_value("hello world");
        let mut writer = Writer::new();
        Node::write(&source, &mut writer);
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), Node::data_size(&source));

        let mut restored = StringLiteral::new();
        Node::read(&mut restored, &mut Reader::new(&bytes)).unwrap();
        assert_eq!(restored.value(), "hello world");
    }
}
