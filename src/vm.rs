// The script interpreter.
//
// *Execution model*
//
// An instance binds to one graph and walks it one node at a time. Each
// step asks the current node to Process itself; the node answers with
// the output ref control should follow, or nothing to end the branch.
// When a branch ends the engine pops the return stack — loop nodes
// push themselves there before running their body, which is the whole
// mechanism by which "do the body, then come back" works — and halts
// once the stack is empty.
//
// *Values*
//
// Control flow and data flow are separate. While a node processes it
// may demand argument values; the engine resolves each demand to the
// producing node and asks it for the right value port. Producers are
// never Processed by a demand — fetching is a read. Cyclic demand
// chains are not detected; authors get the graphs they draw.
//
// *Stepping*
//
// step() is a plain synchronous call and the only way anything runs.
// run() just drives step() to completion. A host that wants to
// interleave script execution with its own work calls step() at
// whatever pace suits it; there is nothing to cancel, it simply stops
// calling.
//
// *State*
//
// Everything mutable during a run lives here, not in the graph: the
// current node, the return stack, a per-node integer scratchpad (loop
// counters), and one global variable store per value type. Two
// instances over the same graph interfere only through node-internal
// result caches, which is why a graph is single-instance while it is
// actually running.

use std::collections::HashMap;

use crate::graph::Graph;
use crate::node::{ArgRef, UNLINKED};
use crate::output;
use crate::value::Value;


// What a start/step/run call left behind.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunResult {
    Error,
    Complete,
    Incomplete,
}


type InstanceSink = Box<dyn FnMut(&str)>;


pub struct ScriptInstance<'g> {
    graph: &'g Graph,
    pub current: u32,
    pub return_stack: Vec<u32>,
    // Per-node integer scratch; the loop keeps its iteration counter
    // here so the node itself stays immutable during a run.
    pub node_state: HashMap<u32, i32>,
    pub bool_globals: HashMap<String, bool>,
    pub num_globals: HashMap<String, f32>,
    pub string_globals: HashMap<String, String>,
    running: bool,
    sink: Option<InstanceSink>,
}

impl<'g> ScriptInstance<'g> {
    pub fn new(graph: &'g Graph) -> ScriptInstance<'g> {
        ScriptInstance {
            graph,
            current: UNLINKED,
            return_stack: Vec::new(),
            node_state: HashMap::new(),
            bool_globals: HashMap::new(),
            num_globals: HashMap::new(),
            string_globals: HashMap::new(),
            running: false,
            sink: None,
        }
    }

    // Route this instance's script log here instead of the
    // process-wide sink.
    pub fn set_sink<F>(&mut self, sink: F)
    where
        F: FnMut(&str) + 'static,
    {
        self.sink = Some(Box::new(sink));
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn reset(&mut self) {
        self.current = UNLINKED;
        self.return_stack.clear();
        self.node_state.clear();
        self.bool_globals.clear();
        self.num_globals.clear();
        self.string_globals.clear();
        self.running = false;
    }

    // Begin a run at the named entry point and take the first step.
    pub fn start(&mut self, entry_point: &str) -> RunResult {
        if self.running {
            return RunResult::Error;
        }
        self.reset();
        let id = match self.graph.entry(entry_point) {
            Some(id) => id,
            None => return RunResult::Error,
        };
        self.current = id;
        self.running = true;
        self.step()
    }

    // Advance by one node. Incomplete while there is more to do.
    pub fn step(&mut self) -> RunResult {
        if !self.running {
            return RunResult::Complete;
        }
        if self.run_step() {
            RunResult::Incomplete
        } else {
            self.running = false;
            RunResult::Complete
        }
    }

    // Drive a fresh run to completion.
    pub fn run(&mut self, entry_point: &str) -> RunResult {
        let mut result = self.start(entry_point);
        while result == RunResult::Incomplete {
            result = self.step();
        }
        result
    }

    // One interpreter cycle. Returns false once the script has halted.
    fn run_step(&mut self) -> bool {
        let graph = self.graph;
        let node = match graph.node(self.current) {
            Some(node) => node,
            None => return self.pop_or_halt(),
        };
        let next = node.process(self);
        log::trace!(
            "step: node={} type={} next={:?} stack={}",
            node.base().id,
            node.type_name(),
            next.map(|target| target.id),
            self.return_stack.len()
        );
        match next {
            Some(target) if graph.node(target.id).is_some() => {
                self.current = target.id;
                true
            }
            // Branch over: unlinked, dangling, or refused.
            _ => self.pop_or_halt(),
        }
    }

    fn pop_or_halt(&mut self) -> bool {
        match self.return_stack.pop() {
            Some(id) => {
                self.current = id;
                true
            }
            None => {
                self.current = UNLINKED;
                false
            }
        }
    }

    // Resolve a value demand against its producing node. A pure read;
    // control-flow state is untouched.
    pub fn get_value(&self, argument: &ArgRef) -> Option<Value> {
        let node = self.graph.node(argument.id)?;
        node.get_value(argument.value_id, self)
    }

    // Called by a loop taking its Cycle branch: control returns to the
    // pushed node when the body's branch ends.
    pub fn push_return_node(&mut self) {
        self.return_stack.push(self.current);
    }

    // Forward one script log line to whichever sink applies.
    pub fn emit_log(&mut self, message: &str) {
        match self.sink.as_mut() {
            Some(sink) => sink(message),
            None => output::emit(message),
        }
    }
}
