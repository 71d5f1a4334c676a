// The node type registry.
//
// Maps a persisted type name to the pair of factories the loader
// needs: construct-empty (for the editor) and construct-from-payload
// (for the codec). Hosts populate it once at startup — explicitly, so
// there is no static-initializer ordering to trip over — and treat it
// as read-only afterwards.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::codec;
use crate::node::Node;
use crate::nodes::*;


pub type CreateFn = fn() -> Box<dyn Node>;
pub type LoadFn = fn(&[u8]) -> Result<Box<dyn Node>, codec::Error>;

struct Factory {
    create: CreateFn,
    load: LoadFn,
}

lazy_static! {
    static ref NODE_TYPES: RwLock<BTreeMap<String, Factory>> =
        RwLock::new(BTreeMap::new());
}


pub fn register(type_name: &str, create: CreateFn, load: LoadFn) {
    log::debug!("registering node type {:?}", type_name);
    NODE_TYPES
        .write()
        .unwrap()
        .insert(String::from(type_name), Factory { create, load });
}

// Construct an empty node of the named type, or None when the type is
// not registered.
pub fn create(type_name: &str) -> Option<Box<dyn Node>> {
    let types = NODE_TYPES.read().unwrap();
    types.get(type_name).map(|factory| (factory.create)())
}

// Construct a node of the named type from its persisted payload.
// None when the type is not registered; the inner Result carries any
// payload decode failure.
pub fn load(type_name: &str, data: &[u8]) -> Option<Result<Box<dyn Node>, codec::Error>> {
    let types = NODE_TYPES.read().unwrap();
    let factory = types.get(type_name)?;
    Some((factory.load)(data))
}

// Registered type names, sorted.
pub fn type_names() -> Vec<String> {
    NODE_TYPES.read().unwrap().keys().cloned().collect()
}

// The built-in catalog.
pub fn register_defaults() {
    register(EntryNode::TYPE_NAME, EntryNode::create, EntryNode::load);
    register(Condition::TYPE_NAME, Condition::create, Condition::load);
    register(Loop::TYPE_NAME, Loop::create, Loop::load);
    register(
        BooleanComparison::TYPE_NAME,
        BooleanComparison::create,
        BooleanComparison::load,
    );
    register(
        NotComparison::TYPE_NAME,
        NotComparison::create,
        NotComparison::load,
    );
    register(
        NumberComparison::TYPE_NAME,
        NumberComparison::create,
        NumberComparison::load,
    );
    register(Math::TYPE_NAME, Math::create, Math::load);
    register(
        BooleanLiteral::TYPE_NAME,
        BooleanLiteral::create,
        BooleanLiteral::load,
    );
    register(
        NumberLiteral::TYPE_NAME,
        NumberLiteral::create,
        NumberLiteral::load,
    );
    register(
        StringLiteral::TYPE_NAME,
        StringLiteral::create,
        StringLiteral::load,
    );
    register(PrintLog::TYPE_NAME, PrintLog::create, PrintLog::load);
    register(LoadBool::TYPE_NAME, LoadBool::create, LoadBool::load);
    register(SaveBool::TYPE_NAME, SaveBool::create, SaveBool::load);
    register(LoadNumber::TYPE_NAME, LoadNumber::create, LoadNumber::load);
    register(SaveNumber::TYPE_NAME, SaveNumber::create, SaveNumber::load);
    register(LoadString::TYPE_NAME, LoadString::create, LoadString::load);
    register(SaveString::TYPE_NAME, SaveString::create, SaveString::load);
}
