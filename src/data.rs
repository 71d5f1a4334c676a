// Host-side view of an instance's variable stores.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::vm::ScriptInstance;


// Snapshot of the three global stores, ordered so dumps are stable.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct VariableDump {
    pub booleans: BTreeMap<String, bool>,
    pub numbers: BTreeMap<String, f32>,
    pub strings: BTreeMap<String, String>,
}

impl VariableDump {
    pub fn capture(instance: &ScriptInstance<'_>) -> VariableDump {
        VariableDump {
            booleans: instance
                .bool_globals
                .iter()
                .map(|(name, value)| (name.clone(), *value))
                .collect(),
            numbers: instance
                .num_globals
                .iter()
                .map(|(name, value)| (name.clone(), *value))
                .collect(),
            strings: instance
                .string_globals
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| String::from("{}"))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::vm::ScriptInstance;

    #[test]
    fn captures_all_three_stores() {
        let graph = Graph::new();
        let mut instance = ScriptInstance::new(&graph);
        instance.bool_globals.insert(String::from("armed"), true);
        instance.num_globals.insert(String::from("n"), 5.0);
        instance
            .string_globals
            .insert(String::from("who"), String::from("world"));

        let dump = VariableDump::capture(&instance);
        assert_eq!(dump.booleans.get("armed"), Some(&true));
        assert_eq!(dump.numbers.get("n"), Some(&5.0));
        assert_eq!(dump.strings.get("who").map(String::as_str), Some("world"));

        let json = dump.to_json();
        assert!(json.contains("\"armed\": true"));
        assert!(json.contains("\"n\": 5.0"));
        assert!(json.contains("\"who\": \"world\""));
    }
}
