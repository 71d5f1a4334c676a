// The script value model.
//
// Scripts move exactly three kinds of data around: booleans, numbers
// and strings. Nodes consume their arguments by *requested* type, not
// by produced type, so every value must convert to every other kind.
// The conversions are total; there is no such thing as a type error at
// run time.

use regex::Regex;


// The three value kinds a port can carry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueType {
    Boolean,
    Number,
    String,
}


// A single script value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Boolean(bool),
    Number(f32),
    Str(String),
}


// The boolean spellings are fixed literals. Both directions of the
// string conversion must agree on them.
const TRUE_TEXT: &str = "true";
const FALSE_TEXT: &str = "false";


lazy_static! {
    // Longest leading decimal prefix, in the manner of C's atof.
    static ref NUMBER_PREFIX: Regex = Regex::new(
        r"^[ \t]*[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?"
    ).unwrap();
}


// Permissive string-to-number conversion: parse whatever numeric
// prefix is there, 0.0 when there is none.
fn parse_number(text: &str) -> f32 {
    match NUMBER_PREFIX.find(text) {
        Some(found) => found.as_str().trim_start().parse().unwrap_or(0.0),
        None => 0.0,
    }
}


impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Boolean(_) => ValueType::Boolean,
            Value::Number(_) => ValueType::Number,
            Value::Str(_) => ValueType::String,
        }
    }

    // Anything nonzero is true. A string is true unless it spells
    // "false"; note that this makes the empty string true.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Boolean(value) => *value,
            Value::Number(value) => *value != 0.0,
            Value::Str(value) => value != FALSE_TEXT,
        }
    }

    pub fn as_number(&self) -> f32 {
        match self {
            Value::Boolean(value) => {
                if *value {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(value) => *value,
            Value::Str(value) => parse_number(value),
        }
    }

    // Numbers render with six decimal places, matching the fixed
    // formatting of the persisted script format's home platform.
    pub fn as_string(&self) -> String {
        match self {
            Value::Boolean(value) => {
                String::from(if *value { TRUE_TEXT } else { FALSE_TEXT })
            }
            Value::Number(value) => format!("{:.6}", value),
            Value::Str(value) => value.clone(),
        }
    }
}
