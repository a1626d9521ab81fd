use std::collections::BTreeMap;

/// A scalar carried inside an [`Event`]'s data map, or produced by guard
/// evaluation / literal parsing on the CLI's event wire form.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Value {
    Number(f64),
    Str(String),
    Bool(bool),
    Array(Vec<Value>),
    Null,
}

/// An event fired at, or raised internally by, the interpreter.
///
/// Equality is by name *and* data, matching the spec: two events with the
/// same name but different payloads are distinct.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub data: BTreeMap<String, Value>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}
