//! Binding allocation for parameterized Gremlin scripts.
//!
//! Every value that reaches a script goes through a `BindingAllocator`, the
//! script text only ever contains the generated names. Names come from a
//! per-script counter (`_b0`, `_b1`, ...) so they cannot collide with each
//! other whatever the filter keys or property names look like.

use serde_json::Value;

use super::Bindings;

const BINDING_PREFIX: &str = "_b";

#[derive(Debug, Default)]
pub struct BindingAllocator {
    next: usize,
    bindings: Bindings,
}

impl BindingAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind one value and return its name.
    pub fn bind(&mut self, value: impl Into<Value>) -> String {
        let name = format!("{}{}", BINDING_PREFIX, self.next);
        self.next += 1;
        self.bindings.insert(name.clone(), value.into());
        name
    }

    /// Bind a set of filter values and return the matching predicate:
    /// the bare name for one value, `within(...)` for several.
    pub fn bind_predicate(&mut self, values: &[String]) -> String {
        if let [single] = values {
            return self.bind(single.as_str());
        }
        let names: Vec<String> = values.iter().map(|v| self.bind(v.as_str())).collect();
        format!("within({})", names.join(","))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn into_bindings(self) -> Bindings {
        self.bindings
    }
}
