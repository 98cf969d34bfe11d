//! Per-call execution context.
//!
//! Every render executes against a [`CallScope`]: the bound data plus the
//! functions that exist for that call only. Lookups check the call bindings
//! first, then `this`, then the fields of the bound data. Names not found
//! fall through to the set-wide globals.

use std::collections::BTreeMap;
use std::sync::Arc;

use minijinja::value::Object;
use minijinja::Value;

use super::FuncMap;

/// Name under which the whole bound data is reachable.
pub const THIS: &str = "this";

/// The context object a template executes against.
#[derive(Debug, Clone, Default)]
pub struct CallScope {
    data: Value,
    bindings: BTreeMap<String, Value>,
}

impl CallScope {
    /// Scope over `data` with no call bindings.
    pub fn new(data: Value) -> Self {
        Self {
            data,
            bindings: BTreeMap::new(),
        }
    }

    /// Adds every function from `funcs` to the call bindings.
    pub fn with_funcs(mut self, funcs: &FuncMap) -> Self {
        self.bindings
            .extend(funcs.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Binds a single name.
    pub fn bind(mut self, name: impl Into<String>, value: Value) -> Self {
        self.bindings.insert(name.into(), value);
        self
    }

    /// The bound data.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Converts the scope into an engine value.
    pub fn into_value(self) -> Value {
        Value::from_object(self)
    }
}

impl Object for CallScope {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let key = key.as_str()?;
        if let Some(value) = self.bindings.get(key) {
            return Some(value.clone());
        }
        if key == THIS {
            return Some(self.data.clone());
        }
        match self.data.get_attr(key) {
            Ok(value) if !value.is_undefined() => Some(value),
            _ => None,
        }
    }
}
