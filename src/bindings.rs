//! Named variables exposed to an expression during one evaluation

use serde_json::Value;

/// Insertion-ordered set of variable bindings.
///
/// Built fresh for every evaluation call and dropped afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    entries: Vec<(String, Value)>,
}

impl Bindings {
    /// Create an empty binding set
    pub fn new() -> Self {
        Self::default()
    }

    /// Binding set holding a single variable
    pub fn single(name: &str, value: Value) -> Self {
        let mut bindings = Self::new();
        bindings.insert(name, value);
        bindings
    }

    /// Bind a variable, replacing an earlier binding of the same name in place
    pub fn insert(&mut self, name: &str, value: Value) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Variable names in binding order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Error text for a name that is not bound, listing what is
    pub fn unbound(&self, name: &str) -> String {
        if self.is_empty() {
            return format!("'{}' is not bound (no variables are bound)", name);
        }
        let bound: Vec<&str> = self.names().collect();
        format!("'{}' is not bound (bound: {})", name, bound.join(", "))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Follow a dotted property path (`address.city`, `items.0`) into a value.
///
/// Object keys are matched by name and array elements by numeric segment.
/// Returns `None` as soon as a segment does not resolve.
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() {
        return Some(value);
    }

    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
