use indexmap::IndexMap;
use serde::Serialize;

/// Variable bindings collected during one matching attempt.
///
/// The first value bound to a name wins; later occurrences of the variable
/// must agree with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RelationTable(IndexMap<String, String>);

impl RelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Bind `name` unless it is already bound. Returns whether a binding was made.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        match self.0.entry(name.into()) {
            indexmap::map::Entry::Occupied(_) => false,
            indexmap::map::Entry::Vacant(slot) => {
                slot.insert(value.into());
                true
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RelationTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = RelationTable::new();
        for (k, v) in iter {
            table.bind(k, v);
        }
        table
    }
}
