use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Key suffix of the property that carries a metadata value's cardinality.
pub const CARDINALITY_SUFFIX: &str = "@ifmap-cardinality]";
/// Key suffix of the property that carries the publish timestamp.
pub const TIMESTAMP_SUFFIX: &str = "@ifmap-timestamp]";

const SINGLE_VALUE: &str = "singleValue";

/// Insertion-ordered key/value properties.
///
/// Order is kept for display and serialization; equality and hashing ignore it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(IndexMap<String, String>);

impl Properties {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// First value whose key ends with `suffix`.
    pub fn find_by_suffix(&self, suffix: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.ends_with(suffix))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries sorted by key, the canonical order used for hashing and digests.
    pub fn sorted(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self.iter().collect();
        entries.sort_unstable();
        entries
    }
}

impl PartialEq for Properties {
    fn eq(&self, other: &Self) -> bool {
        // IndexMap equality is already order-independent.
        self.0 == other.0
    }
}

impl Eq for Properties {}

impl Hash for Properties {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let sorted = self.sorted();
        sorted.len().hash(state);
        for (k, v) in sorted {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<IndexMap<String, String>> for Properties {
    fn from(map: IndexMap<String, String>) -> Self {
        Self(map)
    }
}

// ── Identifier ───────────────────────────────────────────────

/// A typed vertex of the metadata graph (device, ip-address, access-request, ...).
///
/// Two identifiers are equal when their type and property sets match; the raw
/// XML the data service may ship along is carried but never compared.
#[derive(Debug, Clone)]
pub struct Identifier {
    pub type_name: String,
    pub properties: Properties,
    pub raw_data: Option<String>,
}

impl Identifier {
    pub fn new(type_name: impl Into<String>, properties: Properties) -> Self {
        Self {
            type_name: type_name.into(),
            properties,
            raw_data: None,
        }
    }

    pub fn with_raw_data(mut self, raw: impl Into<String>) -> Self {
        self.raw_data = Some(raw.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key)
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.properties == other.properties
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_name.hash(state);
        self.properties.hash(state);
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.type_name)?;
        for (i, (k, v)) in self.properties.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        write!(f, "}}")
    }
}

// ── Metadata ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    Single,
    Multi,
}

impl Cardinality {
    /// Read the cardinality from a property set. No cardinality property means single.
    pub fn from_properties(properties: &Properties) -> Self {
        match properties.find_by_suffix(CARDINALITY_SUFFIX) {
            Some(SINGLE_VALUE) | None => Cardinality::Single,
            Some(_) => Cardinality::Multi,
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::Single => write!(f, "single"),
            Cardinality::Multi => write!(f, "multi"),
        }
    }
}

/// A typed value attached to one identifier or linking two identifiers.
///
/// `PartialEq` is content equality. Use [`Metadata::slot_eq`] for the
/// replace-vs-accumulate relation the graph applies on insertion.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub type_name: String,
    pub properties: Properties,
    pub raw_data: Option<String>,
    cardinality: Cardinality,
    published_at: Option<DateTime<Utc>>,
}

impl Metadata {
    pub fn new(type_name: impl Into<String>, properties: Properties) -> Self {
        let type_name = type_name.into();
        let cardinality = Cardinality::from_properties(&properties);
        let published_at = properties.find_by_suffix(TIMESTAMP_SUFFIX).and_then(|raw| {
            match DateTime::parse_from_rfc3339(raw) {
                Ok(ts) => Some(ts.with_timezone(&Utc)),
                Err(e) => {
                    tracing::warn!(metadata = %type_name, value = raw, error = %e, "unparsable publish timestamp");
                    None
                }
            }
        });
        Self {
            type_name,
            properties,
            raw_data: None,
            cardinality,
            published_at,
        }
    }

    pub fn with_raw_data(mut self, raw: impl Into<String>) -> Self {
        self.raw_data = Some(raw.into());
        self
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn is_single_value(&self) -> bool {
        self.cardinality == Cardinality::Single
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key)
    }

    /// Whether `self` and `other` occupy the same slot between the same endpoints.
    ///
    /// Two single-valued values of one type always share the slot. Two
    /// multi-valued values share it only when their content is identical. A
    /// single-valued and a multi-valued value never do.
    pub fn slot_eq(&self, other: &Metadata) -> bool {
        if self.type_name != other.type_name {
            return false;
        }
        match (self.cardinality, other.cardinality) {
            (Cardinality::Single, Cardinality::Single) => true,
            (Cardinality::Multi, Cardinality::Multi) => self.properties == other.properties,
            _ => false,
        }
    }
}

impl PartialEq for Metadata {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
            && self.cardinality == other.cardinality
            && self.properties == other.properties
    }
}

impl Eq for Metadata {}

impl Hash for Metadata {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_name.hash(state);
        self.cardinality.hash(state);
        self.properties.hash(state);
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.type_name, self.cardinality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> Properties {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    fn meta(type_name: &str, cardinality: &str, extra: &[(&str, &str)]) -> Metadata {
        let key = format!("/meta:{type_name}[@ifmap-cardinality]");
        let mut p = props(extra);
        p.insert(key, cardinality);
        Metadata::new(type_name, p)
    }

    #[test]
    fn properties_equality_ignores_order() {
        let a = props(&[("x", "1"), ("y", "2")]);
        let b = props(&[("y", "2"), ("x", "1")]);
        assert_eq!(a, b);

        use std::collections::hash_map::DefaultHasher;
        let mut ha = DefaultHasher::new();
        let mut hb = DefaultHasher::new();
        a.hash(&mut ha);
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn identifier_equality_ignores_raw_data() {
        let a = Identifier::new("device", props(&[("/device/name", "dev1")]));
        let b = a.clone().with_raw_data("<device><name>dev1</name></device>");
        assert_eq!(a, b);

        let c = Identifier::new("device", props(&[("/device/name", "dev2")]));
        assert_ne!(a, c);
    }

    #[test]
    fn cardinality_defaults_to_single() {
        let m = Metadata::new("device-ip", Properties::new());
        assert_eq!(m.cardinality(), Cardinality::Single);
        assert_eq!(meta("event", "multiValue", &[]).cardinality(), Cardinality::Multi);
        assert_eq!(meta("device-ip", "singleValue", &[]).cardinality(), Cardinality::Single);
    }

    #[test]
    fn single_values_share_slot_regardless_of_content() {
        let a = meta("device-ip", "singleValue", &[("/meta:device-ip[@ifmap-publisher-id]", "a")]);
        let b = meta("device-ip", "singleValue", &[("/meta:device-ip[@ifmap-publisher-id]", "b")]);
        assert!(a.slot_eq(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn multi_values_share_slot_only_with_same_content() {
        let a = meta("event", "multiValue", &[("/meta:event/name", "a")]);
        let b = meta("event", "multiValue", &[("/meta:event/name", "b")]);
        let a2 = meta("event", "multiValue", &[("/meta:event/name", "a")]);
        assert!(!a.slot_eq(&b));
        assert!(a.slot_eq(&a2));
    }

    #[test]
    fn mixed_cardinality_never_shares_slot() {
        let single = meta("event", "singleValue", &[]);
        let multi = meta("event", "multiValue", &[]);
        assert!(!single.slot_eq(&multi));
        assert!(!multi.slot_eq(&single));
    }

    #[test]
    fn different_types_never_share_slot() {
        let a = meta("device-ip", "singleValue", &[]);
        let b = meta("ip-mac", "singleValue", &[]);
        assert!(!a.slot_eq(&b));
    }

    #[test]
    fn publish_timestamp_is_parsed() {
        let m = meta(
            "ip-mac",
            "multiValue",
            &[("/meta:ip-mac[@ifmap-timestamp]", "2014-09-04T14:22:51+02:00")],
        );
        let ts = m.published_at().unwrap();
        assert_eq!(ts.to_rfc3339(), "2014-09-04T12:22:51+00:00");

        let broken = meta("ip-mac", "multiValue", &[("/meta:ip-mac[@ifmap-timestamp]", "yesterday")]);
        assert!(broken.published_at().is_none());
    }
}
