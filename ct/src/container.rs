//! Type-keyed multi-value cargo container

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::key::TypeKey;
use crate::registry::TypeHierarchy;

type Entries = BTreeMap<TypeKey, Vec<Vec<u8>>>;

/// Serialized items waiting for delivery, or merged in from one
///
/// Each key maps to a FIFO list of payloads, oldest first. A key is present
/// only while its list is non-empty. Iteration order over keys is the key
/// order, so a given container always flattens the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CargoContainer {
    entries: Entries,
}

impl CargoContainer {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_entries(mut entries: Entries) -> Self {
        entries.retain(|_, payloads| !payloads.is_empty());
        Self { entries }
    }

    /// Append a payload under `type_key`
    pub fn insert(&mut self, type_key: TypeKey, payload: Vec<u8>) {
        self.entries.entry(type_key).or_default().push(payload);
    }

    /// Payloads stored under exactly `type_key`, oldest first
    pub fn lookup_exact(&self, type_key: &TypeKey) -> &[Vec<u8>] {
        self.entries.get(type_key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Payloads whose key is assignable to `type_key`, flattened in key order
    pub fn lookup_assignable<'a>(
        &'a self,
        type_key: &TypeKey,
        hierarchy: &dyn TypeHierarchy,
    ) -> Vec<(&'a TypeKey, &'a [u8])> {
        self.entries
            .iter()
            .filter(|(key, _)| hierarchy.is_assignable(type_key, key))
            .flat_map(|(key, payloads)| payloads.iter().map(move |p| (key, p.as_slice())))
            .collect()
    }

    /// New container with `incoming` appended after this one
    ///
    /// For a key present in both, the receiver's payloads stay first. Neither
    /// input is modified.
    pub fn merge_left(&self, incoming: &CargoContainer) -> CargoContainer {
        let mut merged = self.clone();
        for (key, payloads) in &incoming.entries {
            merged
                .entries
                .entry(key.clone())
                .or_default()
                .extend(payloads.iter().cloned());
        }
        merged
    }

    /// Total number of payloads across all keys
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, type_key: &TypeKey) -> usize {
        self.lookup_exact(type_key).len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &TypeKey> {
        self.entries.keys()
    }

    /// (key, payload count) pairs in key order
    pub fn summary(&self) -> Vec<(TypeKey, usize)> {
        self.entries
            .iter()
            .map(|(key, payloads)| (key.clone(), payloads.len()))
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Serialize for CargoContainer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CargoContainer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Entries::deserialize(deserializer).map(Self::from_entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ExactHierarchy, TypeRegistry};
    use crate::BincodeGrapple;
    use proptest::prelude::*;

    fn key(name: &str) -> TypeKey {
        TypeKey::named(name)
    }

    fn container(items: &[(&str, &[u8])]) -> CargoContainer {
        let mut c = CargoContainer::new();
        for (k, payload) in items {
            c.insert(key(k), payload.to_vec());
        }
        c
    }

    #[test]
    fn test_lookup_exact_absent_key_is_empty() {
        let c = container(&[("a", b"1")]);
        assert!(c.lookup_exact(&key("b")).is_empty());
        assert_eq!(c.count(&key("b")), 0);
    }

    #[test]
    fn test_insert_keeps_duplicates() {
        let c = container(&[("a", b"x"), ("a", b"x")]);
        assert_eq!(c.lookup_exact(&key("a")), &[b"x".to_vec(), b"x".to_vec()]);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_lookup_assignable_exact() {
        let c = container(&[("a", b"1"), ("b", b"2"), ("a", b"3")]);
        let found: Vec<&[u8]> = c
            .lookup_assignable(&key("a"), &ExactHierarchy)
            .into_iter()
            .map(|(_, p)| p)
            .collect();
        assert_eq!(found, vec![b"1".as_slice(), b"3".as_slice()]);
    }

    #[test]
    fn test_lookup_assignable_includes_subtypes() {
        let hierarchy = TypeRegistry::<BincodeGrapple>::new()
            .assignable_key(key("shape"), key("circle"))
            .assignable_key(key("shape"), key("square"));
        let c = container(&[("square", b"s1"), ("circle", b"c1"), ("other", b"o1"), ("circle", b"c2")]);

        let found: Vec<(String, Vec<u8>)> = c
            .lookup_assignable(&key("shape"), &hierarchy)
            .into_iter()
            .map(|(k, p)| (k.to_string(), p.to_vec()))
            .collect();
        assert_eq!(
            found,
            vec![
                ("circle".to_string(), b"c1".to_vec()),
                ("circle".to_string(), b"c2".to_vec()),
                ("square".to_string(), b"s1".to_vec()),
            ]
        );
    }

    #[test]
    fn test_merge_left_adopts_new_keys() {
        let a = container(&[("a", b"1")]);
        let b = container(&[("b", b"2")]);
        let merged = a.merge_left(&b);
        assert_eq!(merged.lookup_exact(&key("a")), &[b"1".to_vec()]);
        assert_eq!(merged.lookup_exact(&key("b")), &[b"2".to_vec()]);
    }

    #[test]
    fn test_merge_left_into_empty() {
        let b = container(&[("b", b"2"), ("b", b"3")]);
        assert_eq!(CargoContainer::new().merge_left(&b), b);
    }

    #[test]
    fn test_deserialize_drops_empty_sequences() {
        let mut raw = Entries::new();
        raw.insert(key("empty"), Vec::new());
        raw.insert(key("full"), vec![b"1".to_vec()]);
        let bytes = bincode::serialize(&raw).unwrap();

        let c: CargoContainer = bincode::deserialize(&bytes).unwrap();
        assert_eq!(c.keys().collect::<Vec<_>>(), vec![&key("full")]);
    }

    #[test]
    fn test_summary_and_clear() {
        let mut c = container(&[("b", b"1"), ("a", b"2"), ("b", b"3")]);
        assert_eq!(c.summary(), vec![(key("a"), 1), (key("b"), 2)]);
        c.clear();
        assert!(c.is_empty());
        assert_eq!(c.len(), 0);
    }

    fn entries_strategy() -> impl Strategy<Value = Vec<(u8, Vec<u8>)>> {
        prop::collection::vec((0u8..4, prop::collection::vec(any::<u8>(), 0..8)), 0..24)
    }

    fn build(items: &[(u8, Vec<u8>)]) -> CargoContainer {
        let mut c = CargoContainer::new();
        for (k, payload) in items {
            c.insert(key(&format!("k{k}")), payload.clone());
        }
        c
    }

    proptest! {
        #[test]
        fn prop_lookup_exact_returns_inserts_in_order(items in entries_strategy()) {
            let c = build(&items);
            for k in 0u8..4 {
                let expected: Vec<Vec<u8>> = items
                    .iter()
                    .filter(|(ik, _)| *ik == k)
                    .map(|(_, p)| p.clone())
                    .collect();
                prop_assert_eq!(c.lookup_exact(&key(&format!("k{k}"))), expected.as_slice());
            }
        }

        #[test]
        fn prop_merge_left_appends_without_mutation(left in entries_strategy(), right in entries_strategy()) {
            let a = build(&left);
            let b = build(&right);
            let a_before = a.clone();
            let b_before = b.clone();

            let merged = a.merge_left(&b);

            prop_assert_eq!(&a, &a_before);
            prop_assert_eq!(&b, &b_before);
            prop_assert_eq!(merged.len(), a.len() + b.len());
            for k in 0u8..4 {
                let k = key(&format!("k{k}"));
                let mut expected = a.lookup_exact(&k).to_vec();
                expected.extend_from_slice(b.lookup_exact(&k));
                prop_assert_eq!(merged.lookup_exact(&k), expected.as_slice());
            }
        }
    }
}
