//! Deduplicate a bag of remote-registry entries by ID, keeping the copy
//! with the largest `modify_index`.
//!
//! Generic over whatever entry shape the caller has, so this stays pure and
//! testable without depending on `discovery_infra`'s wire types.

use std::collections::HashMap;

/// The two fields dedup needs from an entry; implemented by
/// `discovery_infra`'s `RemoteEntry` for real use and by plain tuples in
/// tests.
pub trait Identified {
    fn entry_id(&self) -> &str;
    fn modify_index(&self) -> u64;
}

/// For any duplicate `id`, keeps the entry with the largest `modify_index`.
/// Order among distinct IDs is not preserved.
pub fn dedup_by_id<T: Identified>(entries: Vec<T>) -> Vec<T> {
    let mut best: HashMap<String, T> = HashMap::with_capacity(entries.len());
    for entry in entries {
        match best.get(entry.entry_id()) {
            Some(existing) if existing.modify_index() >= entry.modify_index() => {}
            _ => {
                best.insert(entry.entry_id().to_string(), entry);
            }
        }
    }
    best.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct TestEntry {
        id: &'static str,
        modify_index: u64,
    }

    impl Identified for TestEntry {
        fn entry_id(&self) -> &str {
            self.id
        }
        fn modify_index(&self) -> u64 {
            self.modify_index
        }
    }

    #[test]
    fn keeps_at_most_one_per_id() {
        let entries = vec![
            TestEntry { id: "a", modify_index: 1 },
            TestEntry { id: "a", modify_index: 5 },
            TestEntry { id: "b", modify_index: 2 },
        ];
        let result = dedup_by_id(entries);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn keeps_the_highest_modify_index() {
        let entries = vec![
            TestEntry { id: "a", modify_index: 1 },
            TestEntry { id: "a", modify_index: 5 },
            TestEntry { id: "a", modify_index: 3 },
        ];
        let result = dedup_by_id(entries);
        assert_eq!(result, vec![TestEntry { id: "a", modify_index: 5 }]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let entries: Vec<TestEntry> = vec![];
        assert!(dedup_by_id(entries).is_empty());
    }
}
