//! Named index spaces for states, actions, and observations.

use std::{collections::HashMap, ops::Range};

/// An ordered sequence of unique labels.
///
/// Labels are either taken verbatim from a header line or synthesized as
/// `"0"`, `"1"`, ..., `"N-1"` from a bare count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameSpace {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl NameSpace {
    /// Synthesizes the labels `"0"` to `"count-1"`.
    pub fn synthesized(count: usize) -> Self {
        Self::from_unique((0..count).map(|idx| idx.to_string()).collect())
    }

    /// Uses the given labels, returning the first duplicate as error.
    pub fn named<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Result<Self, String> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut index = HashMap::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            if index.insert(name.clone(), idx).is_some() {
                return Err(name.clone());
            }
        }
        Ok(Self { names, index })
    }

    fn from_unique(names: Vec<String>) -> Self {
        let index = names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        Self { names, index }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, idx: usize) -> Option<&str> {
        self.names.get(idx).map(String::as_str)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Resolves a table field into the indices it denotes.
    ///
    /// `*` denotes the whole space. Otherwise the field is looked up as a
    /// label and, failing that, read as a 0-based index.
    pub fn resolve(&self, field: &str) -> Option<IndexSet> {
        if field == "*" {
            return Some(IndexSet::All(self.len()));
        }
        self.index_of(field)
            .or_else(|| field.parse::<usize>().ok().filter(|idx| *idx < self.len()))
            .map(IndexSet::One)
    }
}

/// The indices a single table field resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexSet {
    All(usize),
    One(usize),
}

impl IndexSet {
    pub fn indices(&self) -> Range<usize> {
        match *self {
            IndexSet::All(size) => 0..size,
            IndexSet::One(idx) => idx..idx + 1,
        }
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.indices().contains(&idx)
    }

    pub fn is_all(&self) -> bool {
        matches!(self, IndexSet::All(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesizes_labels() {
        let space = NameSpace::synthesized(3);
        assert_eq!(space.names(), ["0", "1", "2"]);
        assert_eq!(space.index_of("2"), Some(2));
    }

    #[test]
    fn rejects_duplicates() {
        assert_eq!(NameSpace::named(["a", "b", "a"]), Err("a".to_owned()));
    }

    #[test]
    fn resolves_fields() {
        let space = NameSpace::named(["left", "right"]).unwrap();
        assert_eq!(space.resolve("*"), Some(IndexSet::All(2)));
        assert_eq!(space.resolve("right"), Some(IndexSet::One(1)));
        assert_eq!(space.resolve("0"), Some(IndexSet::One(0)));
        assert_eq!(space.resolve("2"), None);
        assert_eq!(space.resolve("middle"), None);
    }

    #[test]
    fn index_sets_enumerate_indices() {
        assert_eq!(IndexSet::All(3).indices().collect::<Vec<_>>(), [0, 1, 2]);
        assert_eq!(IndexSet::One(1).indices().collect::<Vec<_>>(), [1]);
        assert!(IndexSet::All(3).contains(2));
        assert!(!IndexSet::One(1).contains(0));
    }
}
