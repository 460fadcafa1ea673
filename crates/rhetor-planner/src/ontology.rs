//! Concept hierarchies

use std::collections::{BTreeSet, HashMap, HashSet};

/// Distance between unrelated or unknown concepts.
pub const MAX_DISTANCE: f64 = f64::MAX;

pub trait Ontology {
    /// Reflexive, transitive subsumption.
    fn is_a(&self, child: &str, parent: &str) -> bool;

    /// Symmetric semantic distance; `0` for equal concepts.
    fn distance(&self, a: &str, b: &str) -> f64;
}

/// Ontology with no structure: every concept only subsumes itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatOntology;

impl Ontology for FlatOntology {
    fn is_a(&self, child: &str, parent: &str) -> bool {
        child == parent
    }

    fn distance(&self, a: &str, b: &str) -> f64 {
        if a == b {
            0.0
        } else {
            1.0
        }
    }
}

/// Concept hierarchy stored as a child → parents map.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    parents: HashMap<String, BTreeSet<String>>,
}

impl Taxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_parent(&mut self, child: impl Into<String>, parent: impl Into<String>) {
        self.parents
            .entry(child.into())
            .or_default()
            .insert(parent.into());
    }

    /// Whether `concept` has at least one recorded parent.
    pub fn contains(&self, concept: &str) -> bool {
        self.parents.contains_key(concept)
    }

    pub fn parents(&self, concept: &str) -> impl Iterator<Item = &str> {
        self.parents
            .get(concept)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    fn expand(&self, set: &mut HashSet<String>) -> bool {
        let before = set.len();
        let grandparents: Vec<String> = set
            .iter()
            .flat_map(|concept| self.parents(concept))
            .map(str::to_string)
            .collect();
        set.extend(grandparents);
        set.len() != before
    }
}

impl Ontology for Taxonomy {
    fn is_a(&self, child: &str, parent: &str) -> bool {
        if child == parent {
            return true;
        }
        let mut seen: HashSet<&str> = HashSet::new();
        let mut pending = vec![child];
        while let Some(concept) = pending.pop() {
            for candidate in self.parents(concept) {
                if candidate == parent {
                    return true;
                }
                if seen.insert(candidate) {
                    pending.push(candidate);
                }
            }
        }
        false
    }

    fn distance(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 0.0;
        }
        if !self.contains(a) || !self.contains(b) {
            return MAX_DISTANCE;
        }
        if self.is_a(a, b) || self.is_a(b, a) {
            return 0.5;
        }

        let mut left: HashSet<String> = self.parents(a).map(str::to_string).collect();
        let mut right: HashSet<String> = self.parents(b).map(str::to_string).collect();
        let mut current = 0.6;
        loop {
            if !left.is_disjoint(&right) {
                return current;
            }
            current += 0.1;
            let grew_left = self.expand(&mut left);
            let grew_right = self.expand(&mut right);
            if !grew_left && !grew_right {
                return MAX_DISTANCE;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animals() -> Taxonomy {
        let mut t = Taxonomy::new();
        t.add_parent("dog", "mammal");
        t.add_parent("cat", "mammal");
        t.add_parent("mammal", "animal");
        t.add_parent("sparrow", "bird");
        t.add_parent("bird", "animal");
        t.add_parent("animal", "thing");
        t.add_parent("rock", "mineral");
        t
    }

    #[test]
    fn subsumption_is_reflexive_and_transitive() {
        let t = animals();
        assert!(t.is_a("dog", "dog"));
        assert!(t.is_a("dog", "animal"));
        assert!(t.is_a("dog", "thing"));
        assert!(!t.is_a("animal", "dog"));
        assert!(!t.is_a("dog", "bird"));
    }

    #[test]
    fn subsumption_survives_cycles() {
        let mut t = Taxonomy::new();
        t.add_parent("a", "b");
        t.add_parent("b", "a");
        assert!(t.is_a("a", "b"));
        assert!(!t.is_a("a", "c"));
    }

    #[test]
    fn distance_levels() {
        let t = animals();
        assert_eq!(t.distance("dog", "dog"), 0.0);
        assert_eq!(t.distance("dog", "mammal"), 0.5);
        assert_eq!(t.distance("mammal", "dog"), 0.5);
        assert!((t.distance("dog", "cat") - 0.6).abs() < 1e-9);
        assert!((t.distance("dog", "sparrow") - 0.7).abs() < 1e-9);
        assert_eq!(t.distance("dog", "rock"), MAX_DISTANCE);
        assert_eq!(t.distance("dog", "unicorn"), MAX_DISTANCE);
    }

    #[test]
    fn flat_ontology_only_knows_identity() {
        assert!(FlatOntology.is_a("x", "x"));
        assert!(!FlatOntology.is_a("x", "y"));
        assert_eq!(FlatOntology.distance("x", "y"), 1.0);
    }
}
