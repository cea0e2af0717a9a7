//! Name lookup table and type-reference graph over the working document.
//!
//! # Responsibility
//! - Map every searchable string variant to the unit that owns it.
//! - Answer "which units depend on type X" queries.
//! - Rank search keys for type-as-you-search completion.
//!
//! # Invariants
//! - The index is derived only from the working document and rebuilt in
//!   full on every synchronization; it is never patched.
//! - Qualified keys have the form `[Owner]value`.
//! - Primitive scalar types never appear as reference-graph keys.

use crate::model::document::Document;
use crate::model::unit::{Category, Field, Unit};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Single ranked completion hit returned by [`SearchIndex::fuzzy_find`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit<'a> {
    /// Registered search key.
    pub key: &'a str,
    /// Unit the key resolves to.
    pub unit: &'a str,
    /// 0 = exact (case-insensitive), 1 = prefix, 2 = contains.
    pub score: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchIndex {
    names: BTreeMap<String, String>,
    references: HashMap<String, Vec<String>>,
    members: HashMap<Category, Vec<String>>,
}

impl SearchIndex {
    /// Walks `working` once and builds all lookup tables.
    pub fn build(working: &Document) -> Self {
        let mut index = Self::default();
        for category in Category::ALL {
            let mut members = Vec::new();
            for unit in working.units(category) {
                members.push(unit.name.clone());
                index.register_unit(unit);
            }
            index.members.insert(category, members);
        }
        index
    }

    fn register_unit(&mut self, unit: &Unit) {
        let owner = unit.name.as_str();
        self.names.insert(owner.to_string(), owner.to_string());
        self.insert_case_variants(owner, owner);

        if let Some(comment) = unit.comment.as_deref().filter(|value| !value.is_empty()) {
            self.insert_all_variants(owner, comment);
        }

        for field in unit.fields() {
            self.register_field(owner, owner, field);
        }

        // Rpc parts index under the outer unit but attribute references to
        // the part itself.
        for part in unit.parts() {
            self.insert_case_variants(owner, &part.name);
            for field in &part.fields {
                self.register_field(owner, &part.name, field);
            }
        }
    }

    fn register_field(&mut self, owner: &str, referrer: &str, field: &Field) {
        if !field.name.is_empty() {
            self.insert_all_variants(owner, &field.name);
        }
        if let Some(comment) = field.comment.as_deref().filter(|value| !value.is_empty()) {
            self.insert_all_variants(owner, comment);
        }
        if let Some(type_name) = field.referenced_type() {
            self.references
                .entry(type_name.to_string())
                .or_default()
                .push(referrer.to_string());
        }
    }

    fn insert_all_variants(&mut self, owner: &str, value: &str) {
        self.names
            .insert(qualified(owner, value), owner.to_string());
        self.insert_case_variants(owner, value);
    }

    fn insert_case_variants(&mut self, owner: &str, value: &str) {
        self.names
            .insert(qualified(owner, &value.to_lowercase()), owner.to_string());
        self.names
            .insert(qualified(owner, &value.to_uppercase()), owner.to_string());
    }

    /// Resolves a search key to the owning unit name.
    pub fn resolve(&self, key: &str) -> Option<&str> {
        self.names.get(key).map(String::as_str)
    }

    /// Units (or rpc parts) whose fields reference `type_name`.
    pub fn references(&self, type_name: &str) -> &[String] {
        self.references
            .get(type_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Unit names of `category` in document order.
    pub fn members(&self, category: Category) -> &[String] {
        self.members
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Flat searchable-name buffer, sorted.
    pub fn keys(&self) -> Vec<&str> {
        self.names.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Ranks keys against `query`: exact (case-insensitive), then prefix,
    /// then contains; ties break by key.
    ///
    /// Returns an empty list for blank queries or a zero limit.
    pub fn fuzzy_find(&self, query: &str, limit: usize) -> Vec<SearchHit<'_>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut hits = self
            .names
            .iter()
            .filter_map(|(key, unit)| {
                let key_lower = key.to_lowercase();
                let score = if key_lower == query {
                    0
                } else if key_lower.starts_with(&query) {
                    1
                } else if key_lower.contains(&query) {
                    2
                } else {
                    return None;
                };
                Some(SearchHit {
                    key: key.as_str(),
                    unit: unit.as_str(),
                    score,
                })
            })
            .collect::<Vec<_>>();

        hits.sort_by(|a, b| a.score.cmp(&b.score).then_with(|| a.key.cmp(b.key)));
        hits.truncate(limit);
        hits
    }
}

fn qualified(owner: &str, value: &str) -> String {
    format!("[{owner}]{value}")
}

#[cfg(test)]
mod tests {
    use super::SearchIndex;
    use crate::model::document::Document;
    use crate::model::unit::{Category, Field, Unit};

    fn sample() -> Document {
        let mut doc = Document::new();
        doc.push_unit(
            Category::Enum,
            Unit::enumeration("Enum_Color", vec![Field::new("Red", 0).with_comment("warm")])
                .with_comment("Palette"),
        );
        doc
    }

    #[test]
    fn unit_and_field_variants_resolve_to_owner() {
        let index = SearchIndex::build(&sample());

        for key in [
            "Enum_Color",
            "[Enum_Color]enum_color",
            "[Enum_Color]ENUM_COLOR",
            "[Enum_Color]Palette",
            "[Enum_Color]palette",
            "[Enum_Color]Red",
            "[Enum_Color]RED",
            "[Enum_Color]warm",
            "[Enum_Color]WARM",
        ] {
            assert_eq!(index.resolve(key), Some("Enum_Color"), "missing key {key}");
        }
        assert_eq!(index.members(Category::Enum), ["Enum_Color".to_string()]);
        assert!(index.members(Category::Rpc).is_empty());
    }

    #[test]
    fn fuzzy_find_ranks_exact_before_prefix_before_contains() {
        let index = SearchIndex::build(&sample());
        let hits = index.fuzzy_find("enum_color", 10);

        assert_eq!(hits[0].key, "Enum_Color");
        assert_eq!(hits[0].score, 0);
        assert!(hits.iter().skip(1).all(|hit| hit.score >= 1));
        assert!(hits.iter().all(|hit| hit.unit == "Enum_Color"));
    }

    #[test]
    fn fuzzy_find_handles_blank_query_and_limit() {
        let index = SearchIndex::build(&sample());
        assert!(index.fuzzy_find("   ", 10).is_empty());
        assert!(index.fuzzy_find("red", 0).is_empty());
        assert_eq!(index.fuzzy_find("r", 2).len(), 2);
    }
}
