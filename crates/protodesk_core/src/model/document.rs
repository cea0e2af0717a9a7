//! Document tree: ordered categories of units.
//!
//! # Responsibility
//! - Own one full copy of a schema document with value semantics.
//! - Provide name-based lookup and replacement inside a category.
//!
//! # Invariants
//! - Categories are created lazily; a missing category reads as empty.
//! - Cloning yields an independent tree; no node is shared between copies.

use super::unit::{Category, Unit};
use serde::{Deserialize, Serialize};

/// Units of one category in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBlock {
    pub category: Category,
    pub units: Vec<Unit>,
}

impl CategoryBlock {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            units: Vec::new(),
        }
    }

    pub fn find(&self, name: &str) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Unit> {
        self.units.iter_mut().find(|unit| unit.name == name)
    }

    /// Removes the first unit named `name`.
    pub fn remove(&mut self, name: &str) -> Option<Unit> {
        let position = self.units.iter().position(|unit| unit.name == name)?;
        Some(self.units.remove(position))
    }
}

/// A forest of category blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    categories: Vec<CategoryBlock>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Category blocks in document order.
    pub fn categories(&self) -> &[CategoryBlock] {
        &self.categories
    }

    pub fn category(&self, category: Category) -> Option<&CategoryBlock> {
        self.categories
            .iter()
            .find(|block| block.category == category)
    }

    pub fn category_mut(&mut self, category: Category) -> Option<&mut CategoryBlock> {
        self.categories
            .iter_mut()
            .find(|block| block.category == category)
    }

    /// Returns the block for `category`, appending an empty one if absent.
    pub fn ensure_category(&mut self, category: Category) -> &mut CategoryBlock {
        let position = match self
            .categories
            .iter()
            .position(|block| block.category == category)
        {
            Some(position) => position,
            None => {
                self.categories.push(CategoryBlock::new(category));
                self.categories.len() - 1
            }
        };
        &mut self.categories[position]
    }

    /// Units of `category`; empty when the category was never created.
    pub fn units(&self, category: Category) -> &[Unit] {
        self.category(category)
            .map(|block| block.units.as_slice())
            .unwrap_or(&[])
    }

    pub fn unit(&self, category: Category, name: &str) -> Option<&Unit> {
        self.category(category).and_then(|block| block.find(name))
    }

    pub fn unit_mut(&mut self, category: Category, name: &str) -> Option<&mut Unit> {
        self.category_mut(category)
            .and_then(|block| block.find_mut(name))
    }

    pub fn contains_unit(&self, category: Category, name: &str) -> bool {
        self.unit(category, name).is_some()
    }

    pub fn remove_unit(&mut self, category: Category, name: &str) -> Option<Unit> {
        self.category_mut(category)
            .and_then(|block| block.remove(name))
    }

    /// Appends `unit` to `category` without checking name uniqueness.
    ///
    /// Callers replacing a unit remove the old entry first.
    pub fn push_unit(&mut self, category: Category, unit: Unit) {
        self.ensure_category(category).units.push(unit);
    }

    pub fn unit_count(&self) -> usize {
        self.categories.iter().map(|block| block.units.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.unit_count() == 0
    }
}
