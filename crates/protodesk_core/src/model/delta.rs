//! Change records between a baseline and a working document.
//!
//! # Responsibility
//! - Hold the output of one diff run, grouped by category.
//! - Render the changed-units overview listing.
//!
//! # Invariants
//! - Every entry carries exactly one `ChangeOp`.
//! - A unit name appears at most once per category.
//! - `Add` entries hold the working copy; `Delete`/`Update` entries hold the
//!   baseline copy.

use super::unit::{Category, Unit};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Operation that turns the baseline unit into the working one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    /// Present in working only.
    Add,
    /// Present in baseline only.
    Delete,
    /// Present on both sides, structurally unequal.
    Update,
}

impl ChangeOp {
    /// Value of the `opertype` wire attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Delete => "delete",
            Self::Update => "update",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "add" => Some(Self::Add),
            "delete" => Some(Self::Delete),
            "update" => Some(Self::Update),
            _ => None,
        }
    }
}

impl Display for ChangeOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaEntry {
    pub op: ChangeOp,
    pub unit: Unit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaCategory {
    pub category: Category,
    pub entries: Vec<DeltaEntry>,
}

impl DeltaCategory {
    pub fn find(&self, name: &str) -> Option<&DeltaEntry> {
        self.entries.iter().find(|entry| entry.unit.name == name)
    }
}

/// Derived change document. Rebuilt from scratch on every diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    categories: Vec<DeltaCategory>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn categories(&self) -> &[DeltaCategory] {
        &self.categories
    }

    pub fn category(&self, category: Category) -> Option<&DeltaCategory> {
        self.categories
            .iter()
            .find(|block| block.category == category)
    }

    pub fn entry(&self, category: Category, name: &str) -> Option<&DeltaEntry> {
        self.category(category).and_then(|block| block.find(name))
    }

    pub fn contains(&self, category: Category, name: &str) -> bool {
        self.entry(category, name).is_some()
    }

    /// Appends one change record, creating the category block on first use.
    pub fn record(&mut self, category: Category, op: ChangeOp, unit: Unit) {
        let entry = DeltaEntry { op, unit };
        match self
            .categories
            .iter_mut()
            .find(|block| block.category == category)
        {
            Some(block) => block.entries.push(entry),
            None => self.categories.push(DeltaCategory {
                category,
                entries: vec![entry],
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.categories.iter().map(|block| block.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overview rows in the form `[op]UnitName`, in category then entry order.
    pub fn changed_units(&self) -> Vec<String> {
        self.categories
            .iter()
            .flat_map(|block| block.entries.iter())
            .map(|entry| format!("[{}]{}", entry.op, entry.unit.name))
            .collect()
    }
}
