//! Schema unit domain model.
//!
//! # Responsibility
//! - Define the typed records behind every unit a schema document holds.
//! - Expose the positional attribute view used by structural comparison.
//!
//! # Invariants
//! - A unit's `name` is unique within its category inside one document.
//! - `UnitBody::Rpc` holds at most one part per `RpcKind`.
//! - Field attribute order follows the wire order
//!   `EntryOption, EntryType, EntryName, EntryIndex, EntryDefault, EntryComment`.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::{Display, Formatter};

/// Scalar type names that never create a reference edge.
pub const PRIMITIVE_TYPES: [&str; 15] = [
    "int32", "int64", "uint32", "uint64", "sint32", "sint64", "fixed32", "fixed64", "sfixed32",
    "sfixed64", "float", "double", "bool", "string", "bytes",
];

/// Returns whether `type_name` is one of the fixed scalar names.
pub fn is_primitive_type(type_name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&type_name)
}

/// Whether `text` can be stored as a leading comment annotation.
///
/// Markup comments may not contain `--` nor end with `-`.
pub fn is_storable_comment(text: &str) -> bool {
    !text.contains("--") && !text.ends_with('-')
}

/// Top-level grouping of units inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Enumerations.
    Enum,
    /// Shared data structures.
    Data,
    /// Protocol messages.
    Protocol,
    /// Request/acknowledgement pairs.
    Rpc,
}

impl Category {
    /// Canonical walk order used by diffing and indexing.
    pub const ALL: [Category; 4] = [
        Category::Enum,
        Category::Data,
        Category::Protocol,
        Category::Rpc,
    ];

    /// Element tag used on the wire.
    pub fn as_tag(self) -> &'static str {
        match self {
            Self::Enum => "enum",
            Self::Data => "data",
            Self::Protocol => "protocol",
            Self::Rpc => "rpc",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "enum" => Some(Self::Enum),
            "data" => Some(Self::Data),
            "protocol" => Some(Self::Protocol),
            "rpc" => Some(Self::Rpc),
            _ => None,
        }
    }

    /// Whether units of this category carry message-style typed fields.
    pub fn is_message_like(self) -> bool {
        matches!(self, Self::Data | Self::Protocol)
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// One row of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Presence/repetition marker (`optional`, `repeated`). Messages only.
    pub option: Option<String>,
    /// Scalar name or the name of another unit.
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    pub name: String,
    /// Wire-order number. Uniqueness is checked when rows are submitted.
    pub index: i32,
    /// Meaningful only when `field_type` names an enumeration.
    pub default: Option<String>,
    pub comment: Option<String>,
}

impl Field {
    /// Creates a field with only the required `name` and `index`.
    pub fn new(name: impl Into<String>, index: i32) -> Self {
        Self {
            option: None,
            field_type: None,
            name: name.into(),
            index,
            default: None,
            comment: None,
        }
    }

    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.option = Some(option.into());
        self
    }

    pub fn with_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = Some(field_type.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Present attribute values in wire order.
    ///
    /// Structural comparison pairs these by position, not by attribute name.
    pub fn attribute_values(&self) -> Vec<Cow<'_, str>> {
        let mut values = Vec::with_capacity(6);
        if let Some(option) = &self.option {
            values.push(Cow::Borrowed(option.as_str()));
        }
        if let Some(field_type) = &self.field_type {
            values.push(Cow::Borrowed(field_type.as_str()));
        }
        values.push(Cow::Borrowed(self.name.as_str()));
        values.push(Cow::Owned(self.index.to_string()));
        if let Some(default) = &self.default {
            values.push(Cow::Borrowed(default.as_str()));
        }
        if let Some(comment) = &self.comment {
            values.push(Cow::Borrowed(comment.as_str()));
        }
        values
    }

    /// Returns the unit name this field depends on, if any.
    pub fn referenced_type(&self) -> Option<&str> {
        self.field_type
            .as_deref()
            .filter(|value| !value.is_empty() && !is_primitive_type(value))
    }
}

/// Side of an rpc pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RpcKind {
    Req,
    Ack,
}

impl RpcKind {
    /// Value of the `RpcType` wire attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Req => "Req",
            Self::Ack => "Ack",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Req" => Some(Self::Req),
            "Ack" => Some(Self::Ack),
            _ => None,
        }
    }
}

impl Display for RpcKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request or acknowledgement half of an rpc unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcPart {
    pub name: String,
    pub kind: RpcKind,
    pub comment: Option<String>,
    pub fields: Vec<Field>,
}

impl RpcPart {
    pub fn new(name: impl Into<String>, kind: RpcKind, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            kind,
            comment: None,
            fields,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Kind-specific content of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum UnitBody {
    Enum(Vec<Field>),
    Message(Vec<Field>),
    /// Ordered parts. Order is significant for structural comparison.
    Rpc(Vec<RpcPart>),
}

/// One named entity of a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub name: String,
    /// Leading free-text annotation, never counted as a field.
    pub comment: Option<String>,
    pub body: UnitBody,
}

impl Unit {
    pub fn enumeration(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            comment: None,
            body: UnitBody::Enum(fields),
        }
    }

    pub fn message(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            comment: None,
            body: UnitBody::Message(fields),
        }
    }

    pub fn rpc(name: impl Into<String>, parts: Vec<RpcPart>) -> Self {
        Self {
            name: name.into(),
            comment: None,
            body: UnitBody::Rpc(parts),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Direct fields. Empty for rpc units, whose fields live in their parts.
    pub fn fields(&self) -> &[Field] {
        match &self.body {
            UnitBody::Enum(fields) | UnitBody::Message(fields) => fields,
            UnitBody::Rpc(_) => &[],
        }
    }

    /// Rpc parts in document order. Empty for other kinds.
    pub fn parts(&self) -> &[RpcPart] {
        match &self.body {
            UnitBody::Rpc(parts) => parts,
            _ => &[],
        }
    }

    pub fn part(&self, kind: RpcKind) -> Option<&RpcPart> {
        self.parts().iter().find(|part| part.kind == kind)
    }

    /// Replaces the part of the same kind, or appends when none exists.
    ///
    /// The replaced part is removed and the new one appended, so a replaced
    /// request moves after an existing acknowledgement.
    pub fn upsert_part(&mut self, part: RpcPart) {
        if let UnitBody::Rpc(parts) = &mut self.body {
            parts.retain(|existing| existing.kind != part.kind);
            parts.push(part);
        }
    }

    /// Whether this body shape belongs under `category`.
    pub fn fits_category(&self, category: Category) -> bool {
        match (&self.body, category) {
            (UnitBody::Enum(_), Category::Enum) => true,
            (UnitBody::Message(_), Category::Data | Category::Protocol) => true,
            (UnitBody::Rpc(_), Category::Rpc) => true,
            _ => false,
        }
    }
}
