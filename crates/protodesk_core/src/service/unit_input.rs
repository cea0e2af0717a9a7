//! Caller-supplied unit definitions and their validation.
//!
//! # Responsibility
//! - Carry raw, string-typed rows as entered in an editing form.
//! - Validate naming and uniqueness rules before any document mutation.
//! - Build typed [`Unit`] values from validated rows.
//!
//! # Invariants
//! - Unit, part and field names are identifiers (`[A-Za-z_][A-Za-z0-9_]*`).
//! - Field names and field indices are unique within one field list.
//! - An rpc draft carries at least one part and at most one part per kind.

use crate::model::unit::{is_storable_comment, Category, Field, RpcKind, RpcPart, Unit};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Validation failure for a [`UnitDraft`].
///
/// Row numbers are 1-based, matching what an editing form shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitInputError {
    EmptyUnitName,
    InvalidUnitName(String),
    EmptyPartName,
    InvalidPartName(String),
    EmptyFieldName { row: usize },
    InvalidFieldName { row: usize, name: String },
    DuplicateFieldName(String),
    EmptyFieldIndex { row: usize },
    InvalidFieldIndex { row: usize, value: String },
    DuplicateFieldIndex(i32),
    /// Message-like and rpc rows must name a type.
    EmptyFieldType { row: usize },
    /// Unit or part comment contains `--` or ends with `-`.
    InvalidComment(String),
    MissingRpcParts,
    DuplicateRpcKind(RpcKind),
    /// Request/ack parts supplied for a non-rpc category.
    UnexpectedRpcParts(Category),
    /// Plain field rows supplied for an rpc draft.
    UnexpectedFieldRows,
}

impl Display for UnitInputError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUnitName => write!(f, "unit name must not be blank"),
            Self::InvalidUnitName(name) => write!(f, "unit name `{name}` is not an identifier"),
            Self::EmptyPartName => write!(f, "rpc part name must not be blank"),
            Self::InvalidPartName(name) => {
                write!(f, "rpc part name `{name}` is not an identifier")
            }
            Self::EmptyFieldName { row } => write!(f, "row {row}: field name must not be blank"),
            Self::InvalidFieldName { row, name } => {
                write!(f, "row {row}: field name `{name}` is not an identifier")
            }
            Self::DuplicateFieldName(name) => write!(f, "duplicate field name `{name}`"),
            Self::EmptyFieldIndex { row } => write!(f, "row {row}: field index must not be blank"),
            Self::InvalidFieldIndex { row, value } => {
                write!(f, "row {row}: field index `{value}` is not an integer")
            }
            Self::DuplicateFieldIndex(index) => write!(f, "duplicate field index {index}"),
            Self::EmptyFieldType { row } => write!(f, "row {row}: field type must not be blank"),
            Self::InvalidComment(comment) => {
                write!(f, "comment `{comment}` must not contain `--` or end with `-`")
            }
            Self::MissingRpcParts => write!(f, "rpc unit needs a request or ack part"),
            Self::DuplicateRpcKind(kind) => write!(f, "rpc unit has more than one {kind} part"),
            Self::UnexpectedRpcParts(category) => {
                write!(f, "category `{category}` does not hold rpc parts")
            }
            Self::UnexpectedFieldRows => write!(f, "rpc unit fields belong to its parts"),
        }
    }
}

impl Error for UnitInputError {}

/// One raw field row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRow {
    pub option: String,
    pub field_type: String,
    pub name: String,
    pub index: String,
    pub default: String,
    pub comment: String,
}

impl FieldRow {
    pub fn new(name: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: index.into(),
            ..Self::default()
        }
    }

    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.option = option.into();
        self
    }

    pub fn with_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = field_type.into();
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = default.into();
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

/// Request or acknowledgement half of an rpc draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcPartDraft {
    pub name: String,
    pub kind: RpcKind,
    pub comment: String,
    pub rows: Vec<FieldRow>,
}

impl RpcPartDraft {
    pub fn new(name: impl Into<String>, kind: RpcKind) -> Self {
        Self {
            name: name.into(),
            kind,
            comment: String::new(),
            rows: Vec::new(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_row(mut self, row: FieldRow) -> Self {
        self.rows.push(row);
        self
    }
}

/// Complete add/update request for one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitDraft {
    pub category: Category,
    pub name: String,
    pub comment: String,
    pub rows: Vec<FieldRow>,
    pub parts: Vec<RpcPartDraft>,
}

impl UnitDraft {
    pub fn new(category: Category, name: impl Into<String>) -> Self {
        Self {
            category,
            name: name.into(),
            comment: String::new(),
            rows: Vec::new(),
            parts: Vec::new(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_row(mut self, row: FieldRow) -> Self {
        self.rows.push(row);
        self
    }

    pub fn with_part(mut self, part: RpcPartDraft) -> Self {
        self.parts.push(part);
        self
    }

    /// Trimmed unit name.
    pub fn unit_name(&self) -> &str {
        self.name.trim()
    }

    /// Runs every validation rule without building anything.
    pub fn validate(&self) -> Result<(), UnitInputError> {
        self.build().map(|_| ())
    }

    /// Validates the draft and converts it into a typed unit.
    pub fn build(&self) -> Result<Unit, UnitInputError> {
        let name = self.unit_name();
        if name.is_empty() {
            return Err(UnitInputError::EmptyUnitName);
        }
        if !IDENTIFIER_RE.is_match(name) {
            return Err(UnitInputError::InvalidUnitName(name.to_string()));
        }

        let unit = match self.category {
            Category::Enum | Category::Data | Category::Protocol => {
                if !self.parts.is_empty() {
                    return Err(UnitInputError::UnexpectedRpcParts(self.category));
                }
                let fields = build_fields(&self.rows, self.category == Category::Enum)?;
                if self.category == Category::Enum {
                    Unit::enumeration(name, fields)
                } else {
                    Unit::message(name, fields)
                }
            }
            Category::Rpc => {
                if !self.rows.is_empty() {
                    return Err(UnitInputError::UnexpectedFieldRows);
                }
                Unit::rpc(name, build_parts(&self.parts)?)
            }
        };

        Ok(match checked_comment(&self.comment)? {
            Some(comment) => unit.with_comment(comment),
            None => unit,
        })
    }
}

fn build_parts(drafts: &[RpcPartDraft]) -> Result<Vec<RpcPart>, UnitInputError> {
    if drafts.is_empty() {
        return Err(UnitInputError::MissingRpcParts);
    }

    let mut kinds = HashSet::new();
    let mut parts = Vec::with_capacity(drafts.len());
    for draft in drafts {
        if !kinds.insert(draft.kind) {
            return Err(UnitInputError::DuplicateRpcKind(draft.kind));
        }
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(UnitInputError::EmptyPartName);
        }
        if !IDENTIFIER_RE.is_match(name) {
            return Err(UnitInputError::InvalidPartName(name.to_string()));
        }

        let part = RpcPart::new(name, draft.kind, build_fields(&draft.rows, false)?);
        parts.push(match checked_comment(&draft.comment)? {
            Some(comment) => part.with_comment(comment),
            None => part,
        });
    }
    Ok(parts)
}

fn build_fields(rows: &[FieldRow], enum_rows: bool) -> Result<Vec<Field>, UnitInputError> {
    let mut names = HashSet::new();
    let mut indices = HashSet::new();
    let mut fields = Vec::with_capacity(rows.len());

    for (position, row) in rows.iter().enumerate() {
        let row_number = position + 1;

        let name = row.name.trim();
        if name.is_empty() {
            return Err(UnitInputError::EmptyFieldName { row: row_number });
        }
        if !IDENTIFIER_RE.is_match(name) {
            return Err(UnitInputError::InvalidFieldName {
                row: row_number,
                name: name.to_string(),
            });
        }
        if !names.insert(name.to_string()) {
            return Err(UnitInputError::DuplicateFieldName(name.to_string()));
        }

        let raw_index = row.index.trim();
        if raw_index.is_empty() {
            return Err(UnitInputError::EmptyFieldIndex { row: row_number });
        }
        let index = raw_index
            .parse::<i32>()
            .map_err(|_| UnitInputError::InvalidFieldIndex {
                row: row_number,
                value: raw_index.to_string(),
            })?;
        if !indices.insert(index) {
            return Err(UnitInputError::DuplicateFieldIndex(index));
        }

        // Enum rows carry only name, index and comment.
        let mut field = Field::new(name, index).with_comment(row.comment.trim());
        if !enum_rows {
            let field_type =
                non_blank(&row.field_type).ok_or(UnitInputError::EmptyFieldType { row: row_number })?;
            field.field_type = Some(field_type.to_string());
            field.option = non_blank(&row.option).map(str::to_string);
            field.default = non_blank(&row.default).map(str::to_string);
        }
        fields.push(field);
    }
    Ok(fields)
}

fn checked_comment(value: &str) -> Result<Option<&str>, UnitInputError> {
    match non_blank(value) {
        Some(comment) if !is_storable_comment(comment) => {
            Err(UnitInputError::InvalidComment(comment.to_string()))
        }
        comment => Ok(comment),
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::{FieldRow, RpcPartDraft, UnitDraft, UnitInputError};
    use crate::model::unit::{Category, RpcKind, UnitBody};

    #[test]
    fn enum_draft_ignores_type_columns() {
        let unit = UnitDraft::new(Category::Enum, " Enum_Color ")
            .with_comment("colors")
            .with_row(FieldRow::new("Red", "0").with_type("int32").with_comment(" warm "))
            .build()
            .expect("draft should build");

        assert_eq!(unit.name, "Enum_Color");
        assert_eq!(unit.comment.as_deref(), Some("colors"));
        let field = &unit.fields()[0];
        assert_eq!(field.field_type, None);
        assert_eq!(field.comment.as_deref(), Some("warm"));
        assert!(matches!(unit.body, UnitBody::Enum(_)));
    }

    #[test]
    fn message_draft_requires_type() {
        let err = UnitDraft::new(Category::Data, "Data_A")
            .with_row(FieldRow::new("id", "1"))
            .build()
            .unwrap_err();
        assert_eq!(err, UnitInputError::EmptyFieldType { row: 1 });
    }

    #[test]
    fn blank_comment_becomes_none() {
        let unit = UnitDraft::new(Category::Data, "Data_A")
            .with_comment("   ")
            .build()
            .expect("empty message is valid");
        assert_eq!(unit.comment, None);
    }

    #[test]
    fn rejects_duplicates_and_bad_indices() {
        let dup_name = UnitDraft::new(Category::Enum, "E")
            .with_row(FieldRow::new("A", "0"))
            .with_row(FieldRow::new("A", "1"))
            .validate()
            .unwrap_err();
        assert_eq!(dup_name, UnitInputError::DuplicateFieldName("A".into()));

        let dup_index = UnitDraft::new(Category::Enum, "E")
            .with_row(FieldRow::new("A", "0"))
            .with_row(FieldRow::new("B", " 0 "))
            .validate()
            .unwrap_err();
        assert_eq!(dup_index, UnitInputError::DuplicateFieldIndex(0));

        let bad_index = UnitDraft::new(Category::Enum, "E")
            .with_row(FieldRow::new("A", "one"))
            .validate()
            .unwrap_err();
        assert!(matches!(bad_index, UnitInputError::InvalidFieldIndex { row: 1, .. }));
    }

    #[test]
    fn rejects_non_identifier_names() {
        assert_eq!(
            UnitDraft::new(Category::Enum, "").validate().unwrap_err(),
            UnitInputError::EmptyUnitName
        );
        assert!(matches!(
            UnitDraft::new(Category::Enum, "1Bad").validate().unwrap_err(),
            UnitInputError::InvalidUnitName(_)
        ));
        assert!(matches!(
            UnitDraft::new(Category::Enum, "E")
                .with_row(FieldRow::new("has space", "0"))
                .validate()
                .unwrap_err(),
            UnitInputError::InvalidFieldName { row: 1, .. }
        ));
    }

    #[test]
    fn rejects_comments_that_break_markup() {
        assert_eq!(
            UnitDraft::new(Category::Enum, "Enum_A")
                .with_comment("ends with --> here")
                .validate()
                .unwrap_err(),
            UnitInputError::InvalidComment("ends with --> here".to_string())
        );
        assert_eq!(
            UnitDraft::new(Category::Enum, "Enum_A")
                .with_comment("trailing-")
                .validate()
                .unwrap_err(),
            UnitInputError::InvalidComment("trailing-".to_string())
        );
        assert!(matches!(
            UnitDraft::new(Category::Rpc, "Rpc_A")
                .with_part(RpcPartDraft::new("AReq", RpcKind::Req).with_comment("a--b"))
                .validate()
                .unwrap_err(),
            UnitInputError::InvalidComment(_)
        ));
        assert!(UnitDraft::new(Category::Enum, "Enum_A")
            .with_comment("a - b <c> & d")
            .validate()
            .is_ok());
    }

    #[test]
    fn rpc_draft_rules() {
        assert_eq!(
            UnitDraft::new(Category::Rpc, "Rpc_Login").validate().unwrap_err(),
            UnitInputError::MissingRpcParts
        );

        let duplicate = UnitDraft::new(Category::Rpc, "Rpc_Login")
            .with_part(RpcPartDraft::new("LoginReq", RpcKind::Req))
            .with_part(RpcPartDraft::new("LoginReq2", RpcKind::Req))
            .validate()
            .unwrap_err();
        assert_eq!(duplicate, UnitInputError::DuplicateRpcKind(RpcKind::Req));

        let unit = UnitDraft::new(Category::Rpc, "Rpc_Login")
            .with_part(
                RpcPartDraft::new("LoginReq", RpcKind::Req)
                    .with_row(FieldRow::new("account", "1").with_type("string")),
            )
            .build()
            .expect("rpc draft should build");
        assert_eq!(unit.parts().len(), 1);
        assert_eq!(unit.parts()[0].fields[0].field_type.as_deref(), Some("string"));
    }

    #[test]
    fn rows_and_parts_must_match_category() {
        assert_eq!(
            UnitDraft::new(Category::Data, "D")
                .with_part(RpcPartDraft::new("DReq", RpcKind::Req))
                .validate()
                .unwrap_err(),
            UnitInputError::UnexpectedRpcParts(Category::Data)
        );
        assert_eq!(
            UnitDraft::new(Category::Rpc, "R")
                .with_row(FieldRow::new("a", "1"))
                .validate()
                .unwrap_err(),
            UnitInputError::UnexpectedFieldRows
        );
    }
}
