//! Structural equality of two versions of the same unit.
//!
//! # Responsibility
//! - Decide whether a unit present on both sides counts as updated.
//!
//! # Invariants
//! - Children are paired by position, never by field name.
//! - Attribute values are paired by position within each child.
//! - A missing leading comment compares equal to an empty one.

use crate::model::unit::{Field, RpcPart, Unit};
use log::debug;
use std::borrow::Cow;

/// Read-only view shared by units, rpc parts and fields.
trait StructuralNode {
    fn tag(&self) -> &str;
    fn leading_comment(&self) -> &str;
    fn attribute_values(&self) -> Vec<Cow<'_, str>>;
    fn child_nodes(&self) -> Vec<&dyn StructuralNode>;
}

impl StructuralNode for Unit {
    fn tag(&self) -> &str {
        &self.name
    }

    fn leading_comment(&self) -> &str {
        self.comment.as_deref().unwrap_or("")
    }

    // Unit-level attributes are never compared; only children's are.
    fn attribute_values(&self) -> Vec<Cow<'_, str>> {
        Vec::new()
    }

    fn child_nodes(&self) -> Vec<&dyn StructuralNode> {
        let parts = self.parts();
        if parts.is_empty() {
            self.fields()
                .iter()
                .map(|field| field as &dyn StructuralNode)
                .collect()
        } else {
            parts
                .iter()
                .map(|part| part as &dyn StructuralNode)
                .collect()
        }
    }
}

impl StructuralNode for RpcPart {
    fn tag(&self) -> &str {
        &self.name
    }

    fn leading_comment(&self) -> &str {
        self.comment.as_deref().unwrap_or("")
    }

    fn attribute_values(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Borrowed(self.kind.as_str())]
    }

    fn child_nodes(&self) -> Vec<&dyn StructuralNode> {
        self.fields
            .iter()
            .map(|field| field as &dyn StructuralNode)
            .collect()
    }
}

impl StructuralNode for Field {
    // Field elements are tagged with their owner's name, which already matched.
    fn tag(&self) -> &str {
        ""
    }

    fn leading_comment(&self) -> &str {
        ""
    }

    fn attribute_values(&self) -> Vec<Cow<'_, str>> {
        Field::attribute_values(self)
    }

    fn child_nodes(&self) -> Vec<&dyn StructuralNode> {
        Vec::new()
    }
}

/// Compares two candidate versions of one named unit.
///
/// Both absent is equal; exactly one absent is unequal. Reordered fields
/// with identical content compare unequal.
pub fn units_equal(a: Option<&Unit>, b: Option<&Unit>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => nodes_equal(a, b),
        _ => false,
    }
}

fn nodes_equal(a: &dyn StructuralNode, b: &dyn StructuralNode) -> bool {
    if a.tag() != b.tag() {
        debug!(
            "event=unit_compare module=diff status=diff reason=tag left={} right={}",
            a.tag(),
            b.tag()
        );
        return false;
    }

    let children_a = a.child_nodes();
    let children_b = b.child_nodes();
    if children_a.len() != children_b.len() {
        debug!(
            "event=unit_compare module=diff status=diff reason=child_count tag={} left={} right={}",
            a.tag(),
            children_a.len(),
            children_b.len()
        );
        return false;
    }

    if a.leading_comment() != b.leading_comment() {
        debug!(
            "event=unit_compare module=diff status=diff reason=comment tag={}",
            a.tag()
        );
        return false;
    }

    for (child_a, child_b) in children_a.iter().zip(children_b.iter()) {
        let values_a = child_a.attribute_values();
        let values_b = child_b.attribute_values();
        if values_a.len() != values_b.len() {
            debug!(
                "event=unit_compare module=diff status=diff reason=attr_count tag={} left={} right={}",
                a.tag(),
                values_a.len(),
                values_b.len()
            );
            return false;
        }
        if let Some((left, right)) = values_a
            .iter()
            .zip(values_b.iter())
            .find(|(left, right)| left != right)
        {
            debug!(
                "event=unit_compare module=diff status=diff reason=attr_value tag={} left={} right={}",
                a.tag(),
                left,
                right
            );
            return false;
        }
        if !nodes_equal(*child_a, *child_b) {
            return false;
        }
    }

    true
}
