#![forbid(unsafe_code)]

use crate::caltime::CalTime;
use crate::property::PropertyId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericOp {
    Equal,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    NotEqual,
    /// Matches rows where the column is NULL; the operand is ignored.
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextMatch {
    Exactly,
    Fullstring,
    Contains,
    StartsWith,
    EndsWith,
    /// Matches rows where the column is not NULL; the operand is ignored.
    Exists,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Int { op: NumericOp, value: i32 },
    Int64 { op: NumericOp, value: i64 },
    Double { op: NumericOp, value: f64 },
    Text { mode: TextMatch, value: String },
    CalTime { op: NumericOp, value: CalTime },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeFilter {
    pub property: PropertyId,
    pub condition: Condition,
}

impl AttributeFilter {
    pub fn int(property: PropertyId, op: NumericOp, value: i32) -> Self {
        Self {
            property,
            condition: Condition::Int { op, value },
        }
    }

    pub fn int64(property: PropertyId, op: NumericOp, value: i64) -> Self {
        Self {
            property,
            condition: Condition::Int64 { op, value },
        }
    }

    pub fn double(property: PropertyId, op: NumericOp, value: f64) -> Self {
        Self {
            property,
            condition: Condition::Double { op, value },
        }
    }

    pub fn text(property: PropertyId, mode: TextMatch, value: impl Into<String>) -> Self {
        Self {
            property,
            condition: Condition::Text {
                mode,
                value: value.into(),
            },
        }
    }

    pub fn caltime(property: PropertyId, op: NumericOp, value: CalTime) -> Self {
        Self {
            property,
            condition: Condition::CalTime { op, value },
        }
    }
}

/// AND/OR combination of child filters.
///
/// Operators sit between children, so a non-empty composite always has
/// exactly one operator fewer than it has children.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeFilter {
    children: Vec<Filter>,
    operators: Vec<LogicalOp>,
}

impl CompositeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(filter: impl Into<Filter>) -> Self {
        Self {
            children: vec![filter.into()],
            operators: Vec::new(),
        }
    }

    pub fn and(self, filter: impl Into<Filter>) -> Self {
        self.push(LogicalOp::And, filter)
    }

    pub fn or(self, filter: impl Into<Filter>) -> Self {
        self.push(LogicalOp::Or, filter)
    }

    /// Appends `filter`; `op` is dropped when this is the first child.
    pub fn push(mut self, op: LogicalOp, filter: impl Into<Filter>) -> Self {
        if !self.children.is_empty() {
            self.operators.push(op);
        }
        self.children.push(filter.into());
        self
    }

    pub fn children(&self) -> &[Filter] {
        &self.children
    }

    pub fn operators(&self) -> &[LogicalOp] {
        &self.operators
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    Composite(CompositeFilter),
    Attribute(AttributeFilter),
}

impl From<AttributeFilter> for Filter {
    fn from(value: AttributeFilter) -> Self {
        Self::Attribute(value)
    }
}

impl From<CompositeFilter> for Filter {
    fn from(value: CompositeFilter) -> Self {
        Self::Composite(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_sit_between_children() {
        let composite = CompositeFilter::new()
            .and(AttributeFilter::int(PropertyId::Priority, NumericOp::Equal, 1))
            .or(AttributeFilter::text(
                PropertyId::Summary,
                TextMatch::Contains,
                "x",
            ))
            .and(AttributeFilter::int(PropertyId::Id, NumericOp::None, 0));
        assert_eq!(composite.children().len(), 3);
        assert_eq!(composite.operators(), &[LogicalOp::Or, LogicalOp::And]);
    }
}
