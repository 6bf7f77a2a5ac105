//! Sorting types for find and list operations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl SortDirection {
    /// Return the store-native direction value (`1` / `-1`).
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::Asc => 1,
            Self::Desc => -1,
        }
    }
}

/// A sort specification consisting of a field name and direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    /// Field path to sort by.
    pub field: String,
    /// Sort direction.
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortField {
    /// Create a new sort field.
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Create an ascending sort on the given field.
    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    /// Create a descending sort on the given field.
    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

/// An ordered, multi-key sort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortSpec(pub Vec<SortField>);

impl SortSpec {
    /// Parse a sort expression such as `"name -createdAt"`.
    ///
    /// Keys are separated by whitespace or commas; a leading `-` sorts
    /// descending, a leading `+` is accepted and ignored.
    pub fn parse(expression: &str) -> Self {
        let fields = expression
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
            .filter_map(|token| {
                if let Some(field) = token.strip_prefix('-') {
                    (!field.is_empty()).then(|| SortField::desc(field))
                } else {
                    let field = token.strip_prefix('+').unwrap_or(token);
                    (!field.is_empty()).then(|| SortField::asc(field))
                }
            })
            .collect();
        Self(fields)
    }

    /// Whether the sort has no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the sort keys in priority order.
    pub fn fields(&self) -> impl Iterator<Item = &SortField> {
        self.0.iter()
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for key in &self.0 {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            match key.direction {
                SortDirection::Asc => write!(f, "{}", key.field)?,
                SortDirection::Desc => write!(f, "-{}", key.field)?,
            }
        }
        Ok(())
    }
}

impl From<SortField> for SortSpec {
    fn from(field: SortField) -> Self {
        Self(vec![field])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multi_key() {
        let spec = SortSpec::parse("name -createdAt,+age");
        assert_eq!(
            spec.0,
            vec![
                SortField::asc("name"),
                SortField::desc("createdAt"),
                SortField::asc("age"),
            ]
        );
        assert_eq!(spec.to_string(), "name -createdAt age");
    }

    #[test]
    fn test_parse_ignores_empty_tokens() {
        assert!(SortSpec::parse("  , - ").is_empty());
    }
}
