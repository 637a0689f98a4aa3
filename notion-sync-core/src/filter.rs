//! Publication filter pushed down to the content source query.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Equals,
    DoesNotEqual,
}

impl Comparator {
    fn as_str(&self) -> &'static str {
        match self {
            Comparator::Equals => "equals",
            Comparator::DoesNotEqual => "does_not_equal",
        }
    }
}

/// `(property, comparator, value)` predicate selecting which records are eligible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicationFilter {
    pub property: String,
    /// Property type key the comparison is nested under (`select`, `status`, `rich_text`, ...).
    pub property_type: String,
    pub comparator: Comparator,
    pub value: String,
}

impl Default for PublicationFilter {
    fn default() -> Self {
        Self {
            property: "status".to_string(),
            property_type: "select".to_string(),
            comparator: Comparator::Equals,
            value: "Published".to_string(),
        }
    }
}

impl PublicationFilter {
    /// Filter object for the database query body.
    pub fn to_query(&self) -> Value {
        let mut condition = serde_json::Map::new();
        condition.insert(
            self.comparator.as_str().to_string(),
            Value::String(self.value.clone()),
        );
        let mut filter = serde_json::Map::new();
        filter.insert("property".to_string(), json!(self.property));
        filter.insert(self.property_type.clone(), Value::Object(condition));
        Value::Object(filter)
    }
}
