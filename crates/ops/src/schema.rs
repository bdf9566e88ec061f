//! Declared node schemas: value type tags and input/output/widget specs.
//!
//! Every operation registers its schema explicitly; values are checked
//! against the closed [`ValueKind`] tag at dispatch time, never coerced.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed set of value types flowing along edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValueKind {
    Text,
    Number,
    Boolean,
    Object,
    List,
    /// Accepts any JSON value; no check is performed.
    Any,
}

impl ValueKind {
    /// Whether `value` is acceptable for this tag.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ValueKind::Text => value.is_string(),
            ValueKind::Number => value.is_number(),
            ValueKind::Boolean => value.is_boolean(),
            ValueKind::Object => value.is_object(),
            ValueKind::List => value.is_array(),
            ValueKind::Any => true,
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueKind::Text => "TEXT",
            ValueKind::Number => "NUMBER",
            ValueKind::Boolean => "BOOLEAN",
            ValueKind::Object => "OBJECT",
            ValueKind::List => "LIST",
            ValueKind::Any => "ANY",
        };
        f.write_str(name)
    }
}

/// One declared input port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ValueKind,
    /// When set, every incoming edge's value is collected into a JSON array
    /// (in edge-declaration order). Otherwise at most one edge may target
    /// this port.
    #[serde(rename = "acceptsMultiple", default)]
    pub accepts_multiple: bool,
}

impl InputSpec {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            accepts_multiple: false,
        }
    }

    pub fn multiple(mut self) -> Self {
        self.accepts_multiple = true;
        self
    }
}

/// One declared output port. Values are assigned to outputs positionally
/// from the operation's return vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ValueKind,
}

impl OutputSpec {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// One static configuration value supplied by the user in the editor,
/// as opposed to data arriving over an edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ValueKind,
    /// Used when the client omits the widget entirely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl WidgetSpec {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_matching() {
        assert!(ValueKind::Text.matches(&json!("hi")));
        assert!(!ValueKind::Text.matches(&json!(1)));
        assert!(ValueKind::Number.matches(&json!(1.5)));
        assert!(ValueKind::List.matches(&json!([1, 2])));
        assert!(ValueKind::Object.matches(&json!({"a": 1})));
        assert!(ValueKind::Any.matches(&json!(null)));
    }

    #[test]
    fn specs_serialize_with_wire_names() {
        let input = InputSpec::new("items", ValueKind::Text).multiple();
        let v = serde_json::to_value(&input).unwrap();
        assert_eq!(v["type"], "TEXT");
        assert_eq!(v["acceptsMultiple"], true);

        let widget = WidgetSpec::new("text", ValueKind::Text);
        let v = serde_json::to_value(&widget).unwrap();
        assert!(v.get("default").is_none());
    }
}
