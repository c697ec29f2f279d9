//! Function (tool) schemas offered to the model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// A named capability the model may select and supply arguments for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema of the arguments object.
    #[serde(default = "empty_object_schema")]
    pub parameters: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

impl FunctionSchema {
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            parameters,
        }
    }

    /// Names listed under the schema's `required` key.
    #[must_use]
    pub fn required(&self) -> Vec<&str> {
        required_fields(&self.parameters)
    }

    /// The schema's `properties` object, or an empty object.
    #[must_use]
    pub fn properties(&self) -> Value {
        self.parameters
            .get("properties")
            .cloned()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()))
    }
}

/// Names listed under a JSON schema's `required` key.
pub(crate) fn required_fields(schema: &Value) -> Vec<&str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|fields| fields.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Find the schema named `name`.
///
/// # Errors
/// Returns [`Error::InvalidFunctionSelection`] if no schema has that name.
pub fn find<'a>(functions: &'a [FunctionSchema], name: &str) -> Result<&'a FunctionSchema> {
    functions
        .iter()
        .find(|f| f.name == name)
        .ok_or_else(|| Error::InvalidFunctionSelection {
            name: name.to_string(),
            available: functions.iter().map(|f| f.name.clone()).collect(),
        })
}

/// Serialize `value` as JSON indented with `indent` spaces.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn to_json_indented<T: Serialize + ?Sized>(value: &T, indent: usize) -> Result<String> {
    let indent = " ".repeat(indent);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut ser)?;
    String::from_utf8(out).map_err(|e| Error::Other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather() -> FunctionSchema {
        FunctionSchema::new(
            "get_weather",
            "Get weather in a location",
            json!({
                "type": "object",
                "properties": {"location": {"type": "string", "description": "City name"}},
                "required": ["location"]
            }),
        )
    }

    #[test]
    fn required_fields() {
        assert_eq!(weather().required(), vec!["location"]);
        let bare = FunctionSchema::new("noop", "Nothing", json!({}));
        assert!(bare.required().is_empty());
        assert_eq!(bare.properties(), json!({}));
    }

    #[test]
    fn find_unknown_lists_available() {
        let functions = vec![weather()];
        assert!(find(&functions, "get_weather").is_ok());
        match find(&functions, "get_unknown") {
            Err(Error::InvalidFunctionSelection { name, available }) => {
                assert_eq!(name, "get_unknown");
                assert_eq!(available, vec!["get_weather".to_string()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn indented_json_keeps_key_order() {
        let text = to_json_indented(&json!({"b": 1, "a": [true]}), 4).unwrap();
        assert_eq!(text, "{\n    \"b\": 1,\n    \"a\": [\n        true\n    ]\n}");
    }

    #[test]
    fn missing_parameters_default_to_empty_object() {
        let f: FunctionSchema = serde_json::from_str(r#"{"name": "ping"}"#).unwrap();
        assert_eq!(f.description, None);
        assert_eq!(f.properties(), json!({}));
    }
}
