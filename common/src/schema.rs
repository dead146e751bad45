use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Display;

pub const DRAFT_7: &str = "http://json-schema.org/draft-07/schema#";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Object,
    Array,
    String,
    Integer,
    Number,
    Boolean,
}

impl SchemaType {
    fn matches(&self, value: &Value) -> bool {
        match self {
            SchemaType::Object => value.is_object(),
            SchemaType::Array => value.is_array(),
            SchemaType::String => value.is_string(),
            SchemaType::Boolean => value.is_boolean(),
            SchemaType::Number => value.is_number(),

            // 7.0 is an integer as far as draft-07 is concerned
            SchemaType::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|n| n.is_finite() && n.fract() == 0.0)
            }
        }
    }
}

impl Display for SchemaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            SchemaType::Object => "object",
            SchemaType::Array => "array",
            SchemaType::String => "string",
            SchemaType::Integer => "integer",
            SchemaType::Number => "number",
            SchemaType::Boolean => "boolean",
        };

        write!(f, "{}", str)
    }
}

/// A request model, the subset of JSON Schema draft-07 supported by API Gateway models
///
/// Serializes into the exact document placed into `AWS::ApiGateway::Model.Schema`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSchema {
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none", default)]
    pub schema: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
    pub kind: Option<SchemaType>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub properties: BTreeMap<String, JsonSchema>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub required: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub items: Option<Box<JsonSchema>>,

    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty", default)]
    pub enumeration: Vec<Value>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub maximum: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub min_properties: Option<usize>,
}

/// A single reason a value does not conform to a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Location of the offending value, `$` being the document root
    pub path: String,
    pub message: String,
}

impl Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl JsonSchema {
    fn of(kind: SchemaType) -> Self {
        JsonSchema {
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn object() -> Self {
        Self::of(SchemaType::Object)
    }

    pub fn string() -> Self {
        Self::of(SchemaType::String)
    }

    pub fn integer() -> Self {
        Self::of(SchemaType::Integer)
    }

    pub fn number() -> Self {
        Self::of(SchemaType::Number)
    }

    pub fn array(items: JsonSchema) -> Self {
        JsonSchema {
            items: Some(Box::new(items)),
            ..Self::of(SchemaType::Array)
        }
    }

    /// Mark the schema as a root document
    pub fn draft7(mut self) -> Self {
        self.schema = Some(DRAFT_7.into());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn property(mut self, name: &str, schema: JsonSchema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    pub fn required(mut self, names: &[&str]) -> Self {
        self.required = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn enumeration(mut self, values: &[&str]) -> Self {
        self.enumeration = values.iter().map(|v| Value::String(v.to_string())).collect();
        self
    }

    pub fn maximum(mut self, maximum: i64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    pub fn min_properties(mut self, min: usize) -> Self {
        self.min_properties = Some(min);
        self
    }

    /// Check a JSON value against the schema
    ///
    /// Collects every violation instead of stopping at the first one.
    pub fn validate(&self, value: &Value) -> Result<(), Vec<Violation>> {
        let mut violations = vec![];
        self.check(value, "$", &mut violations);

        if violations.is_empty() {
            Ok(())
        } else {
            log::debug!("Value does not match the schema: {violations:?}");
            Err(violations)
        }
    }

    fn check(&self, value: &Value, path: &str, violations: &mut Vec<Violation>) {
        let mut violation = |message: String| {
            violations.push(Violation {
                path: path.to_string(),
                message,
            })
        };

        if let Some(kind) = self.kind {
            if !kind.matches(value) {
                // Nested keywords make no sense for a value of the wrong type
                violation(format!("expected {kind}, got {}", type_name(value)));
                return;
            }
        }

        if !self.enumeration.is_empty() && !self.enumeration.contains(value) {
            let allowed = self
                .enumeration
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ");

            violation(format!("must be one of {allowed}"));
        }

        if let (Some(number), Some(maximum)) = (value.as_f64(), self.maximum) {
            if number > maximum as f64 {
                violation(format!("must be at most {maximum}"));
            }
        }

        match value {
            Value::Object(map) => {
                if let Some(min) = self.min_properties {
                    if map.len() < min {
                        violation(format!("must have at least {min} properties"));
                    }
                }

                for name in self.required.iter() {
                    if !map.contains_key(name) {
                        violation(format!("missing required property `{name}`"));
                    }
                }

                for (name, schema) in self.properties.iter() {
                    if let Some(value) = map.get(name) {
                        schema.check(value, &format!("{path}.{name}"), violations);
                    }
                }
            }

            Value::Array(items) => {
                if let Some(schema) = &self.items {
                    for (index, item) in items.iter().enumerate() {
                        schema.check(item, &format!("{path}[{index}]"), violations);
                    }
                }
            }

            _ => {}
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
