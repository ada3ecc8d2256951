//! Input schema subset used by tool descriptors.

use crate::error::{ToolError, ToolResult};
use crate::tools::args::{ArgValue, Arguments};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Primitive type tag of a schema property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
}

impl PropertyType {
    fn accepts(self, value: &ArgValue) -> bool {
        match (self, value) {
            (_, ArgValue::Absent) => true,
            (Self::String, ArgValue::Text(_)) => true,
            (Self::Integer, ArgValue::Number(n)) => n.is_i64() || n.is_u64(),
            (Self::Number, ArgValue::Number(_)) => true,
            (Self::Boolean, ArgValue::Boolean(_)) => true,
            (Self::Array, ArgValue::Sequence(_)) => true,
            _ => false,
        }
    }
}

/// One named parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "type")]
    pub kind: PropertyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Property>>,
}

impl Property {
    pub fn new(kind: PropertyType, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: Some(description.into()),
            items: None,
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new(PropertyType::String, description)
    }

    /// Array property; `items` describes each element.
    pub fn array(description: impl Into<String>, items: Property) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::new(PropertyType::Array, description)
        }
    }
}

/// JSON-schema object with named properties and a required subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Property>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl Default for InputSchema {
    fn default() -> Self {
        Self::object()
    }
}

impl InputSchema {
    /// Empty object schema (a tool without arguments).
    pub fn object() -> Self {
        Self {
            kind: "object".into(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    pub fn required(mut self, name: impl Into<String>, property: Property) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.properties.insert(name, property);
        self
    }

    pub fn optional(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    /// Checks required presence first, then the declared type of every
    /// supplied property. Unknown arguments are ignored.
    pub fn validate(&self, args: &Arguments) -> ToolResult<()> {
        for name in &self.required {
            if is_missing(args.get(name)) {
                return Err(ToolError::MissingArgument(name.clone().into()));
            }
        }

        for (name, property) in &self.properties {
            check_type(name, property, args.get(name))?;
        }

        Ok(())
    }
}

/// Empty text and empty sequences count as missing.
fn is_missing(value: &ArgValue) -> bool {
    match value {
        ArgValue::Absent => true,
        ArgValue::Text(s) => s.is_empty(),
        ArgValue::Sequence(items) => items.is_empty(),
        _ => false,
    }
}

fn check_type(name: &str, property: &Property, value: &ArgValue) -> ToolResult<()> {
    if !property.kind.accepts(value) {
        return Err(ToolError::InvalidArguments(format!(
            "'{}' must be of type {}, got {}",
            name,
            type_name(property.kind),
            value.type_name()
        )));
    }

    if let (Some(items), ArgValue::Sequence(elements)) = (&property.items, value) {
        for (index, element) in elements.iter().enumerate() {
            if matches!(element, ArgValue::Absent) || !items.kind.accepts(element) {
                return Err(ToolError::InvalidArguments(format!(
                    "'{}[{}]' must be of type {}, got {}",
                    name,
                    index,
                    type_name(items.kind),
                    element.type_name()
                )));
            }
        }
    }

    Ok(())
}

fn type_name(kind: PropertyType) -> &'static str {
    match kind {
        PropertyType::String => "string",
        PropertyType::Integer => "integer",
        PropertyType::Number => "number",
        PropertyType::Boolean => "boolean",
        PropertyType::Array => "array",
    }
}
