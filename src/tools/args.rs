//! Tagged argument values extracted from a `tools/call` argument mapping.

use crate::error::{ToolError, ToolResult};
use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// One argument value as supplied by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Text(String),
    Number(Number),
    Boolean(bool),
    Sequence(Vec<ArgValue>),
    /// Nested object; no tool declares one, so only undeclared arguments
    /// carry it through validation.
    Mapping(BTreeMap<String, ArgValue>),
    /// Missing from the mapping, or explicitly `null`.
    Absent,
}

static ABSENT: ArgValue = ArgValue::Absent;

impl ArgValue {
    fn from_json(name: &str, value: Value) -> ToolResult<Self> {
        Ok(match value {
            Value::Null => Self::Absent,
            Value::String(s) => Self::Text(s),
            Value::Number(n) => Self::Number(n),
            Value::Bool(b) => Self::Boolean(b),
            Value::Array(items) => Self::Sequence(
                items
                    .into_iter()
                    .map(|item| Self::from_json(name, item))
                    .collect::<ToolResult<_>>()?,
            ),
            Value::Object(map) => Self::Mapping(
                map.into_iter()
                    .map(|(key, item)| Self::from_json(name, item).map(|value| (key, value)))
                    .collect::<ToolResult<_>>()?,
            ),
        })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "string",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::Sequence(_) => "array",
            Self::Mapping(_) => "object",
            Self::Absent => "null",
        }
    }

    /// Textual form of a scalar; `None` for sequences and absent values.
    pub fn as_scalar_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Number(n) => Some(n.to_string()),
            Self::Boolean(b) => Some(b.to_string()),
            Self::Sequence(_) | Self::Mapping(_) | Self::Absent => None,
        }
    }
}

/// Argument mapping of one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(BTreeMap<String, ArgValue>);

impl Arguments {
    /// Converts the raw `arguments` member; `null` or a missing member is an
    /// empty mapping.
    pub fn from_json(value: Value) -> ToolResult<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => map
                .into_iter()
                .map(|(name, value)| {
                    let value = ArgValue::from_json(&name, value)?;
                    Ok((name, value))
                })
                .collect::<ToolResult<BTreeMap<_, _>>>()
                .map(Self),
            other => Err(ToolError::InvalidArguments(format!(
                "arguments must be an object, got {}",
                json_type(&other)
            ))),
        }
    }

    pub fn get(&self, name: &str) -> &ArgValue {
        self.0.get(name).unwrap_or(&ABSENT)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Non-empty text argument.
    pub fn required_text(&self, name: &'static str) -> ToolResult<&str> {
        match self.get(name) {
            ArgValue::Text(s) if !s.is_empty() => Ok(s.as_str()),
            ArgValue::Absent | ArgValue::Text(_) => Err(ToolError::MissingArgument(name.into())),
            other => Err(mismatch(name, "string", other)),
        }
    }

    /// Text argument; absent or empty yields `None`.
    pub fn optional_text(&self, name: &'static str) -> ToolResult<Option<&str>> {
        match self.get(name) {
            ArgValue::Absent => Ok(None),
            ArgValue::Text(s) if s.is_empty() => Ok(None),
            ArgValue::Text(s) => Ok(Some(s.as_str())),
            other => Err(mismatch(name, "string", other)),
        }
    }

    /// Sequence of non-empty text values with at least one element.
    pub fn required_text_list(&self, name: &'static str) -> ToolResult<Vec<String>> {
        match self.get(name) {
            ArgValue::Sequence(items) if !items.is_empty() => items
                .iter()
                .map(|item| match item {
                    ArgValue::Text(s) if !s.is_empty() => Ok(s.clone()),
                    other => Err(mismatch(name, "non-empty string", other)),
                })
                .collect(),
            ArgValue::Absent | ArgValue::Sequence(_) => {
                Err(ToolError::MissingArgument(name.into()))
            }
            other => Err(mismatch(name, "array", other)),
        }
    }

    /// Sequence of scalars rendered as text; absent yields an empty list.
    pub fn optional_scalar_list(&self, name: &'static str) -> ToolResult<Vec<String>> {
        match self.get(name) {
            ArgValue::Absent => Ok(Vec::new()),
            ArgValue::Sequence(items) => items
                .iter()
                .map(|item| {
                    item.as_scalar_text()
                        .ok_or_else(|| mismatch(name, "scalar", item))
                })
                .collect(),
            other => Err(mismatch(name, "array", other)),
        }
    }
}

fn mismatch(name: &str, expected: &str, got: &ArgValue) -> ToolError {
    ToolError::InvalidArguments(format!(
        "'{}' must be {}, got {}",
        name,
        expected,
        got.type_name()
    ))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
