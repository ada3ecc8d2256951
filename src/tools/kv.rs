//! Key-value store tools.

use crate::collaborator::Link;
use crate::error::{ToolError, ToolResult};
use crate::kv::KvBackend;
use crate::protocol::{CallToolResult, Tool};
use crate::tools::args::Arguments;
use crate::tools::registry::{json_result, ToolHandler};
use crate::tools::schema::{InputSchema, Property, PropertyType};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{instrument, warn};

/// Parses a duration such as `300ms`, `1.5h` or `2h45m`.
///
/// Units: `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. A bare `0` is accepted.
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let input = text.trim();
    if input == "0" {
        return Ok(Duration::ZERO);
    }
    if input.is_empty() {
        return Err("empty duration".into());
    }

    let mut rest = input;
    let mut nanos = 0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(format!("invalid duration '{}'", text));
        }
        let value: f64 = rest[..number_len]
            .parse()
            .map_err(|_| format!("invalid duration '{}'", text))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(format!("missing unit in duration '{}'", text)),
            unit => return Err(format!("unknown unit '{}' in duration '{}'", unit, text)),
        };
        nanos += value * scale;
        rest = &rest[unit_len..];
    }

    Ok(Duration::from_nanos(nanos.round() as u64))
}

/// Optional expiry; zero means none.
///
/// The store counts in milliseconds, so a non-zero expiry below one
/// millisecond is rounded up to one.
fn expiration(args: &Arguments) -> ToolResult<Option<Duration>> {
    match args.optional_text("expiration")? {
        None => Ok(None),
        Some(text) => {
            let duration = parse_duration(text)
                .map_err(|e| ToolError::InvalidArguments(format!("'expiration': {}", e)))?;
            Ok(Some(duration)
                .filter(|d| !d.is_zero())
                .map(|d| d.max(Duration::from_millis(1))))
        }
    }
}

fn key_schema(description: &str) -> InputSchema {
    InputSchema::object().required("key", Property::string(description))
}

pub struct GetTool;

#[async_trait]
impl<C: KvBackend> ToolHandler<C> for GetTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "redis_get".into(),
            description: "Get the value of a key. A missing key is reported with found=false."
                .into(),
            input_schema: key_schema("Key to read"),
        }
    }

    #[instrument(skip(self, args, link), fields(tool = "redis_get"))]
    async fn execute(&self, args: &Arguments, link: &mut Link<C>) -> ToolResult<CallToolResult> {
        let key = args.required_text("key")?;
        let value = link.backend().get(key).await?;
        json_result(&json!({
            "key": key,
            "found": value.is_some(),
            "value": value,
        }))
    }
}

pub struct SetTool;

#[async_trait]
impl<C: KvBackend> ToolHandler<C> for SetTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "redis_set".into(),
            description: "Set a key to a text value, optionally with an expiration.".into(),
            input_schema: InputSchema::object()
                .required("key", Property::string("Key to write"))
                .required("value", Property::string("Value to store"))
                .optional(
                    "expiration",
                    Property::string("Expiration such as '30s', '10m' or '1h30m'; omit for none"),
                ),
        }
    }

    fn validate(&self, args: &Arguments) -> ToolResult<()> {
        expiration(args).map(|_| ())
    }

    #[instrument(skip(self, args, link), fields(tool = "redis_set"))]
    async fn execute(&self, args: &Arguments, link: &mut Link<C>) -> ToolResult<CallToolResult> {
        let key = args.required_text("key")?;
        let value = args.required_text("value")?;
        let expiry = expiration(args)?;

        link.backend().set(key, value, expiry).await?;
        json_result(&json!({
            "key": key,
            "status": "OK",
            "expiration_ms": expiry.map(|d| d.as_millis() as u64),
        }))
    }
}

pub struct DeleteTool;

#[async_trait]
impl<C: KvBackend> ToolHandler<C> for DeleteTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "redis_del".into(),
            description: "Delete one or more keys and return how many were removed.".into(),
            input_schema: InputSchema::object().required(
                "keys",
                Property::array("Keys to delete", Property::string("Key name")),
            ),
        }
    }

    #[instrument(skip(self, args, link), fields(tool = "redis_del"))]
    async fn execute(&self, args: &Arguments, link: &mut Link<C>) -> ToolResult<CallToolResult> {
        let keys = args.required_text_list("keys")?;
        let deleted = link.backend().delete(&keys).await?;
        json_result(&json!({ "deleted": deleted, "keys": keys }))
    }
}

pub struct KeysTool;

#[async_trait]
impl<C: KvBackend> ToolHandler<C> for KeysTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "redis_keys".into(),
            description: "List keys matching a glob pattern (e.g. 'user:*').".into(),
            input_schema: InputSchema::object()
                .required("pattern", Property::string("Glob pattern")),
        }
    }

    #[instrument(skip(self, args, link), fields(tool = "redis_keys"))]
    async fn execute(&self, args: &Arguments, link: &mut Link<C>) -> ToolResult<CallToolResult> {
        let pattern = args.required_text("pattern")?;
        let keys = link.backend().keys(pattern).await?;
        json_result(&json!({
            "pattern": pattern,
            "count": keys.len(),
            "keys": keys,
        }))
    }
}

pub struct TypeTool;

#[async_trait]
impl<C: KvBackend> ToolHandler<C> for TypeTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "redis_type".into(),
            description: "Get the type of the value stored at a key.".into(),
            input_schema: key_schema("Key to inspect"),
        }
    }

    #[instrument(skip(self, args, link), fields(tool = "redis_type"))]
    async fn execute(&self, args: &Arguments, link: &mut Link<C>) -> ToolResult<CallToolResult> {
        let key = args.required_text("key")?;
        let kind = link.backend().key_type(key).await?;
        json_result(&json!({ "key": key, "type": kind }))
    }
}

#[derive(Debug, Serialize)]
struct TtlOutput<'a> {
    key: &'a str,
    ttl_seconds: i64,
    state: &'static str,
}

pub struct TtlTool;

#[async_trait]
impl<C: KvBackend> ToolHandler<C> for TtlTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "redis_ttl".into(),
            description: "Get the remaining time to live of a key. ttl_seconds is -1 for keys \
                without expiry and -2 for missing keys."
                .into(),
            input_schema: key_schema("Key to inspect"),
        }
    }

    #[instrument(skip(self, args, link), fields(tool = "redis_ttl"))]
    async fn execute(&self, args: &Arguments, link: &mut Link<C>) -> ToolResult<CallToolResult> {
        let key = args.required_text("key")?;
        let ttl = link.backend().ttl(key).await?;
        json_result(&TtlOutput {
            key,
            ttl_seconds: ttl.seconds(),
            state: ttl.state(),
        })
    }
}

pub struct InfoTool;

#[async_trait]
impl<C: KvBackend> ToolHandler<C> for InfoTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "redis_info".into(),
            description: "Get server information, optionally for one section \
                (server, clients, memory, stats, ...)."
                .into(),
            input_schema: InputSchema::object()
                .optional("section", Property::string("Info section name")),
        }
    }

    #[instrument(skip(self, args, link), fields(tool = "redis_info"))]
    async fn execute(&self, args: &Arguments, link: &mut Link<C>) -> ToolResult<CallToolResult> {
        let section = args.optional_text("section")?;
        let info = link.backend().info(section).await?;
        json_result(&json!({ "section": section, "info": info }))
    }
}

pub struct DbSizeTool;

#[async_trait]
impl<C: KvBackend> ToolHandler<C> for DbSizeTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "redis_dbsize".into(),
            description: "Count the keys in the selected database.".into(),
            input_schema: InputSchema::object(),
        }
    }

    async fn execute(&self, _args: &Arguments, link: &mut Link<C>) -> ToolResult<CallToolResult> {
        let size = link.backend().dbsize().await?;
        json_result(&json!({ "dbsize": size }))
    }
}

pub struct FlushTool;

#[async_trait]
impl<C: KvBackend> ToolHandler<C> for FlushTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "redis_flushdb".into(),
            description: "Delete every key in the selected database. This cannot be undone."
                .into(),
            input_schema: InputSchema::object(),
        }
    }

    #[instrument(skip(self, _args, link), fields(tool = "redis_flushdb"))]
    async fn execute(&self, _args: &Arguments, link: &mut Link<C>) -> ToolResult<CallToolResult> {
        warn!("Flushing the selected database");
        link.backend().flush().await?;
        json_result(&json!({ "status": "OK" }))
    }
}

pub struct ExecuteTool;

#[async_trait]
impl<C: KvBackend> ToolHandler<C> for ExecuteTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "redis_execute".into(),
            description: "Execute an arbitrary command with arguments and return its reply."
                .into(),
            input_schema: InputSchema::object()
                .required("command", Property::string("Command name, e.g. HGETALL"))
                .optional(
                    "args",
                    Property::new(
                        PropertyType::Array,
                        "Command arguments (strings, numbers or booleans)",
                    ),
                ),
        }
    }

    fn validate(&self, args: &Arguments) -> ToolResult<()> {
        args.optional_scalar_list("args").map(|_| ())
    }

    #[instrument(skip(self, args, link), fields(tool = "redis_execute"))]
    async fn execute(&self, args: &Arguments, link: &mut Link<C>) -> ToolResult<CallToolResult> {
        let command = args.required_text("command")?;
        let command_args = args.optional_scalar_list("args")?;
        let result: Value = link.backend().raw_command(command, &command_args).await?;
        json_result(&json!({
            "command": command,
            "args": command_args,
            "result": result,
        }))
    }
}
