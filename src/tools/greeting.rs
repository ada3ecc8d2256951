//! `say_hello`: greet someone and append the greeting to the log file.

use crate::collaborator::Link;
use crate::error::ToolResult;
use crate::greeting::GreetingLog;
use crate::protocol::{CallToolResult, Tool};
use crate::tools::args::Arguments;
use crate::tools::registry::{json_result, ToolHandler};
use crate::tools::schema::{InputSchema, Property};
use async_trait::async_trait;
use chrono::Local;
use serde::Serialize;
use tracing::{instrument, warn};

pub const DEFAULT_GREETING: &str = "Hello";

const TEMPLATE_COUNT: usize = 4;

/// Canned reply picked by the byte length of the name.
pub fn reply_for(person_name: &str) -> String {
    match person_name.len() % TEMPLATE_COUNT {
        0 => format!("Hello {}! Nice to meet you!", person_name),
        1 => format!("Hi {}! Hope you're having a great day!", person_name),
        2 => format!("{}, hello! Is there anything I can help you with?", person_name),
        _ => format!("Hello {}! Welcome to the MCP service!", person_name),
    }
}

pub fn log_entry(timestamp: &str, person_name: &str, greeting: &str) -> String {
    format!("[{}] to {}: {}", timestamp, person_name, greeting)
}

#[derive(Debug, Serialize)]
struct GreetingOutput {
    reply: String,
    log_entry: String,
    logged: bool,
}

pub struct SayHelloTool;

#[async_trait]
impl<C: GreetingLog> ToolHandler<C> for SayHelloTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "say_hello".into(),
            description: "Say hello to someone: records the greeting in the log file and \
                returns a friendly reply."
                .into(),
            input_schema: InputSchema::object()
                .required("person_name", Property::string("Name of the person to greet"))
                .optional(
                    "greeting_message",
                    Property::string("Optional custom greeting, defaults to 'Hello'"),
                ),
        }
    }

    /// A log failure is reported in the payload, not as a call failure.
    fn requires_connection(&self) -> bool {
        false
    }

    #[instrument(skip(self, args, link), fields(tool = "say_hello"))]
    async fn execute(&self, args: &Arguments, link: &mut Link<C>) -> ToolResult<CallToolResult> {
        let person_name = args.required_text("person_name")?;
        let greeting = args
            .optional_text("greeting_message")?
            .unwrap_or(DEFAULT_GREETING);

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let entry = log_entry(&timestamp, person_name, greeting);

        let logged = match link.ensure_connected().await {
            Ok(()) => match link.backend_mut().append(&entry).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to write greeting log: {}", e);
                    false
                }
            },
            Err(e) => {
                warn!("Greeting log unavailable: {}", e);
                false
            }
        };

        json_result(&GreetingOutput {
            reply: reply_for(person_name),
            log_entry: entry,
            logged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_selection_by_length() {
        assert!(reply_for("Anna").starts_with("Hello Anna! Nice"));
        assert!(reply_for("Bob").starts_with("Hello Bob! Welcome"));
        assert!(reply_for("Li").starts_with("Li, hello!"));
        assert!(reply_for("Kai Z").starts_with("Hi Kai Z!"));
    }

    #[test]
    fn test_reply_uses_byte_length() {
        // "Zoë" is three characters but four bytes.
        assert!(reply_for("Zoë").starts_with("Hello Zoë! Nice"));
    }

    #[test]
    fn test_log_entry_format() {
        assert_eq!(
            log_entry("2024-01-02 03:04:05", "Ada", "Hi"),
            "[2024-01-02 03:04:05] to Ada: Hi"
        );
    }
}
