//! Tool registry: ordered, name-unique, fixed after construction.

use crate::collaborator::{Collaborator, Link};
use crate::error::{ToolError, ToolResult};
use crate::protocol::{CallToolResult, Tool};
use crate::tools::args::Arguments;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// One tool: its descriptor plus the capability it drives on collaborator `C`.
#[async_trait]
pub trait ToolHandler<C: Collaborator>: Send + Sync {
    fn definition(&self) -> Tool;

    /// Checks beyond the declared schema; runs before any collaborator access.
    fn validate(&self, _args: &Arguments) -> ToolResult<()> {
        Ok(())
    }

    /// Whether the link must be connected before `execute` runs.
    fn requires_connection(&self) -> bool {
        true
    }

    async fn execute(&self, args: &Arguments, link: &mut Link<C>) -> ToolResult<CallToolResult>;
}

pub struct RegisteredTool<C: Collaborator> {
    pub definition: Tool,
    pub handler: Box<dyn ToolHandler<C>>,
}

pub struct ToolRegistry<C: Collaborator> {
    tools: Vec<RegisteredTool<C>>,
    index: HashMap<String, usize>,
}

impl<C: Collaborator> ToolRegistry<C> {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Adds a tool; a repeated name is a construction error.
    pub fn register<T: ToolHandler<C> + 'static>(&mut self, tool: T) -> ToolResult<()> {
        let definition = tool.definition();
        let name = definition.name.clone();
        if self.index.contains_key(&name) {
            return Err(ToolError::DuplicateTool(name));
        }

        debug!("Registering tool: {}", name);
        self.index.insert(name, self.tools.len());
        self.tools.push(RegisteredTool {
            definition,
            handler: Box::new(tool),
        });
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> ToolResult<&RegisteredTool<C>> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// Descriptors in registration order.
    pub fn list(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.definition.name.as_str()).collect()
    }

    /// Lookup, argument validation, lazy connection, then execution.
    ///
    /// Nothing touches the collaborator until the arguments are valid, and a
    /// failed reconnection stops the call before the handler runs.
    #[instrument(skip(self, arguments, link), fields(tool = %name))]
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Value,
        link: &mut Link<C>,
    ) -> ToolResult<CallToolResult> {
        let tool = self.lookup(name)?;
        let args = Arguments::from_json(arguments)?;

        tool.definition.input_schema.validate(&args)?;
        tool.handler.validate(&args)?;

        if tool.handler.requires_connection() {
            link.ensure_connected().await?;
        }

        tool.handler.execute(&args, link).await
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl<C: Collaborator> Default for ToolRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps a payload as the single text block of a tool result.
pub fn json_result<T: serde::Serialize>(data: &T) -> ToolResult<CallToolResult> {
    CallToolResult::json(data)
        .map_err(|e| ToolError::ExecutionFailed(format!("result could not be encoded: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollaboratorError;
    use crate::testing::StubKv;
    use crate::tools::schema::{InputSchema, Property};
    use serde_json::json;

    struct EchoTool(&'static str);

    #[async_trait]
    impl ToolHandler<StubKv> for EchoTool {
        fn definition(&self) -> Tool {
            Tool {
                name: self.0.into(),
                description: "Echo the key".into(),
                input_schema: InputSchema::object().required("key", Property::string("Key")),
            }
        }

        async fn execute(
            &self,
            args: &Arguments,
            _link: &mut Link<StubKv>,
        ) -> ToolResult<CallToolResult> {
            Ok(CallToolResult::text(args.required_text("key")?))
        }
    }

    fn registry() -> ToolRegistry<StubKv> {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool("b_tool")).unwrap();
        registry.register(EchoTool("a_tool")).unwrap();
        registry
    }

    #[test]
    fn test_registration_order_and_lookup() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["b_tool", "a_tool"]);
        assert!(registry.lookup("a_tool").is_ok());
        assert!(matches!(
            registry.lookup("unknown"),
            Err(ToolError::NotFound(_))
        ));
        assert_eq!(registry.list(), registry.list());
    }

    struct Unencodable;

    impl serde::Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("cannot encode"))
        }
    }

    #[test]
    fn test_json_result_encoding_failure() {
        let ok = json_result(&json!({"a": 1})).unwrap();
        assert_eq!(ok, CallToolResult::text("{\n  \"a\": 1\n}"));

        let err = json_result(&Unencodable).unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed(_)));
        assert_eq!(err.into_protocol("echo").code(), -32603);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = registry();
        assert!(matches!(
            registry.register(EchoTool("a_tool")),
            Err(ToolError::DuplicateTool(_))
        ));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_invoke_validates_before_connecting() {
        let registry = registry();
        let mut link = Link::new(StubKv::new());

        let err = registry
            .invoke("a_tool", json!({}), &mut link)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::MissingArgument(_)));
        assert_eq!(link.backend().connects(), 0);

        let result = registry
            .invoke("a_tool", json!({"key": "k"}), &mut link)
            .await
            .unwrap();
        assert_eq!(result, CallToolResult::text("k"));
        assert_eq!(link.backend().connects(), 1);
    }

    #[tokio::test]
    async fn test_invoke_stops_on_failed_connection() {
        let registry = registry();
        let mut link = Link::new(StubKv::new().failing_connect());

        let err = registry
            .invoke("a_tool", json!({"key": "k"}), &mut link)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::Collaborator(CollaboratorError::ConnectionFailed(_))
        ));
    }
}
