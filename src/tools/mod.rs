//! MCP tool definitions and registry.

pub mod args;
pub mod greeting;
pub mod kv;
pub mod registry;
pub mod schema;
pub mod sql;
pub mod status;

pub use args::{ArgValue, Arguments};
pub use greeting::SayHelloTool;
pub use kv::{
    DbSizeTool, DeleteTool, ExecuteTool, FlushTool, GetTool, InfoTool, KeysTool, SetTool,
    TtlTool, TypeTool,
};
pub use registry::{json_result, RegisteredTool, ToolHandler, ToolRegistry};
pub use schema::{InputSchema, Property, PropertyType};
pub use sql::{ListTablesTool, QueryTool, TableSchemaTool};
pub use status::ConnectionStatusTool;

use crate::database::SqlBackend;
use crate::error::ToolResult;
use crate::greeting::GreetingLog;
use crate::kv::KvBackend;

/// Create and register the greeting tool set.
pub fn create_greeting_registry<C: GreetingLog + 'static>() -> ToolResult<ToolRegistry<C>> {
    let mut registry = ToolRegistry::new();
    registry.register(SayHelloTool)?;
    Ok(registry)
}

/// Create and register the relational store tool set.
pub fn create_sql_registry<C: SqlBackend + 'static>() -> ToolResult<ToolRegistry<C>> {
    let mut registry = ToolRegistry::new();

    registry.register(QueryTool)?;
    registry.register(ListTablesTool)?;
    registry.register(TableSchemaTool)?;

    // Status works without a connection
    registry.register(ConnectionStatusTool::new(
        "database_status",
        "Report whether the database is reachable and where the server points.",
    ))?;

    Ok(registry)
}

/// Create and register the key-value store tool set.
pub fn create_kv_registry<C: KvBackend + 'static>() -> ToolResult<ToolRegistry<C>> {
    let mut registry = ToolRegistry::new();

    registry.register(GetTool)?;
    registry.register(SetTool)?;
    registry.register(DeleteTool)?;
    registry.register(KeysTool)?;
    registry.register(TypeTool)?;
    registry.register(TtlTool)?;
    registry.register(InfoTool)?;
    registry.register(DbSizeTool)?;
    registry.register(FlushTool)?;
    registry.register(ExecuteTool)?;

    // Status works without a connection
    registry.register(ConnectionStatusTool::new(
        "redis_status",
        "Report whether Redis is reachable and where the server points.",
    ))?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::Link;
    use crate::error::{CollaboratorError, ToolError};
    use crate::testing::{StubGreetingLog, StubKv, StubSql};
    use serde_json::{json, Value};

    fn payload(result: &crate::protocol::CallToolResult) -> Value {
        match &result.content[0] {
            crate::protocol::ToolContent::Text { text } => serde_json::from_str(text).unwrap(),
        }
    }

    #[test]
    fn test_registry_contents() {
        let greeting = create_greeting_registry::<StubGreetingLog>().unwrap();
        assert_eq!(greeting.names(), vec!["say_hello"]);

        let sql = create_sql_registry::<StubSql>().unwrap();
        assert_eq!(
            sql.names(),
            vec![
                "database_query",
                "database_tables",
                "database_schema",
                "database_status"
            ]
        );

        let kv = create_kv_registry::<StubKv>().unwrap();
        assert_eq!(kv.len(), 11);
        assert_eq!(kv.names()[0], "redis_get");
        assert_eq!(kv.names()[10], "redis_status");
    }

    #[tokio::test]
    async fn test_kv_set_then_get() {
        let registry = create_kv_registry::<StubKv>().unwrap();
        let mut link = Link::new(StubKv::new());

        registry
            .invoke("redis_set", json!({"key": "a", "value": "1"}), &mut link)
            .await
            .unwrap();
        let got = registry
            .invoke("redis_get", json!({"key": "a"}), &mut link)
            .await
            .unwrap();

        let got = payload(&got);
        assert_eq!(got["found"], true);
        assert_eq!(got["value"], "1");

        let missing = registry
            .invoke("redis_get", json!({"key": "zzz"}), &mut link)
            .await
            .unwrap();
        assert_eq!(payload(&missing)["found"], false);
    }

    #[tokio::test]
    async fn test_kv_ttl_states() {
        let registry = create_kv_registry::<StubKv>().unwrap();
        let mut link = Link::new(StubKv::new());

        let absent = payload(
            &registry
                .invoke("redis_ttl", json!({"key": "nope"}), &mut link)
                .await
                .unwrap(),
        );
        assert_eq!(absent["state"], "absent");
        assert_eq!(absent["ttl_seconds"], -2);

        registry
            .invoke(
                "redis_set",
                json!({"key": "t", "value": "v", "expiration": "1m"}),
                &mut link,
            )
            .await
            .unwrap();
        let expiring = payload(
            &registry
                .invoke("redis_ttl", json!({"key": "t"}), &mut link)
                .await
                .unwrap(),
        );
        assert_eq!(expiring["state"], "expiring");
        assert_eq!(expiring["ttl_seconds"], 60);
    }

    #[tokio::test]
    async fn test_kv_invalid_expiration_never_reaches_store() {
        let registry = create_kv_registry::<StubKv>().unwrap();
        let mut link = Link::new(StubKv::new());

        let err = registry
            .invoke(
                "redis_set",
                json!({"key": "a", "value": "1", "expiration": "forever"}),
                &mut link,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert_eq!(link.backend().calls(), 0);
        assert_eq!(link.backend().connects(), 0);
    }

    #[tokio::test]
    async fn test_kv_delete_and_execute() {
        let registry = create_kv_registry::<StubKv>().unwrap();
        let mut link = Link::new(StubKv::new());

        for key in ["a", "b"] {
            registry
                .invoke("redis_set", json!({"key": key, "value": "x"}), &mut link)
                .await
                .unwrap();
        }

        let deleted = registry
            .invoke("redis_del", json!({"keys": ["a", "b", "c"]}), &mut link)
            .await
            .unwrap();
        assert_eq!(payload(&deleted)["deleted"], 2);

        let err = registry
            .invoke("redis_del", json!({"keys": []}), &mut link)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::MissingArgument(_)));

        let executed = registry
            .invoke(
                "redis_execute",
                json!({"command": "ECHO", "args": ["hi", 2, true]}),
                &mut link,
            )
            .await
            .unwrap();
        let executed = payload(&executed);
        assert_eq!(executed["args"], json!(["hi", "2", "true"]));
        assert_eq!(executed["result"], json!(["ECHO", "hi", "2", "true"]));
    }

    #[tokio::test]
    async fn test_status_reports_failed_reconnect() {
        let registry = create_kv_registry::<StubKv>().unwrap();
        let mut link = Link::new(StubKv::new().failing_connect());

        let status = payload(
            &registry
                .invoke("redis_status", json!({}), &mut link)
                .await
                .unwrap(),
        );
        assert_eq!(status["connected"], false);
        assert_eq!(status["endpoint"]["kind"], "stub-kv");
        assert!(status["error"].is_string());

        let err = registry
            .invoke("redis_dbsize", json!({}), &mut link)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::Collaborator(CollaboratorError::ConnectionFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_sql_tools() {
        let registry = create_sql_registry::<StubSql>().unwrap();
        let mut link = Link::new(StubSql::new());

        let query = payload(
            &registry
                .invoke("database_query", json!({"sql": "SELECT 1"}), &mut link)
                .await
                .unwrap(),
        );
        assert_eq!(query["columns"], json!(["id", "name"]));
        assert_eq!(query["row_count"], 1);
        assert_eq!(query["rows"][0], json!([1, "widget"]));

        let tables = payload(
            &registry
                .invoke("database_tables", Value::Null, &mut link)
                .await
                .unwrap(),
        );
        assert_eq!(tables["tables"], json!(["products"]));

        let schema = payload(
            &registry
                .invoke("database_schema", json!({"table_name": "products"}), &mut link)
                .await
                .unwrap(),
        );
        assert_eq!(schema["fields"][0]["key"], "PRI");

        let missing = registry
            .invoke("database_schema", json!({"table_name": "ghosts"}), &mut link)
            .await
            .unwrap_err();
        assert!(matches!(
            missing,
            ToolError::Collaborator(CollaboratorError::TableNotFound(_))
        ));

        let err = registry
            .invoke("database_schema", json!({"table_name": ""}), &mut link)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::MissingArgument(_)));
    }

    #[tokio::test]
    async fn test_say_hello_logs_greeting() {
        let registry = create_greeting_registry::<StubGreetingLog>().unwrap();
        let mut link = Link::new(StubGreetingLog::new());

        let result = payload(
            &registry
                .invoke("say_hello", json!({"person_name": "Anna"}), &mut link)
                .await
                .unwrap(),
        );
        assert_eq!(result["logged"], true);
        assert!(result["reply"].as_str().unwrap().starts_with("Hello Anna!"));
        assert!(result["log_entry"]
            .as_str()
            .unwrap()
            .ends_with("to Anna: Hello"));

        registry
            .invoke(
                "say_hello",
                json!({"person_name": "Bo", "greeting_message": "Howdy"}),
                &mut link,
            )
            .await
            .unwrap();

        let lines = link.backend().lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("to Bo: Howdy"));
    }

    #[tokio::test]
    async fn test_say_hello_survives_log_failure() {
        let registry = create_greeting_registry::<StubGreetingLog>().unwrap();
        let mut link = Link::new(StubGreetingLog::new().failing_connect());

        let result = payload(
            &registry
                .invoke("say_hello", json!({"person_name": "Anna"}), &mut link)
                .await
                .unwrap(),
        );
        assert_eq!(result["logged"], false);

        let err = registry
            .invoke("say_hello", json!({}), &mut link)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::MissingArgument(_)));
    }
}
