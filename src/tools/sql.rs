//! Relational store tools.

use crate::collaborator::Link;
use crate::database::{FieldDescriptor, SqlBackend};
use crate::error::ToolResult;
use crate::protocol::{CallToolResult, Tool};
use crate::tools::args::Arguments;
use crate::tools::registry::{json_result, ToolHandler};
use crate::tools::schema::{InputSchema, Property};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};

pub struct QueryTool;

#[async_trait]
impl<C: SqlBackend> ToolHandler<C> for QueryTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "database_query".into(),
            description: "Execute a SQL statement and return column names, row count and rows. \
                Cell values keep their native types."
                .into(),
            input_schema: InputSchema::object()
                .required("sql", Property::string("The SQL statement to execute")),
        }
    }

    #[instrument(skip(self, args, link), fields(tool = "database_query"))]
    async fn execute(&self, args: &Arguments, link: &mut Link<C>) -> ToolResult<CallToolResult> {
        let sql = args.required_text("sql")?;
        let result = link.backend().query(sql).await?;
        debug!("Query returned {} rows", result.row_count);
        json_result(&result)
    }
}

#[derive(Debug, Serialize)]
struct TablesOutput {
    count: usize,
    tables: Vec<String>,
}

pub struct ListTablesTool;

#[async_trait]
impl<C: SqlBackend> ToolHandler<C> for ListTablesTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "database_tables".into(),
            description: "List the tables of the connected database.".into(),
            input_schema: InputSchema::object(),
        }
    }

    #[instrument(skip(self, _args, link), fields(tool = "database_tables"))]
    async fn execute(&self, _args: &Arguments, link: &mut Link<C>) -> ToolResult<CallToolResult> {
        let tables = link.backend().list_tables().await?;
        json_result(&TablesOutput {
            count: tables.len(),
            tables,
        })
    }
}

#[derive(Debug, Serialize)]
struct SchemaOutput<'a> {
    table: &'a str,
    fields: Vec<FieldDescriptor>,
}

pub struct TableSchemaTool;

#[async_trait]
impl<C: SqlBackend> ToolHandler<C> for TableSchemaTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "database_schema".into(),
            description: "Describe the columns of a table: name, type, nullability, key role, \
                default and extra attributes."
                .into(),
            input_schema: InputSchema::object().required(
                "table_name",
                Property::string("Table name, optionally schema-qualified (schema.table)"),
            ),
        }
    }

    #[instrument(skip(self, args, link), fields(tool = "database_schema"))]
    async fn execute(&self, args: &Arguments, link: &mut Link<C>) -> ToolResult<CallToolResult> {
        let table = args.required_text("table_name")?;
        let fields = link.backend().table_schema(table).await?;
        json_result(&SchemaOutput { table, fields })
    }
}
