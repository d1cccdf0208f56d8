// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Redshift metadata templates, built on the `svv_all_*` system views.

use sqlhub_driver::statement::quote_literal;
use sqlhub_driver::{ContextValue, QueryTemplates, TreeNode};

/// Schemas hidden from the explorer
const SYSTEM_SCHEMAS: &str = "'information_schema', 'pg_catalog', 'pg_internal', 'pg_automv'";

#[derive(Debug, Clone, Copy, Default)]
pub struct RedshiftQueries;

fn database_of(node: &TreeNode) -> String {
    quote_literal(node.database.as_deref().unwrap_or(&node.label))
}

fn schema_of(node: &TreeNode) -> String {
    quote_literal(node.schema.as_deref().unwrap_or(&node.label))
}

fn pattern(search: &str) -> String {
    quote_literal(&format!("%{}%", search))
}

fn relations(schema: &TreeNode, table_type: &str, kind: ContextValue) -> String {
    format!(
        "SELECT table_name AS label, '{kind}' AS type, database_name AS database, \
         schema_name AS schema, 'table' AS iconid \
         FROM svv_all_tables \
         WHERE database_name = {db} AND schema_name = {schema} AND table_type = '{table_type}' \
         ORDER BY table_name;",
        kind = kind.as_str(),
        db = database_of(schema),
        schema = schema_of(schema),
        table_type = table_type,
    )
}

impl QueryTemplates for RedshiftQueries {
    fn fetch_databases(&self) -> String {
        format!(
            "SELECT database_name AS label, database_name AS database, '{}' AS type, \
             'database' AS detail \
             FROM svv_redshift_databases ORDER BY database_name;",
            ContextValue::Database.as_str()
        )
    }

    fn fetch_schemas(&self, database: &TreeNode) -> String {
        format!(
            "SELECT schema_name AS label, schema_name AS schema, database_name AS database, \
             '{}' AS type, 'group-by-ref-type' AS iconid \
             FROM svv_all_schemas \
             WHERE database_name = {} AND schema_name NOT IN ({}) \
             ORDER BY schema_name;",
            ContextValue::Schema.as_str(),
            database_of(database),
            SYSTEM_SCHEMAS
        )
    }

    fn fetch_tables(&self, schema: &TreeNode) -> String {
        relations(schema, "TABLE", ContextValue::Table)
    }

    fn fetch_views(&self, schema: &TreeNode) -> String {
        relations(schema, "VIEW", ContextValue::View)
    }

    fn fetch_materialized_views(&self, schema: &TreeNode) -> String {
        format!(
            "SELECT name AS label, '{}' AS type, db_name AS database, schema AS schema, \
             'table' AS iconid \
             FROM stv_mv_info \
             WHERE db_name = {} AND schema = {} \
             ORDER BY name;",
            ContextValue::MaterializedView.as_str(),
            database_of(schema),
            schema_of(schema)
        )
    }

    fn fetch_functions(&self, schema: &TreeNode) -> String {
        format!(
            "SELECT f.proname AS label, '{}' AS type, {} AS database, n.nspname AS schema, \
             'variable' AS iconname, \
             f.proname || '(' || oidvectortypes(f.proargtypes) || ')' AS detail \
             FROM pg_proc f JOIN pg_namespace n ON n.oid = f.pronamespace \
             WHERE n.nspname = {} \
             ORDER BY f.proname;",
            ContextValue::Function.as_str(),
            database_of(schema),
            schema_of(schema)
        )
    }

    fn fetch_columns(&self, table: &TreeNode) -> String {
        let schema = table
            .schema
            .as_deref()
            .map(quote_literal)
            .unwrap_or_else(|| "'public'".to_string());
        format!(
            "SELECT c.column_name AS label, '{kind}' AS type, c.database_name AS database, \
             c.schema_name AS schema, c.table_name AS \"table\", c.data_type AS datatype, \
             c.data_type AS detail, \
             EXISTS (SELECT 1 FROM information_schema.table_constraints tc \
                     JOIN information_schema.key_column_usage kcu \
                       ON kcu.constraint_name = tc.constraint_name \
                      AND kcu.table_schema = tc.table_schema \
                     WHERE tc.constraint_type = 'PRIMARY KEY' \
                       AND kcu.table_schema = c.schema_name \
                       AND kcu.table_name = c.table_name \
                       AND kcu.column_name = c.column_name) AS ispk, \
             EXISTS (SELECT 1 FROM information_schema.table_constraints tc \
                     JOIN information_schema.key_column_usage kcu \
                       ON kcu.constraint_name = tc.constraint_name \
                      AND kcu.table_schema = tc.table_schema \
                     WHERE tc.constraint_type = 'FOREIGN KEY' \
                       AND kcu.table_schema = c.schema_name \
                       AND kcu.table_name = c.table_name \
                       AND kcu.column_name = c.column_name) AS isfk \
             FROM svv_all_columns c \
             WHERE c.database_name = {db} AND c.schema_name = {schema} AND c.table_name = {table} \
             ORDER BY c.ordinal_position;",
            kind = ContextValue::Column.as_str(),
            db = database_of(table),
            schema = schema,
            table = quote_literal(&table.label),
        )
    }

    fn search_tables(&self, search: &str, limit: usize) -> String {
        format!(
            "SELECT table_name AS label, \
             CASE WHEN table_type = 'VIEW' THEN '{view}' ELSE '{table}' END AS type, \
             database_name AS database, schema_name AS schema \
             FROM svv_all_tables \
             WHERE schema_name NOT IN ({system}) AND table_name ILIKE {pattern} \
             ORDER BY table_name LIMIT {limit};",
            view = ContextValue::View.as_str(),
            table = ContextValue::Table.as_str(),
            system = SYSTEM_SCHEMAS,
            pattern = pattern(search),
            limit = limit,
        )
    }

    fn search_columns(&self, search: &str, tables: &[TreeNode], limit: usize) -> String {
        let table_filter = if tables.is_empty() {
            String::new()
        } else {
            let names: Vec<String> = tables.iter().map(|t| quote_literal(&t.label)).collect();
            format!(" AND table_name IN ({})", names.join(", "))
        };
        format!(
            "SELECT column_name AS label, '{kind}' AS type, database_name AS database, \
             schema_name AS schema, table_name AS \"table\", data_type AS datatype \
             FROM svv_all_columns \
             WHERE schema_name NOT IN ({system}) AND column_name ILIKE {pattern}{filter} \
             ORDER BY column_name LIMIT {limit};",
            kind = ContextValue::Column.as_str(),
            system = SYSTEM_SCHEMAS,
            pattern = pattern(search),
            filter = table_filter,
            limit = limit,
        )
    }

    fn fetch_keywords(&self) -> String {
        "SELECT UPPER(word) AS label, UPPER(catdesc) AS desc FROM pg_get_keywords();".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals_are_escaped() {
        let sql = RedshiftQueries.search_tables("o'brien", 10);
        assert!(sql.contains("ILIKE '%o''brien%'"));
        assert!(sql.ends_with("LIMIT 10;"));
    }

    #[test]
    fn test_relations_filter_by_database_and_schema() {
        let schema = TreeNode::new("public", ContextValue::Schema)
            .with_database("dev")
            .with_schema("public");
        let sql = RedshiftQueries.fetch_views(&schema);
        assert!(sql.contains("database_name = 'dev'"));
        assert!(sql.contains("schema_name = 'public'"));
        assert!(sql.contains("table_type = 'VIEW'"));
        assert!(sql.contains("'connection.view' AS type"));
    }

    #[test]
    fn test_column_search_restricts_to_tables() {
        let tables = vec![
            TreeNode::new("users", ContextValue::Table),
            TreeNode::new("orders", ContextValue::Table),
        ];
        let sql = RedshiftQueries.search_columns("id", &tables, 5);
        assert!(sql.contains("table_name IN ('users', 'orders')"));

        let unrestricted = RedshiftQueries.search_columns("id", &[], 5);
        assert!(!unrestricted.contains("table_name IN"));
    }

    #[test]
    fn test_keywords_query() {
        assert_eq!(
            RedshiftQueries.fetch_keywords(),
            "SELECT UPPER(word) AS label, UPPER(catdesc) AS desc FROM pg_get_keywords();"
        );
    }
}
