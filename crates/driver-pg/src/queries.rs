// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! PostgreSQL metadata templates over `pg_catalog`.

use sqlhub_driver::statement::quote_literal;
use sqlhub_driver::{ContextValue, QueryTemplates, TreeNode};

const HIDDEN_SCHEMAS: &str =
    "n.nspname NOT IN ('information_schema', 'pg_catalog', 'pg_toast') AND n.nspname NOT LIKE 'pg_temp_%'";

#[derive(Debug, Clone, Copy, Default)]
pub struct PgQueries;

fn schema_of(node: &TreeNode) -> String {
    quote_literal(node.schema.as_deref().unwrap_or(&node.label))
}

fn pattern(search: &str) -> String {
    quote_literal(&format!("%{}%", search))
}

fn relations(schema: &TreeNode, relkinds: &str, kind: ContextValue) -> String {
    format!(
        "SELECT c.relname AS label, '{kind}' AS type, current_database() AS database, \
         n.nspname AS schema, 'table' AS iconid \
         FROM pg_class c JOIN pg_namespace n ON n.oid = c.relnamespace \
         WHERE n.nspname = {schema} AND c.relkind IN ({relkinds}) \
         ORDER BY c.relname;",
        kind = kind.as_str(),
        schema = schema_of(schema),
        relkinds = relkinds,
    )
}

impl QueryTemplates for PgQueries {
    fn fetch_databases(&self) -> String {
        format!(
            "SELECT datname AS label, datname AS database, '{}' AS type, 'database' AS detail \
             FROM pg_database WHERE datistemplate = false AND datallowconn \
             ORDER BY datname;",
            ContextValue::Database.as_str()
        )
    }

    fn fetch_schemas(&self, _database: &TreeNode) -> String {
        format!(
            "SELECT n.nspname AS label, n.nspname AS schema, current_database() AS database, \
             '{}' AS type, 'group-by-ref-type' AS iconid \
             FROM pg_namespace n WHERE {} \
             ORDER BY n.nspname;",
            ContextValue::Schema.as_str(),
            HIDDEN_SCHEMAS
        )
    }

    fn fetch_tables(&self, schema: &TreeNode) -> String {
        relations(schema, "'r', 'p', 'f'", ContextValue::Table)
    }

    fn fetch_views(&self, schema: &TreeNode) -> String {
        relations(schema, "'v'", ContextValue::View)
    }

    fn fetch_materialized_views(&self, schema: &TreeNode) -> String {
        relations(schema, "'m'", ContextValue::MaterializedView)
    }

    fn fetch_functions(&self, schema: &TreeNode) -> String {
        format!(
            "SELECT p.proname AS label, '{}' AS type, current_database() AS database, \
             n.nspname AS schema, 'variable' AS iconname, \
             p.proname || '(' || pg_get_function_identity_arguments(p.oid) || ')' AS detail \
             FROM pg_proc p JOIN pg_namespace n ON n.oid = p.pronamespace \
             WHERE n.nspname = {} \
             ORDER BY p.proname;",
            ContextValue::Function.as_str(),
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
            "SELECT a.attname AS label, '{kind}' AS type, current_database() AS database, \
             n.nspname AS schema, c.relname AS \"table\", \
             format_type(a.atttypid, a.atttypmod) AS datatype, \
             format_type(a.atttypid, a.atttypmod) AS detail, \
             EXISTS (SELECT 1 FROM pg_constraint k WHERE k.conrelid = c.oid \
                     AND k.contype = 'p' AND a.attnum = ANY (k.conkey)) AS ispk, \
             EXISTS (SELECT 1 FROM pg_constraint k WHERE k.conrelid = c.oid \
                     AND k.contype = 'f' AND a.attnum = ANY (k.conkey)) AS isfk \
             FROM pg_attribute a \
             JOIN pg_class c ON c.oid = a.attrelid \
             JOIN pg_namespace n ON n.oid = c.relnamespace \
             WHERE n.nspname = {schema} AND c.relname = {table} \
               AND a.attnum > 0 AND NOT a.attisdropped \
             ORDER BY a.attnum;",
            kind = ContextValue::Column.as_str(),
            schema = schema,
            table = quote_literal(&table.label),
        )
    }

    fn search_tables(&self, search: &str, limit: usize) -> String {
        format!(
            "SELECT c.relname AS label, \
             CASE WHEN c.relkind = 'v' THEN '{view}' \
                  WHEN c.relkind = 'm' THEN '{mview}' ELSE '{table}' END AS type, \
             current_database() AS database, n.nspname AS schema \
             FROM pg_class c JOIN pg_namespace n ON n.oid = c.relnamespace \
             WHERE c.relkind IN ('r', 'p', 'f', 'v', 'm') AND {hidden} \
               AND c.relname ILIKE {pattern} \
             ORDER BY c.relname LIMIT {limit};",
            view = ContextValue::View.as_str(),
            mview = ContextValue::MaterializedView.as_str(),
            table = ContextValue::Table.as_str(),
            hidden = HIDDEN_SCHEMAS,
            pattern = pattern(search),
            limit = limit,
        )
    }

    fn search_columns(&self, search: &str, tables: &[TreeNode], limit: usize) -> String {
        let table_filter = if tables.is_empty() {
            String::new()
        } else {
            let names: Vec<String> = tables.iter().map(|t| quote_literal(&t.label)).collect();
            format!(" AND c.relname IN ({})", names.join(", "))
        };
        format!(
            "SELECT a.attname AS label, '{kind}' AS type, current_database() AS database, \
             n.nspname AS schema, c.relname AS \"table\", \
             format_type(a.atttypid, a.atttypmod) AS datatype \
             FROM pg_attribute a \
             JOIN pg_class c ON c.oid = a.attrelid \
             JOIN pg_namespace n ON n.oid = c.relnamespace \
             WHERE c.relkind IN ('r', 'p', 'f', 'v', 'm') AND {hidden} \
               AND a.attnum > 0 AND NOT a.attisdropped \
               AND a.attname ILIKE {pattern}{filter} \
             ORDER BY a.attname LIMIT {limit};",
            kind = ContextValue::Column.as_str(),
            hidden = HIDDEN_SCHEMAS,
            pattern = pattern(search),
            filter = table_filter,
            limit = limit,
        )
    }

    fn fetch_keywords(&self) -> String {
        "SELECT UPPER(word) AS label, UPPER(catdesc) AS desc FROM pg_get_keywords();".to_string()
    }
}
