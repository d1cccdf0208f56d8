// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! PostgreSQL driver tests that need no running server

use sqlhub_driver::{
    ConnectionDriver, DriverError, DriverPlugin, DriverRegistry, PluginContext, QueryOptions,
    ResourceMap,
};
use sqlhub_driver_pg::{PgDriver, PgPlugin};
use sqlhub_test_utils::Fixtures;

fn unreachable_connection() -> sqlhub_driver::ConnectionConfig {
    Fixtures::pg_connection()
        .with_setting("server", "127.0.0.1")
        .with_setting("port", 1)
        .with_setting("connectionTimeout", 2)
}

#[tokio::test]
async fn test_unreachable_server_fails_open() {
    let mut driver = PgDriver::new(&unreachable_connection()).unwrap();
    let err = driver.open().await.unwrap_err();
    assert!(matches!(err, DriverError::Connection(_)));

    let err = driver.test_connection().await.unwrap_err();
    assert!(matches!(err, DriverError::Connection(_)));
}

#[tokio::test]
async fn test_query_against_unreachable_server_returns_error_envelope() {
    let mut driver = PgDriver::new(&unreachable_connection()).unwrap();
    let results = driver.query("SELECT 1; SELECT 2", QueryOptions::new("r1")).await;
    assert_eq!(results.len(), 1);
    assert!(results[0].error);
    assert_eq!(results[0].query, "SELECT 1; SELECT 2");
    assert_eq!(results[0].conn_id, "pg|local");
}

#[tokio::test]
async fn test_close_without_session_is_noop() {
    let mut driver = PgDriver::new(&Fixtures::pg_connection()).unwrap();
    driver.close().await.unwrap();
}

#[test]
fn test_missing_settings_are_configuration_errors() {
    let config = sqlhub_driver::ConnectionConfig::new("broken", "pg");
    let err = PgDriver::new(&config).unwrap_err();
    assert!(matches!(err, DriverError::Configuration(_)));
}

#[test]
fn test_plugin_registers_constructors() {
    let mut drivers = DriverRegistry::new();
    let mut resources = ResourceMap::new();
    PgPlugin::new("/opt/sqlhub")
        .register(&mut PluginContext::new(&mut drivers, &mut resources))
        .unwrap();

    assert_eq!(drivers.aliases(), vec!["PostgreSQL", "pg"]);
    let driver = drivers.create(&Fixtures::pg_connection()).unwrap();
    assert_eq!(driver.id(), "pg|local");
    assert!(resources.get("pg", "connection-schema").is_some());
}
