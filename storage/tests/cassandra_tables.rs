use errors::FixtureError;
use fixture_core::{MutableTableState, QueryExecutor, TableHandle, TableManager};
use std::sync::Arc;
use storage::TableNameGenerator;
use storage::managers::CassandraTableManager;
use testing::RecordingQueryExecutor;
use testing::tables::nation_relational;

fn cassandra(executor: &Arc<RecordingQueryExecutor>, batch_size: usize) -> CassandraTableManager {
    CassandraTableManager::new(
        "cassandra",
        "tpch",
        Arc::clone(executor) as Arc<dyn QueryExecutor>,
        Arc::new(TableNameGenerator::with_run_id("c0ffee00")),
        batch_size
    )
}

#[tokio::test]
async fn test_rows_are_loaded_in_unlogged_batches_of_named_inserts() {
    let executor = Arc::new(RecordingQueryExecutor::new());

    let instance = cassandra(&executor, 3)
        .create_immutable(&Arc::new(nation_relational()), &TableHandle::table("nation"))
        .await
        .unwrap();

    assert_eq!(instance.name_in_database(), "tpch.nation");
    let statements = executor.statements();
    assert!(statements[0].starts_with("CREATE KEYSPACE IF NOT EXISTS tpch"));
    assert_eq!(statements[1], "DROP TABLE IF EXISTS tpch.nation");

    let batches = executor.statements_starting_with("BEGIN UNLOGGED BATCH");
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].matches("INSERT INTO").count(), 3);
    assert!(batches[0].contains(
        "INSERT INTO tpch.nation (n_nationkey, n_name, n_regionkey, n_comment) VALUES (0, 'ALGERIA', 0, 'haggle carefully');"
    ));
    assert!(batches[1].ends_with("VALUES (3, 'CANADA', 1, 'eas hang ironic'); APPLY BATCH"));
}

#[tokio::test]
async fn test_handle_schema_overrides_default_keyspace() {
    let executor = Arc::new(RecordingQueryExecutor::new());
    let manager = cassandra(&executor, 100).without_keyspace_creation();

    let instance = manager
        .create_immutable(&Arc::new(nation_relational()), &TableHandle::table("nation").in_schema("sales"))
        .await
        .unwrap();

    assert_eq!(instance.name_in_database(), "sales.nation");
    assert!(executor.statements_starting_with("CREATE KEYSPACE").is_empty());
    assert!(executor.tables().contains("sales.nation"));
}

#[tokio::test]
async fn test_mutable_tables_are_unsupported() {
    let executor = Arc::new(RecordingQueryExecutor::new());

    let err = cassandra(&executor, 100)
        .create_mutable(&Arc::new(nation_relational()), MutableTableState::Loaded, &TableHandle::table("nation"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FixtureError::Table { ref source, .. } if matches!(**source, FixtureError::Unsupported { .. })
    ));
    assert!(executor.statements().is_empty());
}

#[tokio::test]
async fn test_failed_batch_names_the_table() {
    let executor = Arc::new(RecordingQueryExecutor::new());
    executor.fail_on("BEGIN UNLOGGED BATCH", "write timeout");

    let err = cassandra(&executor, 100)
        .create_immutable(&Arc::new(nation_relational()), &TableHandle::table("nation"))
        .await
        .unwrap_err();

    match err {
        FixtureError::Table { handle, source } => {
            assert_eq!(handle, "nation");
            assert!(source.to_string().contains("write timeout"));
        }
        other => panic!("unexpected error: {other}")
    }
}
