use config::Configuration;
use fixture_core::{ImmutableTablesState, MutableTablesState, QueryExecutor, Requirement, TableDefinition, TableHandle};
use lifecycle::{Orchestrator, Plugin, PluginRegistry, TestMethod, TestOutcome};
use serde_json::json;
use storage::clients::PostgresQueryExecutor;
use testing::postgres;
use testing::tables::nation_relational;

struct Tpch;

impl Plugin for Tpch {
    fn name(&self) -> &str {
        "tpch"
    }

    fn tables(&self) -> Vec<TableDefinition> {
        vec![nation_relational().with_default_database("psql")]
    }
}

async fn count(executor: &PostgresQueryExecutor, table: &str) -> serde_json::Value {
    executor
        .execute(&format!("SELECT count(*) FROM {table}"))
        .await
        .unwrap()
        .rows[0][0]
        .clone()
}

async fn table_exists(executor: &PostgresQueryExecutor, table: &str) -> bool {
    executor
        .execute("SELECT table_name FROM information_schema.tables WHERE table_schema = current_schema()")
        .await
        .unwrap()
        .first_column_strings()
        .iter()
        .any(|name| name == table)
}

#[tokio::test]
async fn relational_fixtures_round_trip_through_postgres() {
    let Some(fixture) = postgres().await else {
        eprintln!("Skipping PostgreSQL suite: Docker not available");
        return;
    };
    let configuration = Configuration::from_pairs([
        ("databases.psql.table_manager_type", "jdbc"),
        ("databases.psql.jdbc_url", fixture.url()),
        ("databases.psql.batch_size", "2")
    ]);
    let orchestrator = Orchestrator::new(configuration, PluginRegistry::builtin().register(Tpch));
    let test = TestMethod::new("nation_copy")
        .requires(Requirement::immutable_table(TableHandle::table("nation")))
        .requires(Requirement::mutable_table(TableHandle::table("nation")));
    let verifier = PostgresQueryExecutor::connect(fixture.url()).await.unwrap();

    orchestrator.on_suite_start(std::slice::from_ref(&test)).await.unwrap();
    let scope = orchestrator.on_test_start(&test).await.unwrap();
    let context = scope.context().unwrap();

    let immutable = context
        .require::<ImmutableTablesState>()
        .unwrap()
        .get_by_name("nation")
        .unwrap()
        .name_in_database();
    let mutable = context
        .require::<MutableTablesState>()
        .unwrap()
        .get_by_name("nation")
        .unwrap()
        .name_in_database();
    assert_eq!(immutable, "nation");
    assert_ne!(mutable, immutable);
    assert_eq!(count(&verifier, &immutable).await, json!(4));
    assert_eq!(count(&verifier, &mutable).await, json!(4));

    orchestrator
        .on_test_finished(&test, scope, TestOutcome::Success)
        .await
        .unwrap();
    assert!(!table_exists(&verifier, &mutable).await);

    orchestrator.on_suite_finish().await.unwrap();
    assert!(table_exists(&verifier, "nation").await);
    verifier.close().await.unwrap();
}
