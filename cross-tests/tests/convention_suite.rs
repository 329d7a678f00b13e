use config::{Configuration, DEFAULT_ENV_PREFIX, load_from_file, load_from_vars, merge_configs};
use context::Dependencies;
use errors::{FixtureError, FixtureResult};
use fixture_core::{MutableTablesState, ObjectStore, QueryExecutor, Requirement, TableHandle};
use lifecycle::{Orchestrator, PluginRegistry, SuiteBindings, TestMethod, TestOutcome};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storage::TableNameGenerator;
use storage::clients::LocalObjectStore;
use tempfile::TempDir;
use testing::RecordingQueryExecutor;

const ORDERS_DDL: &str = "-- type: hive; schema: sales
CREATE TABLE %NAME% (o_orderkey BIGINT, o_status VARCHAR(1))
";

/// Working tree of one suite run: convention tables, a YAML configuration
/// and a local object store root.
struct Workspace {
    dir: TempDir
}

impl Workspace {
    fn new(manager_type: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let tables = dir.path().join("tables");
        fs::create_dir_all(&tables).unwrap();
        fs::write(tables.join("orders.ddl"), ORDERS_DDL).unwrap();
        fs::write(tables.join("orders.data"), "1|O\n2|F\n\n-- trailing comment\n").unwrap();

        let yaml = format!(
            "tests:\n  tables_path: {}\ndatabases:\n  hive:\n    table_manager_type: {manager_type}\n    immutable_tables_location: /warehouse\n    mutable_tables_location: /scratch\n",
            tables.display()
        );
        fs::write(dir.path().join("fixtures.yaml"), yaml).unwrap();
        Self { dir }
    }

    fn store_root(&self) -> PathBuf {
        self.dir.path().join("store")
    }

    fn stored(&self, path: &str) -> PathBuf {
        self.store_root().join(path)
    }

    fn configuration(&self, env: &[(&str, &str)]) -> Configuration {
        let file = load_from_file(&self.dir.path().join("fixtures.yaml")).unwrap();
        let env = load_from_vars(
            DEFAULT_ENV_PREFIX,
            env.iter().map(|(k, v)| (k.to_string(), v.to_string()))
        );
        merge_configs(vec![("file", file), ("env", env)])
    }

    fn orchestrator(&self, configuration: Configuration, executor: &Arc<RecordingQueryExecutor>) -> Orchestrator {
        let executor = Arc::clone(executor);
        let store: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(self.store_root()));
        let bindings = SuiteBindings(move |_: &Configuration, dependencies: &mut Dependencies| -> FixtureResult<()> {
            dependencies.bind_named::<Arc<dyn QueryExecutor>>("hive", Arc::clone(&executor) as Arc<dyn QueryExecutor>);
            dependencies.bind_named::<Arc<dyn ObjectStore>>("hive", Arc::clone(&store));
            Ok(())
        });
        Orchestrator::new(configuration, PluginRegistry::builtin().register(bindings))
            .with_names(TableNameGenerator::with_run_id("ab12cd34"))
    }
}

fn orders() -> TableHandle {
    TableHandle::table("orders").in_schema("sales")
}

fn mutable_location(store: &Path, table: &str) -> PathBuf {
    store.join("scratch").join(table)
}

#[tokio::test]
async fn convention_tables_are_uploaded_and_created_from_yaml_configuration() {
    let workspace = Workspace::new("hive");
    let executor = Arc::new(RecordingQueryExecutor::new());
    let orchestrator = workspace.orchestrator(workspace.configuration(&[]), &executor);
    let reader = TestMethod::new("read_orders").requires(Requirement::immutable_table(orders()));
    let writer = TestMethod::new("write_orders").requires(Requirement::mutable_table(orders()));
    let tests = [reader, writer];

    orchestrator.on_suite_start(&tests).await.unwrap();

    let data = fs::read_to_string(workspace.stored("warehouse/sales/orders/data")).unwrap();
    assert_eq!(data, "1|O\n2|F\n");
    assert!(executor
        .statements()
        .contains(&"CREATE SCHEMA IF NOT EXISTS sales".to_string()));
    assert!(executor.tables().contains("sales.orders"));

    let scope = orchestrator.on_test_start(&tests[0]).await.unwrap();
    orchestrator
        .on_test_finished(&tests[0], scope, TestOutcome::Success)
        .await
        .unwrap();

    let scope = orchestrator.on_test_start(&tests[1]).await.unwrap();
    let context = scope.context().unwrap();
    let instance = context
        .require::<MutableTablesState>()
        .unwrap()
        .get(&orders())
        .unwrap()
        .clone();
    let bare = instance.name().bare_name_in_database().to_string();
    assert_eq!(instance.name_in_database(), format!("sales.{bare}"));
    let location = mutable_location(&workspace.store_root(), &bare);
    assert_eq!(fs::read_to_string(location.join("data")).unwrap(), "1|O\n2|F\n");

    orchestrator
        .on_test_finished(&tests[1], scope, TestOutcome::Success)
        .await
        .unwrap();
    assert!(!location.exists());
    assert!(!executor.tables().contains(&instance.name_in_database()));

    orchestrator.on_suite_finish().await.unwrap();
    assert_eq!(executor.close_count(), 1);
    // Immutable data outlives the suite.
    assert!(workspace.stored("warehouse/sales/orders/data").exists());
}

#[tokio::test]
async fn environment_overrides_keep_tables_of_failed_tests() {
    let workspace = Workspace::new("hive");
    let executor = Arc::new(RecordingQueryExecutor::new());
    let configuration = workspace.configuration(&[(
        "FIXTURE__DATABASES__HIVE__KEEP_MUTABLE_TABLES_ON_FAILURE",
        "true"
    )]);
    let orchestrator = workspace.orchestrator(configuration, &executor);
    let test = TestMethod::new("broken_writer").requires(Requirement::mutable_table(orders()));

    orchestrator.on_suite_start(std::slice::from_ref(&test)).await.unwrap();
    let scope = orchestrator.on_test_start(&test).await.unwrap();
    let name = scope
        .context()
        .unwrap()
        .require::<MutableTablesState>()
        .unwrap()
        .get(&orders())
        .unwrap()
        .name()
        .clone();
    orchestrator
        .on_test_finished(&test, scope, TestOutcome::Failure)
        .await
        .unwrap();
    orchestrator.on_suite_finish().await.unwrap();

    assert!(executor.tables().contains(&name.name_in_database()));
    assert!(mutable_location(&workspace.store_root(), name.bare_name_in_database())
        .join("data")
        .exists());
    assert_eq!(orchestrator.failed_tests(), 1);
}

#[tokio::test]
async fn leftovers_of_an_earlier_run_are_reclaimed() {
    let workspace = Workspace::new("hive");
    let executor = Arc::new(
        RecordingQueryExecutor::new().with_tables(["sales.orders", "sales.tmp_orders_00000000_0a0b0c"])
    );
    let orchestrator = workspace.orchestrator(workspace.configuration(&[]), &executor);
    let test = TestMethod::new("writer").requires(Requirement::mutable_table(orders()));

    orchestrator.on_suite_start(std::slice::from_ref(&test)).await.unwrap();
    let scope = orchestrator.on_test_start(&test).await.unwrap();
    orchestrator
        .on_test_finished(&test, scope, TestOutcome::Success)
        .await
        .unwrap();
    orchestrator.on_suite_finish().await.unwrap();

    assert_eq!(
        executor.statements_starting_with("DROP TABLE IF EXISTS sales.tmp_orders_00000000"),
        ["DROP TABLE IF EXISTS sales.tmp_orders_00000000_0a0b0c"]
    );
    let remaining: Vec<String> = executor.tables().into_iter().collect();
    assert_eq!(remaining, ["sales.orders"]);
}

#[tokio::test]
async fn unknown_manager_type_fails_suite_before_any_work() {
    let workspace = Workspace::new("warehouse9000");
    let executor = Arc::new(RecordingQueryExecutor::new());
    let orchestrator = workspace.orchestrator(workspace.configuration(&[]), &executor);
    let test = TestMethod::new("never").requires(Requirement::immutable_table(orders()));

    let err = orchestrator
        .on_suite_start(std::slice::from_ref(&test))
        .await
        .unwrap_err();

    assert!(matches!(err, FixtureError::UnknownTableManagerType { ref manager_type, .. } if manager_type == "warehouse9000"));
    assert!(executor.statements().is_empty());
    assert!(!workspace.store_root().exists());
}
