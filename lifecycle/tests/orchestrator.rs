use async_trait::async_trait;
use config::Configuration;
use context::{Dependencies, TestContext};
use errors::{FixtureError, FixtureResult};
use fixture_core::{
    CommandRequirement, CommandScope, DirectoryClient, ImmutableTablesState, MutableTableRequirement, MutableTableState,
    MutableTablesState, ObjectStore, QueryExecutor, Requirement, ResourceRequirement, StateEntry,
    TableDefinition, TableHandle, TestStatus
};
use lifecycle::fulfillers::commands::TEST_COMMAND_FULFILLER;
use lifecycle::fulfillers::tables::MUTABLE_TABLES_FULFILLER;
use lifecycle::fulfillers::resources::PROVISIONED_RESOURCES_FULFILLER;
use lifecycle::fulfillers::{LDAP_RESOURCE_KIND, ResourceProvisioner, ResourcesState};
use lifecycle::{
    FnHook, FulfillerScope, Orchestrator, Plugin, PluginRegistry, RequirementFulfiller, SuiteBindings,
    TestMethod, TestMethodInfo, TestOutcome, TestScope
};
use std::sync::Arc;
use storage::TableNameGenerator;
use testing::tables::{nation, region};
use testing::{
    EventLog, InMemoryDirectory, RecordingFulfiller, RecordingObjectStore, RecordingQueryExecutor, event_log
};

const RUN_ID: &str = "5eed5eed";

struct Hive {
    executor: Arc<RecordingQueryExecutor>,
    store: Arc<RecordingObjectStore>
}

impl Hive {
    fn new() -> Self {
        Self {
            executor: Arc::new(RecordingQueryExecutor::new()),
            store: Arc::new(RecordingObjectStore::new())
        }
    }

    fn bindings(
        &self
    ) -> SuiteBindings<impl Fn(&Configuration, &mut Dependencies) -> FixtureResult<()> + Clone + Send + Sync + 'static>
    {
        let executor = Arc::clone(&self.executor);
        let store = Arc::clone(&self.store);
        SuiteBindings(move |_: &Configuration, dependencies: &mut Dependencies| -> FixtureResult<()> {
            dependencies.bind_named::<Arc<dyn QueryExecutor>>("hive", Arc::clone(&executor) as Arc<dyn QueryExecutor>);
            dependencies.bind_named::<Arc<dyn ObjectStore>>("hive", Arc::clone(&store) as Arc<dyn ObjectStore>);
            Ok(())
        })
    }
}

struct Tpch;

impl Plugin for Tpch {
    fn name(&self) -> &str {
        "tpch"
    }

    fn tables(&self) -> Vec<TableDefinition> {
        vec![nation(), region()]
    }
}

struct Extra {
    fulfillers: Vec<Arc<dyn RequirementFulfiller>>,
    provisioners: Vec<Arc<dyn ResourceProvisioner>>
}

impl Plugin for Extra {
    fn name(&self) -> &str {
        "extra"
    }

    fn fulfillers(&self) -> Vec<Arc<dyn RequirementFulfiller>> {
        self.fulfillers.clone()
    }

    fn resource_provisioners(&self) -> Vec<Arc<dyn ResourceProvisioner>> {
        self.provisioners.clone()
    }
}

/// Provisions queues as `queue://<key>` strings named after their key.
struct Queues {
    events: EventLog
}

#[async_trait]
impl ResourceProvisioner for Queues {
    fn kind(&self) -> &str {
        "queue"
    }

    async fn provision(&self, requirement: &ResourceRequirement, _context: &TestContext) -> FixtureResult<Option<StateEntry>> {
        self.events.lock().push(format!("provision:{}", requirement.key));
        Ok(Some(StateEntry::named(requirement.key.clone(), format!("queue://{}", requirement.key))))
    }

    async fn release(&self, requirement: &ResourceRequirement, status: TestStatus) -> FixtureResult<()> {
        self.events
            .lock()
            .push(format!("release:{}:{status}", requirement.key));
        Ok(())
    }
}

fn configuration() -> Configuration {
    Configuration::from_pairs([
        ("databases.hive.table_manager_type", "hive"),
        ("databases.hive.immutable_tables_location", "/warehouse")
    ])
}

fn orchestrator(configuration: Configuration, hive: &Hive, extra: Extra) -> Orchestrator {
    let registry = PluginRegistry::builtin()
        .register(hive.bindings())
        .register(Tpch)
        .register(extra);
    Orchestrator::new(configuration, registry).with_names(TableNameGenerator::with_run_id(RUN_ID))
}

fn no_extra() -> Extra {
    Extra {
        fulfillers: Vec::new(),
        provisioners: Vec::new()
    }
}

fn watching(events: &EventLog) -> Extra {
    Extra {
        fulfillers: vec![RecordingFulfiller::new("watch", FulfillerScope::Suite, events).into_arc()],
        provisioners: Vec::new()
    }
}

fn immutable(name: &str) -> Requirement {
    Requirement::immutable_table(TableHandle::table(name))
}

fn mutable(name: &str) -> Requirement {
    Requirement::mutable_table(TableHandle::table(name))
}

fn mutable_name(scope: &TestScope, name: &str) -> String {
    let context = scope.context().unwrap();
    let tables = context.get::<MutableTablesState>().unwrap();
    tables.get_by_name(name).unwrap().name_in_database()
}

#[tokio::test]
async fn test_immutable_tables_are_created_once_per_suite() {
    let hive = Hive::new();
    let orchestrator = orchestrator(configuration(), &hive, no_extra());
    let tests = [
        TestMethod::new("count_nations").requires(immutable("nation")),
        TestMethod::new("join_regions")
            .requires(immutable("nation"))
            .requires(immutable("region"))
    ];

    orchestrator.on_suite_start(&tests).await.unwrap();
    for test in &tests {
        let scope = orchestrator.on_test_start(test).await.unwrap();
        let context = scope.context().unwrap();
        let tables = context.get::<ImmutableTablesState>().unwrap();
        assert_eq!(tables.get_by_name("nation").unwrap().name_in_database(), "nation");
        orchestrator
            .on_test_finished(test, scope, TestOutcome::Success)
            .await
            .unwrap();
    }
    orchestrator.on_suite_finish().await.unwrap();

    assert_eq!(hive.executor.statements_starting_with("CREATE TABLE nation").len(), 1);
    assert_eq!(hive.executor.statements_starting_with("CREATE TABLE region").len(), 1);
    assert_eq!(hive.store.uploads().len(), 2);
    assert_eq!(hive.executor.close_count(), 1);
}

#[tokio::test]
async fn test_handles_differing_in_case_share_one_immutable_table() {
    let hive = Hive::new();
    let orchestrator = orchestrator(configuration(), &hive, no_extra());
    let tests = [
        TestMethod::new("shouting").requires(immutable("NATION")),
        TestMethod::new("quiet").requires(immutable("nation"))
    ];

    orchestrator.on_suite_start(&tests).await.unwrap();
    for test in &tests {
        let scope = orchestrator.on_test_start(test).await.unwrap();
        let context = scope.context().unwrap();
        assert!(context.require::<ImmutableTablesState>().unwrap().get_by_name("nation").is_ok());
        orchestrator
            .on_test_finished(test, scope, TestOutcome::Success)
            .await
            .unwrap();
    }
    orchestrator.on_suite_finish().await.unwrap();

    let creates: Vec<String> = hive
        .executor
        .statements()
        .into_iter()
        .filter(|statement| statement.to_ascii_lowercase().starts_with("create table nation"))
        .collect();
    assert_eq!(creates.len(), 1);
    assert_eq!(hive.store.uploads().len(), 1);
}

#[tokio::test]
async fn test_schema_qualified_lookup_falls_back_to_unqualified_table() {
    let hive = Hive::new();
    let orchestrator = orchestrator(configuration(), &hive, no_extra());
    let test = TestMethod::new("lookup").requires(immutable("nation"));

    orchestrator.on_suite_start(std::slice::from_ref(&test)).await.unwrap();
    let scope = orchestrator.on_test_start(&test).await.unwrap();

    let context = scope.context().unwrap();
    let tables = context.get::<ImmutableTablesState>().unwrap();
    let qualified = tables
        .get(&TableHandle::table("nation").in_schema("tpch"))
        .unwrap();
    assert_eq!(qualified.name().database(), "hive");
    assert!(tables.get_by_name("region").is_err());

    orchestrator
        .on_test_finished(&test, scope, TestOutcome::Success)
        .await
        .unwrap();
    orchestrator.on_suite_finish().await.unwrap();
}

#[tokio::test]
async fn test_mutable_tables_are_dropped_after_each_test() {
    let hive = Hive::new();
    let orchestrator = orchestrator(configuration(), &hive, no_extra());
    let test = TestMethod::new("insert_orders").requires(mutable("nation")).requires(
        Requirement::from(
            MutableTableRequirement::new(TableHandle::table("region"))
                .with_name("empty_region")
                .with_state(MutableTableState::Created)
        )
    );

    orchestrator.on_suite_start(std::slice::from_ref(&test)).await.unwrap();
    let scope = orchestrator.on_test_start(&test).await.unwrap();
    let nation = mutable_name(&scope, "nation");
    let region = mutable_name(&scope, "empty_region");
    assert!(nation.starts_with(&format!("tmp_nation_{RUN_ID}_")));
    assert!(hive.executor.tables().contains(&nation));
    assert_eq!(hive.store.uploads().len(), 1);

    orchestrator
        .on_test_finished(&test, scope, TestOutcome::Success)
        .await
        .unwrap();

    assert!(!hive.executor.tables().contains(&nation));
    assert!(!hive.executor.tables().contains(&region));
    orchestrator.on_suite_finish().await.unwrap();
    assert_eq!(orchestrator.failed_tests(), 0);
}

#[tokio::test]
async fn test_mutable_tables_of_failed_test_are_kept_when_configured() {
    let hive = Hive::new();
    let events = event_log();
    let configuration = configuration().with("databases.hive.keep_mutable_tables_on_failure", "true");
    let orchestrator = orchestrator(configuration, &hive, watching(&events));
    let test = TestMethod::new("broken_insert").requires(mutable("nation"));

    orchestrator.on_suite_start(std::slice::from_ref(&test)).await.unwrap();
    let scope = orchestrator.on_test_start(&test).await.unwrap();
    let nation = mutable_name(&scope, "nation");
    orchestrator
        .on_test_finished(&test, scope, TestOutcome::Failure)
        .await
        .unwrap();

    assert!(hive.executor.tables().contains(&nation));
    assert_eq!(orchestrator.failed_tests(), 1);

    orchestrator.on_suite_finish().await.unwrap();
    assert_eq!(events.lock().last().map(String::as_str), Some("cleanup:watch:FAILURE"));
}

#[tokio::test]
async fn test_failing_after_hook_fails_test_but_still_cleans_up() {
    let hive = Hive::new();
    let orchestrator = orchestrator(configuration(), &hive, no_extra());
    let test = TestMethod::new("verify_rows")
        .requires(mutable("nation"))
        .after(FnHook::new("check_rows", |_: &TestContext| {
            Err(FixtureError::backend("check", "row count mismatch"))
        }));

    orchestrator.on_suite_start(std::slice::from_ref(&test)).await.unwrap();
    let scope = orchestrator.on_test_start(&test).await.unwrap();
    let nation = mutable_name(&scope, "nation");

    let err = orchestrator
        .on_test_finished(&test, scope, TestOutcome::Success)
        .await
        .unwrap_err();

    assert!(matches!(err, FixtureError::Hook { ref hook, .. } if hook == "check_rows"));
    assert!(!hive.executor.tables().contains(&nation));
    assert_eq!(orchestrator.failed_tests(), 1);
    orchestrator.on_suite_finish().await.unwrap();
}

#[tokio::test]
async fn test_failing_before_hook_unwinds_test_scope() {
    let hive = Hive::new();
    let orchestrator = orchestrator(configuration(), &hive, no_extra());
    let test = TestMethod::new("prepare")
        .requires(mutable("nation"))
        .before(FnHook::new("seed", |_: &TestContext| {
            Err(FixtureError::backend("seed", "connection refused"))
        }));

    orchestrator.on_suite_start(std::slice::from_ref(&test)).await.unwrap();
    let err = orchestrator.on_test_start(&test).await.unwrap_err();

    assert!(matches!(err, FixtureError::Hook { .. }));
    assert_eq!(hive.executor.statements_starting_with("DROP TABLE IF EXISTS tmp_nation_").len(), 1);
    assert!(hive.executor.tables().iter().all(|table| !table.starts_with("tmp_")));
    assert_eq!(orchestrator.failed_tests(), 1);
    orchestrator.on_suite_finish().await.unwrap();
}

#[tokio::test]
async fn test_before_hooks_see_test_identity_and_fixtures() {
    let hive = Hive::new();
    let orchestrator = orchestrator(configuration(), &hive, no_extra());
    let test = TestMethod::new("identity")
        .requires(immutable("nation"))
        .before(FnHook::new("inspect", |context: &TestContext| {
            let info = context.require::<TestMethodInfo>()?;
            let tables = context.require::<ImmutableTablesState>()?;
            tables.get_by_name("nation")?;
            if info.name != "identity" {
                return Err(FixtureError::configuration(format!("unexpected test {}", info.name)));
            }
            Ok(())
        }));

    orchestrator.on_suite_start(std::slice::from_ref(&test)).await.unwrap();
    let scope = orchestrator.on_test_start(&test).await.unwrap();
    orchestrator
        .on_test_finished(&test, scope, TestOutcome::Success)
        .await
        .unwrap();
    orchestrator.on_suite_finish().await.unwrap();
}

#[tokio::test]
async fn test_skipped_test_counts_as_success() {
    let hive = Hive::new();
    let events = event_log();
    let orchestrator = orchestrator(configuration(), &hive, watching(&events));
    let test = TestMethod::new("skipped").requires(immutable("nation"));

    orchestrator.on_suite_start(std::slice::from_ref(&test)).await.unwrap();
    let scope = orchestrator.on_test_start(&test).await.unwrap();
    orchestrator
        .on_test_finished(&test, scope, TestOutcome::Skipped)
        .await
        .unwrap();
    orchestrator.on_suite_finish().await.unwrap();

    assert_eq!(orchestrator.failed_tests(), 0);
    assert_eq!(*events.lock(), ["fulfill:watch", "cleanup:watch:SUCCESS"]);
}

#[tokio::test]
async fn test_failed_suite_start_closes_managers() {
    let hive = Hive::new();
    let events = event_log();
    let extra = Extra {
        fulfillers: vec![
            RecordingFulfiller::new("broken", FulfillerScope::Suite, &events)
                .failing_fulfill()
                .into_arc()
        ],
        provisioners: Vec::new()
    };
    let orchestrator = orchestrator(configuration(), &hive, extra);
    let test = TestMethod::new("never_runs").requires(immutable("nation"));

    let err = orchestrator
        .on_suite_start(std::slice::from_ref(&test))
        .await
        .unwrap_err();

    assert!(matches!(err.primary(), FixtureError::Fulfillment { fulfiller, .. } if fulfiller == "broken"));
    assert_eq!(hive.executor.close_count(), 1);
    assert!(matches!(
        orchestrator.on_test_start(&test).await.unwrap_err(),
        FixtureError::SuiteNotInitialized
    ));
    assert!(matches!(
        orchestrator.on_suite_finish().await.unwrap_err(),
        FixtureError::SuiteNotInitialized
    ));
}

#[tokio::test]
async fn test_suite_cannot_start_twice() {
    let hive = Hive::new();
    let orchestrator = orchestrator(configuration(), &hive, no_extra());

    orchestrator.on_suite_start(&[]).await.unwrap();
    assert!(orchestrator.on_suite_start(&[]).await.unwrap_err().is_consistency_violation());
    orchestrator.on_suite_finish().await.unwrap();
}

#[tokio::test]
async fn test_resources_are_provisioned_for_suite_and_released_in_reverse() {
    let hive = Hive::new();
    let events = event_log();
    let extra = Extra {
        fulfillers: Vec::new(),
        provisioners: vec![Arc::new(Queues {
            events: Arc::clone(&events)
        })]
    };
    let orchestrator = orchestrator(configuration(), &hive, extra);
    let tests = [
        TestMethod::new("publish").requires(Requirement::from(ResourceRequirement::new("queue", "orders"))),
        TestMethod::new("consume").requires(Requirement::from(ResourceRequirement::new("queue", "events")))
    ];

    orchestrator.on_suite_start(&tests).await.unwrap();
    let scope = orchestrator.on_test_start(&tests[1]).await.unwrap();
    let queue = scope.context().unwrap().get_named::<String>("events").unwrap();
    assert_eq!(queue.as_str(), "queue://events");
    orchestrator
        .on_test_finished(&tests[1], scope, TestOutcome::Success)
        .await
        .unwrap();
    orchestrator.on_suite_finish().await.unwrap();

    assert_eq!(
        *events.lock(),
        [
            "provision:orders",
            "provision:events",
            "release:events:SUCCESS",
            "release:orders:SUCCESS"
        ]
    );
}

#[tokio::test]
async fn test_resources_registered_by_test_close_at_test_end() {
    let hive = Hive::new();
    let orchestrator = orchestrator(configuration(), &hive, no_extra());
    let test = TestMethod::new("connections");
    let closed = event_log();

    orchestrator.on_suite_start(std::slice::from_ref(&test)).await.unwrap();
    let scope = orchestrator.on_test_start(&test).await.unwrap();
    let resources = scope.context().unwrap().get::<ResourcesState>().unwrap();
    for name in ["session", "cursor"] {
        let closed = Arc::clone(&closed);
        resources.register(name, move || {
            closed.lock().push(name.to_string());
            Ok(())
        });
    }
    orchestrator
        .on_test_finished(&test, scope, TestOutcome::Success)
        .await
        .unwrap();

    assert_eq!(*closed.lock(), ["cursor", "session"]);
    assert!(resources.is_empty());
    orchestrator.on_suite_finish().await.unwrap();
}

#[tokio::test]
async fn test_commands_run_at_setup_and_teardown() {
    let hive = Hive::new();
    let orchestrator = orchestrator(configuration(), &hive, no_extra());
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("marker");
    let command = CommandRequirement::new(CommandScope::Test)
        .setup(format!("touch {}", marker.display()))
        .teardown(format!("rm {}", marker.display()));
    let test = TestMethod::new("with_marker").requires(Requirement::from(command));

    orchestrator.on_suite_start(std::slice::from_ref(&test)).await.unwrap();
    let scope = orchestrator.on_test_start(&test).await.unwrap();
    assert!(marker.exists());
    orchestrator
        .on_test_finished(&test, scope, TestOutcome::Success)
        .await
        .unwrap();
    assert!(!marker.exists());
    orchestrator.on_suite_finish().await.unwrap();
}

#[tokio::test]
async fn test_failing_command_fails_test_start() {
    let hive = Hive::new();
    let orchestrator = orchestrator(configuration(), &hive, no_extra());
    let command = CommandRequirement::new(CommandScope::Test).setup("exit 3");
    let test = TestMethod::new("bad_command").requires(Requirement::from(command));

    orchestrator.on_suite_start(std::slice::from_ref(&test)).await.unwrap();
    let err = orchestrator.on_test_start(&test).await.unwrap_err();

    assert!(matches!(err.primary(), FixtureError::Fulfillment { .. }));
    assert_eq!(orchestrator.failed_tests(), 1);
    orchestrator.on_suite_finish().await.unwrap();
}

#[tokio::test]
async fn test_failed_setup_command_tears_down_earlier_commands() {
    let hive = Hive::new();
    let orchestrator = orchestrator(configuration(), &hive, no_extra());
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("marker");
    let touch = CommandRequirement::new(CommandScope::Test)
        .setup(format!("touch {}", marker.display()))
        .teardown(format!("rm {}", marker.display()));
    let broken = CommandRequirement::new(CommandScope::Test).setup("exit 3");
    let test = TestMethod::new("half_prepared")
        .requires(Requirement::from(touch))
        .requires(Requirement::from(broken));

    orchestrator.on_suite_start(std::slice::from_ref(&test)).await.unwrap();
    let err = orchestrator.on_test_start(&test).await.unwrap_err();

    assert!(matches!(
        err.primary(),
        FixtureError::Fulfillment { fulfiller, .. } if fulfiller == TEST_COMMAND_FULFILLER
    ));
    assert!(!marker.exists());
    orchestrator.on_suite_finish().await.unwrap();
}

#[tokio::test]
async fn test_failed_mutable_table_rolls_back_tables_created_before_it() {
    let hive = Hive::new();
    hive.executor.fail_on("CREATE TABLE tmp_region", "disk full");
    let orchestrator = orchestrator(configuration(), &hive, no_extra());
    let test = TestMethod::new("two_tables")
        .requires(mutable("nation"))
        .requires(mutable("region"));

    orchestrator.on_suite_start(std::slice::from_ref(&test)).await.unwrap();
    let err = orchestrator.on_test_start(&test).await.unwrap_err();

    assert!(matches!(
        err.primary(),
        FixtureError::Fulfillment { fulfiller, .. } if fulfiller == MUTABLE_TABLES_FULFILLER
    ));
    assert_eq!(hive.executor.statements_starting_with("DROP TABLE IF EXISTS tmp_nation_").len(), 1);
    assert!(hive.executor.tables().iter().all(|table| !table.starts_with("tmp_")));
    assert_eq!(orchestrator.failed_tests(), 1);
    orchestrator.on_suite_finish().await.unwrap();
}

#[tokio::test]
async fn test_failed_test_start_keeps_suite_tables_for_next_test() {
    let hive = Hive::new();
    hive.executor.fail_on("CREATE TABLE tmp_region", "disk full");
    let orchestrator = orchestrator(configuration(), &hive, no_extra());
    let tests = [
        TestMethod::new("broken")
            .requires(immutable("nation"))
            .requires(mutable("region")),
        TestMethod::new("reader").requires(immutable("nation"))
    ];

    orchestrator.on_suite_start(&tests).await.unwrap();
    assert!(orchestrator.on_test_start(&tests[0]).await.is_err());

    let scope = orchestrator.on_test_start(&tests[1]).await.unwrap();
    let context = scope.context().unwrap();
    let nation = context
        .require::<ImmutableTablesState>()
        .unwrap()
        .get_by_name("nation")
        .unwrap()
        .name_in_database();
    assert!(hive.executor.tables().contains(&nation));
    orchestrator
        .on_test_finished(&tests[1], scope, TestOutcome::Success)
        .await
        .unwrap();
    orchestrator.on_suite_finish().await.unwrap();

    assert_eq!(hive.executor.statements_starting_with("DROP TABLE IF EXISTS nation").len(), 1);
    assert!(hive.executor.tables().contains("nation"));
    assert_eq!(orchestrator.failed_tests(), 1);
}

fn directory_orchestrator(hive: &Hive, directory: Option<Arc<InMemoryDirectory>>) -> Orchestrator {
    let bind_directory = SuiteBindings(move |_: &Configuration, dependencies: &mut Dependencies| -> FixtureResult<()> {
        if let Some(directory) = &directory {
            dependencies.bind::<Arc<dyn DirectoryClient>>(Arc::clone(directory) as Arc<dyn DirectoryClient>);
        }
        Ok(())
    });
    let registry = PluginRegistry::builtin()
        .register(hive.bindings())
        .register(bind_directory);
    Orchestrator::new(configuration(), registry).with_names(TableNameGenerator::with_run_id(RUN_ID))
}

#[tokio::test]
async fn test_directory_entries_are_added_once_and_outlive_the_suite() {
    let hive = Hive::new();
    let directory = Arc::new(InMemoryDirectory::new().with_entry("cn=admins,dc=example,dc=com"));
    let orchestrator = directory_orchestrator(&hive, Some(Arc::clone(&directory)));
    let alice = ResourceRequirement::new(LDAP_RESOURCE_KIND, "uid=alice,ou=people,dc=example,dc=com")
        .with_attribute("objectClass", "person")
        .with_attribute("cn", "Alice");
    let admins = ResourceRequirement::new(LDAP_RESOURCE_KIND, "cn=admins,dc=example,dc=com");
    let tests = [
        TestMethod::new("login")
            .requires(Requirement::from(alice.clone()))
            .requires(Requirement::from(admins)),
        TestMethod::new("relogin").requires(Requirement::from(alice))
    ];

    orchestrator.on_suite_start(&tests).await.unwrap();
    orchestrator.on_suite_finish().await.unwrap();

    assert_eq!(directory.added_count(), 1);
    let entry = directory.entry("uid=alice,ou=people,dc=example,dc=com").unwrap();
    assert_eq!(entry["cn"], "Alice");
    assert_eq!(entry["objectClass"], "person");
}

#[tokio::test]
async fn test_directory_entries_without_a_bound_client_fail_the_suite() {
    let hive = Hive::new();
    let orchestrator = directory_orchestrator(&hive, None);
    let test = TestMethod::new("login").requires(Requirement::from(ResourceRequirement::new(
        LDAP_RESOURCE_KIND,
        "uid=bob,ou=people,dc=example,dc=com"
    )));

    let err = orchestrator
        .on_suite_start(std::slice::from_ref(&test))
        .await
        .unwrap_err();

    assert!(matches!(
        err.primary(),
        FixtureError::Fulfillment { fulfiller, source }
            if fulfiller == PROVISIONED_RESOURCES_FULFILLER
                && matches!(**source, FixtureError::MissingDependency { .. })
    ));
}
