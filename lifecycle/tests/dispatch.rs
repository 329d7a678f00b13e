use context::{Dependencies, TestContext, TestContextStack};
use errors::FixtureError;
use fixture_core::{Requirement, RequirementSet, ResourceRequirement, TableHandle, TestStatus};
use lifecycle::{FulfillerScope, FulfillmentScope, RequirementFulfiller, do_cleanup, do_fulfillment};
use std::sync::Arc;
use testing::{Claim, EventLog, RecordingFulfiller, event_log};

fn requirements() -> RequirementSet {
    Requirement::immutable_table(TableHandle::table("nation")).flatten()
}

fn suite_scope() -> FulfillmentScope {
    FulfillmentScope::new(FulfillerScope::Suite, TestContext::new(Dependencies::new()))
}

fn recording(name: &str, events: &EventLog) -> RecordingFulfiller {
    RecordingFulfiller::new(name, FulfillerScope::Suite, events)
}

fn events_of(events: &EventLog) -> Vec<String> {
    events.lock().clone()
}

#[tokio::test]
async fn test_cleanup_runs_in_reverse_fulfillment_order() {
    let events = event_log();
    let fulfillers: Vec<Arc<dyn RequirementFulfiller>> = vec![
        recording("a", &events).into_arc(),
        recording("b", &events).into_arc(),
        recording("c", &events).into_arc()
    ];
    let mut scope = suite_scope();

    do_fulfillment(&mut scope, &fulfillers, &requirements()).await.unwrap();
    assert_eq!(scope.stack().size(), 4);
    assert_eq!(scope.applied().collect::<Vec<_>>(), ["a", "b", "c"]);

    do_cleanup(&mut scope, TestStatus::Success).await.unwrap();
    assert_eq!(
        events_of(&events),
        [
            "fulfill:a",
            "fulfill:b",
            "fulfill:c",
            "cleanup:c:SUCCESS",
            "cleanup:b:SUCCESS",
            "cleanup:a:SUCCESS"
        ]
    );
    assert_eq!(scope.stack().size(), 1);
    scope.close_base().unwrap();
}

#[tokio::test]
async fn test_states_are_visible_to_later_fulfillers_and_top_frame() {
    let events = event_log();
    let fulfillers = vec![recording("a", &events).into_arc(), recording("b", &events).into_arc()];
    let mut scope = suite_scope();

    do_fulfillment(&mut scope, &fulfillers, &requirements()).await.unwrap();

    let top = scope.context().unwrap();
    assert_eq!(top.get_named::<String>("a").as_deref().map(String::as_str), Some("a"));
    assert_eq!(top.get_named::<String>("b").as_deref().map(String::as_str), Some("b"));
    assert_eq!(top.depth(), 3);

    do_cleanup(&mut scope, TestStatus::Success).await.unwrap();
    assert!(top.is_closed());
}

#[tokio::test]
async fn test_failing_fulfiller_unwinds_only_applied_ones() {
    let events = event_log();
    let fulfillers = vec![
        recording("a", &events).into_arc(),
        recording("b", &events).failing_fulfill().into_arc(),
        recording("c", &events).into_arc()
    ];
    let mut scope = suite_scope();

    let err = do_fulfillment(&mut scope, &fulfillers, &requirements())
        .await
        .unwrap_err();

    assert!(matches!(err, FixtureError::Fulfillment { ref fulfiller, .. } if fulfiller == "b"));
    assert_eq!(events_of(&events), ["fulfill:a", "fulfill:b", "cleanup:a:FAILURE"]);
    assert_eq!(scope.stack().size(), 1);
    assert_eq!(scope.applied().count(), 0);
    scope.close_base().unwrap();
}

#[tokio::test]
async fn test_cleanup_failure_during_unwind_is_suppressed() {
    let events = event_log();
    let fulfillers = vec![
        recording("a", &events).failing_cleanup().into_arc(),
        recording("b", &events).failing_fulfill().into_arc()
    ];
    let mut scope = suite_scope();

    let err = do_fulfillment(&mut scope, &fulfillers, &requirements())
        .await
        .unwrap_err();

    assert!(matches!(err.primary(), FixtureError::Fulfillment { fulfiller, .. } if fulfiller == "b"));
    assert_eq!(err.suppressed().len(), 1);
    assert!(err.suppressed()[0].to_string().contains("scripted cleanup failure"));
}

#[tokio::test]
async fn test_every_fulfiller_is_cleaned_up_despite_failures() {
    let events = event_log();
    let fulfillers = vec![
        recording("a", &events).failing_cleanup().into_arc(),
        recording("b", &events).into_arc(),
        recording("c", &events).failing_cleanup().into_arc()
    ];
    let mut scope = suite_scope();
    do_fulfillment(&mut scope, &fulfillers, &requirements()).await.unwrap();

    let err = do_cleanup(&mut scope, TestStatus::Failure).await.unwrap_err();

    assert!(matches!(err.primary(), FixtureError::Fulfillment { fulfiller, .. } if fulfiller == "c"));
    assert_eq!(err.suppressed().len(), 1);
    assert_eq!(
        events_of(&events)[3..],
        ["cleanup:c:FAILURE", "cleanup:b:FAILURE", "cleanup:a:FAILURE"]
    );
    assert_eq!(scope.stack().size(), 1);
}

#[tokio::test]
async fn test_empty_claim_skips_fulfiller_unless_unconditional() {
    let events = event_log();
    let fulfillers = vec![
        recording("tables", &events).claiming(Claim::Tables).into_arc(),
        recording("resources", &events).claiming(Claim::Resources).into_arc(),
        recording("always", &events)
            .claiming(Claim::Nothing)
            .unconditional()
            .into_arc()
    ];
    let mut scope = suite_scope();

    do_fulfillment(&mut scope, &fulfillers, &requirements()).await.unwrap();
    assert_eq!(scope.applied().collect::<Vec<_>>(), ["tables", "always"]);

    let resources: RequirementSet = Requirement::from(ResourceRequirement::new("queue", "orders")).flatten();
    let mut other = suite_scope();
    do_fulfillment(&mut other, &fulfillers, &resources).await.unwrap();
    assert_eq!(other.applied().collect::<Vec<_>>(), ["resources", "always"]);
}

#[tokio::test]
async fn test_mismatched_stack_is_a_consistency_violation() {
    let events = event_log();
    let base = TestContext::new(Dependencies::new());
    let mut stack = TestContextStack::with_base(base.clone());
    stack.push(base.create_child_context(Vec::new()).unwrap());
    let mut scope = FulfillmentScope::from_parts(
        FulfillerScope::Test,
        stack,
        vec![recording("a", &events).into_arc(), recording("b", &events).into_arc()]
    );

    let err = do_cleanup(&mut scope, TestStatus::Success).await.unwrap_err();

    assert!(err.is_consistency_violation());
    assert!(events_of(&events).is_empty());
}

#[tokio::test]
async fn test_base_cannot_close_while_fulfillers_are_applied() {
    let events = event_log();
    let fulfillers = vec![recording("a", &events).into_arc()];
    let mut scope = suite_scope();
    do_fulfillment(&mut scope, &fulfillers, &requirements()).await.unwrap();

    assert!(scope.close_base().unwrap_err().is_consistency_violation());

    do_cleanup(&mut scope, TestStatus::Success).await.unwrap();
    scope.close_base().unwrap();
}
