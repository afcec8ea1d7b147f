//! Scenario orchestration end to end with scripted collaborators.

mod common;

use common::{RecordingSleeper, ScriptedExecutor};
use serde_json::json;
use vouch_core::{HttpRequest, HttpResponse, Value};
use vouch_eval::FailureKind;
use vouch_runner::{
    run_suite, ConfigStore, Orchestrator, RunnerConfig, Scenario, ScenarioResult, StaticEngine,
    SuiteSummary, TestRunContext, EXPECTED_STATUS_HEADER, RESULT_HEADER,
};

fn body(json: serde_json::Value) -> Value {
    Value::from(json)
}

fn echo() -> Scenario {
    Scenario::new("echo", "POST", "/echo", 200).with_example(
        HttpRequest::new("POST", "/echo").with_body(body(json!({"data": "hello"}))),
        HttpResponse::new(200).with_body(body(json!({"data": "$eq(REQUEST.BODY.data)"}))),
    )
}

fn config() -> ConfigStore {
    ConfigStore::from_value(&body(json!({
        "product": {"name": "Soap"},
        "patch": {"Product": {"price": [1000, 2000]}}
    })))
}

async fn run_one(
    context: &TestRunContext,
    scenario: &Scenario,
    responses: Vec<HttpResponse>,
) -> (vouch_runner::ScenarioOutcome, ScriptedExecutor) {
    let engine = StaticEngine::new(vec![scenario.clone()]);
    let executor = ScriptedExecutor::new(responses);
    let sleeper = RecordingSleeper::default();
    let config = RunnerConfig::default();
    let outcome = Orchestrator::new(context, &engine, &executor, &config)
        .with_sleeper(&sleeper)
        .run(scenario)
        .await;
    (outcome, executor)
}

#[tokio::test]
async fn echoed_value_mismatch_is_a_failure() {
    let context = TestRunContext::new(ConfigStore::default());
    let (outcome, _) = run_one(
        &context,
        &echo(),
        vec![HttpResponse::new(200).with_body(body(json!({"data": "bye"})))],
    )
    .await;

    match outcome.result {
        ScenarioResult::Failure { failures } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].breadcrumb, "RESPONSE.BODY.data");
            assert_eq!(failures[0].message, "Expected \"bye\" to equal \"hello\"");
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn echoed_value_match_is_a_success() {
    let context = TestRunContext::new(ConfigStore::default());
    let (outcome, executor) = run_one(
        &context,
        &echo(),
        vec![HttpResponse::new(200).with_body(body(json!({"data": "hello"})))],
    )
    .await;
    assert!(outcome.result.is_success(), "{}", outcome.result.report());
    assert_eq!(
        executor.requests()[0].header(EXPECTED_STATUS_HEADER),
        Some("200")
    );
}

#[tokio::test]
async fn requests_are_resolved_against_config() {
    let scenario = Scenario::new("create", "POST", "/products", 201).with_example(
        HttpRequest::new("POST", "/products").with_body(body(json!({
            "name": "$(CONFIG.product.name)",
            "price": "$rand(CONFIG.patch.Product.price)",
            "tags": ["fixed"]
        }))),
        HttpResponse::new(201),
    );
    let context = TestRunContext::new(config());
    let (outcome, executor) = run_one(&context, &scenario, vec![HttpResponse::new(201)]).await;

    assert!(outcome.result.is_success(), "{}", outcome.result.report());
    let sent = &executor.requests()[0];
    assert_eq!(sent.body.get("name"), Some(&Value::string("Soap")));
    let price = sent.body.get("price").and_then(Value::as_u64);
    assert!(matches!(price, Some(1000) | Some(2000)));
    assert_eq!(sent.body.get("tags"), Some(&body(json!(["fixed"]))));
}

#[tokio::test]
async fn unresolved_lookup_is_an_error_and_nothing_is_sent() {
    let scenario = Scenario::new("get", "GET", "/products/{id}", 200).with_example(
        HttpRequest::new("GET", "/products/$(ENTITY_ID)"),
        HttpResponse::new(200),
    );
    let context = TestRunContext::new(ConfigStore::default());
    let (outcome, executor) = run_one(&context, &scenario, vec![HttpResponse::new(200)]).await;

    match &outcome.result {
        ScenarioResult::Error { message } => assert!(message.contains("ENTITY_ID")),
        other => panic!("expected error, got {:?}", other),
    }
    assert!(executor.requests().is_empty());
    assert!(outcome.response.is_none());
}

#[tokio::test]
async fn transport_failure_is_an_error() {
    let context = TestRunContext::new(ConfigStore::default());
    let (outcome, _) = run_one(&context, &echo(), vec![]).await;
    assert!(matches!(outcome.result, ScenarioResult::Error { .. }));
}

#[tokio::test]
async fn service_signalled_failure() {
    let context = TestRunContext::new(ConfigStore::default());
    let response = HttpResponse::new(200)
        .with_header(RESULT_HEADER, "failure")
        .with_body(Value::string("database unavailable"));
    let (outcome, _) = run_one(&context, &echo(), vec![response]).await;

    match outcome.result {
        ScenarioResult::Failure { failures } => {
            assert_eq!(failures[0].kind, FailureKind::Signalled);
            assert_eq!(failures[0].message, "database unavailable");
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn shape_mismatch_without_monitor_is_a_failure() {
    let context = TestRunContext::new(ConfigStore::default());
    let (outcome, _) = run_one(&context, &echo(), vec![HttpResponse::new(500)]).await;
    match outcome.result {
        ScenarioResult::Failure { failures } => {
            assert_eq!(failures[0].breadcrumb, "RESPONSE.STATUS");
            assert_eq!(failures[0].kind, FailureKind::ShapeMismatch);
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn server_state_reaches_the_executor() {
    let scenario = echo().with_server_state(body(json!({"products": []})));
    let context = TestRunContext::new(ConfigStore::default());
    let (_, executor) = run_one(
        &context,
        &scenario,
        vec![HttpResponse::new(200).with_body(body(json!({"data": "hello"})))],
    )
    .await;
    assert_eq!(executor.states(), vec![body(json!({"products": []}))]);
}

fn product_scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("create", "POST", "/products", 201).with_example(
            HttpRequest::new("POST", "/products")
                .with_body(body(json!({"name": "X", "description": "Y"}))),
            HttpResponse::new(201).with_body(body(json!({"$store": "replace", "id": "(number)"}))),
        ),
        Scenario::new("patch", "PATCH", "/products/{id}", 200).with_example(
            HttpRequest::new("PATCH", "/products/$(ENTITY_ID)").with_body(body(json!({"price": 1}))),
            HttpResponse::new(200).with_body(body(json!({"$store": "merge", "price": "(number)"}))),
        ),
        Scenario::new("get", "GET", "/products/{id}", 200).with_example(
            HttpRequest::new("GET", "/products/$(ENTITY_ID)"),
            HttpResponse::new(200).with_body(body(json!({
                "name": "$eq(ENTITY.name)",
                "price": "$eq(ENTITY.price)"
            }))),
        ),
    ]
}

#[tokio::test]
async fn suite_chains_entities_through_merge() {
    let scenarios = product_scenarios();
    let engine = StaticEngine::new(scenarios.clone());
    let executor = ScriptedExecutor::new(vec![
        HttpResponse::new(201).with_body(body(json!({"id": 7, "name": "X", "description": "Y"}))),
        HttpResponse::new(200).with_body(body(json!({"price": 1}))),
        HttpResponse::new(200).with_body(body(json!({"id": 7, "name": "X", "price": 1}))),
    ]);
    let sleeper = RecordingSleeper::default();
    let config = RunnerConfig::default();
    let context = TestRunContext::new(ConfigStore::default());
    let orchestrator =
        Orchestrator::new(&context, &engine, &executor, &config).with_sleeper(&sleeper);

    let report = run_suite(&orchestrator, &scenarios).await;

    assert_eq!(
        report.summary,
        SuiteSummary {
            success: 3,
            failure: 0,
            error: 0
        },
        "{:?}",
        report.outcomes
    );
    let paths: Vec<String> = executor.requests().iter().map(|r| r.path.clone()).collect();
    assert_eq!(paths, vec!["/products", "/products/7", "/products/7"]);

    let entity = context.entity_facts();
    for key in ["ENTITY.name", "ENTITY.description", "ENTITY.price"] {
        assert!(entity.contains(key), "missing {}", key);
    }
    assert_eq!(entity.get("ENTITY_ID"), Some(&Value::string("7")));
}

#[tokio::test]
async fn replace_drops_earlier_fields() {
    let context = TestRunContext::new(ConfigStore::default());
    let create = &product_scenarios()[0];
    run_one(
        &context,
        create,
        vec![HttpResponse::new(201).with_body(body(json!({"id": 7, "name": "X", "description": "Y"})))],
    )
    .await;

    let (outcome, _) = run_one(
        &context,
        create,
        vec![HttpResponse::new(201).with_body(body(json!({"id": 8, "price": 1})))],
    )
    .await;
    assert!(outcome.result.is_success(), "{}", outcome.result.report());

    let entity = context.entity_facts();
    assert!(!entity.contains("ENTITY.name"));
    assert!(!entity.contains("ENTITY.description"));
    assert!(entity.contains("ENTITY.price"));
    assert_eq!(entity.get("ENTITY_ID"), Some(&Value::string("8")));
}

#[tokio::test]
async fn unsuitable_store_body_is_an_error() {
    let scenario = Scenario::new("list", "GET", "/products", 200).with_example(
        HttpRequest::new("GET", "/products"),
        HttpResponse::new(200).with_body(body(json!({"$store": "replace"}))),
    );
    let context = TestRunContext::new(ConfigStore::default());
    let (outcome, _) = run_one(
        &context,
        &scenario.with_response_shape(vouch_core::Pattern::AnyArray),
        vec![HttpResponse::new(200).with_body(body(json!([{"id": 1}])))],
    )
    .await;
    assert!(matches!(outcome.result, ScenarioResult::Error { .. }));
    assert!(context.entity_facts().is_empty());
}

#[tokio::test]
async fn random_pick_skips_the_current_entity_value() {
    let scenario = Scenario::new("reprice", "PATCH", "/products/{id}", 200).with_example(
        HttpRequest::new("PATCH", "/products/$(ENTITY_ID)")
            .with_body(body(json!({"price": "$rand(CONFIG.patch.Product.price)"}))),
        HttpResponse::new(200),
    );
    let context = TestRunContext::new(config());
    context
        .store_entity(
            vouch_core::StoreDirective::Replace,
            &body(json!({"id": 1000})),
        )
        .unwrap();

    let (outcome, executor) = run_one(&context, &scenario, vec![HttpResponse::new(200)]).await;
    assert!(outcome.result.is_success(), "{}", outcome.result.report());
    assert_eq!(executor.requests()[0].path, "/products/1000");
    assert_eq!(executor.requests()[0].body.get("price"), Some(&Value::from(2000)));
}

fn details() -> Scenario {
    Scenario::new("details", "GET", "/details", 200).with_example(
        HttpRequest::new("GET", "/details"),
        HttpResponse::new(200).with_body(body(json!({"details": ["(string)"]}))),
    )
}

#[tokio::test]
async fn pattern_mismatch_is_reported_once() {
    let context = TestRunContext::new(ConfigStore::default());
    let (outcome, _) = run_one(
        &context,
        &details(),
        vec![HttpResponse::new(200).with_body(body(json!({"details": [123]})))],
    )
    .await;

    match outcome.result {
        ScenarioResult::Failure { failures } => {
            assert_eq!(failures.len(), 1, "{:?}", failures);
            assert_eq!(failures[0].breadcrumb, "RESPONSE.BODY.details[0]");
            assert_eq!(failures[0].kind, FailureKind::PatternMismatch);
            assert_eq!(failures[0].message, "Expected string, actual was 123 (number)");
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn every_mismatched_element_is_reported() {
    let context = TestRunContext::new(ConfigStore::default());
    let (outcome, _) = run_one(
        &context,
        &details(),
        vec![HttpResponse::new(200).with_body(body(json!({"details": ["ok", 1, false]})))],
    )
    .await;

    match outcome.result {
        ScenarioResult::Failure { failures } => {
            let crumbs: Vec<&str> = failures.iter().map(|f| f.breadcrumb.as_str()).collect();
            assert_eq!(crumbs, vec!["RESPONSE.BODY.details[1]", "RESPONSE.BODY.details[2]"]);
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

fn account() -> Scenario {
    Scenario::new("account", "GET", "/account", 200).with_example(
        HttpRequest::new("GET", "/account"),
        HttpResponse::new(200).with_body(body(json!({
            "id": "(number)",
            "secret": "$not_exists()"
        }))),
    )
}

#[tokio::test]
async fn absent_key_satisfies_not_exists() {
    let context = TestRunContext::new(ConfigStore::default());
    let (outcome, _) = run_one(
        &context,
        &account(),
        vec![HttpResponse::new(200).with_body(body(json!({"id": 1})))],
    )
    .await;
    assert!(outcome.result.is_success(), "{}", outcome.result.report());
}

#[tokio::test]
async fn present_key_fails_not_exists() {
    let context = TestRunContext::new(ConfigStore::default());
    let (outcome, _) = run_one(
        &context,
        &account(),
        vec![HttpResponse::new(200).with_body(body(json!({"id": 1, "secret": "hunter2"})))],
    )
    .await;

    match outcome.result {
        ScenarioResult::Failure { failures } => {
            assert_eq!(failures.len(), 1, "{:?}", failures);
            assert_eq!(failures[0].breadcrumb, "RESPONSE.BODY.secret");
            assert_eq!(
                failures[0].message,
                "Expected \"RESPONSE.BODY.secret\" to not exist, actual was \"hunter2\""
            );
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_checked_key_is_reported_once() {
    let context = TestRunContext::new(ConfigStore::default());
    let (outcome, _) = run_one(
        &context,
        &account(),
        vec![HttpResponse::new(200).with_body(body(json!({})))],
    )
    .await;

    match outcome.result {
        ScenarioResult::Failure { failures } => {
            assert_eq!(failures.len(), 1, "{:?}", failures);
            assert_eq!(failures[0].kind, FailureKind::CouldNotResolveInResponse);
            assert_eq!(failures[0].message, "Could not resolve \"RESPONSE.BODY.id\" in response");
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_structural_key_is_a_shape_failure() {
    let scenario = Scenario::new("order", "GET", "/order", 200).with_example(
        HttpRequest::new("GET", "/order"),
        HttpResponse::new(200).with_body(body(json!({"lines": [{"sku": "A-1"}]}))),
    );
    let context = TestRunContext::new(ConfigStore::default());
    let (outcome, _) = run_one(
        &context,
        &scenario,
        vec![HttpResponse::new(200).with_body(body(json!({"total": 3})))],
    )
    .await;

    match outcome.result {
        ScenarioResult::Failure { failures } => {
            assert_eq!(failures.len(), 1, "{:?}", failures);
            assert_eq!(failures[0].breadcrumb, "RESPONSE.BODY.lines");
            assert_eq!(failures[0].kind, FailureKind::ShapeMismatch);
            assert_eq!(failures[0].message, "Expected key named \"lines\" was missing");
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

fn priced_product() -> Scenario {
    Scenario::new("priced", "GET", "/products/{id}", 200).with_example(
        HttpRequest::new("GET", "/products/$(ENTITY_ID)"),
        HttpResponse::new(200).with_body(body(json!({
            "kind": "(string)",
            "$if": {
                "$conditions": {"kind": "$eq(ENTITY.kind)"},
                "$then": {"price": "(number)"},
                "$else": {"price": "$not_exists()"}
            }
        }))),
    )
}

#[tokio::test]
async fn conditional_branches_through_the_orchestrator() {
    let context = TestRunContext::new(ConfigStore::default());
    context
        .store_entity(
            vouch_core::StoreDirective::Replace,
            &body(json!({"id": 3, "kind": "paid"})),
        )
        .unwrap();

    let (outcome, _) = run_one(
        &context,
        &priced_product(),
        vec![HttpResponse::new(200).with_body(body(json!({"kind": "paid", "price": 4})))],
    )
    .await;
    assert!(outcome.result.is_success(), "{}", outcome.result.report());

    let (outcome, _) = run_one(
        &context,
        &priced_product(),
        vec![HttpResponse::new(200).with_body(body(json!({"kind": "paid", "price": "4"})))],
    )
    .await;
    match outcome.result {
        ScenarioResult::Failure { failures } => {
            assert_eq!(failures.len(), 1, "{:?}", failures);
            assert_eq!(failures[0].breadcrumb, "RESPONSE.BODY.price");
            assert_eq!(failures[0].kind, FailureKind::PatternMismatch);
        }
        other => panic!("expected failure, got {:?}", other),
    }

    let (outcome, _) = run_one(
        &context,
        &priced_product(),
        vec![HttpResponse::new(200).with_body(body(json!({"kind": "free", "price": 4})))],
    )
    .await;
    match outcome.result {
        ScenarioResult::Failure { failures } => {
            assert_eq!(failures.len(), 1, "{:?}", failures);
            assert_eq!(failures[0].breadcrumb, "RESPONSE.BODY.price");
        }
        other => panic!("expected failure, got {:?}", other),
    }
}
