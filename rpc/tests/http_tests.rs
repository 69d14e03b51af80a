//! HTTP tests driving the router in-process through `tower::ServiceExt`.

use std::sync::Arc;

use agora_governance::{GovernanceFacade, GovernanceParams};
use agora_nullables::{NullBalanceOracle, NullClock, NullDepositEscrow, NullGovernanceStore};
use agora_rpc::{router, AppState, RpcMetrics};
use agora_types::WalletAddress;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

const ALICE: &str = "0x00000000000000000000000000000000000000a1";
const BOB: &str = "0x00000000000000000000000000000000000000b2";
const CAROL: &str = "0x00000000000000000000000000000000000000c3";

struct TestApp {
    router: Router,
    clock: Arc<NullClock>,
}

fn app() -> TestApp {
    let addr = |s: &str| WalletAddress::parse(s).unwrap();
    let clock = Arc::new(NullClock::new(1_700_000_000));
    let oracle = NullBalanceOracle::new()
        .with_balance(&addr(ALICE), 850_000)
        .with_balance(&addr(BOB), 390_000)
        .with_balance(&addr(CAROL), 65_000);
    let facade = GovernanceFacade::new(
        Arc::new(NullGovernanceStore::new()),
        clock.clone(),
        Arc::new(oracle),
        Arc::new(NullDepositEscrow::accepting()),
        GovernanceParams::default(),
    );
    let state = AppState::new(Arc::new(facade), Arc::new(RpcMetrics::new().unwrap()));
    TestApp {
        router: router(state),
        clock,
    }
}

async fn call(app: &TestApp, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn create(app: &TestApp, title: &str, category: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/proposals",
        Some(json!({
            "title": title,
            "category": category,
            "description": "Lower the marketplace take rate.",
            "voting_period_secs": 604800,
            "deposit": { "depositor": CAROL, "amount": 1000, "reference": "escrow-1" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

async fn vote(app: &TestApp, id: &str, voter: &str, choice: &str) -> (StatusCode, Value) {
    call(
        app,
        Method::POST,
        &format!("/proposals/{id}/votes"),
        Some(json!({ "voter": voter, "choice": choice })),
    )
    .await
}

async fn metrics_text(app: &TestApp) -> String {
    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn full_voting_flow() {
    let app = app();
    let id = create(&app, "Reduce fee to 2%", "fee_structure").await;

    assert_eq!(vote(&app, &id, ALICE, "yes").await.0, StatusCode::CREATED);
    assert_eq!(vote(&app, &id, BOB, "no").await.0, StatusCode::CREATED);
    let (status, receipt) = vote(&app, &id, CAROL, "abstain").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["weight"], 65_000);
    assert_eq!(receipt["choice"], "abstain");

    let (status, view) = call(&app, Method::GET, &format!("/proposals/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["state"], "active");
    assert_eq!(view["tally"]["percentages"]["yes"], 65.1);
    assert_eq!(view["tally"]["percentages"]["no"], 29.9);
    assert_eq!(view["tally"]["quorum_reached"], true);
    assert_eq!(view["time_remaining"], "7d 0h");

    app.clock.advance(604_800);
    let (_, view) = call(&app, Method::GET, &format!("/proposals/{id}"), None).await;
    assert_eq!(view["state"], "passed");
    assert_eq!(view["time_remaining"], Value::Null);

    let (status, view) = call(&app, Method::POST, &format!("/proposals/{id}/execute"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["state"], "executed");

    // Closed by the read above, not by a sweep.
    assert!(metrics_text(&app).await.contains("agora_proposals_closed 1"));
}

#[tokio::test]
async fn repeated_vote_conflicts() {
    let app = app();
    let id = create(&app, "Upgrade inference runtime", "platform_updates").await;
    vote(&app, &id, ALICE, "yes").await;

    let (status, body) = vote(&app, &id, ALICE, "yes").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "already_voted");

    let (status, body) = call(&app, Method::GET, &format!("/proposals/{id}/votes/{ALICE}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["weight"], 850_000);

    let (status, _) = call(&app, Method::GET, &format!("/proposals/{id}/votes/{BOB}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let metrics = metrics_text(&app).await;
    assert!(metrics.contains("agora_votes_cast_total 1"));
    assert!(metrics.contains("reason=\"already_voted\""));
}

#[tokio::test]
async fn request_validation() {
    let app = app();
    let id = create(&app, "Treasury grant", "treasury_management").await;

    let (status, body) = vote(&app, &id, "0x1234", "yes").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "invalid_address");

    let (status, _) = vote(&app, &id, ALICE, "maybe").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(&app, Method::GET, "/proposals/not-hex", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = "00".repeat(32);
    let (status, body) = call(&app, Method::GET, &format!("/proposals/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "proposal_not_found");

    let (status, body) = call(
        &app,
        Method::POST,
        "/proposals",
        Some(json!({
            "title": "Cheap",
            "category": "governance",
            "deposit": { "depositor": CAROL, "amount": 10, "reference": "escrow-2" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "insufficient_deposit");
}

#[tokio::test]
async fn delegation_endpoints() {
    let app = app();
    let id = create(&app, "Change quorum", "governance").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/delegations",
        Some(json!({ "voter": BOB, "delegate": ALICE })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delegate"], ALICE);

    let (status, body) = vote(&app, &id, BOB, "no").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "delegation_active");

    let (_, body) = call(&app, Method::GET, &format!("/delegations/{ALICE}"), None).await;
    assert_eq!(body["delegators"], json!([BOB]));

    let (status, body) = call(
        &app,
        Method::POST,
        "/delegations",
        Some(json!({ "voter": BOB, "delegate": BOB })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "self_delegation");

    let (_, body) = call(&app, Method::DELETE, &format!("/delegations/{BOB}"), None).await;
    assert_eq!(body["changed"], true);
    let (_, body) = call(&app, Method::DELETE, &format!("/delegations/{BOB}"), None).await;
    assert_eq!(body["changed"], false);

    assert_eq!(vote(&app, &id, BOB, "no").await.0, StatusCode::CREATED);
}

#[tokio::test]
async fn listing_is_paginated_and_filtered() {
    let app = app();
    for n in 0..5 {
        let category = if n % 2 == 0 { "fee_structure" } else { "governance" };
        create(&app, &format!("proposal {n}"), category).await;
        app.clock.advance(1);
    }

    let (status, page) = call(&app, Method::GET, "/proposals?count=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["proposals"].as_array().unwrap().len(), 2);
    assert_eq!(page["proposals"][0]["title"], "proposal 4");
    let cursor = page["cursor"].as_str().unwrap().to_string();

    let (_, page) = call(&app, Method::GET, &format!("/proposals?count=2&cursor={cursor}"), None).await;
    assert_eq!(page["proposals"][0]["title"], "proposal 2");

    let (_, page) = call(&app, Method::GET, "/proposals?category=governance", None).await;
    assert_eq!(page["proposals"].as_array().unwrap().len(), 2);
    assert!(page.get("cursor").is_none());

    let (status, _) = call(&app, Method::GET, "/proposals?cursor=zz", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_stats() {
    let app = app();
    let id = create(&app, "Anything", "governance").await;
    let (status, _) = call(&app, Method::POST, &format!("/proposals/{id}/discussion"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["stats"]["proposals_created"], 1);
}
