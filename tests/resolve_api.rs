//! HTTP surface of the resolver, driven through the router

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use ethers::types::Address;
use ethers::utils::to_checksum;
use securegames::api::{ApiServer, AppState};
use securegames::chain::{ChainGateway, InMemoryChain};
use securegames::common::to_wei;
use securegames::config::ApiConfig;
use securegames::resolver::{ChainResolver, MockResolver};
use securegames::retry::RetryPolicy;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const OWNER: u8 = 0xb1;
const RESOLVER: u8 = 0xb2;
const PLAYER: u8 = 0xb3;

fn chain_with_game(game_id: &str) -> Arc<InMemoryChain> {
    let chain = Arc::new(InMemoryChain::new(
        Address::repeat_byte(OWNER),
        Address::repeat_byte(RESOLVER),
    ));
    let player = Address::repeat_byte(PLAYER);
    chain.fund(player, to_wei(1.0).unwrap());
    chain
        .start_game(player, game_id, "mines", to_wei(0.1).unwrap())
        .unwrap();
    chain
}

fn app_signing_as(chain: &Arc<InMemoryChain>, signer: Address) -> Router {
    let gateway: Arc<dyn ChainGateway> = Arc::new(chain.gateway(signer));
    let resolver = ChainResolver::new(gateway.clone(), RetryPolicy::immediate(3), Duration::from_secs(60));
    let state = Arc::new(AppState::new(Arc::new(resolver), Some(gateway), Duration::from_secs(30)));
    ApiServer::new(ApiConfig::default(), state).app()
}

async fn post_json(app: Router, body: String) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/resolve-game")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn resolve_body(game_id: &str, did_win: bool, multiplier: f64) -> String {
    json!({
        "gameId": game_id,
        "didWin": did_win,
        "multiplier": multiplier,
        "gameType": "mines",
        "player": to_checksum(&Address::repeat_byte(PLAYER), None),
    })
    .to_string()
}

#[tokio::test]
async fn resolves_a_pending_game() {
    let chain = chain_with_game("g1");
    let app = app_signing_as(&chain, Address::repeat_byte(RESOLVER));

    let (status, body) = post_json(app, resolve_body("g1", true, 1.52)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["gameId"], "g1");
    assert_eq!(body["didWin"], true);
    assert_eq!(body["multiplierPercent"], 152);
    assert!(body["transactionHash"].as_str().unwrap().starts_with("0x"));
    assert!(body["message"].as_str().is_some());
}

#[tokio::test]
async fn second_resolution_conflicts() {
    let chain = chain_with_game("g1");
    let app = app_signing_as(&chain, Address::repeat_byte(RESOLVER));

    let (first, _) = post_json(app.clone(), resolve_body("g1", false, 1.0)).await;
    assert_eq!(first, StatusCode::OK);
    let (second, body) = post_json(app, resolve_body("g1", true, 3.0)).await;
    assert_eq!(second, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_resolved");
    assert!(chain
        .user_stats(Address::repeat_byte(PLAYER))
        .withdrawable_balance
        .is_zero());
}

#[tokio::test]
async fn missing_fields_are_named() {
    let chain = chain_with_game("g1");
    let app = app_signing_as(&chain, Address::repeat_byte(RESOLVER));

    let (status, body) = post_json(app, json!({ "gameId": "g1", "didWin": true }).to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing required fields: gameId, didWin, multiplier");
    assert!(body["requestId"].as_str().is_some());
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let chain = chain_with_game("g1");
    let app = app_signing_as(&chain, Address::repeat_byte(RESOLVER));

    let (status, body) = post_json(app, "{\"gameId\": ".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn resolver_mismatch_is_forbidden_with_both_addresses() {
    let chain = chain_with_game("g1");
    let impostor = Address::repeat_byte(0xee);
    let app = app_signing_as(&chain, impostor);

    let (status, body) = post_json(app, resolve_body("g1", true, 2.0)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "resolver_mismatch");
    assert_eq!(body["details"]["derivedAddress"], to_checksum(&impostor, None));
    assert_eq!(
        body["details"]["expectedAddress"],
        to_checksum(&Address::repeat_byte(RESOLVER), None)
    );
    assert_eq!(
        chain.game_details("g1").status,
        securegames::common::GameStatus::Pending
    );
}

#[tokio::test]
async fn unknown_game_is_unprocessable() {
    let chain = chain_with_game("g1");
    let app = app_signing_as(&chain, Address::repeat_byte(RESOLVER));

    let (status, body) = post_json(app, resolve_body("nope", true, 2.0)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "transaction_reverted");
}

#[tokio::test]
async fn request_id_is_echoed() {
    let chain = chain_with_game("g1");
    let app = app_signing_as(&chain, Address::repeat_byte(RESOLVER));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "abc-123");
}

#[tokio::test]
async fn read_endpoints() {
    let chain = chain_with_game("g1");
    let app = app_signing_as(&chain, Address::repeat_byte(RESOLVER));

    let (status, health) = get_json(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["environment"], "live");
    assert_eq!(
        health["resolverAddress"],
        to_checksum(&Address::repeat_byte(RESOLVER), None)
    );

    let (status, game) = get_json(app.clone(), "/games/g1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(game["status"], "pending");
    assert_eq!(game["gameType"], "mines");
    assert_eq!(game["amountWei"], "100000000000000000");

    let (status, _) = get_json(app.clone(), "/games/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let player = to_checksum(&Address::repeat_byte(PLAYER), None);
    let (status, stats) = get_json(app.clone(), &format!("/users/{}/stats", player)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["gamesPlayed"], 1);

    let (status, _) = get_json(app.clone(), "/users/not-an-address/stats").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, totals) = get_json(app, "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(totals["totalGames"], 1);
    assert_eq!(totals["totalUsers"], 1);
}

#[tokio::test]
async fn mock_mode_resolves_without_chain() {
    let state = Arc::new(AppState::new(
        Arc::new(MockResolver::new(Duration::ZERO)),
        None,
        Duration::from_secs(30),
    ));
    let app = ApiServer::new(ApiConfig::default(), state).app();

    let (status, body) = post_json(app.clone(), resolve_body("g9", true, 1.25)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["transactionHash"].as_str().unwrap().starts_with("mock-tx-"));

    let (status, _) = get_json(app, "/stats").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
