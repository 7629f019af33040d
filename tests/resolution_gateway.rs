//! ResolutionGateway against a live resolver over TCP

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use securegames::api::{ApiServer, AppState};
use securegames::config::ApiConfig;
use securegames::errors::{ErrorCategory, ResolutionError};
use securegames::resolution::{OutcomeReport, Resolution, ResolutionGateway};
use securegames::resolver::MockResolver;
use securegames::retry::RetryPolicy;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn report(game_id: &str) -> OutcomeReport {
    OutcomeReport {
        game_id: game_id.to_string(),
        did_win: true,
        multiplier: 1.52,
        game_type: "mines".to_string(),
        player: "0x3333333333333333333333333333333333333333".to_string(),
    }
}

#[tokio::test]
async fn settles_through_the_mock_resolver() {
    let state = Arc::new(AppState::new(
        Arc::new(MockResolver::new(Duration::ZERO)),
        None,
        Duration::from_secs(30),
    ));
    let addr = serve(ApiServer::new(ApiConfig::default(), state).app()).await;
    let gateway = ResolutionGateway::new(&format!("http://{}", addr))
        .unwrap()
        .with_retry_policy(RetryPolicy::immediate(1));

    let receipt = gateway.resolve_game(&report("g1")).await.unwrap();
    assert_eq!(receipt.game_id, "g1");
    assert!(receipt.did_win);
    assert_eq!(receipt.multiplier_percent, 152);
    assert!(receipt.transaction_hash.starts_with("mock-tx-"));

    match gateway.resolve_game(&report("g1")).await.unwrap_err() {
        ResolutionError::Service { status, .. } => assert_eq!(status, 409),
        other => panic!("expected a 409, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_fields_surface_the_server_message() {
    let state = Arc::new(AppState::new(
        Arc::new(MockResolver::new(Duration::ZERO)),
        None,
        Duration::from_secs(30),
    ));
    let addr = serve(ApiServer::new(ApiConfig::default(), state).app()).await;
    let gateway = ResolutionGateway::new(&format!("http://{}", addr)).unwrap();

    let mut bad = report("g2");
    bad.game_id = String::new();
    match gateway.resolve_game(&bad).await.unwrap_err() {
        ResolutionError::Service { status, message, .. } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Missing required fields: gameId, didWin, multiplier");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn plain_text_gateway_error_is_retried_then_reported() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/api/resolve-game",
            post(|State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                (StatusCode::BAD_GATEWAY, "upstream node unreachable")
            }),
        )
        .with_state(hits.clone());
    let addr = serve(app).await;

    let gateway = ResolutionGateway::new(&format!("http://{}/api", addr))
        .unwrap()
        .with_retry_policy(RetryPolicy::immediate(3));
    assert_eq!(gateway.endpoint().path(), "/api/resolve-game");

    match gateway.resolve_game(&report("g3")).await.unwrap_err() {
        ResolutionError::Service { status, message, .. } => {
            assert_eq!(status, 502);
            assert_eq!(message, "upstream node unreachable");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn empty_error_body_gets_a_status_message() {
    let app = Router::new().route(
        "/resolve-game",
        post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let addr = serve(app).await;
    let gateway = ResolutionGateway::new(&format!("http://{}", addr))
        .unwrap()
        .with_retry_policy(RetryPolicy::immediate(3));

    let err = gateway.resolve_game(&report("g4")).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Transient);
    match err {
        ResolutionError::Service { status, message, .. } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Failed to resolve game (Status: 500)");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn minimal_success_body_is_a_receipt() {
    let app = Router::new().route(
        "/resolve-game",
        post(|| async {
            Json(json!({
                "success": true,
                "transactionHash": "0xabc",
                "gameId": "g1",
                "didWin": true,
                "multiplier": 1.5,
            }))
        }),
    );
    let addr = serve(app).await;
    let gateway = ResolutionGateway::new(&format!("http://{}", addr)).unwrap();

    let receipt = gateway.resolve_game(&report("g1")).await.unwrap();
    assert_eq!(receipt.transaction_hash, "0xabc");
    assert_eq!(receipt.game_id, "g1");
    assert!(receipt.did_win);
    assert_eq!(receipt.multiplier, 1.5);
    assert_eq!(receipt.multiplier_percent, 150);
}

#[tokio::test]
async fn unreadable_success_body_is_transient() {
    let app = Router::new().route("/resolve-game", post(|| async { "ok" }));
    let addr = serve(app).await;
    let gateway = ResolutionGateway::new(&format!("http://{}", addr)).unwrap();

    let err = gateway.resolve_game(&report("g6")).await.unwrap_err();
    assert!(matches!(err, ResolutionError::Service { status: 200, .. }));
    assert_eq!(err.category(), ErrorCategory::Transient);
}

#[tokio::test]
async fn configuration_error_code_is_an_operator_problem() {
    let app = Router::new().route(
        "/resolve-game",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "configuration_error", "message": "Resolver configuration error" })),
            )
        }),
    );
    let addr = serve(app).await;
    let gateway = ResolutionGateway::new(&format!("http://{}", addr))
        .unwrap()
        .with_retry_policy(RetryPolicy::immediate(1));

    let err = gateway.resolve_game(&report("g7")).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert_eq!(err.to_string(), "Resolver configuration error");
}

#[tokio::test]
async fn refused_connection_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway = ResolutionGateway::new(&format!("http://{}", addr))
        .unwrap()
        .with_retry_policy(RetryPolicy::immediate(2));
    assert!(matches!(
        gateway.resolve_game(&report("g5")).await.unwrap_err(),
        ResolutionError::Network(_)
    ));
}
