mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{make_ticket, make_user, test_config};
use fareport_server::gateway::{MockGateway, PaymentStatus};
use fareport_server::models::{BookingStatus, Role};
use fareport_server::routes::create_routes;
use fareport_server::state::AppState;
use fareport_server::store::{MarketStore, MemStore};

fn test_app() -> (Router, Arc<MemStore>, Arc<MockGateway>) {
    let store = Arc::new(MemStore::new());
    let gateway = Arc::new(MockGateway::new());
    let state = AppState::new(
        Arc::clone(&store) as Arc<dyn MarketStore>,
        Arc::clone(&gateway) as _,
        test_config(),
    );
    (create_routes(state), store, gateway)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _store, _gateway) = test_app();
    let (status, body) = send(
        &app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["status"], json!("ok"));
}

#[tokio::test]
async fn registration_conflicts_on_duplicate_email() {
    let (app, _store, _gateway) = test_app();

    let payload = json!({ "name": "Ada", "email": "ada@example.test", "role": "buyer" });
    let (status, body) = send(&app, post_json("/auth/register", None, payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["data"]["token"].as_str().is_some());

    let (status, body) = send(&app, post_json("/auth/register", None, payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["code"], json!("CONFLICT"));
}

#[tokio::test]
async fn bookings_require_a_bearer_token() {
    let (app, _store, _gateway) = test_app();

    let (status, body) = send(
        &app,
        post_json(
            "/bookings",
            None,
            json!({ "ticketId": uuid::Uuid::new_v4(), "quantity": 1 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], json!("AUTH_ERROR"));
}

#[tokio::test]
async fn booking_an_unknown_ticket_is_404() {
    let (app, store, _gateway) = test_app();
    let buyer = make_user(Role::Buyer);
    store.insert_user(&buyer).await.unwrap();

    let (status, body) = send(
        &app,
        post_json(
            "/bookings",
            Some(&buyer.api_token),
            json!({ "ticketId": uuid::Uuid::new_v4(), "quantity": 1 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("NOT_FOUND"));
}

#[tokio::test]
async fn booking_and_settlement_over_http() {
    let (app, store, gateway) = test_app();

    let buyer = make_user(Role::Buyer);
    let vendor = make_user(Role::Vendor);
    store.insert_user(&buyer).await.unwrap();
    store.insert_user(&vendor).await.unwrap();
    let ticket = make_ticket(&vendor, 1250, 5);
    store.insert_ticket(&ticket).await.unwrap();

    // Buyer books two seats.
    let (status, body) = send(
        &app,
        post_json(
            "/bookings",
            Some(&buyer.api_token),
            json!({ "ticketId": ticket.id, "quantity": 2 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let booking_id: uuid::Uuid =
        serde_json::from_value(body["data"]["id"].clone()).unwrap();
    assert_eq!(body["data"]["total_price"], json!("25.00"));

    // Vendor accepts.
    let (status, _) = send(
        &app,
        post_json(
            &format!("/vendor/bookings/{booking_id}/accept"),
            Some(&vendor.api_token),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Buyer opens a checkout session; the gateway then reports it paid.
    let (status, body) = send(
        &app,
        post_json(
            "/payment/create-session",
            Some(&buyer.api_token),
            json!({ "bookingId": booking_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let session_id = body["data"]["sessionId"].as_str().unwrap().to_string();
    assert!(gateway.set_payment_status(&session_id, PaymentStatus::Completed));

    // Settlement succeeds and is idempotent across a retry.
    for _ in 0..2 {
        let (status, body) = send(
            &app,
            post_json(
                "/payment/verify",
                Some(&buyer.api_token),
                json!({ "sessionId": session_id }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], json!("paid"));
    }

    let stored = store.booking_by_id(booking_id).await.unwrap().unwrap();
    assert_eq!(stored.status, BookingStatus::Paid);
    let stored_ticket = store.ticket_by_id(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored_ticket.available_quantity, 3);
}

#[tokio::test]
async fn settlement_conflict_maps_to_409() {
    let (app, store, gateway) = test_app();

    let buyer = make_user(Role::Buyer);
    let vendor = make_user(Role::Vendor);
    store.insert_user(&buyer).await.unwrap();
    store.insert_user(&vendor).await.unwrap();
    let ticket = make_ticket(&vendor, 1000, 1);
    store.insert_ticket(&ticket).await.unwrap();

    let mut sessions = Vec::new();
    for _ in 0..2 {
        let (status, body) = send(
            &app,
            post_json(
                "/bookings",
                Some(&buyer.api_token),
                json!({ "ticketId": ticket.id, "quantity": 1 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let booking_id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            post_json(
                &format!("/vendor/bookings/{booking_id}/accept"),
                Some(&vendor.api_token),
                json!({}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            post_json(
                "/payment/create-session",
                Some(&buyer.api_token),
                json!({ "bookingId": booking_id }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let session_id = body["data"]["sessionId"].as_str().unwrap().to_string();
        assert!(gateway.set_payment_status(&session_id, PaymentStatus::Completed));
        sessions.push(session_id);
    }

    let (status, _) = send(
        &app,
        post_json(
            "/payment/verify",
            Some(&buyer.api_token),
            json!({ "sessionId": sessions[0] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        post_json(
            "/payment/verify",
            Some(&buyer.api_token),
            json!({ "sessionId": sessions[1] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], json!("INVENTORY_CONFLICT"));
}

#[tokio::test]
async fn webhook_settles_without_authentication() {
    let (app, store, gateway) = test_app();

    let buyer = make_user(Role::Buyer);
    let vendor = make_user(Role::Vendor);
    store.insert_user(&buyer).await.unwrap();
    store.insert_user(&vendor).await.unwrap();
    let ticket = make_ticket(&vendor, 1000, 2);
    store.insert_ticket(&ticket).await.unwrap();

    let (_, body) = send(
        &app,
        post_json(
            "/bookings",
            Some(&buyer.api_token),
            json!({ "ticketId": ticket.id, "quantity": 1 }),
        ),
    )
    .await;
    let booking_id = body["data"]["id"].as_str().unwrap().to_string();
    send(
        &app,
        post_json(
            &format!("/vendor/bookings/{booking_id}/accept"),
            Some(&vendor.api_token),
            json!({}),
        ),
    )
    .await;
    let (_, body) = send(
        &app,
        post_json(
            "/payment/create-session",
            Some(&buyer.api_token),
            json!({ "bookingId": booking_id }),
        ),
    )
    .await;
    let session_id = body["data"]["sessionId"].as_str().unwrap().to_string();
    assert!(gateway.set_payment_status(&session_id, PaymentStatus::Completed));

    // Unrelated event types are acknowledged and ignored.
    let (status, _) = send(
        &app,
        post_json(
            "/payment/webhook",
            None,
            json!({ "type": "checkout.session.expired", "sessionId": session_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        post_json(
            "/payment/webhook",
            None,
            json!({ "type": "checkout.session.completed", "sessionId": session_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("paid"));
}

#[tokio::test]
async fn vendor_routes_reject_buyers() {
    let (app, store, _gateway) = test_app();
    let buyer = make_user(Role::Buyer);
    store.insert_user(&buyer).await.unwrap();

    let (status, body) = send(
        &app,
        post_json(
            "/vendor/tickets",
            Some(&buyer.api_token),
            json!({
                "origin": "Leeds",
                "destination": "York",
                "mode": "train",
                "price": "9.50",
                "quantity": 10
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], json!("FORBIDDEN"));
}

#[tokio::test]
async fn browse_only_shows_approved_listings() {
    let (app, store, _gateway) = test_app();
    let vendor = make_user(Role::Vendor);
    store.insert_user(&vendor).await.unwrap();

    let approved = make_ticket(&vendor, 1000, 5);
    store.insert_ticket(&approved).await.unwrap();
    let mut pending = make_ticket(&vendor, 1000, 5);
    pending.status = fareport_server::models::ModerationStatus::Pending;
    store.insert_ticket(&pending).await.unwrap();

    let (status, body) = send(
        &app,
        Request::builder()
            .uri("/tickets")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let listings = body["data"].as_array().unwrap();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0]["id"], json!(approved.id));
}
