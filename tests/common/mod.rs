#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use fareport_server::config::Config;
use fareport_server::gateway::MockGateway;
use fareport_server::models::{ModerationStatus, Role, Ticket, TransportMode, User};
use fareport_server::store::{MarketStore, MemStore};

pub fn test_config() -> Config {
    Config {
        database_url: String::new(),
        port: 0,
        gateway_base_url: "https://gateway.invalid".to_string(),
        gateway_secret_key: None,
        public_base_url: "https://app.invalid".to_string(),
        currency: "usd".to_string(),
        cors_allowed_origins: vec!["http://localhost:3000".to_string()],
        production: false,
    }
}

pub fn make_user(role: Role) -> User {
    let now = Utc::now();
    let id = Uuid::new_v4();
    User {
        id,
        name: format!("user-{id}"),
        email: format!("{id}@example.test"),
        role,
        fraudulent: false,
        api_token: format!("fp_test_{id}"),
        created_at: now,
        updated_at: now,
    }
}

pub fn make_ticket(vendor: &User, price_cents: i64, quantity: i32) -> Ticket {
    let now = Utc::now();
    Ticket {
        id: Uuid::new_v4(),
        vendor_id: vendor.id,
        vendor_name: vendor.name.clone(),
        vendor_email: vendor.email.clone(),
        origin: "Leeds".to_string(),
        destination: "Manchester".to_string(),
        mode: TransportMode::Bus,
        price: Decimal::new(price_cents, 2),
        available_quantity: quantity,
        status: ModerationStatus::Approved,
        advertised: false,
        created_at: now,
        updated_at: now,
    }
}

/// Store pre-seeded with a buyer, a vendor and one approved listing.
pub async fn seeded_store(
    price_cents: i64,
    quantity: i32,
) -> (Arc<MemStore>, Arc<MockGateway>, User, User, Ticket) {
    let store = Arc::new(MemStore::new());
    let gateway = Arc::new(MockGateway::new());

    let buyer = make_user(Role::Buyer);
    let vendor = make_user(Role::Vendor);
    store.insert_user(&buyer).await.unwrap();
    store.insert_user(&vendor).await.unwrap();

    let ticket = make_ticket(&vendor, price_cents, quantity);
    store.insert_ticket(&ticket).await.unwrap();

    (store, gateway, buyer, vendor, ticket)
}
