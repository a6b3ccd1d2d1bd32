use axum::routing::{delete, get, post, put};
use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use crate::auth::{authenticate, require_admin, require_vendor};
use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{self, admin, auth, bookings, payments, tickets};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/auth/register", post(auth::register))
        .route("/tickets", get(tickets::browse))
        .route("/tickets/advertised", get(tickets::advertised))
        .route("/tickets/:id", get(tickets::get_ticket))
        .route("/payment/webhook", post(payments::webhook));

    let authed = Router::new()
        .route("/auth/me", get(auth::me))
        .route(
            "/bookings",
            post(bookings::create_booking).get(bookings::my_bookings),
        )
        .route("/payment/create-session", post(payments::create_session))
        .route("/payment/verify", post(payments::verify))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    let vendor = Router::new()
        .route(
            "/vendor/tickets",
            post(tickets::create_listing).get(tickets::my_listings),
        )
        .route(
            "/vendor/tickets/:id",
            put(tickets::update_listing).delete(tickets::delete_listing),
        )
        .route("/vendor/bookings", get(bookings::vendor_bookings))
        .route("/vendor/bookings/:id/accept", post(bookings::accept_booking))
        .route("/vendor/bookings/:id/reject", post(bookings::reject_booking))
        // Guards run outside-in: authenticate first, then the role check.
        .route_layer(middleware::from_fn(require_vendor))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    let admin_routes = Router::new()
        .route("/admin/tickets", get(admin::list_tickets))
        .route("/admin/tickets/:id", delete(admin::delete_ticket))
        .route("/admin/tickets/:id/approve", post(admin::approve_ticket))
        .route("/admin/tickets/:id/reject", post(admin::reject_ticket))
        .route("/admin/tickets/:id/advertise", post(admin::set_advertised))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/:id/fraudulent", post(admin::mark_fraudulent))
        .route("/admin/transactions", get(admin::list_transactions))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .merge(public)
        .merge(authed)
        .merge(vendor)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(&state.config))
        .layer(create_cors_layer(&state.config))
        .with_state(state)
}
