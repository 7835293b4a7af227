use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, patch, post, put},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::domain::Capability;
use crate::services::{AuthService, RequisitionService, SupplyInventory};
use crate::state::SharedState;

pub mod auth;
mod error;
mod extract;
mod items;
mod maintenance;
mod observability;
mod printers;
mod reports;
mod requisitions;
mod system;
mod types;
mod units;
mod users;
mod validation;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn requisition_service(&self) -> &Arc<dyn RequisitionService> {
        &self.shared.requisition_service
    }

    #[must_use]
    pub fn supply_inventory(&self) -> &Arc<dyn SupplyInventory> {
        &self.shared.supply_inventory
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().read().await.server.cors_allowed_origins.clone();

    let protected_routes = create_protected_router(state.clone());

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/auth/login", post(auth::login))
        .route("/health", get(system::health))
        .with_state(state);

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
}

/// Routes whose every method needs the same capability.
fn gated(capability: Capability, routes: Router<Arc<AppState>>) -> Router<Arc<AppState>> {
    routes.route_layer(middleware::from_fn_with_state(
        capability,
        auth::require_capability,
    ))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let user_admin = gated(
        Capability::ManageUsers,
        Router::new()
            .route("/users", post(users::create_user))
            .route("/users/reset-password", put(users::reset_password))
            .route(
                "/users/{id}",
                put(users::update_user).delete(users::delete_user),
            ),
    );

    let units = gated(
        Capability::ManageUnits,
        Router::new()
            .route("/units", get(units::list_units).post(units::create_unit))
            .route(
                "/units/{id}",
                get(units::get_unit)
                    .put(units::update_unit)
                    .delete(units::delete_unit),
            ),
    );

    let fulfilment = gated(
        Capability::FulfilRequisitions,
        Router::new()
            .route(
                "/requisitions/{id}/status",
                patch(requisitions::update_requisition_status),
            )
            .route(
                "/requisitions/items/{id}/status",
                patch(requisitions::update_line_status),
            ),
    );

    let maintenance_service = gated(
        Capability::ServiceMaintenance,
        Router::new()
            .route(
                "/maintenance/{id}/status",
                patch(maintenance::update_ticket_status),
            )
            .route("/maintenance/{id}/start", patch(maintenance::start_ticket))
            .route("/maintenance/{id}/finish", patch(maintenance::finish_ticket)),
    );

    let global_stats = gated(
        Capability::ViewGlobalStats,
        Router::new()
            .route("/reports/global-stats", get(reports::global_stats))
            .route("/metrics", get(observability::get_metrics)),
    );

    let technician_reports = gated(
        Capability::ViewTechnicianReports,
        Router::new().route(
            "/reports/technician-detail",
            get(reports::technician_detail),
        ),
    );

    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/change-password", put(auth::change_password))
        .route("/items", get(items::list_items).post(items::create_item))
        .route(
            "/items/{id}",
            get(items::get_item)
                .put(items::update_item)
                .delete(items::delete_item),
        )
        .route("/users", get(users::list_users))
        .route(
            "/requisitions",
            get(requisitions::list_requisitions).post(requisitions::create_requisition),
        )
        .route(
            "/requisitions/latest",
            get(requisitions::latest_requisitions),
        )
        .route("/requisitions/{id}", get(requisitions::get_requisition))
        .route(
            "/reports/requisitions-by-technician",
            get(reports::requisitions_by_technician),
        )
        .route("/reports/top-items", get(reports::top_items))
        .route(
            "/maintenance",
            get(maintenance::list_tickets).post(maintenance::create_ticket),
        )
        .route(
            "/printers/printers",
            get(printers::list_printers).post(printers::create_printer),
        )
        .route(
            "/printers/printers/{id}",
            put(printers::update_printer).delete(printers::delete_printer),
        )
        .route(
            "/printers/supplies",
            get(printers::list_consumptions).post(printers::consume_supplies),
        )
        .route(
            "/printers/stock",
            get(printers::get_stock).put(printers::restock),
        )
        .route(
            "/printers/services",
            get(printers::list_services).post(printers::create_service),
        )
        .merge(user_admin)
        .merge(units)
        .merge(fulfilment)
        .merge(maintenance_service)
        .merge(global_stats)
        .merge(technician_reports)
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
