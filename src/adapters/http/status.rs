//! HTTP status surface.
//!
//! Two small JSON endpoints the hosting service scrapes: whether this node
//! is the task orchestrator, and the hibernation phase in flight.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::domain::models::config::HttpConfig;
use crate::services::admission::Orchestrator;

#[derive(Debug, Serialize)]
struct OrchestratorStatusResponse {
    orchestrator: bool,
    status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HibernationStatusResponse {
    hibernation_plan_phase: bool,
    hibernation_task_type: String,
}

/// Build the status router.
pub fn router(orchestrator: Arc<Orchestrator>, enable_cors: bool) -> Router {
    let mut router = Router::new()
        .route("/api/orchestratorStatus", get(orchestrator_status))
        .route("/api/hibernationStatus", get(hibernation_status))
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator);

    if enable_cors {
        router = router.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any));
    }
    router
}

/// Bind and serve the status endpoints until the process exits.
pub async fn serve(config: &HttpConfig, orchestrator: Arc<Orchestrator>) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "status server listening");
    axum::serve(listener, router(orchestrator, config.enable_cors)).await?;
    Ok(())
}

async fn orchestrator_status(
    State(orchestrator): State<Arc<Orchestrator>>,
) -> Json<OrchestratorStatusResponse> {
    Json(OrchestratorStatusResponse {
        orchestrator: orchestrator.is_task_orchestrator(),
        status: "ok",
    })
}

async fn hibernation_status(
    State(orchestrator): State<Arc<Orchestrator>>,
) -> Json<HibernationStatusResponse> {
    let (hibernation_plan_phase, hibernation_task_type) = orchestrator.hibernation_status().await;
    Json(HibernationStatusResponse {
        hibernation_plan_phase,
        hibernation_task_type,
    })
}
