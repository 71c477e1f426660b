use std::sync::Arc;

use ai_llm_service::HealthStatus;
use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{core::app_state::AppState, error_handler::AppResult};

/// Query string for /health_check.
#[derive(Debug, Default, Deserialize)]
pub struct HealthCheckQuery {
    /// Probe Qdrant and the LLM endpoints instead of reporting load state.
    #[serde(default)]
    pub deep: bool,
}

/// Health of one pipeline component.
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub ok: bool,
    pub detail: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub probes: Vec<HealthStatus>,
}

impl ComponentHealth {
    fn loaded() -> Self {
        Self {
            ok: true,
            detail: "loaded".into(),
            probes: Vec::new(),
        }
    }
}

/// Response payload for /health_check.
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    /// `"healthy"` or `"unhealthy"`.
    pub status: &'static str,
    pub retriever: ComponentHealth,
    pub generator: ComponentHealth,
}

pub async fn health_check_route(
    State(state): State<Arc<AppState>>,
    query: Result<Query<HealthCheckQuery>, QueryRejection>,
) -> AppResult<(StatusCode, Json<HealthCheckResponse>)> {
    let Query(q) = query?;

    if !q.deep {
        return Ok((
            StatusCode::OK,
            Json(HealthCheckResponse {
                status: "healthy",
                retriever: ComponentHealth::loaded(),
                generator: ComponentHealth::loaded(),
            }),
        ));
    }

    let (retriever, probes) = tokio::join!(
        state.chat.retriever.health(),
        state.chat.generator.health()
    );

    let retriever = match retriever {
        Ok(()) => ComponentHealth {
            ok: true,
            detail: "reachable".into(),
            probes: Vec::new(),
        },
        Err(err) => {
            warn!(error = %err, "health_check_route: retriever probe failed");
            ComponentHealth {
                ok: false,
                detail: err.to_string(),
                probes: Vec::new(),
            }
        }
    };

    let failed = probes.iter().filter(|p| !p.ok).count();
    let generator = ComponentHealth {
        ok: failed == 0,
        detail: if failed == 0 {
            "reachable".into()
        } else {
            format!("{failed} of {} probes failed", probes.len())
        },
        probes,
    };

    let healthy = retriever.ok && generator.ok;
    debug!(healthy, "health_check_route: deep probe done");

    let (code, status) = if healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    Ok((
        code,
        Json(HealthCheckResponse {
            status,
            retriever,
            generator,
        }),
    ))
}
