// SPDX-License-Identifier: MIT

//! Reconciliation sweep endpoints.
//!
//! Both endpoints are meant for a scheduler, not browsers, and require
//! the shared secret in the `x-batch-secret` header.

use crate::error::{AppError, Result};
use crate::services::batch::{CheckOptions, CheckReport, RefreshReport};
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/batch/refresh", post(batch_refresh))
        .route("/batch/check", post(batch_check))
}

fn require_batch_secret(state: &AppState, headers: &HeaderMap) -> Result<()> {
    let given = headers
        .get("x-batch-secret")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if given != state.config.batch_secret {
        tracing::warn!("Batch endpoint called without valid secret");
        return Err(AppError::AuthFailure);
    }
    Ok(())
}

/// Run the refresh sweep over all due records.
async fn batch_refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<RefreshReport>> {
    require_batch_secret(&state, &headers)?;
    let report = state.reconciliation.refresh_all().await?;
    Ok(Json(report))
}

#[derive(Deserialize)]
pub struct CheckParams {
    #[serde(default = "default_true")]
    pub details: bool,
    #[serde(default = "default_true")]
    pub artists: bool,
    #[serde(default)]
    pub force: bool,
}

fn default_true() -> bool {
    true
}

/// Run the check sweep over every stored record.
async fn batch_check(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CheckParams>,
) -> Result<Json<CheckReport>> {
    require_batch_secret(&state, &headers)?;
    let report = state
        .reconciliation
        .check_all(CheckOptions {
            details: params.details,
            artists: params.artists,
            force: params.force,
        })
        .await?;
    Ok(Json(report))
}
