//! REST endpoint handlers organized by resource.

pub mod events;
pub mod pay;
pub mod payment_configs;
pub mod settings;
pub mod system;
pub mod webhooks;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(pay::routes())
        .merge(webhooks::routes())
        .merge(events::routes())
        .merge(payment_configs::routes())
        .merge(settings::routes())
}
