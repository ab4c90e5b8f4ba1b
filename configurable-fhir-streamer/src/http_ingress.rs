/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! HTTP ingress adapter: `POST /idaas/{endpoint}` hands the request body to the router.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use fhir_streamer::{InboundMessage, IngestError, IngestionRouter};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};

pub fn ingress_routes(router: Arc<IngestionRouter>) -> Router {
    Router::new()
        .route("/idaas/:endpoint", post(ingest))
        .route("/health", get(health))
        .with_state(router)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn ingest(
    State(router): State<Arc<IngestionRouter>>,
    Path(endpoint): Path<String>,
    body: Bytes,
) -> Response {
    match router
        .ingest(&endpoint, InboundMessage::from_bytes(body))
        .await
    {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(err) => IngestRejection(err).into_response(),
    }
}

struct IngestRejection(IngestError);

impl IntoResponse for IngestRejection {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            IngestError::UnknownRouteKind(_) => StatusCode::NOT_FOUND,
            IngestError::IncompleteContext(_) => StatusCode::UNPROCESSABLE_ENTITY,
            IngestError::PublishFailure(_) => StatusCode::BAD_GATEWAY,
        };
        if status.is_server_error() {
            error!(err = %self.0, "ingestion failed on the main path");
        } else {
            warn!(err = %self.0, "ingestion rejected");
        }

        let body = Json(json!({
            "error": self.0.to_string(),
            "state": self.0.state(),
        }));
        (status, body).into_response()
    }
}
