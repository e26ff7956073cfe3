//! HTTP server for probes, metrics and Application admission.
//!
//! Routes:
//! - `GET /healthz`, `GET /readyz`: liveness and readiness probes
//! - `GET /metrics`: Prometheus text exposition
//! - `POST /validate-application`: validating admission webhook
//!
//! TLS for the webhook is expected to be terminated in front of this server.

use crate::error::ControllerError;
use crate::metrics::Metrics;
use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use crds::Application;
use image_reference::is_valid_image_reference;
use kube::api::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// State shared by the HTTP handlers
#[derive(Clone)]
pub struct ServerState {
    metrics: Metrics,
}

impl ServerState {
    pub fn new(metrics: Metrics) -> Self {
        Self { metrics }
    }
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(|| async { "ok" }))
        .route("/metrics", get(metrics_handler))
        .route("/validate-application", post(validate_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the router on `addr` until the task is dropped.
pub async fn serve(addr: SocketAddr, state: ServerState) -> Result<(), ControllerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ControllerError::Server(format!("failed to bind {}: {}", addr, e)))?;

    info!("HTTP server listening on {}", addr);
    axum::serve(listener, router(state))
        .await
        .map_err(|e| ControllerError::Server(e.to_string()))
}

async fn metrics_handler(State(state): State<ServerState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn validate_handler(
    Json(body): Json<AdmissionReview<DynamicObject>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let request: AdmissionRequest<DynamicObject> = match body.try_into() {
        Ok(request) => request,
        Err(e) => {
            error!("Failed to parse admission request: {}", e);
            return Json(AdmissionResponse::invalid(e.to_string()).into_review());
        }
    };

    Json(validate_application(&request).into_review())
}

/// Admit an Application only when its `spec.image` is a valid image reference.
///
/// Requests without an object (deletes) are allowed.
pub fn validate_application(request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
    let response = AdmissionResponse::from(request);

    let Some(object) = &request.object else {
        debug!("Admission request {} has no object, allowing", request.uid);
        return response;
    };

    let app: Application = match serde_json::to_value(object).and_then(serde_json::from_value) {
        Ok(app) => app,
        Err(e) => {
            warn!("Admission request {} is not a valid Application: {}", request.uid, e);
            return response.deny(format!("invalid Application: {}", e));
        }
    };

    if is_valid_image_reference(&app.spec.image) {
        debug!(
            "Admitted Application {}/{} with image {}",
            request.namespace.as_deref().unwrap_or("<none>"),
            request.name,
            app.spec.image
        );
        response
    } else {
        warn!(
            "Denied Application {}/{}: invalid image {:?}",
            request.namespace.as_deref().unwrap_or("<none>"),
            request.name,
            app.spec.image
        );
        response.deny(format!(
            "spec.image {:?} is not a valid image reference",
            app.spec.image
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::util::ServiceExt;

    fn review(operation: &str, object: Option<Value>) -> Value {
        let mut request = json!({
            "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
            "kind": {"group": "dcops.microscaler.io", "version": "v1alpha1", "kind": "Application"},
            "resource": {"group": "dcops.microscaler.io", "version": "v1alpha1", "resource": "applications"},
            "name": "web",
            "namespace": "default",
            "operation": operation,
            "userInfo": {"username": "admin"},
            "dryRun": false
        });
        if let Some(object) = object {
            request["object"] = object;
        }
        json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": request
        })
    }

    fn application(image: &str) -> Value {
        json!({
            "apiVersion": "dcops.microscaler.io/v1alpha1",
            "kind": "Application",
            "metadata": {"name": "web", "namespace": "default"},
            "spec": {"enabled": true, "image": image}
        })
    }

    fn request_from(review: Value) -> AdmissionRequest<DynamicObject> {
        let review: AdmissionReview<DynamicObject> = serde_json::from_value(review).unwrap();
        review.try_into().unwrap()
    }

    fn test_router() -> Router {
        router(ServerState::new(Metrics::new().unwrap()))
    }

    #[test]
    fn test_valid_image_is_allowed() {
        let response = validate_application(&request_from(review(
            "CREATE",
            Some(application("registry.example.com/app:1.0")),
        )));
        assert!(response.allowed);
    }

    #[test]
    fn test_invalid_image_is_denied() {
        let response = validate_application(&request_from(review(
            "UPDATE",
            Some(application("not a valid ref!!")),
        )));
        assert!(!response.allowed);

        let rendered = serde_json::to_string(&response.into_review()).unwrap();
        assert!(rendered.contains("is not a valid image reference"));
    }

    #[test]
    fn test_missing_image_is_denied() {
        let mut object = application("nginx");
        object["spec"] = json!({"enabled": true});

        let response = validate_application(&request_from(review("CREATE", Some(object))));
        assert!(!response.allowed);
    }

    #[test]
    fn test_request_without_object_is_allowed() {
        let response = validate_application(&request_from(review("DELETE", None)));
        assert!(response.allowed);
    }

    #[tokio::test]
    async fn test_validate_endpoint_round_trip() {
        let body = review("CREATE", Some(application("app:v1:v2")));
        let res = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/validate-application")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let review: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(review["response"]["uid"], "705ab4f5-6393-11e8-b7cc-42010a800002");
        assert_eq!(review["response"]["allowed"], false);
    }

    #[tokio::test]
    async fn test_probe_endpoints() {
        for uri in ["/healthz", "/readyz"] {
            let res = test_router()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK, "{} should be healthy", uri);
        }
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let res = test_router()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("application_reconcile_errors_total"));
    }
}
