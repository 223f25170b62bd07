//! REST API handlers.
//!
//! # Endpoints
//!
//! - `POST /notifications`                 – watch an address or a transaction
//! - `GET  /watches/addresses/{address}`   – current watch on an address
//! - `GET  /watches/transactions/{txid}`   – current watch on a transaction

use axum::{
    Json, Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use txnotify_core::RegistrationError;

use crate::state::AppState;

mod notifications;
mod watches;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications", post(notifications::create_notification))
        .route(
            "/watches/addresses/{address}",
            get(watches::get_address_watch),
        )
        .route(
            "/watches/transactions/{txid}",
            get(watches::get_transaction_watch),
        )
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

/// Errors that can occur in API handlers.
#[derive(Debug)]
enum ApiError {
    /// The identifier is neither an address on this network nor a txid.
    InvalidIdentifier(String),
    /// No delivery channel was given.
    NoChannel,
    /// A webhook URL could not be parsed.
    InvalidUrl(String),
    /// The email address is obviously malformed.
    InvalidEmail(String),
    /// Nothing is watched under this identifier.
    NotFound,
}

impl From<RegistrationError> for ApiError {
    fn from(e: RegistrationError) -> Self {
        match e {
            RegistrationError::InvalidIdentifier(identifier) => {
                ApiError::InvalidIdentifier(identifier)
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::InvalidIdentifier(identifier) => (
                StatusCode::BAD_REQUEST,
                format!("identifier was neither a bitcoin address nor a bitcoin txid: {identifier}"),
            ),
            ApiError::NoChannel => (
                StatusCode::BAD_REQUEST,
                "at least one of email, callback_url or slack_webhook_url is required".to_string(),
            ),
            ApiError::InvalidUrl(url) => (StatusCode::BAD_REQUEST, format!("invalid URL: {url}")),
            ApiError::InvalidEmail(email) => {
                (StatusCode::BAD_REQUEST, format!("invalid email: {email}"))
            }
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not watched".to_string()),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use crate::server::build_router;
    use crate::state::AppState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use bitcoin::hashes::Hash;
    use bitcoin::{Address, Network, PubkeyHash};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use txnotify_core::WatchRegistry;

    const TXID_HEX: &str = "f4184fc596403b9d638783cf57adfe4c75c605f6356fbc91338530e9831e9e16";

    fn regtest_address() -> String {
        Address::p2pkh(PubkeyHash::from_byte_array([7; 20]), Network::Regtest).to_string()
    }

    fn app(registry: &WatchRegistry) -> axum::Router {
        build_router(AppState::new(registry.clone(), Network::Regtest, None))
    }

    async fn send(router: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(app(&WatchRegistry::new()), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_register_address_then_lookup() {
        let registry = WatchRegistry::new();
        let address = regtest_address();

        let (status, body) = send(
            app(&registry),
            post_json(
                "/notifications",
                json!({
                    "identifier": address,
                    "email": "user@example.com",
                    "description": "tips",
                    "confirmations": 3
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["kind"], "address");

        let (status, view) = send(
            app(&registry),
            get(&format!("/watches/addresses/{address}")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["id"], body["id"]);
        assert_eq!(view["want_confirmations"], 3);
        assert_eq!(view["description"], "tips");
    }

    #[tokio::test]
    async fn test_register_transaction_then_lookup() {
        let registry = WatchRegistry::new();
        let (status, body) = send(
            app(&registry),
            post_json(
                "/notifications",
                json!({
                    "identifier": TXID_HEX,
                    "callback_url": "https://example.com/hook",
                    "confirmations": 1
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["kind"], "transaction");

        let (status, view) = send(
            app(&registry),
            get(&format!("/watches/transactions/{TXID_HEX}")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["txid"], TXID_HEX);
        assert_eq!(view["confirmed_at_block"], Value::Null);
    }

    #[tokio::test]
    async fn test_invalid_identifier_rejected() {
        let registry = WatchRegistry::new();
        let (status, body) = send(
            app(&registry),
            post_json(
                "/notifications",
                json!({ "identifier": "nonsense", "email": "user@example.com" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("nonsense"));
        assert_eq!(registry.transaction_count().await, 0);
        assert_eq!(registry.address_count().await, 0);
    }

    #[tokio::test]
    async fn test_registration_requires_a_channel() {
        let registry = WatchRegistry::new();
        let (status, _) = send(
            app(&registry),
            post_json(
                "/notifications",
                json!({ "identifier": TXID_HEX, "email": "   " }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(registry.transaction_count().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_callback_url_rejected() {
        let registry = WatchRegistry::new();
        let (status, _) = send(
            app(&registry),
            post_json(
                "/notifications",
                json!({ "identifier": TXID_HEX, "callback_url": "not a url" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_lookup_errors() {
        let registry = WatchRegistry::new();
        let (status, _) = send(app(&registry), get("/watches/transactions/xyz")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            app(&registry),
            get(&format!("/watches/transactions/{TXID_HEX}")),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            app(&registry),
            get(&format!("/watches/addresses/{}", regtest_address())),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
