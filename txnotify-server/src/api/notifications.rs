use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use txnotify_core::models::NotificationTarget;
use txnotify_sdk::objects::{CreateNotification, CreateNotificationResponse};
use url::Url;

use super::ApiError;
use crate::state::AppState;

/// `POST /notifications`: watch an address or a transaction.
///
/// The identifier is tried as an address on the configured network first,
/// then as a txid. Registering the same identifier again replaces the
/// previous watch.
pub(super) async fn create_notification(
    State(state): State<AppState>,
    Json(payload): Json<CreateNotification>,
) -> Result<impl IntoResponse, ApiError> {
    let target = NotificationTarget::new(
        payload.email,
        payload.callback_url,
        payload.slack_webhook_url,
    );
    validate_target(&target)?;

    let description = payload
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let (id, kind) = state
        .registry
        .register_identifier(
            &payload.identifier,
            state.network,
            target.clone(),
            description,
            payload.confirmations,
        )
        .await?;

    if let Some(alerts) = &state.alerts {
        alerts.notify(&payload.identifier, kind, describe_target(&target));
    }

    Ok((
        StatusCode::CREATED,
        Json(CreateNotificationResponse { id, kind }),
    ))
}

fn validate_target(target: &NotificationTarget) -> Result<(), ApiError> {
    if target.is_empty() {
        return Err(ApiError::NoChannel);
    }
    if let Some(email) = &target.email {
        if !email.contains('@') {
            return Err(ApiError::InvalidEmail(email.clone()));
        }
    }
    for url in [&target.callback_url, &target.chat_webhook_url]
        .into_iter()
        .flatten()
    {
        match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => return Err(ApiError::InvalidUrl(url.clone())),
        }
    }
    Ok(())
}

/// The destination named in the operator alert.
fn describe_target(target: &NotificationTarget) -> &str {
    target
        .email
        .as_deref()
        .or(target.callback_url.as_deref())
        .or(target.chat_webhook_url.as_deref())
        .unwrap_or_default()
}
