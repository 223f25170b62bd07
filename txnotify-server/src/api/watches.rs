use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use bitcoin::Txid;
use std::str::FromStr;
use txnotify_core::models::{AddressWatch, TxWatch};
use txnotify_core::registry::parse_address;
use txnotify_sdk::objects::{AddressWatchView, TxWatchView};

use super::ApiError;
use crate::state::AppState;

fn address_view(watch: AddressWatch) -> AddressWatchView {
    AddressWatchView {
        id: watch.id,
        address: watch.address.to_string(),
        want_confirmations: watch.want_confirmations,
        description: watch.description,
    }
}

fn tx_view(watch: TxWatch) -> TxWatchView {
    TxWatchView {
        id: watch.id,
        txid: watch.txid.to_string(),
        want_confirmations: watch.want_confirmations,
        confirmed_at_block: watch.confirmed_at_height,
        description: watch.description,
    }
}

/// `GET /watches/addresses/{address}`: current watch on an address.
pub(super) async fn get_address_watch(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let parsed = parse_address(&address, state.network)
        .ok_or(ApiError::InvalidIdentifier(address))?;
    let watch = state
        .registry
        .lookup_address(&parsed)
        .await
        .ok_or(ApiError::NotFound)?;
    Ok(Json(address_view(watch)))
}

/// `GET /watches/transactions/{txid}`: current watch on a transaction.
///
/// Transactions stop being watched once their notification fires.
pub(super) async fn get_transaction_watch(
    State(state): State<AppState>,
    Path(txid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let parsed = Txid::from_str(&txid).map_err(|_| ApiError::InvalidIdentifier(txid))?;
    let watch = state
        .registry
        .lookup_transaction(&parsed)
        .await
        .ok_or(ApiError::NotFound)?;
    Ok(Json(tx_view(watch)))
}
