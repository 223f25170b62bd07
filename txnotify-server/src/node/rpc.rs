//! Minimal bitcoind JSON-RPC client.

use crate::config::runtime::NodeConfig;
use async_trait::async_trait;
use bitcoin::BlockHash;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use txnotify_core::node::{BlockHeightSource, NodeError};
use url::Url;

/// bitcoind answers RPC_INVALID_ADDRESS_OR_KEY for unknown blocks.
const RPC_INVALID_ADDRESS_OR_KEY: i64 = -5;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'a str,
    params: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Verbose `getblockheader` result; only the fields used here.
#[derive(Debug, Deserialize)]
pub struct BlockHeaderInfo {
    pub height: u64,
    /// `-1` when the block is not on the active chain.
    pub confirmations: i64,
}

/// Client for the bitcoind RPC interface.
#[derive(Clone)]
pub struct BitcoindRpc {
    http_client: reqwest::Client,
    url: Url,
    user: String,
    password: String,
}

impl BitcoindRpc {
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            url: config.rpc_url.clone(),
            user: config.rpc_user.clone(),
            password: config.rpc_password.clone(),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, NodeError> {
        let request = RpcRequest {
            jsonrpc: "1.0",
            id: "txnotify",
            method,
            params,
        };

        let response = self
            .http_client
            .post(self.url.clone())
            .basic_auth(&self.user, Some(&self.password))
            .json(&request)
            .send()
            .await?;

        // Bad credentials get an empty 401; other RPC errors keep a JSON body
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(NodeError::Unauthorized);
        }
        let response: RpcResponse<T> = response.json().await?;

        decode_response(response)
    }

    pub async fn get_block_header(&self, hash: &BlockHash) -> Result<BlockHeaderInfo, NodeError> {
        self.call("getblockheader", vec![Value::String(hash.to_string()), Value::Bool(true)])
            .await
            .map_err(|e| match e {
                NodeError::Rpc { code, .. } if code == RPC_INVALID_ADDRESS_OR_KEY => {
                    NodeError::BlockNotFound(*hash)
                }
                other => other,
            })
    }

    pub async fn get_block_count(&self) -> Result<u64, NodeError> {
        self.call("getblockcount", vec![]).await
    }

    /// Poll `getblockcount` until the node answers, returning its height.
    ///
    /// Gives up after `attempts` tries spaced `delay` apart, or at once when
    /// the credentials are rejected.
    pub async fn wait_until_ready(&self, attempts: u32, delay: Duration) -> Result<u64, NodeError> {
        let mut attempt = 1;
        loop {
            match self.get_block_count().await {
                Ok(height) => return Ok(height),
                Err(NodeError::Unauthorized) => return Err(NodeError::Unauthorized),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        url = %self.url,
                        attempt,
                        error = %e,
                        "bitcoind not reachable yet, retrying"
                    );
                }
            }
            attempt += 1;
            tokio::time::sleep(delay).await;
        }
    }
}

fn decode_response<T>(response: RpcResponse<T>) -> Result<T, NodeError> {
    if let Some(error) = response.error {
        return Err(NodeError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    response
        .result
        .ok_or_else(|| NodeError::Malformed("response has neither result nor error".to_string()))
}

#[async_trait]
impl BlockHeightSource for BitcoindRpc {
    async fn block_height(&self, hash: &BlockHash) -> Result<u64, NodeError> {
        let header = self.get_block_header(hash).await?;
        if header.confirmations < 0 {
            tracing::warn!(%hash, height = header.height, "Block is not on the active chain");
        }
        Ok(header.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::post;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Serve `router` on a random local port and return a client pointed at it.
    async fn rpc_against(router: Router) -> BitcoindRpc {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        BitcoindRpc::new(&NodeConfig {
            network: bitcoin::Network::Regtest,
            rpc_url: format!("http://{addr}/").parse().unwrap(),
            rpc_user: "user".to_string(),
            rpc_password: "pass".to_string(),
            zmq_raw_block: "tcp://127.0.0.1:28332".to_string(),
            zmq_raw_tx: "tcp://127.0.0.1:28333".to_string(),
        })
    }

    #[tokio::test]
    async fn test_unauthorized_gives_up_at_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let router = Router::new().route(
            "/",
            post(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { StatusCode::UNAUTHORIZED }
            }),
        );
        let rpc = rpc_against(router).await;

        let err = rpc
            .wait_until_ready(10, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Unauthorized));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_until_node_answers() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let router = Router::new().route(
            "/",
            post(move || {
                let call = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call < 2 {
                        (StatusCode::SERVICE_UNAVAILABLE, String::new())
                    } else {
                        (
                            StatusCode::OK,
                            r#"{"result":812,"error":null,"id":"txnotify"}"#.to_string(),
                        )
                    }
                }
            }),
        );
        let rpc = rpc_against(router).await;

        let height = rpc
            .wait_until_ready(10, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(height, 812);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let router = Router::new().route(
            "/",
            post(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { (StatusCode::SERVICE_UNAVAILABLE, String::new()) }
            }),
        );
        let rpc = rpc_against(router).await;

        assert!(rpc.wait_until_ready(3, Duration::from_millis(10)).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_request_shape() {
        let request = RpcRequest {
            jsonrpc: "1.0",
            id: "txnotify",
            method: "getblockheader",
            params: vec![Value::String("00ab".to_string()), Value::Bool(true)],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["method"], "getblockheader");
        assert_eq!(value["params"][1], true);
    }

    #[test]
    fn test_decode_block_header() {
        let body = r#"{
            "result": {
                "hash": "0f9188f13cb7b2c71f2a335e3a4fc328bf5beb436012afca590b1a11466e2206",
                "confirmations": 3,
                "height": 120,
                "version": 536870912
            },
            "error": null,
            "id": "txnotify"
        }"#;
        let response: RpcResponse<BlockHeaderInfo> = serde_json::from_str(body).unwrap();
        let header = decode_response(response).unwrap();
        assert_eq!(header.height, 120);
        assert_eq!(header.confirmations, 3);
    }

    #[test]
    fn test_decode_rpc_error() {
        let body = r#"{"result":null,"error":{"code":-5,"message":"Block not found"},"id":"txnotify"}"#;
        let response: RpcResponse<BlockHeaderInfo> = serde_json::from_str(body).unwrap();
        let err = decode_response(response).unwrap_err();
        assert!(matches!(err, NodeError::Rpc { code: -5, .. }));
    }
}
