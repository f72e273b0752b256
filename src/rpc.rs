// src/rpc.rs
use alloy::primitives::Address;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::ledger::BalanceLookupError;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RpcResponse<T> {
    Success { result: T },
    Error { error: RpcError },
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Read-only `eth_call` against the latest block, returning the raw return data
pub async fn eth_call(
    client: &Client,
    rpc_url: &str,
    to: Address,
    data: &[u8],
) -> Result<Vec<u8>, BalanceLookupError> {
    let payload = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "eth_call",
        "params": [
            {
                "to": to.to_string(),
                "data": format!("0x{}", hex::encode(data)),
            },
            "latest"
        ]
    });

    debug!("📡 Sending eth_call → {} (to {})", rpc_url, to);

    let resp = client.post(rpc_url).json(&payload).send().await?;
    if !resp.status().is_success() {
        return Err(BalanceLookupError::Status(resp.status()));
    }
    let text = resp.text().await?;
    debug!("📩 Raw eth_call response: {}", text);

    let parsed: RpcResponse<String> = serde_json::from_str(&text)
        .map_err(|e| BalanceLookupError::Malformed(e.to_string()))?;

    match parsed {
        RpcResponse::Success { result } => hex::decode(result.trim_start_matches("0x"))
            .map_err(|e| BalanceLookupError::Malformed(e.to_string())),
        RpcResponse::Error { error } => Err(BalanceLookupError::Rpc {
            code: error.code,
            message: error.message,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use serde_json::Value;

    async fn spawn_node(reply: Value) -> String {
        let app = Router::new().route(
            "/",
            post(move |Json(req): Json<Value>| {
                let reply = reply.clone();
                async move {
                    assert_eq!(req["method"], "eth_call");
                    assert_eq!(req["params"][1], "latest");
                    Json(reply)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn returns_decoded_result_bytes() {
        let url = spawn_node(json!({"jsonrpc": "2.0", "id": 1, "result": "0x00ff"})).await;

        let data = eth_call(&Client::new(), &url, Address::ZERO, &[0x70, 0xa0])
            .await
            .unwrap();
        assert_eq!(data, vec![0x00, 0xff]);
    }

    #[tokio::test]
    async fn node_error_becomes_rpc_error() {
        let url = spawn_node(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": 3, "message": "execution reverted"}
        }))
        .await;

        let err = eth_call(&Client::new(), &url, Address::ZERO, &[])
            .await
            .unwrap_err();
        match err {
            BalanceLookupError::Rpc { code, message } => {
                assert_eq!(code, 3);
                assert_eq!(message, "execution reverted");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_node_is_transport_error() {
        // bind then drop so the port is closed
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = eth_call(&Client::new(), &format!("http://{}/", addr), Address::ZERO, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, BalanceLookupError::Transport(_)));
    }
}
