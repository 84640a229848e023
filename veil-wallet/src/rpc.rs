//! Network client
//!
//! The wallet needs two things from a node: the output behind a payment id,
//! and acceptance of a signed transaction. [`RpcClient`] asks a list of nodes
//! over JSON-RPC 2.0, starting with the last node that answered.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use veil_transaction_core::{Transaction, Vout};

use crate::config::WalletConfig;
use crate::error::{Result, WalletError};

/// JSON-RPC request ID counter
static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Node acknowledgement of a submitted transaction.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BroadcastAck {
    pub tx_hash: String,
}

/// What the wallet needs from the network.
#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// The output published under `payment_id`.
    async fn get_output(&self, payment_id: &str) -> Result<Vout>;

    /// Submit a signed transaction.
    async fn broadcast(&self, tx: &Transaction) -> Result<BroadcastAck>;
}

/// JSON-RPC 2.0 request
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

/// JSON-RPC error
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

/// Single node endpoint
#[derive(Debug)]
struct NodeEndpoint {
    url: String,
    client: reqwest::Client,
}

impl NodeEndpoint {
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<(T, u128)> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: REQUEST_ID.fetch_add(1, Ordering::SeqCst),
        };

        let start = Instant::now();
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| WalletError::Network(e.to_string()))?;
        let latency = start.elapsed().as_millis();

        if !response.status().is_success() {
            return Err(WalletError::Network(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let body: JsonRpcResponse<T> = response
            .json()
            .await
            .map_err(|e| WalletError::Network(e.to_string()))?;

        if let Some(error) = body.error {
            return Err(WalletError::Network(format!(
                "RPC error {}: {}",
                error.code, error.message
            )));
        }

        body.result
            .ok_or_else(|| WalletError::Network("Missing result in RPC response".into()))
            .map(|r| (r, latency))
    }
}

/// JSON-RPC client with failover across the configured nodes.
#[derive(Debug)]
pub struct RpcClient {
    nodes: Vec<NodeEndpoint>,
    /// Index of the node tried first
    primary: AtomicUsize,
}

impl RpcClient {
    /// A client for `config.nodes` with `config.rpc_timeout_secs`.
    pub fn new(config: &WalletConfig) -> Result<Self> {
        Self::with_nodes(
            &config.nodes,
            Duration::from_secs(config.rpc_timeout_secs),
        )
    }

    pub fn with_nodes(urls: &[String], timeout: Duration) -> Result<Self> {
        if urls.is_empty() {
            return Err(WalletError::Network("No nodes configured".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WalletError::Network(format!("Failed to create HTTP client: {e}")))?;

        let nodes = urls
            .iter()
            .map(|url| NodeEndpoint {
                url: url.clone(),
                client: client.clone(),
            })
            .collect();

        Ok(Self {
            nodes,
            primary: AtomicUsize::new(0),
        })
    }

    /// URL of the node that will be tried first.
    pub fn primary_url(&self) -> &str {
        &self.nodes[self.primary.load(Ordering::Relaxed) % self.nodes.len()].url
    }

    /// Execute an RPC call with automatic failover
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let primary = self.primary.load(Ordering::Relaxed) % self.nodes.len();
        let mut last_error = None;

        for offset in 0..self.nodes.len() {
            let index = (primary + offset) % self.nodes.len();
            let node = &self.nodes[index];
            match node.call::<T>(method, params.clone()).await {
                Ok((result, latency)) => {
                    debug!(node = %node.url, method, latency_ms = latency as u64, "rpc ok");
                    if index != primary {
                        // Promote this node to primary
                        self.primary.store(index, Ordering::Relaxed);
                    }
                    return Ok(result);
                }
                Err(e) => {
                    if offset == 0 {
                        warn!("Primary node {} failed: {}", node.url, e);
                    } else {
                        debug!("Node {} failed: {}", node.url, e);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(WalletError::Network(msg)) => {
                WalletError::Network(format!("All nodes failed, last error: {msg}"))
            }
            Some(other) => other,
            None => WalletError::Network("All nodes failed".into()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct OutputResult {
    vout: Vout,
}

#[async_trait]
impl NetworkClient for RpcClient {
    async fn get_output(&self, payment_id: &str) -> Result<Vout> {
        let result: OutputResult = self
            .call("wallet_getOutput", json!({ "payment_id": payment_id }))
            .await?;
        Ok(result.vout)
    }

    async fn broadcast(&self, tx: &Transaction) -> Result<BroadcastAck> {
        let tx_hex = hex::encode(tx.to_wire_bytes()?);
        self.call("tx_submit", json!({ "tx_hex": tx_hex })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Read one HTTP request and return its body.
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
        let length: usize = headers
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .map(|v| v.trim().parse().unwrap())
            .unwrap_or(0);
        while buf.len() < header_end + length {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before body");
            buf.extend_from_slice(&chunk[..n]);
        }
        String::from_utf8(buf[header_end..header_end + length].to_vec()).unwrap()
    }

    /// A node that answers every request with `result` and records the
    /// request bodies.
    async fn mock_node(result: Value) -> (String, Arc<Mutex<Vec<Value>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        tokio::spawn(async move {
            loop {
                let (mut stream, _) = listener.accept().await.unwrap();
                let body = read_request(&mut stream).await;
                let request: Value = serde_json::from_str(&body).unwrap();
                let reply = json!({
                    "jsonrpc": "2.0",
                    "result": result,
                    "id": request["id"],
                })
                .to_string();
                log.lock().unwrap().push(request);
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    reply.len(),
                    reply
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.ok();
            }
        });
        (url, seen)
    }

    async fn dead_node() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        url
    }

    #[tokio::test]
    async fn test_get_output() {
        let vout = Vout {
            amount: 7,
            script: "lock".into(),
            ..Default::default()
        };
        let (url, seen) = mock_node(json!({ "vout": vout })).await;
        let client = RpcClient::with_nodes(&[url], Duration::from_secs(5)).unwrap();

        assert_eq!(client.get_output("abcd").await.unwrap(), vout);
        let requests = seen.lock().unwrap();
        assert_eq!(requests[0]["method"], "wallet_getOutput");
        assert_eq!(requests[0]["params"]["payment_id"], "abcd");
        assert_eq!(requests[0]["jsonrpc"], "2.0");
    }

    #[tokio::test]
    async fn test_failover_promotes_responsive_node() {
        let dead = dead_node().await;
        let (live, seen) = mock_node(json!({ "tx_hash": "ff00" })).await;
        let client =
            RpcClient::with_nodes(&[dead.clone(), live.clone()], Duration::from_secs(5)).unwrap();
        assert_eq!(client.primary_url(), dead);

        let ack: BroadcastAck = client
            .call("tx_submit", json!({ "tx_hex": "00" }))
            .await
            .unwrap();
        assert_eq!(ack.tx_hash, "ff00");
        assert_eq!(client.primary_url(), live);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_all_nodes_down() {
        let client =
            RpcClient::with_nodes(&[dead_node().await, dead_node().await], Duration::from_secs(5))
                .unwrap();
        let err = client.get_output("abcd").await.unwrap_err();
        assert!(matches!(err, WalletError::Network(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_no_nodes_rejected() {
        assert!(RpcClient::with_nodes(&[], Duration::from_secs(1)).is_err());
    }
}
