// JSON-RPC 2.0 read surface (§4.9, §6). A hyper http1 connection loop with a
// poll-based shutdown flag, bearer-token auth, permissive CORS for local
// tooling, and the `{jsonrpc, result|error, id}` envelope with standard
// JSON-RPC error codes. This node only ever answers questions about
// already-committed state, so there is no mutating method here.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::service::service_fn;
use hyper::{body::Incoming, Request, Response};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::time::{timeout, Duration};

use crate::chain_adapter::ChainAdapter;
use crate::config::RPC_TOKEN_FILE;
use crate::crypto::hash::hash_sha3_256;
use crate::crypto::keys::decode_address_string;
use crate::store::ChainStore;

pub struct RpcState {
    pub store: ChainStore,
    pub adapter: Arc<dyn ChainAdapter>,
    pub shutdown: AtomicBool,
    pub auth_token: String,
}

async fn handle_rpc(state: &RpcState, method: &str, params: &Value) -> Result<Value, (i32, String)> {
    match method {
        "get_sync_head" => {
            let head = state
                .store
                .get_sync_head()
                .map_err(|e| (-32603, format!("store error: {e}")))?;
            Ok(json!(head))
        }

        "get_sync_progress" => {
            let head = state
                .store
                .get_sync_head()
                .map_err(|e| (-32603, format!("store error: {e}")))?;
            let tip = state
                .adapter
                .tip_height()
                .map_err(|e| (-32000, format!("chain platform unavailable: {e}")))?;
            Ok(json!({
                "sync_head": head,
                "chain_tip": tip,
                "behind": (tip as i64 - head).max(0),
            }))
        }

        "get_winners_head" | "get_latest_winners" => {
            let head = state
                .store
                .get_winners_head()
                .map_err(|e| (-32603, format!("store error: {e}")))?;
            if head < 0 {
                return Ok(json!(null));
            }
            let winners = state
                .store
                .get_winners(head as u32)
                .map_err(|e| (-32603, format!("store error: {e}")))?
                .ok_or((-32603, "winners_head points at missing record".to_string()))?;
            Ok(json!({
                "height": head,
                "winners": winners.iter().map(hex::encode).collect::<Vec<_>>(),
            }))
        }

        "get_winners" => {
            let height = params
                .get(0)
                .and_then(|v| v.as_u64())
                .ok_or((-32602, "height required".to_string()))? as u32;
            let winners = state
                .store
                .get_winners(height)
                .map_err(|e| (-32603, format!("store error: {e}")))?;
            match winners {
                Some(w) => Ok(json!(w.iter().map(hex::encode).collect::<Vec<_>>())),
                None => Err((-32602, "no winners recorded at that height".to_string())),
            }
        }

        "get_rates" => {
            let height = params
                .get(0)
                .and_then(|v| v.as_u64())
                .ok_or((-32602, "height required".to_string()))? as u32;
            let rates = state
                .store
                .get_rates(height)
                .map_err(|e| (-32603, format!("store error: {e}")))?;
            match rates {
                Some(r) => {
                    let textual: serde_json::Map<String, Value> = r
                        .iter()
                        .map(|(a, v)| (a.ticker().to_string(), json!(v)))
                        .collect();
                    Ok(Value::Object(textual))
                }
                None => Err((-32602, "no rates recorded at that height".to_string())),
            }
        }

        "get_balances" => {
            let addr_str = params
                .get(0)
                .and_then(|v| v.as_str())
                .ok_or((-32602, "address required".to_string()))?;
            let address =
                decode_address_string(addr_str).map_err(|_| (-32602, "invalid address".to_string()))?;
            let balances = state
                .store
                .get_balances(&address)
                .map_err(|e| (-32603, format!("store error: {e}")))?;
            let mut textual: serde_json::Map<String, Value> = balances
                .iter()
                .map(|(a, v)| (a.ticker().to_string(), json!(v)))
                .collect();

            let native_fct = state
                .adapter
                .factoid_balance(addr_str)
                .map_err(|e| (-32000, format!("chain platform unavailable: {e}")))?;
            textual.insert("native_fct".to_string(), json!(native_fct));

            Ok(Value::Object(textual))
        }

        "stop" => {
            state.shutdown.store(true, Ordering::SeqCst);
            Ok(json!("stopping"))
        }

        _ => Err((-32601, format!("method not found: {method}"))),
    }
}

async fn handle_request(
    state: Arc<RpcState>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    if req.method() == hyper::Method::OPTIONS {
        let builder = Response::builder()
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", "POST, OPTIONS")
            .header("Access-Control-Allow-Headers", "Content-Type, Authorization");
        return Ok(builder.body(Full::new(Bytes::new())).unwrap());
    }

    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");
    if !auth_header.starts_with("Bearer ") || auth_header[7..] != state.auth_token {
        let builder = Response::builder()
            .status(hyper::StatusCode::UNAUTHORIZED)
            .header("Access-Control-Allow-Origin", "*");
        return Ok(builder.body(Full::new(Bytes::from("Unauthorized"))).unwrap());
    }

    let body = match req.collect().await {
        Ok(b) => b.to_bytes(),
        Err(_) => {
            let mut res = Response::new(Full::new(Bytes::from("Bad Request")));
            *res.status_mut() = hyper::StatusCode::BAD_REQUEST;
            return Ok(res);
        }
    };

    let resp = match serde_json::from_slice::<Value>(&body) {
        Ok(v) => {
            let id = v.get("id").cloned().unwrap_or(json!(null));
            if !v.is_object() || v.get("method").is_none() {
                json!({
                    "jsonrpc": "2.0",
                    "error": {"code": -32600, "message": "Invalid Request"},
                    "id": id
                })
            } else {
                let method = v["method"].as_str().unwrap_or("");
                let params = v.get("params").cloned().unwrap_or(json!([]));
                match handle_rpc(&state, method, &params).await {
                    Ok(result) => json!({ "jsonrpc": "2.0", "result": result, "id": id }),
                    Err((code, message)) => json!({
                        "jsonrpc": "2.0",
                        "error": {"code": code, "message": message},
                        "id": id
                    }),
                }
            }
        }
        Err(e) => json!({
            "jsonrpc": "2.0",
            "error": {"code": -32700, "message": format!("parse error: {e}")},
            "id": null,
        }),
    };

    let body_bytes = serde_json::to_vec(&resp).unwrap();
    let builder = Response::builder()
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization");

    Ok(builder.body(Full::new(Bytes::from(body_bytes))).unwrap())
}

pub async fn start_rpc_server(
    state: Arc<RpcState>,
    bind: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "RPC server listening");

    loop {
        if state.shutdown.load(Ordering::SeqCst) {
            break;
        }
        let (stream, _) = match timeout(Duration::from_millis(250), listener.accept()).await {
            Ok(Ok(pair)) => pair,
            _ => continue,
        };
        let s = state.clone();
        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let s2 = s.clone();
                async move { handle_request(s2, req).await }
            });
            let _ = hyper::server::conn::http1::Builder::new()
                .serve_connection(TokioIo::new(stream), svc)
                .await;
        });
    }
    Ok(())
}

/// Loads the bearer token from disk, generating and persisting a new
/// high-entropy one on first run.
pub fn load_or_generate_rpc_token(data_dir: &std::path::Path) -> std::io::Result<String> {
    let token_path = data_dir.join(RPC_TOKEN_FILE);

    if let Ok(token) = std::fs::read_to_string(&token_path) {
        let token = token.trim();
        if token.len() >= 32 {
            return Ok(token.to_string());
        }
    }

    std::fs::create_dir_all(data_dir)?;
    let random_bytes: Vec<u8> = (0..32).map(|_| rand::random::<u8>()).collect();
    let token = hex::encode(hash_sha3_256(&random_bytes));
    std::fs::write(&token_path, &token)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&token_path)?.permissions();
        perms.set_mode(0o600);
        std::fs::set_permissions(&token_path, perms)?;
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Asset;
    use crate::chain_adapter::mock::MockChainAdapter;
    use rocksdb::WriteBatch;
    use std::collections::BTreeMap;

    fn tmp_state() -> RpcState {
        let p = std::env::temp_dir().join(format!("pegnode_rpc_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&p);
        let store = ChainStore::open(&p).unwrap();
        RpcState {
            store,
            adapter: Arc::new(MockChainAdapter::default()),
            shutdown: AtomicBool::new(false),
            auth_token: "test-token".to_string(),
        }
    }

    #[tokio::test]
    async fn get_sync_head_defaults_to_negative_one() {
        let state = tmp_state();
        let result = handle_rpc(&state, "get_sync_head", &json!([])).await.unwrap();
        assert_eq!(result, json!(-1));
    }

    #[tokio::test]
    async fn get_balances_reports_zero_native_fct_for_unknown_address() {
        let state = tmp_state();
        let address = crate::crypto::keys::encode_address_string(&[1u8; 32]);
        let result = handle_rpc(&state, "get_balances", &json!([address])).await.unwrap();
        assert_eq!(result, json!({"native_fct": 0}));
    }

    #[tokio::test]
    async fn get_balances_merges_adapter_native_fct_with_stored_balances() {
        let p = std::env::temp_dir().join(format!("pegnode_rpc_merge_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&p);
        let store = ChainStore::open(&p).unwrap();

        let address = [2u8; 32];
        let addr_str = crate::crypto::keys::encode_address_string(&address);
        let mut deltas = BTreeMap::new();
        deltas.insert(Asset::Fct, 750);
        let mut batch = WriteBatch::default();
        store.stage_balance_deltas(&mut batch, &address, &deltas).unwrap();
        store.write_batch(batch).unwrap();

        let mock = MockChainAdapter::default();
        mock.factoid_balances.lock().unwrap().insert(addr_str.clone(), 1_234_000);
        let state = RpcState {
            store,
            adapter: Arc::new(mock),
            shutdown: AtomicBool::new(false),
            auth_token: "test-token".to_string(),
        };

        let result = handle_rpc(&state, "get_balances", &json!([addr_str])).await.unwrap();
        assert_eq!(result["FCT"], json!(750));
        assert_eq!(result["native_fct"], json!(1_234_000));
    }

    #[tokio::test]
    async fn get_rates_for_missing_height_is_an_error() {
        let state = tmp_state();
        let err = handle_rpc(&state, "get_rates", &json!([1])).await.unwrap_err();
        assert_eq!(err.0, -32602);
    }

    #[tokio::test]
    async fn get_winners_head_resolves_after_a_grading_write() {
        let state = tmp_state();
        let winners = std::array::from_fn(|i| [i as u8; 32]);
        let mut rates = BTreeMap::new();
        rates.insert(Asset::Pnt, 1.0);
        let mut batch = WriteBatch::default();
        state.store.stage_grading_result(&mut batch, 10, &winners, &rates);
        state.store.write_batch(batch).unwrap();

        let result = handle_rpc(&state, "get_winners_head", &json!([])).await.unwrap();
        assert_eq!(result["height"], json!(10));
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let state = tmp_state();
        let err = handle_rpc(&state, "nope", &json!([])).await.unwrap_err();
        assert_eq!(err.0, -32601);
    }
}
