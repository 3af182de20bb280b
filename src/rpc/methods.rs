//! RPC Method Implementations
//!
//! Read-only status calls over the checkpoint registry and block index.
//! Every response is plain data: integers, hex hashes and ordered lists.

use crate::checkpoints::{guess_verification_progress, sigcheck_factor, unix_now, CheckpointRegistry};
use crate::params::NetworkParams;
use crate::storage::ChainIndex;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Standard JSON-RPC 2.0 error: unknown method
pub const RPC_METHOD_NOT_FOUND: i32 = -32601;
/// Standard JSON-RPC 2.0 error: malformed params
pub const RPC_INVALID_PARAMS: i32 = -32602;
/// Invalid, missing or duplicate parameter
pub const RPC_INVALID_PARAMETER: i32 = -8;
/// Requested entry does not exist
pub const RPC_INVALID_ADDRESS_OR_KEY: i32 = -5;

/// JSON-RPC 2.0 Request
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Value>,
    pub id: Value,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub result: Option<Value>,
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

/// JSON-RPC Error
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError { code, message }),
            id,
        }
    }
}

/// RPC Handler State
pub struct RpcState {
    pub params: &'static NetworkParams,
    pub checkpoints: Arc<CheckpointRegistry>,
    pub chain: Arc<RwLock<ChainIndex>>,
}

/// Process a JSON-RPC request and return a response
pub fn handle_request(state: &RpcState, request: JsonRpcRequest) -> JsonRpcResponse {
    debug!(method = %request.method, "rpc request");

    match request.method.as_str() {
        "getblockcount" => get_block_count(state, request.id),
        "getcheckpoint" => get_checkpoint(state, request.id, request.params),
        "getcheckpoints" => get_checkpoints(state, request.id),
        "getcheckpointheights" => get_checkpoint_heights(state, request.id, request.params),
        "gettotalblocksestimate" => get_total_blocks_estimate(state, request.id),
        "getlastcheckpoint" => get_last_checkpoint(state, request.id),
        "getverificationprogress" => get_verification_progress(state, request.id, request.params),
        "getinfo" => get_info(state, request.id),
        _ => JsonRpcResponse::error(
            request.id,
            RPC_METHOD_NOT_FOUND,
            format!("Method not found: {}", request.method),
        ),
    }
}

/// First positional parameter, whether passed bare or in an array
fn first_param(params: Option<Value>) -> Option<Value> {
    match params {
        Some(Value::Array(mut arr)) if !arr.is_empty() => Some(arr.swap_remove(0)),
        Some(Value::Array(_)) | Some(Value::Null) | None => None,
        Some(other) => Some(other),
    }
}

/// Returns the height of the local tip
fn get_block_count(state: &RpcState, id: Value) -> JsonRpcResponse {
    let chain = state.chain.read();
    JsonRpcResponse::success(id, json!(chain.height()))
}

/// Parse a height from the first positional parameter
fn height_param(id: &Value, params: Option<Value>) -> Result<u32, JsonRpcResponse> {
    let value = first_param(params).ok_or_else(|| {
        JsonRpcResponse::error(id.clone(), RPC_INVALID_PARAMS, "Invalid params: expected height".into())
    })?;

    value
        .as_u64()
        .and_then(|h| u32::try_from(h).ok())
        .ok_or_else(|| {
            JsonRpcResponse::error(id.clone(), RPC_INVALID_PARAMETER, format!("Invalid height: {}", value))
        })
}

/// Returns the checkpoint hash at a height
/// Params: [height]
fn get_checkpoint(state: &RpcState, id: Value, params: Option<Value>) -> JsonRpcResponse {
    let height = match height_param(&id, params) {
        Ok(height) => height,
        Err(response) => return response,
    };

    match state.checkpoints.get(height) {
        Some(hash) => JsonRpcResponse::success(id, json!(hash.to_hex())),
        None => JsonRpcResponse::error(
            id,
            RPC_INVALID_ADDRESS_OR_KEY,
            format!("No checkpoint at height {}", height),
        ),
    }
}

/// Returns every checkpoint as `[{height, hash}]`, ascending
fn get_checkpoints(state: &RpcState, id: Value) -> JsonRpcResponse {
    // Copy out first so formatting happens without the registry lock.
    let snapshot = state.checkpoints.snapshot();

    let entries: Vec<Value> = snapshot
        .iter()
        .map(|(height, hash)| json!({ "height": height, "hash": hash.to_hex() }))
        .collect();

    JsonRpcResponse::success(id, Value::Array(entries))
}

/// Returns the checkpoint heights above a given height
/// Params: [height]
fn get_checkpoint_heights(state: &RpcState, id: Value, params: Option<Value>) -> JsonRpcResponse {
    let height = match height_param(&id, params) {
        Ok(height) => height,
        Err(response) => return response,
    };

    JsonRpcResponse::success(id, json!(state.checkpoints.checkpoint_heights_after(height)))
}

/// Returns the height of the highest checkpoint (0 when disabled)
fn get_total_blocks_estimate(state: &RpcState, id: Value) -> JsonRpcResponse {
    JsonRpcResponse::success(id, json!(state.checkpoints.total_blocks_estimate()))
}

/// Returns the highest checkpoint present in the local index, or null
fn get_last_checkpoint(state: &RpcState, id: Value) -> JsonRpcResponse {
    let chain = state.chain.read();

    let result = match state.checkpoints.last_local_checkpoint(&*chain) {
        Some(node) => json!({
            "height": node.height,
            "hash": node.hash.to_hex(),
            "time": node.time,
            "chaintx": node.chain_tx,
        }),
        None => Value::Null,
    };

    JsonRpcResponse::success(id, result)
}

/// Returns the verification progress estimate at the tip
/// Params: [sigchecks] (default true)
fn get_verification_progress(state: &RpcState, id: Value, params: Option<Value>) -> JsonRpcResponse {
    let sigchecks = match first_param(params) {
        None => true,
        Some(Value::Bool(b)) => b,
        Some(other) => {
            return JsonRpcResponse::error(
                id,
                RPC_INVALID_PARAMETER,
                format!("Invalid sigchecks flag: {}", other),
            )
        }
    };

    JsonRpcResponse::success(id, json!(tip_progress(state, sigchecks)))
}

fn tip_progress(state: &RpcState, sigchecks: bool) -> f64 {
    let chain = state.chain.read();
    guess_verification_progress(
        Some(chain.tip()),
        &state.checkpoints.baseline(),
        sigcheck_factor(sigchecks),
        unix_now(),
    )
}

/// Returns general node information
fn get_info(state: &RpcState, id: Value) -> JsonRpcResponse {
    let (blocks, tip) = {
        let chain = state.chain.read();
        (chain.height(), chain.tip().hash)
    };

    let info = json!({
        "network": state.params.network.name(),
        "blocks": blocks,
        "tip": tip.to_hex(),
        "genesis": state.params.genesis_hash.to_hex(),
        "magic": hex::encode(state.params.message_start),
        "port": state.params.default_port,
        "checkpoints_enabled": state.checkpoints.is_enabled(),
        "total_blocks_estimate": state.checkpoints.total_blocks_estimate(),
        "verification_progress": tip_progress(state, true),
        "version": env!("CARGO_PKG_VERSION"),
    });

    JsonRpcResponse::success(id, info)
}
