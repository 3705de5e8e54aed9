//! # HTTP API
//!
//! The axum router in front of the token. Every handler shares [`AppState`]
//! through the `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                | Description                            |
//! |--------|---------------------|----------------------------------------|
//! | GET    | `/health`           | Liveness probe                         |
//! | GET    | `/status`           | Node status summary                    |
//! | GET    | `/token`            | Token metadata and supply              |
//! | GET    | `/balances/:owner`  | Balance of a hex-encoded account       |
//! | POST   | `/transfer`         | Transfer on behalf of the caller       |
//! | POST   | `/mint`             | Mint (kernel identity only)            |
//! | POST   | `/call`             | Raw selector + bincode arguments (hex) |
//!
//! ## Caller Identity
//!
//! The caller is taken from the `x-koin-caller` header (hex account key).
//! A caller equal to the configured kernel identity runs with kernel
//! privilege and keeps authority over its own account. Requests without the
//! header are anonymous and can only query.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response as HttpResponse},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use koin_contracts::dispatch::{self, MintArgs, TransferArgs};
use koin_contracts::{DispatchError, EntryPoint, Request, Response, Token};
use koin_protocol::storage::KoinDB;
use koin_protocol::{AccountKey, StaticHost, Timestamp};

use crate::metrics::{CallOutcome, SharedMetrics};

/// Header carrying the hex-encoded caller identity.
pub const CALLER_HEADER: &str = "x-koin-caller";

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub version: String,
    /// The token. Every call takes this lock, so ledger operations run one
    /// at a time.
    pub token: Arc<Mutex<Token<KoinDB>>>,
    /// Handle to the token's database, for flushing after mutations.
    pub db: KoinDB,
    /// Identity that runs with kernel privilege, if any.
    pub kernel: Option<AccountKey>,
    pub metrics: SharedMetrics,
}

impl AppState {
    /// Build the host for one request: wall-clock time plus the header identity.
    fn host_for(&self, headers: &HeaderMap) -> Result<StaticHost, ApiError> {
        let now = now_millis();
        let Some(raw) = headers.get(CALLER_HEADER) else {
            return Ok(StaticHost::anonymous(now));
        };

        let raw = raw
            .to_str()
            .map_err(|_| ApiError::BadRequest(format!("{CALLER_HEADER} is not valid ASCII")))?;
        let caller: AccountKey = raw
            .parse()
            .map_err(|e| ApiError::BadRequest(format!("{CALLER_HEADER}: {e}")))?;

        if self.kernel.as_ref() == Some(&caller) {
            Ok(StaticHost::kernel_as(caller, now))
        } else {
            Ok(StaticHost::user(caller, now))
        }
    }

    /// Execute one request under the token lock, recording metrics and
    /// flushing the database after a successful mutation.
    fn dispatch(&self, host: &StaticHost, request: Request) -> Result<Response, ApiError> {
        let entry = request.entry_point();
        let started = Instant::now();

        let result = {
            let token = self.token.lock();
            dispatch::execute(&*token, host, request).and_then(|response| {
                if applied_mutation(&response) {
                    let supply = token.total_supply()?;
                    self.metrics.set_total_supply(supply);
                }
                Ok(response)
            })
        };
        self.metrics
            .call_latency_seconds
            .observe(started.elapsed().as_secs_f64());

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.metrics.record_call(entry.as_str(), CallOutcome::Error);
                return Err(e.into());
            }
        };

        let outcome = match response {
            Response::Transfer(false) | Response::Mint(false) => CallOutcome::Rejected,
            _ => CallOutcome::Ok,
        };
        self.metrics.record_call(entry.as_str(), outcome);

        if applied_mutation(&response) {
            self.db.flush().map_err(|e| {
                tracing::error!(entry_point = %entry, error = %e, "flush after mutation failed");
                ApiError::Internal(format!("flush failed: {e}"))
            })?;
        }
        Ok(response)
    }
}

fn applied_mutation(response: &Response) -> bool {
    response.entry_point().is_mutating()
        && matches!(response, Response::Transfer(true) | Response::Mint(true))
}

/// Current Unix time in milliseconds. Pre-epoch clocks read as zero.
pub fn now_millis() -> Timestamp {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Build the API router with CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/token", get(token_handler))
        .route("/balances/:owner", get(balance_handler))
        .route("/transfer", post(transfer_handler))
        .route("/mint", post(mint_handler))
        .route("/call", post(call_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub protocol_version: String,
    pub symbol: String,
    pub total_supply: u64,
    /// Records in the token's space, the supply record included.
    pub stored_objects: usize,
    /// ISO-8601 time of the response.
    pub timestamp: String,
}

/// Body of `GET /token`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    pub total_supply: u64,
    pub regen_window_ms: u64,
}

/// Body of `GET /balances/:owner`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub owner: String,
    pub balance: u64,
}

/// Body of `POST /transfer`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    pub value: u64,
}

/// Body of `POST /mint`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MintRequest {
    pub to: String,
    pub value: u64,
}

/// Result of a mutating call. `false` means the ledger rejected it and
/// nothing changed.
#[derive(Debug, Serialize, Deserialize)]
pub struct MutationResponse {
    pub success: bool,
}

/// Body of `POST /call`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CallRequest {
    pub selector: u32,
    /// Hex-encoded bincode arguments. Empty for argument-less entry points.
    #[serde(default)]
    pub args: String,
}

/// Result of `POST /call`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CallResponse {
    pub entry_point: String,
    /// Hex-encoded bincode result, as returned by the contract entry.
    pub result: String,
    /// The same result, decoded.
    pub decoded: Response,
}

/// Error body returned by every endpoint on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::UnknownEntryPoint(_) => ApiError::NotFound(e.to_string()),
            DispatchError::InvalidArguments(_) => ApiError::BadRequest(e.to_string()),
            DispatchError::ResultTooLarge { .. }
            | DispatchError::Encoding(_)
            | DispatchError::Query(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> HttpResponse {
        let (status, error) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

fn parse_key(field: &str, raw: &str) -> Result<AccountKey, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("{field}: {e}")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`. Does not touch the ledger; that is what `/status` is for.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`
async fn status_handler(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let token = state.token.lock();
    let total_supply = token
        .total_supply()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let stored_objects = state
        .db
        .object_count(token.records().space())
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(StatusResponse {
        version: state.version.clone(),
        protocol_version: koin_protocol::config::PROTOCOL_VERSION.to_string(),
        symbol: token.symbol().to_string(),
        total_supply,
        stored_objects,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

/// `GET /token`
async fn token_handler(State(state): State<AppState>) -> Result<Json<TokenInfo>, ApiError> {
    let token = state.token.lock();
    let total_supply = token
        .total_supply()
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(TokenInfo {
        name: token.name().to_string(),
        symbol: token.symbol().to_string(),
        decimals: token.decimals(),
        total_supply,
        regen_window_ms: token.config().regen_window_ms,
    }))
}

/// `GET /balances/:owner`. Unknown accounts report zero.
async fn balance_handler(
    Path(owner): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let key = parse_key("owner", &owner)?;
    let balance = state
        .token
        .lock()
        .balance_of(&key)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(BalanceResponse {
        owner: key.to_hex(),
        balance,
    }))
}

/// `POST /transfer`. Succeeds only if the caller header names `from`.
async fn transfer_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<TransferRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    let host = state.host_for(&headers)?;
    let request = Request::Transfer(TransferArgs {
        from: parse_key("from", &body.from)?,
        to: parse_key("to", &body.to)?,
        value: body.value,
    });

    let response = state.dispatch(&host, request)?;
    Ok(Json(MutationResponse {
        success: matches!(response, Response::Transfer(true)),
    }))
}

/// `POST /mint`
async fn mint_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<MintRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    let host = state.host_for(&headers)?;
    let request = Request::Mint(MintArgs {
        to: parse_key("to", &body.to)?,
        value: body.value,
    });

    let response = state.dispatch(&host, request)?;
    Ok(Json(MutationResponse {
        success: matches!(response, Response::Mint(true)),
    }))
}

/// `POST /call`. The raw contract entry: selector plus encoded arguments.
async fn call_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CallRequest>,
) -> Result<Json<CallResponse>, ApiError> {
    let host = state.host_for(&headers)?;
    let raw = body.args.strip_prefix("0x").unwrap_or(&body.args);
    let args = hex::decode(raw)
        .map_err(|e| ApiError::BadRequest(format!("args: {e}")))?;

    let entry = EntryPoint::try_from(body.selector)?;
    let request = Request::decode(entry.selector(), &args)?;
    let decoded = state.dispatch(&host, request)?;
    let result = decoded.encode()?;

    Ok(Json(CallResponse {
        entry_point: entry.to_string(),
        result: hex::encode(result),
        decoded,
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use http_body_util::BodyExt;
    use koin_protocol::config::TokenConfig;
    use tower::ServiceExt;

    const KERNEL: &str = "6b65726e656c"; // "kernel"
    const ALICE: &str = "616c696365"; // "alice"
    const BOB: &str = "626f62"; // "bob"

    fn test_app_state() -> AppState {
        let db = KoinDB::open_temporary().expect("temp db");
        let token = Token::new(db.clone(), TokenConfig::default());
        AppState {
            version: "0.1.0-test".into(),
            token: Arc::new(Mutex::new(token)),
            db,
            kernel: Some(KERNEL.parse().unwrap()),
            metrics: Arc::new(crate::metrics::NodeMetrics::new().unwrap()),
        }
    }

    async fn send(router: &Router, req: HttpRequest<Body>) -> (StatusCode, Vec<u8>) {
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = HttpRequest::builder().uri(path).body(Body::empty()).unwrap();
        send(router, req).await
    }

    async fn post_json(
        router: &Router,
        path: &str,
        caller: Option<&str>,
        body: serde_json::Value,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = HttpRequest::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json");
        if let Some(caller) = caller {
            builder = builder.header(CALLER_HEADER, caller);
        }
        let req = builder
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        send(router, req).await
    }

    async fn mint(router: &Router, to: &str, value: u64) -> bool {
        let (status, body) = post_json(
            router,
            "/mint",
            Some(KERNEL),
            serde_json::json!({ "to": to, "value": value }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice::<MutationResponse>(&body).unwrap().success
    }

    async fn balance(router: &Router, owner: &str) -> u64 {
        let (status, body) = get(router, &format!("/balances/{owner}")).await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice::<BalanceResponse>(&body).unwrap().balance
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn token_endpoint_reports_metadata() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/token").await;

        assert_eq!(status, StatusCode::OK);
        let info: TokenInfo = serde_json::from_slice(&body).unwrap();
        assert_eq!(info.name, koin_protocol::config::TOKEN_NAME);
        assert_eq!(info.symbol, koin_protocol::config::TOKEN_SYMBOL);
        assert_eq!(info.decimals, koin_protocol::config::TOKEN_DECIMALS);
        assert_eq!(info.total_supply, 0);
    }

    #[tokio::test]
    async fn unknown_account_has_zero_balance() {
        let router = create_router(test_app_state());
        assert_eq!(balance(&router, "0xdeadbeef").await, 0);
    }

    #[tokio::test]
    async fn malformed_owner_is_bad_request() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/balances/not-hex").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.starts_with("owner"));
    }

    #[tokio::test]
    async fn kernel_identity_mints_and_users_cannot() {
        let state = test_app_state();
        let metrics = Arc::clone(&state.metrics);
        let router = create_router(state);

        assert!(mint(&router, ALICE, 1_000).await);

        let (_, body) = post_json(
            &router,
            "/mint",
            Some(ALICE),
            serde_json::json!({ "to": ALICE, "value": 1 }),
        )
        .await;
        assert!(!serde_json::from_slice::<MutationResponse>(&body).unwrap().success);

        assert_eq!(balance(&router, ALICE).await, 1_000);
        assert_eq!(metrics.total_supply.get(), 1_000);
        assert_eq!(
            metrics
                .ledger_calls_total
                .with_label_values(&["mint", "rejected"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn transfer_requires_matching_caller() {
        let router = create_router(test_app_state());
        assert!(mint(&router, ALICE, 1_000).await);
        let body = serde_json::json!({ "from": ALICE, "to": BOB, "value": 400 });

        let (_, resp) = post_json(&router, "/transfer", Some(BOB), body.clone()).await;
        assert!(!serde_json::from_slice::<MutationResponse>(&resp).unwrap().success);
        let (_, resp) = post_json(&router, "/transfer", None, body.clone()).await;
        assert!(!serde_json::from_slice::<MutationResponse>(&resp).unwrap().success);

        let (status, resp) = post_json(&router, "/transfer", Some(ALICE), body).await;
        assert_eq!(status, StatusCode::OK);
        assert!(serde_json::from_slice::<MutationResponse>(&resp).unwrap().success);

        assert_eq!(balance(&router, ALICE).await, 600);
        assert_eq!(balance(&router, BOB).await, 400);
    }

    #[tokio::test]
    async fn call_endpoint_runs_raw_entry_points() {
        let router = create_router(test_app_state());
        assert!(mint(&router, ALICE, 250).await);

        let args = Request::BalanceOf(dispatch::BalanceOfArgs {
            owner: ALICE.parse().unwrap(),
        })
        .encode_args()
        .unwrap();
        let (status, body) = post_json(
            &router,
            "/call",
            None,
            serde_json::json!({
                "selector": EntryPoint::BalanceOf.selector(),
                "args": hex::encode(args),
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let resp: CallResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.entry_point, "balance_of");
        assert_eq!(resp.decoded, Response::BalanceOf(250));
        assert_eq!(resp.result, hex::encode(250u64.to_le_bytes()));
    }

    #[tokio::test]
    async fn call_endpoint_rejects_unknown_selector() {
        let router = create_router(test_app_state());
        let (status, body) = post_json(
            &router,
            "/call",
            None,
            serde_json::json!({ "selector": 0xdeadbeefu32 }),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.contains("deadbeef"));
    }

    #[tokio::test]
    async fn call_args_accept_a_single_hex_prefix_only() {
        let router = create_router(test_app_state());
        let args = hex::encode(
            Request::BalanceOf(dispatch::BalanceOfArgs {
                owner: ALICE.parse().unwrap(),
            })
            .encode_args()
            .unwrap(),
        );
        let selector = EntryPoint::BalanceOf.selector();

        let (status, _) = post_json(
            &router,
            "/call",
            None,
            serde_json::json!({ "selector": selector, "args": format!("0x{args}") }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = post_json(
            &router,
            "/call",
            None,
            serde_json::json!({ "selector": selector, "args": format!("0x0x{args}") }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.starts_with("args"));
    }

    #[tokio::test]
    async fn kernel_caller_can_spend_what_it_minted_to_itself() {
        let router = create_router(test_app_state());
        assert!(mint(&router, KERNEL, 500).await);

        let (status, body) = post_json(
            &router,
            "/transfer",
            Some(KERNEL),
            serde_json::json!({ "from": KERNEL, "to": BOB, "value": 200 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(serde_json::from_slice::<MutationResponse>(&body).unwrap().success);

        assert_eq!(balance(&router, KERNEL).await, 300);
        assert_eq!(balance(&router, BOB).await, 200);
    }

    #[tokio::test]
    async fn status_counts_stored_records() {
        let router = create_router(test_app_state());
        assert!(mint(&router, ALICE, 5).await);
        assert!(mint(&router, BOB, 7).await);

        let (status, body) = get(&router, "/status").await;
        assert_eq!(status, StatusCode::OK);
        let resp: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.total_supply, 12);
        // Two accounts plus the supply record.
        assert_eq!(resp.stored_objects, 3);
    }
}
