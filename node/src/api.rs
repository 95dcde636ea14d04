//! HTTP API for the Lightning assets client

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use lac_contracts::{ContractManager, ContractSubscription};
use lac_core::{ApiResponse, ContractId, ContractType, LacError, LacResult, Sats};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// API state containing the contract manager
pub type ApiState = Arc<ContractManager>;

/// Contract creation request
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateContractRequest {
    pub asset: String,
    pub amount: f64,
    #[serde(alias = "type")]
    pub contract_type: ContractType,
}

/// Invoice creation request
#[derive(Debug, Serialize, Deserialize)]
pub struct PayReqRequest {
    pub amount: u64,
}

/// Invoice creation response
#[derive(Debug, Serialize, Deserialize)]
pub struct PayReqResponse {
    pub pay_req: String,
}

/// Payment request
#[derive(Debug, Serialize, Deserialize)]
pub struct PayRequest {
    pub pay_req: String,
}

/// HTTP status for an error kind
pub fn status_for(err: &LacError) -> StatusCode {
    match err {
        LacError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        LacError::NotFound(_) => StatusCode::NOT_FOUND,
        LacError::Conflict(_) => StatusCode::CONFLICT,
        LacError::RemoteFailure(_) => StatusCode::BAD_GATEWAY,
        LacError::PaymentFailure(_) => StatusCode::PAYMENT_REQUIRED,
        LacError::PriceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        LacError::Corrupt(_)
        | LacError::StoreFailure(_)
        | LacError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn respond<T: Serialize>(result: LacResult<T>, ok: StatusCode) -> (StatusCode, Json<ApiResponse<T>>) {
    match result {
        Ok(data) => (ok, Json(ApiResponse::ok(data))),
        Err(e) => {
            let status = status_for(&e);
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                error!("Request failed: {}", e);
            }
            (status, Json(ApiResponse::err(e)))
        }
    }
}

/// Create API router
pub fn create_router(state: ApiState, enable_cors: bool) -> Router {
    let router = Router::new()
        // Health
        .route("/health", get(health))
        // Contracts
        .route("/contracts", post(create_contract).get(list_contracts))
        .route("/contracts/subscribe", get(subscribe_contracts))
        .route("/contracts/:id", axum::routing::delete(close_contract))
        .route("/contracts/:id/open", post(open_contract))
        // Payments
        .route("/payreq", post(request_payment_request))
        .route("/pay", post(request_payment))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router.layer(cors)
    } else {
        router
    }
}

/// Health check
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// Create contract
async fn create_contract(
    State(manager): State<ApiState>,
    Json(req): Json<CreateContractRequest>,
) -> impl IntoResponse {
    let result = manager
        .create_contract(&req.asset, req.amount, req.contract_type)
        .await;
    respond(result, StatusCode::CREATED)
}

/// Open contract
async fn open_contract(
    State(manager): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    respond(manager.open_contract(&ContractId::new(id)).await, StatusCode::OK)
}

/// Close contract
async fn close_contract(
    State(manager): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    respond(manager.close_contract(&ContractId::new(id)).await, StatusCode::OK)
}

/// List contracts
async fn list_contracts(State(manager): State<ApiState>) -> impl IntoResponse {
    respond(manager.list_contracts().await, StatusCode::OK)
}

/// Stream contract updates as server-sent events
async fn subscribe_contracts(State(manager): State<ApiState>) -> Response {
    let subscription = manager.subscribe();
    info!("Contract subscriber {} connected", subscription.id());

    Sse::new(contract_events(subscription))
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn contract_events(subscription: ContractSubscription) -> impl Stream<Item = Result<Event, axum::Error>> {
    stream::unfold(subscription, |mut subscription| async move {
        let contract = subscription.recv().await?;
        let event = Event::default().event("contract").json_data(&contract);
        Some((event, subscription))
    })
}

/// Create invoice
async fn request_payment_request(
    State(manager): State<ApiState>,
    Json(req): Json<PayReqRequest>,
) -> impl IntoResponse {
    let result = manager
        .request_payment_request(Sats(req.amount))
        .await
        .map(|pay_req| PayReqResponse { pay_req });
    respond(result, StatusCode::OK)
}

/// Pay invoice
async fn request_payment(
    State(manager): State<ApiState>,
    Json(req): Json<PayRequest>,
) -> impl IntoResponse {
    respond(manager.request_payment(&req.pay_req).await, StatusCode::OK)
}

/// Start API server
pub async fn start_api_server(manager: ApiState, listen_addr: &str, enable_cors: bool) -> anyhow::Result<()> {
    let router = create_router(manager, enable_cors);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!("API server listening on {}", listen_addr);

    axum::serve(listener, router).await?;

    Ok(())
}
