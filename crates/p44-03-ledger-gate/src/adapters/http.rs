//! HTTP surface of the ledger gate.
//!
//! | Method | Path                        | Result                                   |
//! |--------|-----------------------------|------------------------------------------|
//! | POST   | `/ledger/actions`           | 200 allowed, 403 denied, 400 ledger error |
//! | GET    | `/ledger/balances/:account` | current balance                          |

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use shared_types::NodeId;
use std::sync::Arc;

use crate::domain::{CustodyAction, DenyReason, GateDecision, Receipt};
use crate::ports::LedgerGateApi;

pub type GateState = Arc<dyn LedgerGateApi>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionRequest {
    pub subject_node_id: NodeId,
    pub action: CustodyAction,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionReply {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<Receipt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denial: Option<DenyReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceReply {
    pub account: String,
    pub balance: u64,
}

pub fn router(gate: GateState) -> Router {
    Router::new()
        .route("/ledger/actions", post(execute))
        .route("/ledger/balances/:account", get(balance))
        .with_state(gate)
}

async fn execute(State(gate): State<GateState>, Json(req): Json<ActionRequest>) -> Response {
    match gate.execute(&req.subject_node_id, req.action).await {
        Ok(GateDecision::Allowed(receipt)) => Json(ActionReply {
            allowed: true,
            receipt: Some(receipt),
            denial: None,
            error: None,
        })
        .into_response(),
        Ok(GateDecision::Denied(reason)) => (
            StatusCode::FORBIDDEN,
            Json(ActionReply {
                allowed: false,
                receipt: None,
                denial: Some(reason),
                error: None,
            }),
        )
            .into_response(),
        Err(err) => (
            StatusCode::BAD_REQUEST,
            Json(ActionReply {
                allowed: false,
                receipt: None,
                denial: None,
                error: Some(err.to_string()),
            }),
        )
            .into_response(),
    }
}

async fn balance(State(gate): State<GateState>, Path(account): Path<String>) -> impl IntoResponse {
    let balance = gate.balance(&account);
    Json(BalanceReply { account, balance })
}
