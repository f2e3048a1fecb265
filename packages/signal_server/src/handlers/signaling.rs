use axum::{
    body::{Body, Bytes},
    extract::{Query, RawQuery, State},
    http::{HeaderName, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use signal_relay::{PeerId, RelayError, protocol};
use tracing::{debug, warn};

use super::ApiError;
use crate::AppState;

/// Query parameters shared by the signaling endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PeerQuery {
    peer_id: Option<String>,
    to: Option<String>,
}

const TEXT_PLAIN: &str = "text/plain";

fn plain(body: impl Into<Body>) -> Response {
    ([(header::CONTENT_TYPE, TEXT_PLAIN)], body.into()).into_response()
}

/// Plain-text response with the origin id in the out-of-band header.
fn tagged(origin: PeerId, body: impl Into<Body>) -> Response {
    (
        [
            (header::CONTENT_TYPE, TEXT_PLAIN.to_string()),
            (
                HeaderName::from_static(protocol::ORIGIN_HEADER),
                origin.to_string(),
            ),
        ],
        body.into(),
    )
        .into_response()
}

fn validated<T>(state: &AppState, parsed: Result<T, RelayError>) -> Result<T, ApiError> {
    parsed.map_err(|e| {
        state.metrics.malformed_request();
        warn!("Rejected request: {}", e);
        ApiError(e)
    })
}

/// `GET /sign_in?<name>`: register and return the roster, own line first.
pub async fn sign_in(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Response {
    let name = protocol::sign_in_name(raw.as_deref());
    let signed = state.switchboard.sign_in(name);
    state.metrics.peer_signed_in();
    tagged(signed.id, protocol::encode_roster(&signed.roster))
}

/// `GET /sign_out?peer_id=N`: always succeeds for a well-formed id.
pub async fn sign_out(
    State(state): State<AppState>,
    Query(query): Query<PeerQuery>,
) -> Result<Response, ApiError> {
    let peer = validated(
        &state,
        protocol::parse_peer_id(query.peer_id.as_deref(), "peer_id"),
    )?;
    if state.switchboard.sign_out(peer) {
        state.metrics.peer_signed_out();
    }
    Ok(plain(Body::empty()))
}

/// `GET /wait?peer_id=N`: the long poll.
///
/// The origin header holds the sender id for a relayed payload and the
/// caller's own id for a roster notification.
pub async fn wait(
    State(state): State<AppState>,
    Query(query): Query<PeerQuery>,
) -> Result<Response, ApiError> {
    let peer = validated(
        &state,
        protocol::parse_peer_id(query.peer_id.as_deref(), "peer_id"),
    )?;

    state.metrics.wait_started();
    let result = state
        .switchboard
        .wait(peer, state.signaling.wait_timeout)
        .await;
    state.metrics.wait_finished(&result);

    let delivery = result.inspect_err(|e| debug!(%peer, "Wait failed: {}", e))?;
    Ok(tagged(
        delivery.origin(peer),
        protocol::delivery_body(&delivery),
    ))
}

/// `POST /message?peer_id=N&to=M`: queue the body for `to`.
pub async fn message(
    State(state): State<AppState>,
    Query(query): Query<PeerQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let (from, to) = validated(
        &state,
        protocol::parse_route(query.peer_id.as_deref(), query.to.as_deref()),
    )?;

    let len = body.len();
    if let Err(e) = state.switchboard.send(from, to, body) {
        state.metrics.message_rejected();
        warn!(%from, %to, "Message rejected: {}", e);
        return Err(e.into());
    }
    state.metrics.message_relayed(len);
    Ok(plain(Body::empty()))
}
