//! Request validation and response encoding for the signaling protocol.
//!
//! Transport-agnostic: callers hand in raw query values and get back typed
//! ids or the text bodies the browser client expects. Validation happens
//! here, before any shared state is touched.

use bytes::Bytes;

use crate::error::RelayError;
use crate::registry::{PeerId, RosterEntry};
use crate::switchboard::Delivery;

/// Header carrying the origin id of a wait response. Safelisted for
/// cross-origin reads, so browser clients can see it without extra CORS setup.
pub const ORIGIN_HEADER: &str = "pragma";

/// Name used when sign-in carries an empty query string.
pub const ANONYMOUS: &str = "anonymous";

/// The display name is the raw query string of the sign-in request.
pub fn sign_in_name(raw_query: Option<&str>) -> String {
    match raw_query {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => ANONYMOUS.to_string(),
    }
}

/// Parse a required, positive peer id parameter.
pub fn parse_peer_id(value: Option<&str>, field: &str) -> Result<PeerId, RelayError> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RelayError::malformed(format!("missing {field}")))?;
    match raw.parse::<u64>() {
        Ok(0) => Err(RelayError::malformed(format!("{field} must be positive"))),
        Ok(id) => Ok(PeerId(id)),
        Err(_) => Err(RelayError::malformed(format!(
            "{field} is not a peer id: {raw:?}"
        ))),
    }
}

/// Parse the `(peer_id, to)` pair of a message request.
pub fn parse_route(
    peer_id: Option<&str>,
    to: Option<&str>,
) -> Result<(PeerId, PeerId), RelayError> {
    Ok((parse_peer_id(peer_id, "peer_id")?, parse_peer_id(to, "to")?))
}

/// Roster lines joined by newlines.
pub fn encode_roster(roster: &[RosterEntry]) -> String {
    roster
        .iter()
        .map(RosterEntry::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a roster body back into entries. Blank lines are skipped.
///
/// The name may itself contain commas, so id and flag are taken from the end.
pub fn decode_roster(body: &str) -> Result<Vec<RosterEntry>, RelayError> {
    body.lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut parts = line.rsplitn(3, ',');
            let flag = parts.next();
            let id = parts.next();
            let name = parts.next();
            match (name, id, flag) {
                (Some(name), Some(id), Some(flag)) => Ok(RosterEntry {
                    name: name.to_string(),
                    id: parse_peer_id(Some(id), "roster id")?,
                    connected: flag != "0",
                }),
                _ => Err(RelayError::malformed(format!("bad roster line: {line:?}"))),
            }
        })
        .collect()
}

/// Response body for a wait: the opaque payload as-is, or the roster text.
pub fn delivery_body(delivery: &Delivery) -> Bytes {
    match delivery {
        Delivery::Message(message) => message.payload.clone(),
        Delivery::Notification { roster, .. } => Bytes::from(encode_roster(roster)),
    }
}
