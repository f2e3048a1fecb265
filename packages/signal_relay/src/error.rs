//! Error taxonomy for signaling operations.

use crate::registry::PeerId;

/// Errors surfaced to the peer whose request failed.
///
/// None of these are retried internally and none affect other peers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// The request referenced an id with no live registry entry.
    #[error("peer not found: {0}")]
    PeerNotFound(PeerId),

    /// A required parameter was missing or unparseable.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// A newer wait for the same peer took over the long-poll slot.
    #[error("wait for peer {0} superseded by a newer wait")]
    WaitSuperseded(PeerId),
}

impl RelayError {
    pub fn error_code(&self) -> &str {
        match self {
            Self::PeerNotFound(_) => "peer_not_found",
            Self::MalformedRequest(_) => "malformed_request",
            Self::WaitSuperseded(_) => "wait_superseded",
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRequest(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes() {
        assert_eq!(RelayError::PeerNotFound(PeerId(3)).error_code(), "peer_not_found");
        assert_eq!(
            RelayError::malformed("missing peer_id").error_code(),
            "malformed_request"
        );
        assert_eq!(
            RelayError::WaitSuperseded(PeerId(1)).error_code(),
            "wait_superseded"
        );
    }

    #[test]
    fn display_includes_peer() {
        let err = RelayError::PeerNotFound(PeerId(42));
        assert_eq!(err.to_string(), "peer not found: 42");
    }
}
