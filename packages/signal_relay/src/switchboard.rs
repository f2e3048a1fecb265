//! The shared signaling state and the long-poll wait.

use bytes::Bytes;
use chrono::Utc;
use parking_lot::Mutex;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::RelayError;
use crate::registry::{PeerId, Registry, RosterEntry};
use crate::relay::{Message, Relay, Wake};

/// What a wait hands back to its caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// A payload relayed from another peer
    Message(Message),
    /// The current roster, addressed to the waiting peer itself
    Notification {
        roster: Vec<RosterEntry>,
        cause: NotificationCause,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationCause {
    RosterChanged,
    TimedOut,
}

impl Delivery {
    /// The id carried out-of-band with the body: the sender for a relayed
    /// message, the waiting peer itself for a notification.
    pub fn origin(&self, waiting_peer: PeerId) -> PeerId {
        match self {
            Delivery::Message(message) => message.from,
            Delivery::Notification { .. } => waiting_peer,
        }
    }
}

/// Result of a sign-in
#[derive(Clone, Debug)]
pub struct SignIn {
    pub id: PeerId,
    /// The new peer first, then everyone else in registration order
    pub roster: Vec<RosterEntry>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SwitchboardStats {
    pub peers: usize,
    pub waiting: usize,
    pub queued_messages: usize,
}

struct State {
    registry: Registry,
    relay: Relay,
}

/// Registry and relay behind one lock.
///
/// Every mutation of the peer set and of any queue happens inside a single
/// acquisition, so a sign-out can never interleave with a send or wait for
/// the same peer. [`Switchboard::wait`] releases the lock while parked.
pub struct Switchboard {
    state: Mutex<State>,
}

impl Default for Switchboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Switchboard {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                registry: Registry::new(),
                relay: Relay::new(),
            }),
        }
    }

    /// Register a peer, open its mailbox and notify parked waiters.
    pub fn sign_in(&self, name: impl Into<String>) -> SignIn {
        let name = name.into();
        let mut state = self.state.lock();
        let id = state.registry.sign_in(name.clone());
        state.relay.open(id);
        let roster = state.registry.roster_for(id);
        let woken = state.relay.wake_all();
        info!(peer = %id, %name, peers = roster.len(), woken, "Peer signed in");
        SignIn { id, roster }
    }

    /// Remove a peer and its queue. Unknown ids are a no-op.
    ///
    /// Returns whether the peer was registered.
    pub fn sign_out(&self, id: PeerId) -> bool {
        let mut state = self.state.lock();
        Self::remove_peer(&mut state, id)
    }

    fn remove_peer(state: &mut State, id: PeerId) -> bool {
        let Some(peer) = state.registry.sign_out(id) else {
            debug!(peer = %id, "Sign-out for unknown peer ignored");
            return false;
        };
        let dropped = state.relay.close(id);
        let woken = state.relay.wake_all();
        info!(peer = %id, name = %peer.name, dropped, woken, "Peer signed out");
        true
    }

    /// Refresh a peer's `last_seen`. Returns whether it exists.
    pub fn touch(&self, id: PeerId) -> bool {
        self.state.lock().registry.touch(id)
    }

    /// The roster in registration order.
    pub fn snapshot(&self) -> Vec<RosterEntry> {
        self.state.lock().registry.snapshot()
    }

    /// Queue `payload` for `to` and wake its parked wait.
    pub fn send(
        &self,
        from: PeerId,
        to: PeerId,
        payload: impl Into<Bytes>,
    ) -> Result<(), RelayError> {
        let payload = payload.into();
        let mut state = self.state.lock();
        if !state.registry.contains(to) {
            return Err(RelayError::PeerNotFound(to));
        }
        if !state.registry.contains(from) {
            return Err(RelayError::PeerNotFound(from));
        }
        let len = payload.len();
        state.relay.enqueue(to, Message { from, payload })?;
        debug!(%from, %to, bytes = len, "Message queued");
        Ok(())
    }

    /// Long-poll for the next delivery to `id`.
    ///
    /// Returns the oldest queued message immediately if there is one.
    /// Otherwise parks until a message arrives, the roster changes or
    /// `timeout` elapses (`None` waits indefinitely). A newer wait for the
    /// same peer supersedes this one, even if this one was already woken.
    ///
    /// Dropping the returned future before it completes loses nothing:
    /// messages only leave the queue in the same critical section that
    /// returns them.
    pub async fn wait(
        &self,
        id: PeerId,
        timeout: Option<Duration>,
    ) -> Result<Delivery, RelayError> {
        let (ticket, rx) = {
            let mut state = self.state.lock();
            if !state.registry.touch(id) {
                return Err(RelayError::PeerNotFound(id));
            }
            let ticket = state
                .relay
                .claim(id)
                .ok_or(RelayError::PeerNotFound(id))?;
            if let Some(message) = state.relay.pop(id) {
                state.relay.release(id, ticket);
                debug!(peer = %id, from = %message.from, "Delivered queued message");
                return Ok(Delivery::Message(message));
            }
            let rx = state
                .relay
                .park(id, ticket)
                .ok_or(RelayError::PeerNotFound(id))?;
            (ticket, rx)
        };

        let mut guard = Parked {
            board: Some(self),
            id,
            ticket,
        };
        let woke = match timeout {
            Some(limit) => tokio::time::timeout(limit, rx).await.ok(),
            None => Some(rx.await),
        };

        let mut state = self.state.lock();
        guard.disarm();
        if matches!(woke, Some(Err(_))) || !state.registry.contains(id) {
            return Err(RelayError::PeerNotFound(id));
        }
        if !state.relay.release(id, ticket) {
            debug!(peer = %id, "Wait superseded");
            return Err(RelayError::WaitSuperseded(id));
        }
        state.registry.touch(id);

        if let Some(message) = state.relay.pop(id) {
            debug!(peer = %id, from = %message.from, "Delivered message to parked wait");
            return Ok(Delivery::Message(message));
        }
        let cause = match woke {
            Some(Ok(Wake::Roster)) => NotificationCause::RosterChanged,
            None => NotificationCause::TimedOut,
            // A message wake with an empty queue would need another wait to
            // have popped it, and that wait would have revoked this claim.
            Some(Ok(Wake::Message | Wake::Superseded)) | Some(Err(_)) => {
                return Err(RelayError::WaitSuperseded(id));
            }
        };
        debug!(peer = %id, ?cause, "Delivered roster notification");
        Ok(Delivery::Notification {
            roster: state.registry.snapshot(),
            cause,
        })
    }

    /// Sign out every peer not seen for longer than `idle`, skipping peers
    /// that have a wait in flight.
    pub fn reap_idle(&self, idle: Duration) -> Vec<PeerId> {
        let Ok(idle) = chrono::Duration::from_std(idle) else {
            return Vec::new();
        };
        let cutoff = Utc::now() - idle;
        let mut state = self.state.lock();
        let stale: Vec<PeerId> = state
            .registry
            .idle_since(cutoff)
            .into_iter()
            .filter(|id| !state.relay.has_wait_in_flight(*id))
            .collect();
        for id in &stale {
            Self::remove_peer(&mut state, *id);
        }
        stale
    }

    pub fn is_registered(&self, id: PeerId) -> bool {
        self.state.lock().registry.contains(id)
    }

    pub fn is_waiting(&self, id: PeerId) -> bool {
        self.state.lock().relay.is_waiting(id)
    }

    /// Undelivered messages for `id`, `None` if unregistered.
    pub fn queued(&self, id: PeerId) -> Option<usize> {
        self.state.lock().relay.queued(id)
    }

    pub fn stats(&self) -> SwitchboardStats {
        let state = self.state.lock();
        SwitchboardStats {
            peers: state.registry.len(),
            waiting: state.relay.waiting_count(),
            queued_messages: state.relay.queued_total(),
        }
    }
}

/// Releases the claim of a wait that is cancelled while parked.
struct Parked<'a> {
    board: Option<&'a Switchboard>,
    id: PeerId,
    ticket: u64,
}

impl Parked<'_> {
    /// The wait resumed and releases its claim under the caller's lock.
    fn disarm(&mut self) {
        self.board = None;
    }
}

impl Drop for Parked<'_> {
    fn drop(&mut self) {
        if let Some(board) = self.board {
            board.state.lock().relay.release(self.id, self.ticket);
        }
    }
}
