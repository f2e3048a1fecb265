//! Peer directory: id assignment, presence and the roster snapshot.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Server-assigned peer identifier, unique for the lifetime of the process.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A signed-in peer
#[derive(Clone, Debug)]
pub(crate) struct Peer {
    pub id: PeerId,
    /// Client-supplied display name, not validated
    pub name: String,
    /// Updated on sign-in and every wait. Informational unless reaping is enabled.
    pub last_seen: DateTime<Utc>,
}

/// One line of the roster: `name,id,connected`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterEntry {
    pub name: String,
    pub id: PeerId,
    /// Always true: there is no "disconnecting" state.
    pub connected: bool,
}

impl fmt::Display for RosterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.name, self.id, u8::from(self.connected))
    }
}

impl From<&Peer> for RosterEntry {
    fn from(peer: &Peer) -> Self {
        Self {
            name: peer.name.clone(),
            id: peer.id,
            connected: true,
        }
    }
}

/// Authoritative set of signed-in peers.
///
/// Ids are handed out sequentially and never reused, so iterating the map in
/// key order is the same as registration order.
#[derive(Debug)]
pub(crate) struct Registry {
    peers: BTreeMap<PeerId, Peer>,
    next_id: u64,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            peers: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Register a new peer and return its id.
    pub fn sign_in(&mut self, name: impl Into<String>) -> PeerId {
        let id = PeerId(self.next_id);
        self.next_id += 1;
        self.peers.insert(
            id,
            Peer {
                id,
                name: name.into(),
                last_seen: Utc::now(),
            },
        );
        id
    }

    /// Remove a peer, handing it back if it was present.
    pub fn sign_out(&mut self, id: PeerId) -> Option<Peer> {
        self.peers.remove(&id)
    }

    /// Refresh `last_seen`. Returns whether the peer exists.
    pub fn touch(&mut self, id: PeerId) -> bool {
        match self.peers.get_mut(&id) {
            Some(peer) => {
                peer.last_seen = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: PeerId) -> bool {
        self.peers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// All peers in registration order.
    pub fn snapshot(&self) -> Vec<RosterEntry> {
        self.peers.values().map(RosterEntry::from).collect()
    }

    /// Roster as returned by sign-in: `id` first, then everyone else in
    /// registration order.
    pub fn roster_for(&self, id: PeerId) -> Vec<RosterEntry> {
        let mut roster = Vec::with_capacity(self.peers.len());
        if let Some(own) = self.peers.get(&id) {
            roster.push(RosterEntry::from(own));
        }
        roster.extend(
            self.peers
                .values()
                .filter(|p| p.id != id)
                .map(RosterEntry::from),
        );
        roster
    }

    /// Peers whose `last_seen` is strictly before `cutoff`.
    pub fn idle_since(&self, cutoff: DateTime<Utc>) -> Vec<PeerId> {
        self.peers
            .values()
            .filter(|p| p.last_seen < cutoff)
            .map(|p| p.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_and_never_reused() {
        let mut reg = Registry::new();
        let a = reg.sign_in("alice");
        let b = reg.sign_in("bob");
        assert_eq!(a, PeerId(1));
        assert_eq!(b, PeerId(2));

        assert_eq!(reg.sign_out(b).map(|p| p.name), Some("bob".to_string()));
        let c = reg.sign_in("carol");
        assert_eq!(c, PeerId(3));
    }

    #[test]
    fn sign_out_unknown_is_noop() {
        let mut reg = Registry::new();
        reg.sign_in("alice");
        assert!(reg.sign_out(PeerId(99)).is_none());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn roster_lists_self_first() {
        let mut reg = Registry::new();
        reg.sign_in("alice");
        reg.sign_in("bob");
        let carol = reg.sign_in("carol");

        let names: Vec<_> = reg
            .roster_for(carol)
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["carol", "alice", "bob"]);
    }

    #[test]
    fn snapshot_in_registration_order() {
        let mut reg = Registry::new();
        let a = reg.sign_in("alice");
        let b = reg.sign_in("bob");
        let c = reg.sign_in("carol");
        reg.sign_out(b);

        let ids: Vec<_> = reg.snapshot().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn touch_reports_existence() {
        let mut reg = Registry::new();
        let a = reg.sign_in("alice");
        std::thread::sleep(std::time::Duration::from_millis(5));
        let cutoff = Utc::now();
        assert_eq!(reg.idle_since(cutoff), vec![a]);

        assert!(reg.touch(a));
        assert!(reg.idle_since(cutoff).is_empty());
        assert!(!reg.touch(PeerId(7)));
    }

    #[test]
    fn roster_entry_format() {
        let entry = RosterEntry {
            name: "alice".into(),
            id: PeerId(5),
            connected: true,
        };
        assert_eq!(entry.to_string(), "alice,5,1");
    }

    #[test]
    fn idle_since_uses_cutoff() {
        let mut reg = Registry::new();
        let a = reg.sign_in("alice");
        let past = Utc::now() - chrono::Duration::seconds(60);
        assert!(reg.idle_since(past).is_empty());

        let future = Utc::now() + chrono::Duration::seconds(60);
        assert_eq!(reg.idle_since(future), vec![a]);
    }
}
