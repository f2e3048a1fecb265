//! Per-peer message queues and long-poll waiter slots.
//!
//! The relay holds no lock of its own; the [`Switchboard`](crate::Switchboard)
//! owns it together with the registry behind a single mutex.

use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use tokio::sync::oneshot;

use crate::error::RelayError;
use crate::registry::PeerId;

/// A relayed payload waiting in the recipient's queue
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub from: PeerId,
    pub payload: Bytes,
}

/// Why a parked wait was woken.
///
/// Wakes carry no data. A woken waiter goes back to its queue under the lock,
/// so a message is only ever removed by the request that returns it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Wake {
    Message,
    Roster,
    Superseded,
}

struct Waiter {
    ticket: u64,
    tx: oneshot::Sender<Wake>,
}

impl Waiter {
    fn wake(self, reason: Wake) {
        // The receiver is gone if the request was cancelled; nothing to do.
        let _ = self.tx.send(reason);
    }
}

#[derive(Default)]
struct Mailbox {
    queue: VecDeque<Message>,
    /// Set while the current wait is parked; taken when it is woken.
    waiter: Option<Waiter>,
    /// Ticket of the wait allowed to answer next. Stays set from claim until
    /// that wait releases it, including the window after a wake and before
    /// the woken task re-acquires the lock.
    current: Option<u64>,
}

/// Message queues keyed by recipient id.
#[derive(Default)]
pub(crate) struct Relay {
    mailboxes: HashMap<PeerId, Mailbox>,
    next_ticket: u64,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn open(&mut self, id: PeerId) {
        self.mailboxes.entry(id).or_default();
    }

    /// Drop a mailbox along with its undelivered messages. A parked waiter
    /// sees its channel close.
    pub(crate) fn close(&mut self, id: PeerId) -> usize {
        self.mailboxes
            .remove(&id)
            .map(|mb| mb.queue.len())
            .unwrap_or(0)
    }

    pub(crate) fn enqueue(&mut self, to: PeerId, message: Message) -> Result<(), RelayError> {
        let mailbox = self
            .mailboxes
            .get_mut(&to)
            .ok_or(RelayError::PeerNotFound(to))?;
        mailbox.queue.push_back(message);
        if let Some(waiter) = mailbox.waiter.take() {
            waiter.wake(Wake::Message);
        }
        Ok(())
    }

    pub(crate) fn pop(&mut self, id: PeerId) -> Option<Message> {
        self.mailboxes.get_mut(&id)?.queue.pop_front()
    }

    /// Make a new wait the current one for `id`. A wait that is parked, or
    /// woken but not yet resumed, loses its claim and will answer
    /// `WaitSuperseded`.
    pub(crate) fn claim(&mut self, id: PeerId) -> Option<u64> {
        let mailbox = self.mailboxes.get_mut(&id)?;
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        mailbox.current = Some(ticket);
        if let Some(previous) = mailbox.waiter.take() {
            previous.wake(Wake::Superseded);
        }
        Some(ticket)
    }

    /// Install the waiter for a claimed wait. `None` if `ticket` is not the
    /// current claim.
    pub(crate) fn park(&mut self, id: PeerId, ticket: u64) -> Option<oneshot::Receiver<Wake>> {
        let mailbox = self.mailboxes.get_mut(&id)?;
        if mailbox.current != Some(ticket) {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        mailbox.waiter = Some(Waiter { ticket, tx });
        Some(rx)
    }

    /// End the wait identified by `ticket`. Returns whether it still held
    /// the claim, i.e. whether it may answer.
    pub(crate) fn release(&mut self, id: PeerId, ticket: u64) -> bool {
        let Some(mailbox) = self.mailboxes.get_mut(&id) else {
            return false;
        };
        if mailbox.waiter.as_ref().is_some_and(|w| w.ticket == ticket) {
            mailbox.waiter = None;
        }
        if mailbox.current == Some(ticket) {
            mailbox.current = None;
            true
        } else {
            false
        }
    }

    /// Wake every parked waiter because the roster changed. Returns how many
    /// were woken.
    pub(crate) fn wake_all(&mut self) -> usize {
        let mut woken = 0;
        for mailbox in self.mailboxes.values_mut() {
            if let Some(waiter) = mailbox.waiter.take() {
                waiter.wake(Wake::Roster);
                woken += 1;
            }
        }
        woken
    }

    /// Whether `id` has a wait parked on its waiter slot.
    pub fn is_waiting(&self, id: PeerId) -> bool {
        self.mailboxes
            .get(&id)
            .is_some_and(|mb| mb.waiter.is_some())
    }

    pub fn waiting_count(&self) -> usize {
        self.mailboxes
            .values()
            .filter(|mb| mb.waiter.is_some())
            .count()
    }

    /// Number of undelivered messages for `id`, or `None` if it has no mailbox.
    pub fn queued(&self, id: PeerId) -> Option<usize> {
        self.mailboxes.get(&id).map(|mb| mb.queue.len())
    }

    pub fn queued_total(&self) -> usize {
        self.mailboxes.values().map(|mb| mb.queue.len()).sum()
    }

    /// Whether `id` has a wait that has not answered yet, parked or woken.
    pub fn has_wait_in_flight(&self, id: PeerId) -> bool {
        self.mailboxes
            .get(&id)
            .is_some_and(|mb| mb.current.is_some())
    }
}
