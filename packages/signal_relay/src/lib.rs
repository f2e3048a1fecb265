//! Signal Relay - peer rendezvous for WebRTC signaling
//!
//! This crate holds the protocol core of a polling signaling server: peer id
//! assignment, presence, per-peer message queues and the long-poll wait.
//! It has no HTTP dependencies; payloads are opaque bytes.
//!
//! # Example
//!
//! ```no_run
//! use signal_relay::{Delivery, Switchboard};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let board = Switchboard::new();
//!
//!     let alice = board.sign_in("alice").id;
//!     let bob = board.sign_in("bob").id;
//!
//!     board.send(alice, bob, "v=0 ...").unwrap();
//!
//!     match board.wait(bob, Some(Duration::from_secs(30))).await.unwrap() {
//!         Delivery::Message(msg) => println!("from {}: {:?}", msg.from, msg.payload),
//!         Delivery::Notification { roster, .. } => println!("{} peers online", roster.len()),
//!     }
//! }
//! ```

mod error;
pub mod protocol;
mod registry;
mod relay;
mod switchboard;

pub use error::RelayError;
pub use registry::{PeerId, RosterEntry};
pub use relay::Message;
pub use switchboard::{Delivery, NotificationCause, SignIn, Switchboard, SwitchboardStats};
