//! Envoy Core
//!
//! A privacy-preserving request/response messaging layer over a public
//! pub/sub event network (Nostr-style relays). Callers submit an
//! application-level rumor addressed to a recipient public key; the core
//! seals it under two layers of authenticated encryption, publishes the
//! outer envelope to a configured set of relays, subscribes for gift-wrapped
//! responses addressed to itself, correlates an incoming response back to
//! the originating request, and returns the inner rumor — within a bounded
//! timeout.
//!
//! ```text
//!  caller            C rumor          B seal/wrap         E publish
//!    │  partial ───────▶│ build ───────▶│ seal+wrap ───────▶│ N relays
//!    │                                                         │
//!    │◀── G/H waiter ◀── B unseal/unwrap ◀── F subscribe ◀─────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![deny(unsafe_code)]

pub mod config;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod facade;
pub mod publisher;
pub mod relay;
pub mod rumor;
pub mod subscriber;
pub mod waiter;

pub use config::Config;
pub use error::CoreError;
pub use facade::MessagingCore;
