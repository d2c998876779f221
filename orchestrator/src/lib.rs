// Copyright (c) 2026 Sweep Labs. MIT License.
// See LICENSE for details.

//! # SWEEP — Wallet Session & Transfer Orchestrator
//!
//! SWEEP links a Helio account to a client application and moves the
//! account's entire spendable balance, minus a fixed reserve, to one
//! configured destination. The transfer is the easy part. The actual
//! engineering problem is that "a wallet" is three structurally different
//! things wearing the same trench coat:
//!
//! - an injected provider object living in the same page,
//! - a mobile wallet reachable only by navigating the browser away and
//!   getting control back on a later page load, and
//! - a raw private key pasted straight into the app.
//!
//! This crate reconciles all three behind one protocol state machine.
//!
//! ## Architecture
//!
//! - **config** — Every constant. The reserve, the key lengths, the slot name.
//! - **crypto** — X25519 handshake, AES-256-GCM sealing, Ed25519 account keys.
//! - **ledger** — The four-operation RPC facade, plus an in-memory ledger.
//! - **transfer** — Transfer planning, canonical signable bytes, signing.
//! - **session** — Who is connected, how they sign, and the one store slot
//!   that survives a page teardown.
//! - **browser** — The seam to the hosting page. Headless in tests.
//! - **backend** — Three adapters, one capability surface.
//! - **resume** — The returning half of a deep-link round trip.
//! - **overlay** — The wallet-picker collaborator, held at arm's length.
//! - **orchestrator** — The state machine and the public API.
//!
//! ## Design Philosophy
//!
//! 1. Nothing is retried automatically. Retry is a human pressing a button.
//! 2. "Not sent" and "sent, status unknown" are different sentences, and
//!    the error taxonomy keeps them different.
//! 3. One pending round trip at a time. The slot rejects, never overwrites.
//! 4. If it touches money, it has tests. Plural.

pub mod backend;
pub mod browser;
pub mod config;
pub mod crypto;
pub mod ledger;
pub mod orchestrator;
pub mod overlay;
pub mod resume;
pub mod session;
pub mod transfer;
