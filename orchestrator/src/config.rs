//! # Orchestrator Configuration & Constants
//!
//! Every magic number in SWEEP lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! Most of these values are contractual: the reserve is what keeps swept
//! accounts usable, the crypto lengths are fixed by the algorithms, and the
//! deep-link parameter names are what the Spectre wallet actually sends back.
//! Change them and the round trip stops round-tripping.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Transfer Parameters
// ---------------------------------------------------------------------------

/// The fixed reserve left behind by every sweep, in lux (the Helio smallest
/// unit). Deliberately non-zero so the emptied account can still pay one
/// minimal follow-up fee. 100,000 lux = 0.0001 HEL.
pub const RESERVE_LUX: u64 = 100_000;

/// Number of characters of the transaction id shown in success messages.
/// Full ids are ~88 base58 characters; nobody reads those.
pub const TX_ID_DISPLAY_WIDTH: usize = 16;

/// How often the background task refreshes the connected account's balance.
/// Ten seconds is frequent enough to feel live and rare enough to be polite
/// to the RPC endpoint.
pub const BALANCE_POLL_INTERVAL: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 secret key (seed) length in bytes.
pub const SIGNING_KEY_LENGTH: usize = 32;

/// Ed25519 public key length in bytes.
pub const VERIFYING_KEY_LENGTH: usize = 32;

/// The pasted secret-key format is the 64-byte array wallets export:
/// 32-byte seed followed by the 32-byte public key.
pub const SECRET_KEY_ARRAY_LENGTH: usize = 64;

/// Ed25519 signature length. Always 64 bytes. If yours isn't, something
/// has gone terribly wrong.
pub const SIGNATURE_LENGTH: usize = 64;

/// X25519 public key length for the handshake key agreement.
pub const HANDSHAKE_KEY_LENGTH: usize = 32;

/// AES-256-GCM key length in bytes.
pub const AES_KEY_LENGTH: usize = 32;

/// AES-256-GCM nonce length in bytes. 96 bits is the standard and the only
/// length you should use. 12 bytes. Not 16. Not 8. Twelve.
pub const AES_NONCE_LENGTH: usize = 12;

/// AES-256-GCM authentication tag length in bytes.
pub const AES_TAG_LENGTH: usize = 16;

// ---------------------------------------------------------------------------
// Session Store
// ---------------------------------------------------------------------------

/// The single slot name under which a pending round trip is persisted.
/// One slot, one pending round trip. A second attempt while this slot is
/// occupied is rejected, not overwritten.
pub const PENDING_ROUND_TRIP_SLOT: &str = "sweep.pending_round_trip";

// ---------------------------------------------------------------------------
// Deep-Link Wallet Defaults
// ---------------------------------------------------------------------------

/// Identifier of the default deep-link wallet. The return trip carries a
/// `<name>_encryption_public_key` query parameter, so this string is part
/// of the wire contract.
pub const DEFAULT_DEEPLINK_WALLET: &str = "spectre";

/// Base URL of the default deep-link wallet's universal-link endpoint.
pub const DEFAULT_DEEPLINK_BASE_URL: &str = "https://spectre.app/ul/v1";

/// Where to send users who don't have the wallet installed.
pub const DEFAULT_DEEPLINK_INSTALL_URL: &str = "https://spectre.app/download";

/// Path segment for a connect round trip.
pub const DEEPLINK_CONNECT_PATH: &str = "connect";

/// Path segment for a sign-and-send round trip.
pub const DEEPLINK_SIGN_PATH: &str = "signAndSendTransaction";
