//! Authenticated request signing.
//!
//! Private REST calls carry `api_key`, `timestamp`, `recv_window` and an
//! HMAC-SHA256 `sign` over the lexicographically sorted parameter string;
//! the realtime socket authenticates with the same primitive over
//! `"GET/realtime" + expiry`.

pub mod error;
pub mod signer;

pub use error::{SignError, SignResult};
pub use signer::{
    canonical_query, hmac_sha256_hex, realtime_auth_signature, RequestSigner, CLOCK_SKEW_MS,
    RECV_WINDOW_MS,
};
