//! Utility functions for encoding, hashing and display formatting.
//!
//! This module provides the packed encoder used to build canonical signed
//! messages, the personal-message hash applied on both the signing and the
//! verifying side, and string helpers used in log output.

pub mod constants;
pub mod encoding;
pub mod formatting;

pub use constants::{DEFAULT_LEGACY_MARKER, SIGNATURE_LENGTH};
pub use encoding::{personal_message_hash, PackedEncoder};
pub use formatting::truncate_id;
