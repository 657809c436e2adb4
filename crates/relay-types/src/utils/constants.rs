//! Constants shared by the signing and verifying sides.

/// Marker appended to cheque messages signed with the legacy encoding.
///
/// Older wallets signed cheques with this ASCII text appended after the nonce;
/// the executor appends the same bytes when the legacy flag is set.
pub const DEFAULT_LEGACY_MARKER: &str = "ERC20Compat";

/// Length of a serialized `r || s || v` signature.
pub const SIGNATURE_LENGTH: usize = 65;
