//! String formatting utilities for log output.

/// Truncates a hex string for display, keeping the first 10 characters.
///
/// Channel ids and digests are 66 characters long; logs only need enough of
/// the prefix to correlate entries.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 10 {
		id.to_string()
	} else {
		format!("{}..", &id[..10])
	}
}
