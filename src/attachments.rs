use crate::storage::KeyValue;

/// Inline binary payloads are carried as data URIs; anything with this
/// prefix gets moved out of its record at write time.
pub const DATA_URI_PREFIX: &str = "data:";

/// A payload that must be written under its own key when the owning record
/// is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalPayload {
    pub key: String,
    pub payload: String,
}

/// Swap an inline data URI out of a record field. Returns the value the
/// record should persist (the derived key) together with the payload write
/// to apply. Non-data values pass through untouched.
pub fn externalize(
    value: Option<&str>,
    prefix: &str,
    id: &str,
) -> (Option<String>, Option<ExternalPayload>) {
    match value {
        Some(inline) if inline.starts_with(DATA_URI_PREFIX) => {
            let key = format!("{prefix}{id}");
            let payload = ExternalPayload {
                key: key.clone(),
                payload: inline.to_string(),
            };
            (Some(key), Some(payload))
        }
        Some(other) => (Some(other.to_string()), None),
        None => (None, None),
    }
}

/// Resolve a stored reference back to its payload. A reference whose payload
/// is missing is dropped rather than exposed dangling.
pub fn hydrate<S: KeyValue>(value: Option<String>, prefix: &str, kv: &S) -> Option<String> {
    match value {
        Some(reference) if reference.starts_with(prefix) => kv.get(&reference),
        other => other,
    }
}
