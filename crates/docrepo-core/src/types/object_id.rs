//! Store-style object identifiers.

use chrono::Utc;
use uuid::Uuid;

/// Generate a fresh 24-hex-character object id.
///
/// Layout: 4-byte big-endian creation timestamp (seconds) followed by
/// 8 random bytes, so ids sort roughly by creation time.
pub fn new_object_id() -> String {
    let seconds = Utc::now().timestamp() as u32;
    let random = Uuid::new_v4().into_bytes();
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&random[..8]);
    format!("{seconds:08x}{:016x}", u64::from_be_bytes(tail))
}

/// Whether `value` has the shape of an object id (24 hex characters).
pub fn is_object_id(value: &str) -> bool {
    value.len() == 24 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_object_id_shape() {
        let id = new_object_id();
        assert!(is_object_id(&id), "{id}");
        assert_ne!(id, new_object_id());
    }

    #[test]
    fn test_is_object_id_rejects_other_strings() {
        assert!(!is_object_id("abc123"));
        assert!(!is_object_id("zzzzzzzzzzzzzzzzzzzzzzzz"));
    }
}
