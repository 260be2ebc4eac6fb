use crate::error::DecodeError;

/// Copy a dense, already channel-planar payload.
///
/// The payload must be exactly `expected_len` bytes.
pub fn decode_raw(payload: &[u8], expected_len: usize) -> Result<Vec<u8>, DecodeError> {
    if payload.len() != expected_len {
        return Err(DecodeError::LengthMismatch {
            expected: expected_len,
            actual: payload.len(),
        });
    }
    Ok(payload.to_vec())
}
