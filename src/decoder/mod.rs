mod error;
mod record;
mod sentence;
mod stream;
mod validate;

pub use error::LogError;
pub use record::{DeviceState, Record};
pub use sentence::{checksum, split_line, Line, Sentence};
pub use stream::{decode, DecodeStats, Records};
pub use validate::{validate, Validation};

pub const MIN_LOG_BYTES: usize = 100;
pub const MAX_LOG_BYTES: usize = 16 * 1024 * 1024;

pub fn check_buffer(buffer: &[u8]) -> Result<(), LogError> {
    if buffer.is_empty() {
        return Err(LogError::Empty);
    }
    if buffer.len() < MIN_LOG_BYTES {
        return Err(LogError::TooSmall);
    }
    if buffer.len() > MAX_LOG_BYTES {
        return Err(LogError::TooLarge);
    }
    Ok(())
}
