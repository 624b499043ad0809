//! Body chunk framing.
//!
//! Response bodies are pushed to the client as a sequence of chunk messages:
//!
//! ```text
//! [payload:N][control:1]
//! ```
//!
//! The control byte is stripped before the payload reaches the consumer.

use bytes::Bytes;

/// Chunk control codes.
pub mod chunk_control {
    /// Data chunk, the stream stays open.
    pub const DATA: u8 = 0x00;
    /// End of stream.
    pub const END: u8 = 0x01;
    /// Alternate end of stream code.
    pub const END_ALT: u8 = 0x02;
}

/// Terminal control code that closed a body stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndCode {
    /// Closed with [`chunk_control::END`].
    End,
    /// Closed with [`chunk_control::END_ALT`].
    EndAlt,
}

impl EndCode {
    /// The control byte for this code.
    pub fn as_byte(self) -> u8 {
        match self {
            EndCode::End => chunk_control::END,
            EndCode::EndAlt => chunk_control::END_ALT,
        }
    }
}

/// A decoded chunk message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Chunk {
    /// Payload bytes to deliver to the consumer.
    Data(Bytes),
    /// End of stream. Any payload carried by the final message is discarded.
    End(EndCode),
}

/// Chunk framing errors.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    /// A message without a control byte.
    #[error("empty chunk message: missing control byte")]
    Empty,
}

/// Append the control byte to a payload.
pub fn encode_chunk(payload: &[u8], control: u8) -> Vec<u8> {
    let mut message = Vec::with_capacity(payload.len() + 1);
    message.extend_from_slice(payload);
    message.push(control);
    message
}

/// Encode a data chunk.
pub fn data_chunk(payload: &[u8]) -> Vec<u8> {
    encode_chunk(payload, chunk_control::DATA)
}

/// The message that closes a body stream.
pub fn end_of_stream() -> Vec<u8> {
    vec![chunk_control::END]
}

/// Decode one chunk message.
///
/// # Errors
/// Returns [`ChunkError::Empty`] for a zero-length message.
pub fn decode_chunk(mut message: Bytes) -> Result<Chunk, ChunkError> {
    let Some(&control) = message.last() else {
        return Err(ChunkError::Empty);
    };

    match control {
        chunk_control::END => Ok(Chunk::End(EndCode::End)),
        chunk_control::END_ALT => Ok(Chunk::End(EndCode::EndAlt)),
        _ => {
            message.truncate(message.len() - 1);
            Ok(Chunk::Data(message))
        }
    }
}
