use bytes::Bytes;
use std::ops::Deref;

use crate::errors::MinecraftProtocolError;

pub(crate) const SEGMENT_BITS: u8 = 0x7f; // 0111 1111
pub(crate) const CONTINUE_BIT: u8 = 0x80; // 1000 0000

/// A VarInt may not span more than this many bytes.
const MAX_VARINT_LEN: usize = 5;

/// An encoded VarInt.
pub(crate) struct VarInt {
    bytes: Bytes,
}

/// Outcome of decoding a VarInt out of a buffer that may still be filling up.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum VarIntRead {
    /// A full VarInt was read, spanning `size` bytes.
    Complete { value: i32, size: usize },

    /// The buffer ended before the terminating byte.
    Incomplete,
}

impl VarInt {
    /// Decode a VarInt starting at `offset` without consuming anything from `buffer`.
    ///
    /// # Errors
    /// Returns [`MinecraftProtocolError::MalformedVarInt`] if five bytes pass
    /// without a terminating byte.
    pub(crate) fn decode(
        buffer: &[u8],
        offset: usize,
    ) -> Result<VarIntRead, MinecraftProtocolError> {
        let mut value: u32 = 0;

        for i in 0..MAX_VARINT_LEN {
            let Some(&current_byte) = buffer.get(offset + i) else {
                return Ok(VarIntRead::Incomplete);
            };

            value |= ((current_byte & SEGMENT_BITS) as u32) << (7 * i);

            if current_byte & CONTINUE_BIT == 0 {
                return Ok(VarIntRead::Complete {
                    value: value as i32,
                    size: i + 1,
                });
            }
        }

        Err(MinecraftProtocolError::MalformedVarInt)
    }
}

impl From<i32> for VarInt {
    fn from(value: i32) -> Self {
        let mut value = (value as u64) & 0xffff_ffff;
        let mut buffer = Vec::with_capacity(MAX_VARINT_LEN);

        loop {
            let temp = (value & SEGMENT_BITS as u64) as u8;
            value >>= 7;

            if value != 0 {
                buffer.push(temp | CONTINUE_BIT);
            } else {
                buffer.push(temp);
                break;
            }
        }

        Self {
            bytes: Bytes::from(buffer),
        }
    }
}

impl From<usize> for VarInt {
    fn from(value: usize) -> Self {
        VarInt::from(value as i32)
    }
}

impl Deref for VarInt {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.bytes
    }
}
