use crate::errors::BedrockProtocolError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

pub(super) const UNCONNECTED_PING_ID: u8 = 0x01;
pub(super) const UNCONNECTED_PONG_ID: u8 = 0x1c;

/// RakNet's `OFFLINE_MESSAGE_DATA_ID` magic.
/// See more: [Raknet: Data Types](https://wiki.vg/Raknet_Protocol#Data_types)
pub(super) const OFFLINE_MESSAGE_DATA_ID: [u8; 16] = [
    0x00, 0xff, 0xff, 0x00, 0xfe, 0xfe, 0xfe, 0xfe, 0xfd, 0xfd, 0xfd, 0xfd, 0x12, 0x34, 0x56, 0x78,
];

/// Where the server ID string starts: packet ID, time, server GUID, magic and
/// the string's u16 length.
const SERVER_ID_OFFSET: usize = 1 + 8 + 8 + 16 + 2;

/// An unconnected ping carrying `time`.
pub(super) fn unconnected_ping(time: u64) -> Bytes {
    let mut bytes = BytesMut::with_capacity(1 + 8 + OFFLINE_MESSAGE_DATA_ID.len());

    bytes.put_u8(UNCONNECTED_PING_ID);
    bytes.put_u64(time);
    bytes.put_slice(&OFFLINE_MESSAGE_DATA_ID);

    bytes.freeze()
}

/// A decoded unconnected pong.
#[derive(Debug)]
pub(super) struct UnconnectedPong {
    pub time: u64,
    pub server_guid: u64,
    pub server_id: String,
}

impl TryFrom<&[u8]> for UnconnectedPong {
    type Error = BedrockProtocolError;

    fn try_from(mut bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() <= SERVER_ID_OFFSET || bytes[0] != UNCONNECTED_PONG_ID {
            return Err(BedrockProtocolError::InvalidResponsePacket);
        }

        let server_id = String::from_utf8_lossy(&bytes[SERVER_ID_OFFSET..]).into_owned();

        bytes.advance(1);
        let time = bytes.get_u64();
        let server_guid = bytes.get_u64();

        Ok(Self {
            time,
            server_guid,
            server_id,
        })
    }
}
