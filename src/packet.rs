use crate::varint::VarInt;
use bytes::{BufMut, Bytes, BytesMut};

/// Serverbound packet IDs used by the status exchange.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PacketId {
    Handshake,
    StatusRequest,
    Ping,
}

impl From<PacketId> for i32 {
    fn from(id: PacketId) -> Self {
        match id {
            PacketId::Handshake | PacketId::StatusRequest => 0x00,
            PacketId::Ping => 0x01,
        }
    }
}

/// Clientbound ID of the packet carrying the status JSON.
pub(crate) const STATUS_RESPONSE_ID: i32 = 0x00;

/// Clientbound ID of the packet echoing a ping payload.
pub(crate) const PONG_ID: i32 = 0x01;

/// Value of the handshake's `next state` field selecting the status state.
pub(crate) const NEXT_STATE_STATUS: i32 = 1;

/// Prefix `payload` with its length as a VarInt.
pub(crate) fn frame(payload: &[u8]) -> Bytes {
    let len = VarInt::from(payload.len());
    let mut bytes = BytesMut::with_capacity(len.len() + payload.len());

    bytes.extend_from_slice(&len);
    bytes.extend_from_slice(payload);

    bytes.freeze()
}

#[derive(Debug)]
pub(crate) struct Packet {
    id: i32,
    payload: Bytes,
}

impl Packet {
    pub fn builder(id: PacketId) -> PacketBuilder {
        PacketBuilder::new(id)
    }

    pub fn bytes(self) -> Bytes {
        self.into()
    }
}

impl From<Packet> for Bytes {
    fn from(packet: Packet) -> Self {
        let id = VarInt::from(packet.id);
        let mut body = BytesMut::with_capacity(id.len() + packet.payload.len());

        body.extend_from_slice(&id);
        body.extend_from_slice(&packet.payload);

        frame(&body)
    }
}

#[derive(Debug)]
pub(crate) struct PacketBuilder {
    id: PacketId,
    bytes: BytesMut,
}

impl PacketBuilder {
    pub fn new(id: PacketId) -> Self {
        Self {
            id,
            bytes: BytesMut::new(),
        }
    }

    pub fn add_varint(mut self, varint: &VarInt) -> Self {
        self.bytes.extend_from_slice(varint);
        self
    }

    pub fn add_string(self, string: &str) -> Self {
        let mut inst = self.add_varint(&VarInt::from(string.len()));
        inst.bytes.put(string.as_bytes());
        inst
    }

    pub fn add_u16(mut self, short: u16) -> Self {
        self.bytes.put_u16(short);
        self
    }

    pub fn add_u64(mut self, long: u64) -> Self {
        self.bytes.put_u64(long);
        self
    }

    pub fn build(self) -> Packet {
        Packet {
            id: self.id.into(),
            payload: self.bytes.freeze(),
        }
    }
}

/// Handshake announcing `protocol_version` and switching to the status state.
pub(crate) fn handshake(protocol_version: i32, host: &str, port: u16) -> Bytes {
    Packet::builder(PacketId::Handshake)
        .add_varint(&VarInt::from(protocol_version))
        .add_string(host)
        .add_u16(port)
        .add_varint(&VarInt::from(NEXT_STATE_STATUS))
        .build()
        .bytes()
}

pub(crate) fn status_request() -> Bytes {
    Packet::builder(PacketId::StatusRequest).build().bytes()
}

pub(crate) fn ping(payload: u64) -> Bytes {
    Packet::builder(PacketId::Ping).add_u64(payload).build().bytes()
}
