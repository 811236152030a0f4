//! Transport independent state machine for one Java edition status query.
//!
//! A [`JavaSession`] is fed [`SessionEvent`]s by whatever owns the connection
//! and answers with the [`SessionAction`]s that connection has to carry out.
//! It never performs I/O itself, so it can be driven by a socket or by a test
//! handing it synthetic byte chunks.
//!
//! ```text
//! Connecting --Connected--> AwaitingStatus --status--> AwaitingPong --pong--> Done
//!      \                        |                         |
//!       `-------Closed----------+--> Done (offline)       `--Closed--> Failed
//! ```
//!
//! Errors and timeouts move any unsettled state to `Failed`.

use super::{data::JavaStatus, data::StatusResponse, description::normalize_description};
use crate::{
    errors::{MinecraftProtocolError, QueryError},
    packet::{self, PONG_ID, STATUS_RESPONSE_ID},
    varint::{VarInt, VarIntRead},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::{Buf, Bytes, BytesMut};
use std::{
    io, mem,
    time::{Instant, SystemTime, UNIX_EPOCH},
};
use tracing::{debug, trace, warn};

const FAVICON_PREFIX: &str = "data:image/png;base64,";

/// Largest packet a server may send, bounded by a three byte length prefix.
const MAX_PACKET_LEN: usize = 2_097_151;

/// Something that happened on the session's transport.
#[derive(Debug)]
pub enum SessionEvent<'a> {
    /// The connection was established.
    Connected,

    /// A chunk of bytes arrived. Chunks may split or join packets arbitrarily.
    BytesReceived(&'a [u8]),

    /// The peer closed the connection.
    Closed,

    /// The transport failed.
    ErrorOccurred(io::Error),

    /// The query's deadline passed.
    TimedOut,
}

/// Something the transport has to do on behalf of the session.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionAction {
    /// Write these bytes to the connection.
    Send(Bytes),

    /// Gracefully close the connection. The query succeeded.
    Close,

    /// Tear the connection down. The query failed.
    Destroy,
}

#[derive(Debug)]
struct PendingPing {
    payload: u64,
    sent_at: Instant,
}

#[derive(Debug)]
enum SessionState {
    Connecting,
    AwaitingStatus,
    AwaitingPong {
        status: Box<JavaStatus>,
        ping: PendingPing,
    },
    Done,
    Failed,
}

/// State of a single status query over one connection.
///
/// The session settles exactly once, either with a [`JavaStatus`] or with a
/// [`QueryError`]. Every event after that is ignored.
#[derive(Debug)]
pub struct JavaSession {
    host: String,
    port: u16,
    protocol_version: i32,
    state: SessionState,
    buffer: BytesMut,
    outcome: Option<Result<JavaStatus, QueryError>>,
}

impl JavaSession {
    /// Create a session that will announce `protocol_version` to `host:port`.
    pub fn new(host: impl Into<String>, port: u16, protocol_version: i32) -> Self {
        Self {
            host: host.into(),
            port,
            protocol_version,
            state: SessionState::Connecting,
            buffer: BytesMut::new(),
            outcome: None,
        }
    }

    /// Whether the session has resolved or failed.
    pub fn is_settled(&self) -> bool {
        matches!(self.state, SessionState::Done | SessionState::Failed)
    }

    /// Take the result of the query, once it has settled.
    pub fn take_outcome(&mut self) -> Option<Result<JavaStatus, QueryError>> {
        self.outcome.take()
    }

    /// Advance the session with `event`, returning what the transport must do next.
    pub fn handle(&mut self, event: SessionEvent<'_>) -> Vec<SessionAction> {
        let mut actions = Vec::new();

        if self.is_settled() {
            trace!(?event, "session already settled, ignoring event");
            return actions;
        }

        match event {
            SessionEvent::Connected => self.on_connected(&mut actions),
            SessionEvent::BytesReceived(chunk) => {
                trace!(len = chunk.len(), "received bytes");
                self.buffer.extend_from_slice(chunk);

                if let Err(err) = self.drain(&mut actions) {
                    self.fail(err.into(), &mut actions);
                }
            }
            SessionEvent::Closed => self.on_closed(),
            SessionEvent::ErrorOccurred(err) => self.fail(QueryError::Connection(err), &mut actions),
            SessionEvent::TimedOut => self.fail(QueryError::ConnectionTimeout, &mut actions),
        }

        actions
    }

    fn on_connected(&mut self, actions: &mut Vec<SessionAction>) {
        if !matches!(self.state, SessionState::Connecting) {
            return;
        }

        // https://wiki.vg/Server_List_Ping#Handshake
        actions.push(SessionAction::Send(packet::handshake(
            self.protocol_version,
            &self.host,
            self.port,
        )));
        // https://wiki.vg/Server_List_Ping#Status_Request
        actions.push(SessionAction::Send(packet::status_request()));

        debug!(host = %self.host, port = self.port, "sent handshake and status request");
        self.state = SessionState::AwaitingStatus;
    }

    fn on_closed(&mut self) {
        match self.state {
            SessionState::Connecting | SessionState::AwaitingStatus => {
                debug!(host = %self.host, port = self.port, "closed without status, server offline");
                self.outcome = Some(Ok(JavaStatus::offline(&self.host, self.port)));
                self.state = SessionState::Done;
            }
            SessionState::AwaitingPong { .. } => {
                debug!("closed while awaiting pong");
                self.outcome = Some(Err(QueryError::ConnectionClosed));
                self.state = SessionState::Failed;
            }
            SessionState::Done | SessionState::Failed => {}
        }
    }

    fn fail(&mut self, err: QueryError, actions: &mut Vec<SessionAction>) {
        debug!(%err, "status query failed");
        self.outcome = Some(Err(err));
        self.state = SessionState::Failed;
        actions.push(SessionAction::Destroy);
    }

    /// Process every complete packet in the buffer.
    fn drain(&mut self, actions: &mut Vec<SessionAction>) -> Result<(), MinecraftProtocolError> {
        loop {
            let awaiting_pong = match self.state {
                SessionState::AwaitingStatus => false,
                SessionState::AwaitingPong { .. } => true,
                _ => return Ok(()),
            };

            let Some(frame) = self.next_frame()? else {
                return Ok(());
            };

            if awaiting_pong {
                self.on_pong_frame(&frame, actions)?;
            } else {
                self.on_status_frame(&frame, actions)?;
            }
        }
    }

    /// Split the next complete packet off the buffer, without its length prefix.
    fn next_frame(&mut self) -> Result<Option<Bytes>, MinecraftProtocolError> {
        let VarIntRead::Complete { value, size } = VarInt::decode(&self.buffer, 0)? else {
            return Ok(None);
        };
        let len = usize::try_from(value).map_err(|_| MinecraftProtocolError::MalformedVarInt)?;
        if len > MAX_PACKET_LEN {
            return Err(MinecraftProtocolError::MalformedVarInt);
        }

        if self.buffer.len() < size + len {
            return Ok(None);
        }

        let mut frame = self.buffer.split_to(size + len);
        frame.advance(size);

        Ok(Some(frame.freeze()))
    }

    // https://wiki.vg/Server_List_Ping#Status_Response
    fn on_status_frame(
        &mut self,
        frame: &[u8],
        actions: &mut Vec<SessionAction>,
    ) -> Result<(), MinecraftProtocolError> {
        let truncated = || MinecraftProtocolError::IncompleteStatusPacket;

        let (id, id_size) = read_field(frame, 0).ok_or_else(truncated)??;
        if id != STATUS_RESPONSE_ID {
            warn!(id, "ignoring unexpected packet while awaiting status");
            return Ok(());
        }

        let (len, len_size) = read_field(frame, id_size).ok_or_else(truncated)??;
        let len = usize::try_from(len).map_err(|_| MinecraftProtocolError::MalformedVarInt)?;

        let start = id_size + len_size;
        let json = frame.get(start..start + len).ok_or_else(truncated)?;
        let status = self.build_status(parse_status(json)?);

        let ping = PendingPing {
            payload: ping_payload(),
            sent_at: Instant::now(),
        };
        actions.push(SessionAction::Send(packet::ping(ping.payload)));

        debug!(version = ?status.version, "received status, sent ping");
        self.state = SessionState::AwaitingPong {
            status: Box::new(status),
            ping,
        };

        Ok(())
    }

    // https://wiki.vg/Server_List_Ping#Pong_Response
    fn on_pong_frame(
        &mut self,
        frame: &[u8],
        actions: &mut Vec<SessionAction>,
    ) -> Result<(), MinecraftProtocolError> {
        let (id, id_size) = read_field(frame, 0)
            .ok_or(MinecraftProtocolError::InvalidPongPacket)??;
        if id != PONG_ID {
            warn!(id, "ignoring unexpected packet while awaiting pong");
            return Ok(());
        }

        let mut body = &frame[id_size..];
        if body.len() < 8 {
            return Err(MinecraftProtocolError::InvalidPongPacket);
        }
        let payload = body.get_u64();

        let SessionState::AwaitingPong { ping, .. } = &self.state else {
            return Ok(());
        };
        if ping.payload != payload {
            warn!(expected = ping.payload, payload, "ignoring pong with mismatched payload");
            return Ok(());
        }
        let latency = ping.sent_at.elapsed().as_millis() as u64;

        if let SessionState::AwaitingPong { status, .. } =
            mem::replace(&mut self.state, SessionState::Done)
        {
            debug!(latency, "received pong");
            self.outcome = Some(Ok(JavaStatus {
                online: true,
                latency: Some(latency),
                ..*status
            }));
            actions.push(SessionAction::Close);
        }

        Ok(())
    }

    fn build_status(&self, response: StatusResponse) -> JavaStatus {
        let favicon = response.favicon.filter(|favicon| !favicon.is_empty());
        let favicon_bytes = favicon.as_deref().and_then(decode_favicon);

        JavaStatus {
            online: false,
            host: self.host.clone(),
            port: self.port,
            version: Some(response.version.name),
            protocol: response.version.protocol,
            players_online: Some(response.players.online.unwrap_or(0)),
            players_max: Some(response.players.max.unwrap_or(0)),
            player_sample: response
                .players
                .sample
                .map(|sample| sample.into_iter().map(|player| player.name).collect()),
            description: Some(normalize_description(&response.description)),
            favicon,
            favicon_bytes,
            latency: None,
        }
    }
}

/// Read a VarInt that must lie entirely within an already complete packet.
/// `None` means the packet ended inside the VarInt.
fn read_field(
    frame: &[u8],
    offset: usize,
) -> Option<Result<(i32, usize), MinecraftProtocolError>> {
    match VarInt::decode(frame, offset) {
        Ok(VarIntRead::Complete { value, size }) => Some(Ok((value, size))),
        Ok(VarIntRead::Incomplete) => None,
        Err(err) => Some(Err(err)),
    }
}

fn parse_status(json: &[u8]) -> Result<StatusResponse, MinecraftProtocolError> {
    let value: serde_json::Value =
        serde_json::from_slice(json).map_err(|_| MinecraftProtocolError::InvalidJsonResponse)?;
    let response: StatusResponse =
        serde_json::from_value(value).map_err(|_| MinecraftProtocolError::MalformedResponse)?;

    if response.version.name.is_empty() {
        return Err(MinecraftProtocolError::MalformedResponse);
    }

    Ok(response)
}

fn decode_favicon(favicon: &str) -> Option<Bytes> {
    let data: String = favicon
        .strip_prefix(FAVICON_PREFIX)
        .unwrap_or(favicon)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    match STANDARD.decode(data) {
        Ok(bytes) => Some(Bytes::from(bytes)),
        Err(err) => {
            warn!(%err, "failed to decode favicon");
            None
        }
    }
}

/// Wall clock nanoseconds, echoed back by the server.
fn ping_payload() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos() as u64)
}
