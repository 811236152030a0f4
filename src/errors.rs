//! All the errors defined by this crate.

use std::io;
use thiserror::Error;

/// An error decoding the Java edition status protocol.
#[derive(Error, Debug)]
pub enum MinecraftProtocolError {
    /// A VarInt ran past five bytes without terminating, or encoded a
    /// negative length.
    #[error("malformed varint")]
    MalformedVarInt,

    /// The status response packet was shorter than the string it declared.
    #[error("incomplete status packet")]
    IncompleteStatusPacket,

    /// The status response did not carry valid JSON.
    #[error("invalid json response")]
    InvalidJsonResponse,

    /// The status JSON was missing the version name or the players object.
    #[error("malformed server response")]
    MalformedResponse,

    /// A pong packet was too short to hold its 8 byte payload.
    #[error("invalid pong packet")]
    InvalidPongPacket,
}

/// An error decoding a Bedrock edition unconnected pong.
#[derive(Error, Debug)]
pub enum BedrockProtocolError {
    /// The reply was too short or did not start with the unconnected pong ID.
    #[error("invalid response packet")]
    InvalidResponsePacket,

    /// The server ID string had fewer fields than expected.
    #[error("invalid response format from server")]
    InvalidResponseFormat,
}

/// Any error a status query can end with.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The host was empty.
    #[error("invalid host")]
    InvalidHost,

    /// The port was 0.
    #[error("invalid port")]
    InvalidPort,

    /// The transport failed.
    #[error("connection error: {0}")]
    Connection(#[source] io::Error),

    /// No result was produced before the configured timeout.
    #[error("connection timeout")]
    ConnectionTimeout,

    /// The server closed the connection after sending its status but before
    /// answering the ping.
    #[error("connection closed before pong was received")]
    ConnectionClosed,

    /// The server sent data that does not follow the Java status protocol.
    #[error(transparent)]
    Protocol(#[from] MinecraftProtocolError),

    /// The server sent data that does not follow the Bedrock ping protocol.
    #[error(transparent)]
    Bedrock(#[from] BedrockProtocolError),
}

impl From<io::Error> for QueryError {
    fn from(err: io::Error) -> Self {
        QueryError::Connection(err)
    }
}

/// Checks the parameters shared by both editions before any I/O happens.
pub(crate) fn validate_target(host: &str, port: u16) -> Result<(), QueryError> {
    if host.is_empty() {
        return Err(QueryError::InvalidHost);
    }

    if port == 0 {
        return Err(QueryError::InvalidPort);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_target, MinecraftProtocolError, QueryError};

    #[test]
    fn test_validate_target() {
        assert!(validate_target("localhost", 25565).is_ok());
        assert!(validate_target("localhost", 65535).is_ok());
        assert!(matches!(
            validate_target("", 25565),
            Err(QueryError::InvalidHost)
        ));
        assert!(matches!(
            validate_target("localhost", 0),
            Err(QueryError::InvalidPort)
        ));
    }

    #[test]
    fn test_protocol_error_display() {
        let err = QueryError::from(MinecraftProtocolError::InvalidJsonResponse);
        assert_eq!(err.to_string(), "invalid json response");

        let err = QueryError::Connection(std::io::Error::other("refused"));
        assert_eq!(err.to_string(), "connection error: refused");
    }
}
