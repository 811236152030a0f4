//! Data returned by a Bedrock edition status query.

use super::packet::UnconnectedPong;
use crate::errors::BedrockProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fewer `;` separated fields than this make a server ID string invalid.
const MIN_SERVER_ID_FIELDS: usize = 8;

/// Represents the edition of a bedrock server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BedrockEdition {
    /// `MCPE`, regular Bedrock servers.
    PocketEdition,
    /// `MCEE`, Education Edition servers.
    EducationEdition,
    /// An unknown edition string.
    Other(String),
}

impl fmt::Display for BedrockEdition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PocketEdition => f.write_str("MCPE"),
            Self::EducationEdition => f.write_str("MCEE"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

impl From<&str> for BedrockEdition {
    fn from(edition: &str) -> Self {
        match edition.to_lowercase().as_str() {
            "mcpe" => Self::PocketEdition,
            "mcee" => Self::EducationEdition,
            _ => Self::Other(edition.to_string()),
        }
    }
}

/// Result of a Bedrock edition status query.
///
/// See More: [Raknet: Unconnected Pong](https://wiki.vg/Raknet_Protocol#Unconnected_Pong)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedrockStatus {
    /// Always true, a server that does not answer produces an error instead.
    pub online: bool,

    /// The host that was queried.
    pub host: String,

    /// The port that was queried.
    pub port: u16,

    /// The server's edition.
    pub edition: BedrockEdition,

    /// The first line of the server's MOTD.
    pub motd: String,

    /// The second line of the server's MOTD, often the server software.
    pub motd_2: Option<String>,

    /// The server's protocol version (ex: 766).
    pub protocol: Option<i64>,

    /// The name of the server's version (ex: 1.21.50).
    pub version: String,

    /// The number of players online.
    pub players_online: Option<i64>,

    /// The maximum number of players that could be online at once.
    pub players_max: Option<i64>,

    /// The server's unique ID, as written in the server ID string.
    pub server_id: String,

    /// The game mode new players start in (e.g. "Survival").
    pub game_mode: Option<String>,

    /// The numeric form of `game_mode`.
    pub game_mode_id: Option<i64>,

    /// The port to connect to over IPv4.
    pub port_v4: Option<u16>,

    /// The port to connect to over IPv6.
    pub port_v6: Option<u16>,

    /// The time echoed back in the pong.
    pub pong_time: u64,

    /// The server GUID from the pong header.
    pub server_guid: u64,

    /// Time between sending the ping and receiving the pong, in milliseconds.
    pub latency: u64,
}

impl BedrockStatus {
    /// Extracts information from the semicolon-separated server ID string.
    ///
    /// Edition (MCPE or MCEE for Education Edition)
    /// MOTD line 1
    /// Protocol Version
    /// Version Name
    /// Player Count
    /// Max Player Count
    /// Server Unique ID
    /// MOTD line 2
    /// Game mode
    /// Game mode (numeric)
    /// Port (IPv4)
    /// Port (IPv6)
    pub(super) fn extract(
        host: &str,
        port: u16,
        pong: &UnconnectedPong,
        latency: u64,
    ) -> Result<Self, BedrockProtocolError> {
        let parts: Vec<&str> = pong.server_id.split(';').collect();

        if parts.len() < MIN_SERVER_ID_FIELDS {
            return Err(BedrockProtocolError::InvalidResponseFormat);
        }

        let text = |i: usize| parts.get(i).map(ToString::to_string);
        let number = |i: usize| parts.get(i).and_then(|s| s.trim().parse::<i64>().ok());
        let port_at = |i: usize| parts.get(i).and_then(|s| s.trim().parse::<u16>().ok());

        Ok(Self {
            online: true,
            host: host.to_string(),
            port,
            edition: BedrockEdition::from(parts[0]),
            motd: parts[1].to_string(),
            motd_2: text(7),
            protocol: number(2),
            version: parts[3].to_string(),
            players_online: number(4),
            players_max: number(5),
            server_id: parts[6].to_string(),
            game_mode: text(8),
            game_mode_id: number(9),
            port_v4: port_at(10),
            port_v6: port_at(11),
            pong_time: pong.time,
            server_guid: pong.server_guid,
            latency,
        })
    }
}
