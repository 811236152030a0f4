//! Data returned by a Java edition status query.

use bytes::Bytes;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Response from the server with status information.
/// Represents [this JSON object](https://wiki.vg/Server_List_Ping#Status_Response)
/// as sent on the wire.
///
/// Only `version.name` and `players` are required. Every other field is
/// read leniently: a value of the wrong shape is treated as absent.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Information about the game and protocol version.
    /// See [Version] for more information.
    pub version: Version,

    /// Information about players on the server.
    /// See [Players] for more information.
    pub players: Players,

    /// The "motd" - message shown in the server list by the client.
    ///
    /// Kept as raw JSON since servers send anything from a plain string to a
    /// deeply nested chat component.
    #[serde(default)]
    pub description: Value,

    /// URI to the server's favicon.
    #[serde(default, deserialize_with = "lenient")]
    pub favicon: Option<String>,
}

/// Struct that stores information about players on the server.
///
/// Not intended to be used directly, but only as a part of [`StatusResponse`].
#[derive(Debug, Serialize, Deserialize)]
pub struct Players {
    /// The maximum number of players allowed on the server.
    #[serde(default, deserialize_with = "lenient_count")]
    pub max: Option<i64>,

    /// The number of players currently online.
    #[serde(default, deserialize_with = "lenient_count")]
    pub online: Option<i64>,

    /// A listing of some online Players.
    /// See [Sample] for more information.
    #[serde(default, deserialize_with = "lenient")]
    pub sample: Option<Vec<Sample>>,
}

/// A player listed on the server's list ping information.
///
/// Not intended to be used directly, but only as a part of [`StatusResponse`].
#[derive(Debug, Serialize, Deserialize)]
pub struct Sample {
    /// The player's username.
    pub name: String,

    /// The player's UUID.
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
}

/// Struct that stores version information about the server.
///
/// Not intended to be used directly, but only as a part of [`StatusResponse`].
#[derive(Debug, Serialize, Deserialize)]
pub struct Version {
    /// The game version (e.g: 1.19.1)
    pub name: String,
    /// The version of the [Protocol](https://wiki.vg/Protocol) being used.
    ///
    /// Some proxies leave this out.
    #[serde(default, deserialize_with = "lenient")]
    pub protocol: Option<i64>,
}

/// Deserialize `T`, or `None` if the value does not have its shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// A player count, accepting floats since some servers send `20.0`.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_i64()
        .or_else(|| value.as_f64().map(|count| count as i64)))
}

/// Normalized result of a Java edition status query.
///
/// When `online` is false only `host` and `port` are set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JavaStatus {
    /// Whether the server answered the status request.
    pub online: bool,

    /// The host that was queried.
    pub host: String,

    /// The port that was queried.
    pub port: u16,

    /// The game version name reported by the server.
    pub version: Option<String>,

    /// The protocol number reported by the server.
    pub protocol: Option<i64>,

    /// Number of players currently online.
    pub players_online: Option<i64>,

    /// Maximum number of players.
    pub players_max: Option<i64>,

    /// Names from the player sample, if the server sent one.
    pub player_sample: Option<Vec<String>>,

    /// The MOTD flattened to plain text.
    pub description: Option<String>,

    /// The favicon as sent, a `data:image/png;base64,` URI.
    pub favicon: Option<String>,

    /// The favicon's PNG bytes, if it could be decoded.
    pub favicon_bytes: Option<Bytes>,

    /// Round trip time of the ping/pong exchange, in milliseconds.
    pub latency: Option<u64>,
}

impl JavaStatus {
    /// A status for a server that closed the connection without answering.
    pub(crate) fn offline(host: &str, port: u16) -> Self {
        Self {
            online: false,
            host: host.to_string(),
            port,
            version: None,
            protocol: None,
            players_online: None,
            players_max: None,
            player_sample: None,
            description: None,
            favicon: None,
            favicon_bytes: None,
            latency: None,
        }
    }
}
