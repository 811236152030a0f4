//! Get the status of a Bedrock edition server with a RakNet
//! [unconnected ping](https://wiki.vg/Raknet_Protocol#Unconnected_Ping).
//! See documentation for [`query_bedrock`] for more information.

pub mod data;
mod packet;

use self::{data::BedrockStatus, packet::UnconnectedPong};
use crate::{
    errors::{validate_target, QueryError},
    ServerQuery, DEFAULT_TIMEOUT,
};
use async_trait::async_trait;
use std::{
    net::Ipv4Addr,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::{
    net::UdpSocket,
    time::{timeout, Instant},
};
use tracing::debug;

/// The port Bedrock edition servers listen on unless configured otherwise.
pub const BEDROCK_DEFAULT_PORT: u16 = 19132;

const MAX_DATAGRAM_LEN: usize = 2048;

/// Options for a Bedrock edition status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BedrockQueryOptions {
    /// Deadline for the whole query, from sending the ping until the pong.
    pub timeout: Duration,
}

impl Default for BedrockQueryOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// A validated Bedrock edition status query.
#[derive(Debug, Clone)]
pub struct BedrockQuery {
    host: String,
    port: u16,
    options: BedrockQueryOptions,
}

impl BedrockQuery {
    /// Create a query for `host:port` with default options.
    ///
    /// # Errors
    /// Returns [`QueryError::InvalidHost`] if `host` is empty and
    /// [`QueryError::InvalidPort`] if `port` is 0.
    pub fn new(host: &str, port: u16) -> Result<Self, QueryError> {
        validate_target(host, port)?;

        Ok(Self {
            host: host.to_string(),
            port,
            options: BedrockQueryOptions::default(),
        })
    }

    /// Replace the options of this query.
    #[must_use]
    pub fn with_options(mut self, options: BedrockQueryOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl ServerQuery for BedrockQuery {
    type Status = BedrockStatus;

    async fn query(&self) -> Result<BedrockStatus, QueryError> {
        let exchange = async {
            let start = Instant::now();
            let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
            // only datagrams from the queried server are received from here on
            socket.connect((self.host.as_str(), self.port)).await?;

            socket
                .send(&packet::unconnected_ping(unix_millis()))
                .await?;

            let mut buffer = [0; MAX_DATAGRAM_LEN];
            let len = socket.recv(&mut buffer).await?;
            let latency = (start.elapsed().as_secs_f64() * 1000.0).round() as u64;
            debug!(len, latency, "received unconnected pong");

            let pong = UnconnectedPong::try_from(&buffer[..len])?;
            let status = BedrockStatus::extract(&self.host, self.port, &pong, latency)?;

            Ok::<_, QueryError>(status)
        };

        timeout(self.options.timeout, exchange)
            .await
            .map_err(|_| QueryError::ConnectionTimeout)?
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}

/// Query the status of a Bedrock edition server with a single unconnected
/// ping. There is no retry: a lost datagram ends in a timeout.
///
/// # Arguments
/// * `host` - A string slice that holds the hostname of the server.
/// * `port` - The port of that server, usually [`BEDROCK_DEFAULT_PORT`].
/// * `options` - Timeout for the query.
///
/// # Errors
/// Returns `Err` if the arguments are invalid, there was a network issue, the
/// server sent invalid data or the query timed out.
///
/// # Examples
/// ```no_run
/// use mc_status_query::{query_bedrock, BedrockQueryOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), mc_status_query::errors::QueryError> {
///     let data = query_bedrock("play.cubecraft.net", 19132, &BedrockQueryOptions::default()).await?;
///     println!("{data:#?}");
///
///     Ok(())
/// }
/// ```
pub async fn query_bedrock(
    host: &str,
    port: u16,
    options: &BedrockQueryOptions,
) -> Result<BedrockStatus, QueryError> {
    BedrockQuery::new(host, port)?
        .with_options(*options)
        .query()
        .await
}

create_timeout!(query_bedrock, BedrockStatus, BedrockQueryOptions);

#[cfg(test)]
mod tests {
    use super::{
        packet::OFFLINE_MESSAGE_DATA_ID, query_bedrock, query_bedrock_with_timeout,
        BedrockQueryOptions,
    };
    use crate::errors::{BedrockProtocolError, QueryError};
    use std::time::Duration;
    use tokio::{net::UdpSocket, time::Instant};

    /// Bind a server on loopback that answers one ping with `reply(ping)`.
    async fn mock_server<F>(reply: F) -> (u16, tokio::task::JoinHandle<()>)
    where
        F: FnOnce(&[u8]) -> Vec<u8> + Send + 'static,
    {
        crate::init_test_tracing();

        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            let mut buffer = [0; 64];
            let (len, from) = socket.recv_from(&mut buffer).await.unwrap();
            let response = reply(&buffer[..len]);
            socket.send_to(&response, from).await.unwrap();
        });

        (port, handle)
    }

    fn pong_for(ping: &[u8], server_id: &str) -> Vec<u8> {
        assert_eq!(ping.len(), 25);
        assert_eq!(ping[0], 0x01);
        assert_eq!(&ping[9..], &OFFLINE_MESSAGE_DATA_ID);

        let mut bytes = vec![0x1c];
        bytes.extend_from_slice(&ping[1..9]);
        bytes.extend_from_slice(&0x1234_u64.to_be_bytes());
        bytes.extend_from_slice(&OFFLINE_MESSAGE_DATA_ID);
        bytes.extend_from_slice(&(server_id.len() as u16).to_be_bytes());
        bytes.extend_from_slice(server_id.as_bytes());
        bytes
    }

    #[tokio::test]
    async fn test_bedrock_status() {
        let (port, server) = mock_server(|ping| {
            pong_for(ping, "MCPE;My Server;766;1.21.50;3;20;4242;Bedrock level;Creative;1;")
        })
        .await;

        let status = query_bedrock("127.0.0.1", port, &BedrockQueryOptions::default())
            .await
            .unwrap();
        server.await.unwrap();

        assert!(status.online);
        assert_eq!(status.host, "127.0.0.1");
        assert_eq!(status.port, port);
        assert_eq!(status.motd, "My Server");
        assert_eq!(status.protocol, Some(766));
        assert_eq!(status.version, "1.21.50");
        assert_eq!(status.players_online, Some(3));
        assert_eq!(status.players_max, Some(20));
        assert_eq!(status.server_id, "4242");
        assert_eq!(status.game_mode.as_deref(), Some("Creative"));
        assert_eq!(status.server_guid, 0x1234);
    }

    #[tokio::test]
    async fn test_ignores_other_senders() {
        crate::init_test_tracing();

        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let stray = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            let mut buffer = [0; 64];
            let (len, from) = server.recv_from(&mut buffer).await.unwrap();

            stray.send_to(&[0xff, 0x00], from).await.unwrap();
            let response = pong_for(&buffer[..len], "MCPE;Real;766;1.21.50;0;10;1;World;Survival");
            server.send_to(&response, from).await.unwrap();
        });

        let status = query_bedrock("127.0.0.1", port, &BedrockQueryOptions::default())
            .await
            .unwrap();
        handle.await.unwrap();

        assert_eq!(status.motd, "Real");
    }

    #[tokio::test]
    async fn test_invalid_response_packet() {
        let (port, server) = mock_server(|_| vec![0x1c, 0x00, 0x01]).await;

        let result = query_bedrock("127.0.0.1", port, &BedrockQueryOptions::default()).await;
        server.await.unwrap();

        assert!(matches!(
            result,
            Err(QueryError::Bedrock(BedrockProtocolError::InvalidResponsePacket))
        ));
    }

    #[tokio::test]
    async fn test_invalid_response_format() {
        let (port, server) = mock_server(|ping| pong_for(ping, "MCPE;Too;Short")).await;

        let result = query_bedrock("127.0.0.1", port, &BedrockQueryOptions::default()).await;
        server.await.unwrap();

        assert!(matches!(
            result,
            Err(QueryError::Bedrock(BedrockProtocolError::InvalidResponseFormat))
        ));
    }

    #[tokio::test]
    async fn test_timeout() {
        // bound but never read from
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = silent.local_addr().unwrap().port();

        let timeout = Duration::from_millis(200);
        let start = Instant::now();
        let result = query_bedrock_with_timeout("127.0.0.1", port, timeout).await;

        assert!(matches!(result, Err(QueryError::ConnectionTimeout)));
        assert!(start.elapsed() >= timeout);
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let options = BedrockQueryOptions::default();

        assert!(matches!(
            query_bedrock("", 19132, &options).await,
            Err(QueryError::InvalidHost)
        ));
        assert!(matches!(
            query_bedrock("localhost", 0, &options).await,
            Err(QueryError::InvalidPort)
        ));
    }
}
