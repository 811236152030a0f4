//! Get the status of a Java edition server using the
//! [Server List Ping](https://wiki.vg/Server_List_Ping) protocol.
//! See documentation for [`query_java`] for more information.

pub mod data;
mod description;
pub mod session;

pub use self::description::normalize_description;

use self::{
    data::JavaStatus,
    session::{JavaSession, SessionAction, SessionEvent},
};
use crate::{
    errors::{validate_target, QueryError},
    ServerQuery, DEFAULT_TIMEOUT,
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use tracing::debug;

/// The port Java edition servers listen on unless configured otherwise.
pub const JAVA_DEFAULT_PORT: u16 = 25565;

/// The protocol version announced in the handshake unless configured otherwise.
pub const DEFAULT_PROTOCOL_VERSION: i32 = 770;

const READ_CHUNK_LEN: usize = 4096;

/// Options for a Java edition status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JavaQueryOptions {
    /// Deadline for the whole query, from the connection attempt until the pong.
    pub timeout: Duration,

    /// Protocol version to announce in the handshake.
    pub protocol_version: i32,
}

impl Default for JavaQueryOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            protocol_version: DEFAULT_PROTOCOL_VERSION,
        }
    }
}

/// A validated Java edition status query.
///
/// # Examples
///
/// ```no_run
/// use mc_status_query::{JavaQuery, ServerQuery};
///
/// # async fn run() -> Result<(), mc_status_query::errors::QueryError> {
/// let status = JavaQuery::new("mc.hypixel.net", 25565)?.query().await?;
/// println!("{status:#?}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct JavaQuery {
    host: String,
    port: u16,
    options: JavaQueryOptions,
}

impl JavaQuery {
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
            options: JavaQueryOptions::default(),
        })
    }

    /// Replace the options of this query.
    #[must_use]
    pub fn with_options(mut self, options: JavaQueryOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl ServerQuery for JavaQuery {
    type Status = JavaStatus;

    async fn query(&self) -> Result<JavaStatus, QueryError> {
        let mut session = JavaSession::new(&self.host, self.port, self.options.protocol_version);

        let exchange = async {
            match TcpStream::connect((self.host.as_str(), self.port)).await {
                Ok(socket) => drive(&mut session, socket).await,
                Err(err) => {
                    session.handle(SessionEvent::ErrorOccurred(err));
                }
            }
        };

        if timeout(self.options.timeout, exchange).await.is_err() {
            session.handle(SessionEvent::TimedOut);
        }

        // driving only stops once the session has settled
        session
            .take_outcome()
            .unwrap_or(Err(QueryError::ConnectionTimeout))
    }
}

/// Run `session` over an established connection until it settles.
pub(crate) async fn drive<S>(session: &mut JavaSession, mut stream: S)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut chunk = [0; READ_CHUNK_LEN];
    let mut actions = session.handle(SessionEvent::Connected);

    loop {
        for action in actions.drain(..) {
            match action {
                SessionAction::Send(bytes) => {
                    if let Err(err) = stream.write_all(&bytes).await {
                        session.handle(SessionEvent::ErrorOccurred(err));
                        return;
                    }
                }
                SessionAction::Close => {
                    // the result is already in, a failed shutdown changes nothing
                    if let Err(err) = stream.shutdown().await {
                        debug!(%err, "failed to shut down connection");
                    }
                    return;
                }
                SessionAction::Destroy => return,
            }
        }

        if session.is_settled() {
            return;
        }

        let event = match stream.read(&mut chunk).await {
            Ok(0) => SessionEvent::Closed,
            Ok(n) => SessionEvent::BytesReceived(&chunk[..n]),
            Err(err) => SessionEvent::ErrorOccurred(err),
        };
        actions = session.handle(event);
    }
}

/// Query the status of a Java edition server following the
/// [Server List Ping](https://wiki.vg/Server_List_Ping) protocol, including a
/// ping/pong round trip for latency.
///
/// A server that accepts the connection and closes it without answering is
/// reported with `online: false`.
///
/// # Arguments
/// * `host` - A string slice that holds the hostname of the server to connect to.
/// * `port` - The port to connect to on that server, usually [`JAVA_DEFAULT_PORT`].
/// * `options` - Timeout and protocol version for the query.
///
/// # Errors
/// Returns `Err` if the arguments are invalid, there was a network issue, the
/// server sent invalid data or the query timed out.
///
/// # Examples
/// ```no_run
/// use mc_status_query::{query_java, JavaQueryOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), mc_status_query::errors::QueryError> {
///     let data = query_java("mc.hypixel.net", 25565, &JavaQueryOptions::default()).await?;
///     println!("{data:#?}");
///
///     Ok(())
/// }
/// ```
pub async fn query_java(
    host: &str,
    port: u16,
    options: &JavaQueryOptions,
) -> Result<JavaStatus, QueryError> {
    JavaQuery::new(host, port)?
        .with_options(*options)
        .query()
        .await
}

create_timeout!(query_java, JavaStatus, JavaQueryOptions);

#[cfg(test)]
mod tests {
    use super::{drive, query_java, query_java_with_timeout, JavaQueryOptions};
    use crate::{
        errors::{MinecraftProtocolError, QueryError},
        java::session::JavaSession,
        packet::{frame, handshake, status_request},
        varint::VarInt,
    };
    use std::time::Duration;
    use tokio::{
        io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream},
        net::TcpListener,
        time::{sleep, Instant},
    };

    const STATUS_JSON: &str = r#"{"version":{"name":"1.21.5","protocol":770},"players":{"max":20,"online":3},"description":{"text":"A Minecraft Server"}}"#;

    fn status_packet(json: &str) -> Vec<u8> {
        let mut body = vec![0x00];
        body.extend_from_slice(&VarInt::from(json.len()));
        body.extend_from_slice(json.as_bytes());
        frame(&body).to_vec()
    }

    /// Read the handshake and status request a client sends for `host:port`.
    async fn read_request<S: AsyncRead + Unpin>(stream: &mut S, host: &str, port: u16) {
        let expected = [handshake(770, host, port), status_request()].concat();
        let mut request = vec![0; expected.len()];
        stream.read_exact(&mut request).await.unwrap();
        assert_eq!(request, expected);
    }

    /// Answer like a well behaved server, sending the status in small pieces.
    async fn serve_status<S: AsyncRead + AsyncWrite + Unpin>(mut stream: S, host: &str, port: u16) {
        read_request(&mut stream, host, port).await;

        for piece in status_packet(STATUS_JSON).chunks(16) {
            stream.write_all(piece).await.unwrap();
            stream.flush().await.unwrap();
            sleep(Duration::from_millis(1)).await;
        }

        // a ping and its pong share packet ID and layout
        let mut ping = [0; 10];
        stream.read_exact(&mut ping).await.unwrap();
        stream.write_all(&ping).await.unwrap();
        stream.flush().await.unwrap();

        // wait for the client to hang up
        let mut rest = Vec::new();
        stream.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    async fn drive_duplex<F, Fut>(server: F) -> Result<crate::JavaStatus, QueryError>
    where
        F: FnOnce(DuplexStream) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        crate::init_test_tracing();

        let (client, server_half) = tokio::io::duplex(64);
        let server = tokio::spawn(server(server_half));

        let mut session = JavaSession::new("test-host", 25565, 770);
        drive(&mut session, client).await;
        server.await.unwrap();

        session.take_outcome().unwrap()
    }

    #[tokio::test]
    async fn test_status_over_duplex() {
        let status = drive_duplex(|stream| serve_status(stream, "test-host", 25565))
            .await
            .unwrap();

        assert!(status.online);
        assert_eq!(status.version.as_deref(), Some("1.21.5"));
        assert_eq!(status.players_online, Some(3));
        assert_eq!(status.players_max, Some(20));
        assert_eq!(status.description.as_deref(), Some("A Minecraft Server"));
        assert!(status.latency.is_some());
    }

    #[tokio::test]
    async fn test_offline_over_duplex() {
        let status = drive_duplex(|mut stream| async move {
            read_request(&mut stream, "test-host", 25565).await;
        })
        .await
        .unwrap();

        assert!(!status.online);
        assert_eq!(status.host, "test-host");
        assert_eq!(status.port, 25565);
        assert_eq!(status.version, None);
        assert_eq!(status.latency, None);
    }

    #[tokio::test]
    async fn test_invalid_json_over_duplex() {
        let result = drive_duplex(|mut stream| async move {
            read_request(&mut stream, "test-host", 25565).await;
            stream.write_all(&status_packet("{\"version\":")).await.unwrap();
            let mut rest = Vec::new();
            let _ = stream.read_to_end(&mut rest).await;
        })
        .await;

        assert!(matches!(
            result,
            Err(QueryError::Protocol(MinecraftProtocolError::InvalidJsonResponse))
        ));
    }

    #[tokio::test]
    async fn test_status_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            serve_status(socket, "127.0.0.1", port).await;
        });

        let status = query_java("127.0.0.1", port, &JavaQueryOptions::default())
            .await
            .unwrap();
        server.await.unwrap();

        assert!(status.online);
        assert_eq!(status.host, "127.0.0.1");
        assert_eq!(status.port, port);
        assert_eq!(status.version.as_deref(), Some("1.21.5"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // accept and then never answer
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut rest = Vec::new();
            let _ = socket.read_to_end(&mut rest).await;
        });

        let timeout = Duration::from_millis(200);
        let start = Instant::now();
        let result = query_java_with_timeout("127.0.0.1", port, timeout).await;

        assert!(matches!(result, Err(QueryError::ConnectionTimeout)));
        assert!(start.elapsed() >= timeout);
        server.abort();
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // grab a free port and release it so nothing listens there
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let result = query_java("127.0.0.1", port, &JavaQueryOptions::default()).await;
        assert!(matches!(result, Err(QueryError::Connection(_))));
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let options = JavaQueryOptions::default();

        assert!(matches!(
            query_java("", 25565, &options).await,
            Err(QueryError::InvalidHost)
        ));
        assert!(matches!(
            query_java("localhost", 0, &options).await,
            Err(QueryError::InvalidPort)
        ));
    }

    #[tokio::test]
    #[ignore = "needs network access"]
    async fn test_hypixel_status() -> Result<(), QueryError> {
        let data = query_java("mc.hypixel.net", 25565, &JavaQueryOptions::default()).await?;
        println!("{data:#?}");

        Ok(())
    }
}
