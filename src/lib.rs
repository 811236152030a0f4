//! Status queries for Minecraft servers: [Server List Ping](https://wiki.vg/Server_List_Ping)
//! for Java edition and the [RakNet unconnected ping](https://wiki.vg/Raknet_Protocol#Unconnected_Ping)
//! for Bedrock edition, both normalized into a flat status record.
//!
//! Use [`query_java`] and [`query_bedrock`] for one-off queries, or build a
//! [`JavaQuery`] / [`BedrockQuery`] and call [`ServerQuery::query`] on it.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]

macro_rules! create_timeout {
    ($name:ident, $ret:ty, $options:ident) => {
        ::paste::paste! {
            #[doc = concat!("Similar to [`", stringify!($name), "`]")]
            /// but with default options apart from the timeout.
            ///
            /// Note that timeouts are not precise, and may vary on the order
            /// of milliseconds, because of the way the async event loop works.
            ///
            /// # Arguments
            /// * `host` - A string slice that holds the hostname of the server to connect to.
            /// * `port` - The port to connect to on that server.
            /// * `dur` - Deadline for the whole query.
            ///
            /// # Errors
            /// Returns `Err` on any condition that
            #[doc = concat!("[`", stringify!($name), "`]")]
            /// does.
            #[allow(clippy::needless_update)]
            pub async fn [<$name _with_timeout>](
                host: &str,
                port: u16,
                dur: ::std::time::Duration,
            ) -> ::std::result::Result<$ret, crate::errors::QueryError> {
                let options = $options {
                    timeout: dur,
                    ..::std::default::Default::default()
                };

                $name(host, port, &options).await
            }
        }
    };
}

pub mod bedrock;
pub mod errors;
pub mod java;
mod packet;
mod varint;

use async_trait::async_trait;
use std::time::Duration;

pub use bedrock::{
    data::BedrockStatus, query_bedrock, query_bedrock_with_timeout, BedrockQuery,
    BedrockQueryOptions, BEDROCK_DEFAULT_PORT,
};
pub use java::{
    data::JavaStatus, query_java, query_java_with_timeout, JavaQuery, JavaQueryOptions,
    DEFAULT_PROTOCOL_VERSION, JAVA_DEFAULT_PORT,
};

/// Timeout used by queries unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// A status query for one server, validated and ready to run.
///
/// Each call opens its own connection, performs a single exchange and never
/// retries.
#[async_trait]
pub trait ServerQuery {
    /// The status record produced by a successful query.
    type Status;

    /// Run the query.
    ///
    /// # Errors
    /// Returns `Err` if there was a network issue, the server sent invalid
    /// data or the query timed out.
    async fn query(&self) -> Result<Self::Status, errors::QueryError>;
}

/// Route `tracing` output of a test through the test harness, filtered by `RUST_LOG`.
#[cfg(test)]
pub(crate) fn init_test_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
