//! Generic request/response client for the environment protocol

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

use dqn_core::{DqnError, Result, Shutdown};

use crate::protocol::{encode_line, read_frame, Frame, Operation, ReplyFrame, RequestFrame, MAX_FRAME_BYTES};
use crate::retry::RetryPolicy;

fn default_address() -> String {
    "127.0.0.1:7878".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

/// Where the environment lives and how patiently to talk to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// `host:port` of the environment server
    #[serde(default = "default_address")]
    pub address: String,
    /// Ceiling for a single connect attempt or request round-trip
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Polling behaviour while the service is unavailable
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            request_timeout_ms: default_request_timeout_ms(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Config for `address` with default timeouts
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Per-request timeout
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connection {
    async fn round_trip<O: Operation>(&mut self, request: &O::Request) -> Result<O::Response> {
        let line = encode_line(&RequestFrame::new::<O>(request)?)?;
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;

        let reply = match read_frame(&mut self.reader).await? {
            Frame::Line(reply) => reply,
            Frame::Oversized => {
                return Err(DqnError::MalformedResponse {
                    operation: O::NAME,
                    reason: format!("reply exceeds {MAX_FRAME_BYTES} bytes"),
                })
            }
            Frame::Closed => return Err(DqnError::Connection("environment closed the connection".into())),
        };
        let frame: ReplyFrame = serde_json::from_slice(&reply).map_err(|e| DqnError::MalformedResponse {
            operation: O::NAME,
            reason: e.to_string(),
        })?;
        frame.into_response::<O>()
    }
}

/// One connection to an environment server, reused for every operation
pub struct RemoteClient {
    config: ClientConfig,
    connection: Option<Connection>,
}

impl RemoteClient {
    /// Create a disconnected client
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            connection: None,
        }
    }

    /// Client settings
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether a connection is currently open
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Connect, waiting out an unavailable service according to the retry policy
    ///
    /// Returns the number of attempts it took. Each failed attempt is logged.
    pub async fn connect(&mut self, shutdown: &mut Shutdown) -> Result<u32> {
        let policy = self.config.retry.clone();
        let started = Instant::now();
        let mut attempts = 0;

        loop {
            shutdown.check()?;
            attempts += 1;

            let failure = match timeout(self.config.request_timeout(), TcpStream::connect(&self.config.address)).await {
                Ok(Ok(stream)) => {
                    stream.set_nodelay(true)?;
                    let (read, write) = stream.into_split();
                    self.connection = Some(Connection {
                        reader: BufReader::new(read),
                        writer: write,
                    });
                    info!(address = %self.config.address, attempts, "connected to environment");
                    return Ok(attempts);
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => "connect timed out".to_string(),
            };

            info!(
                address = %self.config.address,
                attempt = attempts,
                reason = %failure,
                "service not available, waiting again..."
            );
            if policy.exhausted(attempts, started.elapsed()) {
                return Err(DqnError::ServiceUnavailable {
                    service: self.config.address.clone(),
                    attempts,
                });
            }

            tokio::select! {
                biased;
                () = shutdown.triggered() => return Err(DqnError::Cancelled),
                () = sleep(policy.wait_interval()) => {}
            }
        }
    }

    /// Perform one round-trip of operation `O`
    ///
    /// A timed-out, broken or misframed connection is dropped; later calls fail with
    /// [`DqnError::Connection`] until [`Self::connect`] succeeds again.
    pub async fn call<O: Operation>(&mut self, request: &O::Request) -> Result<O::Response> {
        let after = self.config.request_timeout();
        let connection = self.connection.as_mut().ok_or_else(|| {
            DqnError::Connection(format!("not connected to {}", self.config.address))
        })?;

        debug!(operation = O::NAME, "sending request");
        let outcome = match timeout(after, connection.round_trip::<O>(request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(DqnError::Timeout {
                operation: O::NAME,
                after,
            }),
        };

        if matches!(
            outcome,
            Err(DqnError::Timeout { .. }
                | DqnError::Connection(_)
                | DqnError::Io(_)
                | DqnError::MalformedResponse { .. })
        ) {
            self.connection = None;
        }
        outcome
    }
}
