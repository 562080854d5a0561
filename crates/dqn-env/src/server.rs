//! Environment server: hosts one simulator behind the wire protocol
//!
//! The server is single-tenant. It accepts one connection at a time and
//! answers that connection's requests strictly in order.

use std::net::SocketAddr;

use serde_json::Value;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, info, warn};

use dqn_core::{DiscreteAction, DqnError, EnvironmentDims, ResetOutcome, Result, Shutdown, StateVector, StepOutcome};

use crate::protocol::{
    encode_line, read_frame, Frame, Operation, ReplyFrame, RequestFrame, Reset, ResetRequest, Setup,
    SetupRequest, Step, StepRequest, MAX_FRAME_BYTES,
};

/// Synchronous process the server exposes
pub trait Simulator: Send {
    /// Fixed state/action dimensionality
    fn dims(&self) -> EnvironmentDims;

    /// Start a fresh episode
    fn reset(&mut self) -> StateVector;

    /// Advance by one action already known to be in range
    fn step(&mut self, action: DiscreteAction) -> StepOutcome;
}

/// TCP front end for a [`Simulator`]
pub struct EnvironmentServer<S> {
    listener: TcpListener,
    sim: S,
    shutdown: Shutdown,
}

impl<S: Simulator> EnvironmentServer<S> {
    /// Bind the listening socket
    pub async fn bind(addr: impl ToSocketAddrs, sim: S, shutdown: Shutdown) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, sim, shutdown })
    }

    /// Address actually bound, useful with port 0
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and serve connections until shutdown
    pub async fn serve(mut self) -> Result<()> {
        info!(address = %self.local_addr()?, dims = %self.sim.dims(), "environment server listening");
        loop {
            let (stream, peer) = tokio::select! {
                biased;
                () = self.shutdown.triggered() => {
                    info!("environment server shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => accepted?,
            };

            info!(%peer, "client connected");
            match self.handle(stream).await {
                Ok(()) => info!(%peer, "client disconnected"),
                Err(e) => warn!(%peer, error = %e, "connection closed with error"),
            }
        }
    }

    async fn handle(&mut self, stream: TcpStream) -> Result<()> {
        stream.set_nodelay(true)?;
        let (read, mut write) = stream.into_split();
        let mut reader = BufReader::new(read);

        loop {
            let frame = tokio::select! {
                biased;
                () = self.shutdown.triggered() => return Ok(()),
                frame = read_frame(&mut reader) => frame?,
            };
            let line = match frame {
                Frame::Line(line) => line,
                Frame::Closed => return Ok(()),
                Frame::Oversized => {
                    let e = DqnError::Connection(format!("request exceeds {MAX_FRAME_BYTES} bytes"));
                    write.write_all(&encode_line(&ReplyFrame::Error(e.to_string()))?).await?;
                    return Err(e);
                }
            };
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let reply = match self.dispatch(&line) {
                Ok(body) => ReplyFrame::Ok(body),
                Err(e) => {
                    warn!(error = %e, "rejecting request");
                    ReplyFrame::Error(e.to_string())
                }
            };
            write.write_all(&encode_line(&reply)?).await?;
        }
    }

    fn dispatch(&mut self, line: &[u8]) -> Result<Value> {
        let frame: RequestFrame = serde_json::from_slice(line)?;
        let op = frame.op.as_str();

        let body = if op == Setup::NAME {
            let _: SetupRequest = serde_json::from_value(frame.body)?;
            serde_json::to_value(self.sim.dims())?
        } else if op == Reset::NAME {
            let request: ResetRequest = serde_json::from_value(frame.body)?;
            debug!(reason = %request.reason, "reset");
            let outcome = ResetOutcome {
                state: self.sim.reset(),
                acknowledged: true,
            };
            serde_json::to_value(outcome)?
        } else if op == Step::NAME {
            let request: StepRequest = serde_json::from_value(frame.body)?;
            let action = self.sim.dims().check_action(request.action)?;
            serde_json::to_value(self.sim.step(action))?
        } else {
            return Err(DqnError::Environment(format!("unknown operation `{op}`")));
        };

        Ok(body)
    }
}
