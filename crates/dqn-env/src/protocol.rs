//! Wire protocol: newline-delimited JSON frames over TCP
//!
//! A request is `{"op": "<name>", "body": {...}}` on one line. The reply is
//! `{"status": "ok", "body": {...}}` or `{"status": "error", "body": "<message>"}`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use dqn_core::{DiscreteAction, DqnError, EnvironmentDims, ResetOutcome, Result, StepOutcome};

/// Longest frame either side will buffer, newline included
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// One request/response pair of the protocol
pub trait Operation {
    /// Name carried in the `op` field
    const NAME: &'static str;
    /// Request body
    type Request: Serialize + DeserializeOwned + Send + Sync;
    /// Response body
    type Response: Serialize + DeserializeOwned + Send;
}

/// Fetch the environment's dimensions
#[derive(Debug, Clone, Copy)]
pub struct Setup;

/// Start a fresh episode, or acknowledge that one ended
#[derive(Debug, Clone, Copy)]
pub struct Reset;

/// Advance the environment by one action
#[derive(Debug, Clone, Copy)]
pub struct Step;

/// Body of a setup request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetupRequest {}

/// Body of a reset request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetRequest {
    /// Advisory text describing why the reset happens
    pub reason: String,
}

/// Body of a step request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepRequest {
    /// Action index
    pub action: DiscreteAction,
}

impl Operation for Setup {
    const NAME: &'static str = "setup";
    type Request = SetupRequest;
    type Response = EnvironmentDims;
}

impl Operation for Reset {
    const NAME: &'static str = "reset";
    type Request = ResetRequest;
    type Response = ResetOutcome;
}

impl Operation for Step {
    const NAME: &'static str = "step";
    type Request = StepRequest;
    type Response = StepOutcome;
}

/// Request envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    /// Operation name
    pub op: String,
    /// Operation-specific body
    #[serde(default)]
    pub body: serde_json::Value,
}

impl RequestFrame {
    /// Wrap a typed request
    pub fn new<O: Operation>(request: &O::Request) -> Result<Self> {
        Ok(Self {
            op: O::NAME.to_string(),
            body: serde_json::to_value(request)?,
        })
    }
}

/// Reply envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "body", rename_all = "lowercase")]
pub enum ReplyFrame {
    /// Success with an operation-specific body
    Ok(serde_json::Value),
    /// Failure with a diagnostic message
    Error(String),
}

impl ReplyFrame {
    /// Decode the body as the response of `O`
    pub fn into_response<O: Operation>(self) -> Result<O::Response> {
        match self {
            Self::Ok(body) => serde_json::from_value(body).map_err(|e| DqnError::MalformedResponse {
                operation: O::NAME,
                reason: e.to_string(),
            }),
            Self::Error(message) => Err(DqnError::Remote(message)),
        }
    }
}

/// Serialize a frame as one protocol line, newline included
pub fn encode_line<T: Serialize>(frame: &T) -> Result<Vec<u8>> {
    let mut line = serde_json::to_vec(frame)?;
    line.push(b'\n');
    Ok(line)
}

/// Result of reading one frame off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete line, newline stripped
    Line(Vec<u8>),
    /// No newline within [`MAX_FRAME_BYTES`]; the stream is no longer aligned
    Oversized,
    /// Peer closed the stream
    Closed,
}

/// Read one newline-terminated frame, buffering at most [`MAX_FRAME_BYTES`]
pub async fn read_frame<R>(reader: &mut R) -> std::io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let read = (&mut *reader)
        .take(MAX_FRAME_BYTES as u64)
        .read_until(b'\n', &mut line)
        .await?;
    if read == 0 {
        return Ok(Frame::Closed);
    }
    if line.last() == Some(&b'\n') {
        line.pop();
    } else if read == MAX_FRAME_BYTES {
        return Ok(Frame::Oversized);
    }
    Ok(Frame::Line(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dqn_core::StateVector;
    use serde_json::json;

    #[test]
    fn test_request_frame_layout() {
        let frame = RequestFrame::new::<Step>(&StepRequest {
            action: DiscreteAction(1),
        })
        .unwrap();
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value, json!({"op": "step", "body": {"action": 1}}));

        let setup = RequestFrame::new::<Setup>(&SetupRequest {}).unwrap();
        assert_eq!(serde_json::to_value(&setup).unwrap(), json!({"op": "setup", "body": {}}));
    }

    #[test]
    fn test_reply_frame_layout() {
        let ok = ReplyFrame::Ok(json!({"state_dim": 4, "action_dim": 2}));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"status": "ok", "body": {"state_dim": 4, "action_dim": 2}})
        );
        let err = ReplyFrame::Error("bad action".into());
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"status": "error", "body": "bad action"})
        );
    }

    #[test]
    fn test_decode_responses() {
        let reply: ReplyFrame = serde_json::from_str(
            r#"{"status":"ok","body":{"state":[0.1,0.2],"reward":1.0,"terminated":false,"truncated":true}}"#,
        )
        .unwrap();
        let step = reply.into_response::<Step>().unwrap();
        assert_eq!(step.state, StateVector::new(vec![0.1, 0.2]));
        assert!(step.truncated);
        assert!(!step.terminated);

        let reply: ReplyFrame =
            serde_json::from_str(r#"{"status":"ok","body":{"acknowledged":true,"state":[0.0]}}"#).unwrap();
        assert!(reply.into_response::<Reset>().unwrap().acknowledged);
    }

    #[test]
    fn test_error_reply_becomes_remote_error() {
        let reply = ReplyFrame::Error("invalid action 7".into());
        let err = reply.into_response::<Step>().unwrap_err();
        assert!(matches!(err, DqnError::Remote(msg) if msg == "invalid action 7"));
    }

    #[test]
    fn test_wrong_body_is_malformed() {
        let reply = ReplyFrame::Ok(json!({"state_dim": "four"}));
        let err = reply.into_response::<Setup>().unwrap_err();
        assert!(matches!(err, DqnError::MalformedResponse { operation: "setup", .. }));
    }

    #[tokio::test]
    async fn test_read_frame_splits_lines() {
        let mut input: &[u8] = b"{\"op\":\"setup\"}\nlast";
        assert_eq!(read_frame(&mut input).await.unwrap(), Frame::Line(b"{\"op\":\"setup\"}".to_vec()));
        assert_eq!(read_frame(&mut input).await.unwrap(), Frame::Line(b"last".to_vec()));
        assert_eq!(read_frame(&mut input).await.unwrap(), Frame::Closed);
    }

    #[tokio::test]
    async fn test_read_frame_stops_at_limit() {
        let data = vec![b'a'; MAX_FRAME_BYTES * 2];
        let mut input: &[u8] = &data;
        assert_eq!(read_frame(&mut input).await.unwrap(), Frame::Oversized);
        assert_eq!(input.len(), MAX_FRAME_BYTES);

        let mut exact = vec![b'a'; MAX_FRAME_BYTES - 1];
        exact.push(b'\n');
        let mut input: &[u8] = &exact;
        assert!(matches!(read_frame(&mut input).await.unwrap(), Frame::Line(l) if l.len() == MAX_FRAME_BYTES - 1));
    }

    #[test]
    fn test_encode_line_ends_with_newline() {
        let line = encode_line(&ReplyFrame::Error("x".into())).unwrap();
        assert_eq!(line.last(), Some(&b'\n'));
        assert_eq!(line.iter().filter(|&&b| b == b'\n').count(), 1);
    }
}
