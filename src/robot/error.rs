use std::time::Duration;
use thiserror::Error;

use crate::{ResultCode, ServiceState};

/// A fault raised by a robot client call.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("line codec error: {0}")]
    Codec(#[from] tokio_util::codec::LinesCodecError),
    #[error("controller replied with error {code}: {message}")]
    Remote { code: i32, message: String },
    #[error("no reply to '{method}' within {timeout:?}")]
    Timeout { method: String, timeout: Duration },
    #[error("not connected")]
    NotConnected,
    #[error("no session context, create one before connecting")]
    NoContext,
    #[error("connection closed by the controller")]
    Closed,
    #[error("unexpected reply to '{method}': {detail}")]
    UnexpectedReply { method: String, detail: String },
    /// Raised by a client without a more specific kind, e.g. a scripted
    /// controller fault.
    #[error("{0}")]
    Fault(String),
}

/// Faults that end the motion test before or during its main sequence.
#[derive(Debug, Error)]
pub enum MotionTestError {
    #[error("connection to {address} failed: {detail}")]
    Connection { address: String, detail: String },
    #[error("waypoint has no usable joint field: {raw}")]
    MissingWaypoint { raw: String },
    #[error("service state did not reach WORKING within {timeout:?} (last observed: {})", describe_state(.last))]
    ReadyTimeout {
        timeout: Duration,
        last: Option<ServiceState>,
    },
    #[error("client fault: {0}")]
    Client(#[from] ClientError),
    #[error("panic during motion test: {0}")]
    Panicked(String),
}

impl MotionTestError {
    pub fn connection_code(address: &str, code: ResultCode) -> Self {
        MotionTestError::Connection {
            address: address.to_string(),
            detail: format!("result code {code}"),
        }
    }
}

fn describe_state(state: &Option<ServiceState>) -> String {
    match state {
        Some(state) => state.to_string(),
        None => "none".to_string(),
    }
}
