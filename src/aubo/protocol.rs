use serde::{Deserialize, Serialize};
use serde_json::Value;

pub static JSONRPC_VERSION: &'static str = "2.0";
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

pub static GET_ROBOT_STATE: &'static str = "get_robot_state";
pub static GET_WORK_MODE: &'static str = "get_work_mode";
pub static GET_CURRENT_WAYPOINT: &'static str = "get_current_waypoint";
pub static ROBOT_STARTUP: &'static str = "robot_startup";
pub static ROBOT_SHUTDOWN: &'static str = "robot_shutdown";
pub static INIT_PROFILE: &'static str = "init_profile";
pub static SET_JOINT_MAXVELC: &'static str = "set_joint_maxvelc";
pub static SET_JOINT_MAXACC: &'static str = "set_joint_maxacc";
pub static MOVE_JOINT: &'static str = "move_joint";

/// One request line sent to the controller.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
    pub id: u64,
}

impl RpcRequest {
    pub fn new(method: &str, params: Value, id: u64) -> Self {
        RpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params,
            id,
        }
    }
}

/// One reply line. Exactly one of `result` and `error` is expected.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcReply {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcErrorBody {
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_as_jsonrpc() {
        let request = RpcRequest::new(MOVE_JOINT, json!([[0.0, 0.0, 0.0, 0.0, 0.5, 0.0], false]), 7);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "jsonrpc": "2.0",
                "method": "move_joint",
                "params": [[0.0, 0.0, 0.0, 0.0, 0.5, 0.0], false],
                "id": 7
            })
        );
    }

    #[test]
    fn error_reply_without_message_parses() {
        let reply: RpcReply = serde_json::from_str(r#"{"id": 3, "error": {"code": 10023}}"#).unwrap();
        assert_eq!(reply.id, Some(3));
        assert!(reply.result.is_none());
        assert_eq!(
            reply.error,
            Some(RpcErrorBody {
                code: 10023,
                message: String::new()
            })
        );
    }

    #[test]
    fn null_result_is_absent() {
        // serde maps an explicit null onto None for Option<Value>.
        let reply: RpcReply = serde_json::from_str(r#"{"id": 1, "result": null}"#).unwrap();
        assert!(reply.result.is_none());
    }
}
