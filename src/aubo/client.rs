use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::{Framed, LinesCodec};

use crate::aubo::protocol::*;
use crate::*;

pub static AUBO_CLIENT_LOG_TARGET: &'static str = "aubo_client";
pub const AUBO_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
pub const AUBO_REPLY_TIMEOUT: Duration = Duration::from_secs(5);
pub const AUBO_BLOCKING_MOTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Returned by `connect` when the socket could not be opened. Local to this
/// client, the controller never sends it.
pub static SOCKET_CONNECT_FAILED: ResultCode = ResultCode(-1);

/// Talks to the controller's command port with newline-delimited JSON-RPC.
pub struct AuboClient {
    lines: Option<Framed<TcpStream, LinesCodec>>,
    next_id: u64,
    initialized: bool,
    context: bool,
    connect_timeout: Duration,
    reply_timeout: Duration,
    motion_timeout: Duration,
}

impl Default for AuboClient {
    fn default() -> Self {
        AuboClient::new()
    }
}

impl AuboClient {
    pub fn new() -> Self {
        AuboClient {
            lines: None,
            next_id: 1,
            initialized: false,
            context: false,
            connect_timeout: AUBO_CONNECT_TIMEOUT,
            reply_timeout: AUBO_REPLY_TIMEOUT,
            motion_timeout: AUBO_BLOCKING_MOTION_TIMEOUT,
        }
    }

    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.lines.is_some()
    }

    async fn call(
        &mut self,
        method: &str,
        params: Value,
        reply_timeout: Duration,
    ) -> Result<Value, ClientError> {
        let lines = self.lines.as_mut().ok_or(ClientError::NotConnected)?;
        let id = self.next_id;
        self.next_id += 1;

        let request = serde_json::to_string(&RpcRequest::new(method, params, id))?;
        log::trace!(target: AUBO_CLIENT_LOG_TARGET, "-> {}", request);
        if let Err(e) = lines.send(request).await {
            self.lines = None;
            return Err(e.into());
        }

        let reply = match timeout(reply_timeout, read_reply(lines, id)).await {
            Ok(reply) => reply,
            Err(_) => {
                return Err(ClientError::Timeout {
                    method: method.to_string(),
                    timeout: reply_timeout,
                })
            }
        };
        if let Err(ClientError::Closed) = reply {
            self.lines = None;
        }
        let reply = reply?;

        match reply.error {
            Some(error) => Err(ClientError::Remote {
                code: error.code,
                message: error.message,
            }),
            None => Ok(reply.result.unwrap_or(Value::Null)),
        }
    }

    async fn call_as<T: DeserializeOwned>(
        &mut self,
        method: &str,
        params: Value,
    ) -> Result<T, ClientError> {
        let value = self.call(method, params, self.reply_timeout).await?;
        decode(method, value)
    }
}

async fn read_reply(
    lines: &mut Framed<TcpStream, LinesCodec>,
    id: u64,
) -> Result<RpcReply, ClientError> {
    loop {
        match lines.next().await {
            Some(Ok(line)) => {
                log::trace!(target: AUBO_CLIENT_LOG_TARGET, "<- {}", line);
                let reply: RpcReply = match serde_json::from_str(&line) {
                    Ok(reply) => reply,
                    Err(e) => {
                        log::warn!(target: AUBO_CLIENT_LOG_TARGET, "Skipping unreadable line '{}': {}", line, e);
                        continue;
                    }
                };
                if reply.id == Some(id) {
                    return Ok(reply);
                }
                log::debug!(target: AUBO_CLIENT_LOG_TARGET, "Skipping reply {:?} while waiting for {}.", reply.id, id);
            }
            Some(Err(e)) => return Err(e.into()),
            None => return Err(ClientError::Closed),
        }
    }
}

fn decode<T: DeserializeOwned>(method: &str, value: Value) -> Result<T, ClientError> {
    serde_json::from_value(value.clone()).map_err(|e| ClientError::UnexpectedReply {
        method: method.to_string(),
        detail: format!("{value} ({e})"),
    })
}

impl RobotClient for AuboClient {
    async fn initialize(&mut self) -> Result<(), ClientError> {
        self.initialized = true;
        log::debug!(target: AUBO_CLIENT_LOG_TARGET, "Client initialized.");
        Ok(())
    }

    async fn create_context(&mut self) -> Result<(), ClientError> {
        if !self.initialized {
            log::warn!(target: AUBO_CLIENT_LOG_TARGET, "Creating a context on an uninitialized client.");
        }
        self.context = true;
        self.next_id = 1;
        Ok(())
    }

    async fn destroy_context(&mut self) -> Result<(), ClientError> {
        if self.lines.take().is_some() {
            log::warn!(target: AUBO_CLIENT_LOG_TARGET, "Context destroyed while still connected, socket dropped.");
        }
        self.context = false;
        Ok(())
    }

    async fn uninitialize(&mut self) -> Result<(), ClientError> {
        self.initialized = false;
        log::debug!(target: AUBO_CLIENT_LOG_TARGET, "Client uninitialized.");
        Ok(())
    }

    async fn connect(&mut self, host: &str, port: u16) -> Result<ResultCode, ClientError> {
        if !self.context {
            return Err(ClientError::NoContext);
        }
        let address = format!("{host}:{port}");
        match timeout(self.connect_timeout, TcpStream::connect(&address)).await {
            Ok(Ok(stream)) => {
                stream.set_nodelay(true)?;
                log::info!(
                    target: AUBO_CLIENT_LOG_TARGET,
                    "Connected to: {} with host ip {}",
                    stream.peer_addr()?,
                    stream.local_addr()?
                );
                self.lines = Some(Framed::new(
                    stream,
                    LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
                ));
                Ok(ResultCode::SUCCESS)
            }
            Ok(Err(e)) => {
                log::error!(target: AUBO_CLIENT_LOG_TARGET, "Could not connect to {}: {}", address, e);
                Ok(SOCKET_CONNECT_FAILED)
            }
            Err(_) => {
                log::error!(target: AUBO_CLIENT_LOG_TARGET, "Timed out connecting to {} after {:?}.", address, self.connect_timeout);
                Ok(SOCKET_CONNECT_FAILED)
            }
        }
    }

    async fn disconnect(&mut self) -> Result<(), ClientError> {
        match self.lines.take() {
            Some(mut lines) => {
                SinkExt::<String>::close(&mut lines).await?;
                log::info!(target: AUBO_CLIENT_LOG_TARGET, "Disconnected.");
            }
            None => log::debug!(target: AUBO_CLIENT_LOG_TARGET, "Disconnect without a connection."),
        }
        Ok(())
    }

    async fn get_robot_state(&mut self) -> Result<ServiceState, ClientError> {
        let raw: i32 = self.call_as(GET_ROBOT_STATE, json!([])).await?;
        Ok(ServiceState::from(raw))
    }

    async fn get_work_mode(&mut self) -> Result<WorkMode, ClientError> {
        let raw: i32 = self.call_as(GET_WORK_MODE, json!([])).await?;
        Ok(WorkMode::from(raw))
    }

    async fn get_current_waypoint(&mut self) -> Result<Option<Waypoint>, ClientError> {
        self.call_as(GET_CURRENT_WAYPOINT, json!([])).await
    }

    async fn robot_startup(&mut self, collision_class: u8) -> Result<ResultCode, ClientError> {
        self.call_as(ROBOT_STARTUP, json!([collision_class])).await
    }

    async fn robot_shutdown(&mut self) -> Result<ResultCode, ClientError> {
        self.call_as(ROBOT_SHUTDOWN, json!([])).await
    }

    async fn init_profile(&mut self) -> Result<ResultCode, ClientError> {
        self.call_as(INIT_PROFILE, json!([])).await
    }

    async fn set_joint_max_velocity(
        &mut self,
        limits: [f64; 6],
    ) -> Result<ResultCode, ClientError> {
        self.call_as(SET_JOINT_MAXVELC, json!([limits])).await
    }

    async fn set_joint_max_acceleration(
        &mut self,
        limits: [f64; 6],
    ) -> Result<ResultCode, ClientError> {
        self.call_as(SET_JOINT_MAXACC, json!([limits])).await
    }

    async fn move_joint(
        &mut self,
        target: JointVector,
        blocking: bool,
    ) -> Result<ResultCode, ClientError> {
        let reply_timeout = if blocking {
            self.motion_timeout
        } else {
            self.reply_timeout
        };
        let value = self
            .call(MOVE_JOINT, json!([target.0, blocking]), reply_timeout)
            .await?;
        decode(MOVE_JOINT, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accepts one connection and answers every request line with whatever
    /// `respond` returns. Yields the requests it saw.
    async fn fake_controller<F>(respond: F) -> (u16, JoinHandle<Vec<Value>>)
    where
        F: Fn(&Value) -> Vec<String> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut lines = Framed::new(stream, LinesCodec::new());
            let mut seen = vec![];
            while let Some(Ok(line)) = lines.next().await {
                let request: Value = serde_json::from_str(&line).unwrap();
                for reply in respond(&request) {
                    lines.send(reply).await.unwrap();
                }
                seen.push(request);
            }
            seen
        });
        (port, handle)
    }

    fn result_for(request: &Value, result: Value) -> String {
        json!({"jsonrpc": "2.0", "id": request["id"], "result": result}).to_string()
    }

    async fn connected(port: u16) -> AuboClient {
        let mut client = AuboClient::new().with_reply_timeout(Duration::from_secs(2));
        client.initialize().await.unwrap();
        client.create_context().await.unwrap();
        let code = client.connect("127.0.0.1", port).await.unwrap();
        assert!(code.is_success());
        client
    }

    #[tokio::test]
    async fn state_query_round_trips() {
        let (port, server) = fake_controller(|request| vec![result_for(request, json!(2))]).await;
        let mut client = connected(port).await;

        assert_eq!(client.get_robot_state().await.unwrap(), ServiceState::Working);
        client.disconnect().await.unwrap();

        let seen = server.await.unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["jsonrpc"], "2.0");
        assert_eq!(seen[0]["method"], "get_robot_state");
        assert_eq!(seen[0]["id"], 1);
    }

    #[tokio::test]
    async fn stale_replies_are_skipped() {
        let (port, server) = fake_controller(|request| {
            vec![
                json!({"id": 999, "result": 4}).to_string(),
                result_for(request, json!(1)),
            ]
        })
        .await;
        let mut client = connected(port).await;

        assert_eq!(client.get_work_mode().await.unwrap(), WorkMode::Real);
        client.disconnect().await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unreadable_lines_are_skipped() {
        let (port, server) = fake_controller(|request| {
            vec!["Aubo controller ready".to_string(), result_for(request, json!(0))]
        })
        .await;
        let mut client = connected(port).await;

        assert_eq!(client.get_robot_state().await.unwrap(), ServiceState::Ready);
        assert!(client.is_connected());
        client.disconnect().await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn disconnect_closes_the_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut lines = Framed::new(stream, LinesCodec::new());
            lines.next().await.is_none()
        });
        let mut client = connected(port).await;

        client.disconnect().await.unwrap();
        assert!(!client.is_connected());
        let saw_eof = timeout(Duration::from_secs(2), server)
            .await
            .expect("controller side never saw the socket close")
            .unwrap();
        assert!(saw_eof);
        assert!(matches!(
            client.get_robot_state().await,
            Err(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn remote_errors_are_faults() {
        let (port, server) = fake_controller(|request| {
            vec![json!({"id": request["id"], "error": {"code": 10023, "message": "not enabled"}})
                .to_string()]
        })
        .await;
        let mut client = connected(port).await;

        let target = JointVector([0.0, 0.0, 0.0, 0.0, 0.5, 0.0]);
        match client.move_joint(target, false).await {
            Err(ClientError::Remote { code, message }) => {
                assert_eq!(code, 10023);
                assert_eq!(message, "not enabled");
            }
            other => panic!("expected remote error, got {other:?}"),
        }
        client.disconnect().await.unwrap();

        let seen = server.await.unwrap();
        assert_eq!(seen[0]["method"], "move_joint");
        assert_eq!(seen[0]["params"], json!([[0.0, 0.0, 0.0, 0.0, 0.5, 0.0], false]));
    }

    #[tokio::test]
    async fn waypoint_may_be_missing() {
        let (port, server) = fake_controller(|request| {
            let result = if request["id"] == 1 {
                Value::Null
            } else {
                json!({"joint": [0.0, 0.1, 0.2, 0.3, 0.4, 0.5], "pos": [0.3, 0.0, 0.4]})
            };
            vec![result_for(request, result)]
        })
        .await;
        let mut client = connected(port).await;

        assert_eq!(client.get_current_waypoint().await.unwrap(), None);
        let waypoint = client.get_current_waypoint().await.unwrap().unwrap();
        assert_eq!(
            waypoint.joints(),
            Some(JointVector([0.0, 0.1, 0.2, 0.3, 0.4, 0.5]))
        );
        client.disconnect().await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn limits_are_sent_as_one_array() {
        let (port, server) = fake_controller(|request| vec![result_for(request, json!(0))]).await;
        let mut client = connected(port).await;

        let code = client.set_joint_max_velocity([0.2; 6]).await.unwrap();
        assert!(code.is_success());
        client.disconnect().await.unwrap();

        let seen = server.await.unwrap();
        assert_eq!(seen[0]["method"], "set_joint_maxvelc");
        assert_eq!(seen[0]["params"], json!([[0.2, 0.2, 0.2, 0.2, 0.2, 0.2]]));
    }

    #[tokio::test]
    async fn null_code_is_an_unexpected_reply() {
        let (port, server) = fake_controller(|request| vec![result_for(request, Value::Null)]).await;
        let mut client = connected(port).await;

        match client.robot_startup(6).await {
            Err(ClientError::UnexpectedReply { method, .. }) => assert_eq!(method, "robot_startup"),
            other => panic!("expected unexpected reply, got {other:?}"),
        }
        client.disconnect().await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_controller_gives_a_failure_code() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut client = AuboClient::new();
        client.initialize().await.unwrap();
        client.create_context().await.unwrap();
        let code = client.connect("127.0.0.1", port).await.unwrap();
        assert_eq!(code, SOCKET_CONNECT_FAILED);
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn calls_need_a_connection() {
        let mut client = AuboClient::new();
        assert!(matches!(
            client.connect("127.0.0.1", 8899).await,
            Err(ClientError::NoContext)
        ));
        assert!(matches!(
            client.get_robot_state().await,
            Err(ClientError::NotConnected)
        ));
        client.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn closed_socket_drops_the_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut lines = Framed::new(stream, LinesCodec::new());
            let _ = lines.next().await;
        });
        let mut client = connected(port).await;

        assert!(matches!(
            client.robot_shutdown().await,
            Err(ClientError::Closed)
        ));
        assert!(!client.is_connected());
        server.await.unwrap();
    }
}
