use std::collections::{HashSet, VecDeque};

use crate::*;

pub static STUB_LOG_TARGET: &'static str = "stub_client";
pub static STUB_HOME_JOINT_STATE: [f64; 6] = [0.0, -0.2618, 1.7453, 0.4363, 1.5708, 0.0];

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum StubCall {
    Initialize,
    CreateContext,
    DestroyContext,
    Uninitialize,
    Connect,
    Disconnect,
    GetRobotState,
    GetWorkMode,
    GetCurrentWaypoint,
    RobotStartup,
    RobotShutdown,
    InitProfile,
    SetJointMaxVelocity,
    SetJointMaxAcceleration,
    MoveJoint,
}

/// In-process controller with scripted answers and a journal of every call.
///
/// Unless told otherwise it connects, reports WORKING, accepts every command
/// and follows accepted joint moves.
#[derive(Debug)]
pub struct StubClient {
    calls: Vec<StubCall>,
    moves: Vec<(JointVector, bool)>,
    connect_code: ResultCode,
    states: VecDeque<ServiceState>,
    last_state: ServiceState,
    work_mode: WorkMode,
    waypoint: Option<Waypoint>,
    startup_code: ResultCode,
    move_results: VecDeque<Result<ResultCode, String>>,
    faults: HashSet<StubCall>,
    panic_on: Option<StubCall>,
}

impl Default for StubClient {
    fn default() -> Self {
        StubClient::new()
    }
}

impl StubClient {
    pub fn new() -> Self {
        StubClient {
            calls: vec![],
            moves: vec![],
            connect_code: ResultCode::SUCCESS,
            states: VecDeque::new(),
            last_state: ServiceState::Working,
            work_mode: WorkMode::Simulation,
            waypoint: Some(Waypoint::from_joints(JointVector(STUB_HOME_JOINT_STATE))),
            startup_code: ResultCode::SUCCESS,
            move_results: VecDeque::new(),
            faults: HashSet::new(),
            panic_on: None,
        }
    }

    pub fn with_connect_code(mut self, code: ResultCode) -> Self {
        self.connect_code = code;
        self
    }

    /// States reported by successive polls; the last one repeats forever.
    pub fn with_states(mut self, states: &[ServiceState]) -> Self {
        self.states = states.iter().copied().collect();
        if let Some(last) = states.last() {
            self.last_state = *last;
        }
        self
    }

    pub fn with_work_mode(mut self, mode: WorkMode) -> Self {
        self.work_mode = mode;
        self
    }

    pub fn with_waypoint(mut self, waypoint: Option<Waypoint>) -> Self {
        self.waypoint = waypoint;
        self
    }

    pub fn with_pose(self, joints: JointVector) -> Self {
        self.with_waypoint(Some(Waypoint::from_joints(joints)))
    }

    pub fn with_startup_code(mut self, code: ResultCode) -> Self {
        self.startup_code = code;
        self
    }

    /// Answers for successive `move_joint` calls; `Err` raises a fault.
    /// Once exhausted, moves are accepted.
    pub fn with_move_results(mut self, results: Vec<Result<ResultCode, String>>) -> Self {
        self.move_results = results.into();
        self
    }

    /// Makes every call of this kind raise a fault.
    pub fn with_fault(mut self, call: StubCall) -> Self {
        self.faults.insert(call);
        self
    }

    pub fn with_panic(mut self, call: StubCall) -> Self {
        self.panic_on = Some(call);
        self
    }

    pub fn calls(&self) -> &[StubCall] {
        &self.calls
    }

    pub fn count(&self, call: StubCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    pub fn moves(&self) -> &[(JointVector, bool)] {
        &self.moves
    }

    fn record(&mut self, call: StubCall) -> Result<(), ClientError> {
        log::debug!(target: STUB_LOG_TARGET, "{:?}", call);
        self.calls.push(call);
        if self.panic_on == Some(call) {
            panic!("stub controller panicked in {call:?}");
        }
        if self.faults.contains(&call) {
            return Err(ClientError::Fault(format!("injected fault in {call:?}")));
        }
        Ok(())
    }
}

impl RobotClient for StubClient {
    async fn initialize(&mut self) -> Result<(), ClientError> {
        self.record(StubCall::Initialize)
    }

    async fn create_context(&mut self) -> Result<(), ClientError> {
        self.record(StubCall::CreateContext)
    }

    async fn destroy_context(&mut self) -> Result<(), ClientError> {
        self.record(StubCall::DestroyContext)
    }

    async fn uninitialize(&mut self) -> Result<(), ClientError> {
        self.record(StubCall::Uninitialize)
    }

    async fn connect(&mut self, host: &str, port: u16) -> Result<ResultCode, ClientError> {
        self.record(StubCall::Connect)?;
        log::debug!(target: STUB_LOG_TARGET, "Pretending to connect to {}:{}.", host, port);
        Ok(self.connect_code)
    }

    async fn disconnect(&mut self) -> Result<(), ClientError> {
        self.record(StubCall::Disconnect)
    }

    async fn get_robot_state(&mut self) -> Result<ServiceState, ClientError> {
        self.record(StubCall::GetRobotState)?;
        Ok(self.states.pop_front().unwrap_or(self.last_state))
    }

    async fn get_work_mode(&mut self) -> Result<WorkMode, ClientError> {
        self.record(StubCall::GetWorkMode)?;
        Ok(self.work_mode)
    }

    async fn get_current_waypoint(&mut self) -> Result<Option<Waypoint>, ClientError> {
        self.record(StubCall::GetCurrentWaypoint)?;
        Ok(self.waypoint.clone())
    }

    async fn robot_startup(&mut self, _collision_class: u8) -> Result<ResultCode, ClientError> {
        self.record(StubCall::RobotStartup)?;
        Ok(self.startup_code)
    }

    async fn robot_shutdown(&mut self) -> Result<ResultCode, ClientError> {
        self.record(StubCall::RobotShutdown)?;
        Ok(ResultCode::SUCCESS)
    }

    async fn init_profile(&mut self) -> Result<ResultCode, ClientError> {
        self.record(StubCall::InitProfile)?;
        Ok(ResultCode::SUCCESS)
    }

    async fn set_joint_max_velocity(
        &mut self,
        _limits: [f64; 6],
    ) -> Result<ResultCode, ClientError> {
        self.record(StubCall::SetJointMaxVelocity)?;
        Ok(ResultCode::SUCCESS)
    }

    async fn set_joint_max_acceleration(
        &mut self,
        _limits: [f64; 6],
    ) -> Result<ResultCode, ClientError> {
        self.record(StubCall::SetJointMaxAcceleration)?;
        Ok(ResultCode::SUCCESS)
    }

    async fn move_joint(
        &mut self,
        target: JointVector,
        blocking: bool,
    ) -> Result<ResultCode, ClientError> {
        self.record(StubCall::MoveJoint)?;
        self.moves.push((target, blocking));
        let code = match self.move_results.pop_front() {
            Some(Ok(code)) => code,
            Some(Err(message)) => return Err(ClientError::Fault(message)),
            None => ResultCode::SUCCESS,
        };
        if code.is_success() {
            if let Some(waypoint) = self.waypoint.as_mut() {
                waypoint.joint = Some(target.0.to_vec());
            }
        }
        Ok(code)
    }
}
