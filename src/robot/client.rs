use crate::{ClientError, JointVector, ResultCode, ServiceState, Waypoint, WorkMode};

/// Operations the motion test needs from a robot controller.
///
/// Commands answer with the controller's `ResultCode`; an `Err` is a raised
/// fault (transport failure, malformed reply, remote exception).
#[allow(async_fn_in_trait)]
pub trait RobotClient {
    async fn initialize(&mut self) -> Result<(), ClientError>;
    async fn create_context(&mut self) -> Result<(), ClientError>;
    async fn destroy_context(&mut self) -> Result<(), ClientError>;
    async fn uninitialize(&mut self) -> Result<(), ClientError>;

    async fn connect(&mut self, host: &str, port: u16) -> Result<ResultCode, ClientError>;
    async fn disconnect(&mut self) -> Result<(), ClientError>;

    async fn get_robot_state(&mut self) -> Result<ServiceState, ClientError>;
    async fn get_work_mode(&mut self) -> Result<WorkMode, ClientError>;
    async fn get_current_waypoint(&mut self) -> Result<Option<Waypoint>, ClientError>;

    /// Power the arm and release the brakes.
    async fn robot_startup(&mut self, collision_class: u8) -> Result<ResultCode, ClientError>;
    async fn robot_shutdown(&mut self) -> Result<ResultCode, ClientError>;

    async fn init_profile(&mut self) -> Result<ResultCode, ClientError>;
    async fn set_joint_max_velocity(&mut self, limits: [f64; 6])
        -> Result<ResultCode, ClientError>;
    async fn set_joint_max_acceleration(
        &mut self,
        limits: [f64; 6],
    ) -> Result<ResultCode, ClientError>;

    /// With `blocking == false` the call returns once the controller has
    /// accepted the motion, not when the motion is done.
    async fn move_joint(
        &mut self,
        target: JointVector,
        blocking: bool,
    ) -> Result<ResultCode, ClientError>;
}
