use std::any::Any;
use std::fmt;
use std::io::{BufRead, Write};
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::*;

pub static MOTION_TEST_LOG_TARGET: &'static str = "motion_test";
pub static REJECTED_MOTION_CODE: ResultCode = ResultCode(10023);

#[derive(Clone, PartialEq, Debug)]
pub enum MoveVerdict {
    Accepted,
    Rejected(ResultCode),
    Faulted(String),
}

impl MoveVerdict {
    pub fn is_accepted(&self) -> bool {
        *self == MoveVerdict::Accepted
    }
}

impl fmt::Display for MoveVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveVerdict::Accepted => write!(f, "accepted"),
            MoveVerdict::Rejected(code) => write!(f, "{code}"),
            MoveVerdict::Faulted(message) => write!(f, "fault ({message})"),
        }
    }
}

#[derive(Debug)]
pub enum MotionTestOutcome {
    /// The operator did not confirm; nothing was sent to the controller.
    Cancelled,
    /// The sequence stopped before the motion phase finished.
    Aborted(MotionTestError),
    /// Both motions were attempted, or the outbound one was refused.
    Finished {
        outbound: MoveVerdict,
        inbound: Option<MoveVerdict>,
    },
}

impl fmt::Display for MotionTestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionTestOutcome::Cancelled => write!(f, "cancelled by operator"),
            MotionTestOutcome::Aborted(e) => write!(f, "aborted: {e}"),
            MotionTestOutcome::Finished { outbound, inbound } => match inbound {
                Some(inbound) => write!(f, "outbound move {outbound}, return move {inbound}"),
                None => write!(f, "outbound move {outbound}, no return move"),
            },
        }
    }
}

/// Which teardown steps went through without a fault.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct CleanupReport {
    pub shutdown: bool,
    pub disconnect: bool,
    pub destroy_context: bool,
    pub uninitialize: bool,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.shutdown && self.disconnect && self.destroy_context && self.uninitialize
    }
}

#[derive(Debug)]
pub struct MotionTestReport {
    pub outcome: MotionTestOutcome,
    /// `None` when the test never started.
    pub cleanup: Option<CleanupReport>,
}

/// Full operator flow: banner, confirmation prompt, then the motion test.
///
/// Only console I/O failures surface as `Err`; everything the controller
/// does is reported in the returned `MotionTestReport`.
pub async fn operator_motion_test<C, R, W>(
    client: &mut C,
    config: &MotionTestConfig,
    input: &mut R,
    console: &mut OperatorConsole<W>,
) -> std::io::Result<MotionTestReport>
where
    C: RobotClient,
    R: BufRead,
    W: Write,
{
    console.banner("Aubo Robot Simple Motion Test");

    if !confirm_operator(input, console, &config.confirmation)? {
        console.line("Test cancelled.");
        log::warn!(target: MOTION_TEST_LOG_TARGET, "Operator did not confirm, nothing was sent.");
        return Ok(MotionTestReport {
            outcome: MotionTestOutcome::Cancelled,
            cleanup: None,
        });
    }

    Ok(run_motion_test(client, config, console).await)
}

/// Runs the motion sequence and then, unconditionally, the cleanup phase.
pub async fn run_motion_test<C: RobotClient, W: Write>(
    client: &mut C,
    config: &MotionTestConfig,
    console: &mut OperatorConsole<W>,
) -> MotionTestReport {
    let body = AssertUnwindSafe(motion_sequence(client, config, console))
        .catch_unwind()
        .await;

    let outcome = match body {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            if matches!(e, MotionTestError::Client(_)) {
                report_fault(console, &e);
            }
            MotionTestOutcome::Aborted(e)
        }
        Err(payload) => {
            let e = MotionTestError::Panicked(panic_message(payload));
            report_fault(console, &e);
            MotionTestOutcome::Aborted(e)
        }
    };

    let cleanup = cleanup(client, console).await;
    log::info!(target: MOTION_TEST_LOG_TARGET, "Motion test result: {}.", outcome);

    MotionTestReport {
        outcome,
        cleanup: Some(cleanup),
    }
}

async fn motion_sequence<C: RobotClient, W: Write>(
    client: &mut C,
    config: &MotionTestConfig,
    console: &mut OperatorConsole<W>,
) -> Result<MotionTestOutcome, MotionTestError> {
    client.initialize().await?;
    client.create_context().await?;

    console.line("\n1. Connecting to robot...");
    let address = config.address();
    match client.connect(&config.host, config.port).await {
        Ok(code) if code.is_success() => (),
        Ok(code) => {
            console.line(format!("✗ Connection failed: {code}"));
            log::error!(target: MOTION_TEST_LOG_TARGET, "Connecting to {} returned {}.", address, code);
            return Err(MotionTestError::connection_code(&address, code));
        }
        Err(e) => {
            console.line(format!("✗ Connection failed: {e}"));
            log::error!(target: MOTION_TEST_LOG_TARGET, "Connecting to {} failed with {}.", address, e);
            return Err(MotionTestError::Connection {
                address,
                detail: e.to_string(),
            });
        }
    }
    console.line("✓ Connected");
    log::info!(target: MOTION_TEST_LOG_TARGET, "Connected to {}.", address);

    console.line("\n2. Checking robot state...");
    let state = client.get_robot_state().await?;
    console.line(format!("   Service state: {state}"));
    console.line("   States: 0=READY, 1=STARTING, 2=WORKING, 3=CLOSING, 4=CLOSED");
    let work_mode = client.get_work_mode().await?;
    console.line(format!("   Work mode: {work_mode} (0=simulation, 1=real)"));
    log::info!(target: MOTION_TEST_LOG_TARGET, "Service state {:?}, work mode {:?}.", state, work_mode);

    console.line("\n3. Reading current position...");
    let waypoint = client.get_current_waypoint().await?;
    let current = match waypoint.as_ref().and_then(Waypoint::joints) {
        Some(joints) => joints,
        None => {
            let raw = format!("{waypoint:?}");
            console.line(format!("   Waypoint data: {raw}"));
            log::error!(target: MOTION_TEST_LOG_TARGET, "No joint angles in the waypoint, not moving.");
            return Err(MotionTestError::MissingWaypoint { raw });
        }
    };
    console.line(format!("   Joints (rad): {}", current.format_radians()));
    console.line(format!("   Joints (deg): {}", current.format_degrees()));

    console.line("\n4. Starting robot (enabling power)...");
    let code = client.robot_startup(config.collision_class).await?;
    if code.is_success() {
        console.line("✓ Robot startup command sent");
    } else {
        console.line(format!("✗ Startup failed: {code}"));
        console.line("   Robot may already be powered on or in error state.");
        log::warn!(target: MOTION_TEST_LOG_TARGET, "Startup returned {}, continuing.", code);
    }

    console.line("\n   Waiting for service state to become WORKING (state=2)...");
    if let Err(e) =
        wait_for_working(client, console, config.poll_interval, config.ready_timeout).await
    {
        if let MotionTestError::ReadyTimeout { last, .. } = &e {
            report_ready_timeout(console, *last);
        }
        return Err(e);
    }
    tokio::time::sleep(config.ready_settle).await;

    console.line("\n5. Initializing motion profile...");
    let code = client.init_profile().await?;
    log::debug!(target: MOTION_TEST_LOG_TARGET, "init_profile returned {}.", code);

    console.line("\n6. Setting motion parameters (very slow)...");
    let code = client
        .set_joint_max_velocity(config.limits.max_velocity)
        .await?;
    log::debug!(target: MOTION_TEST_LOG_TARGET, "Joint max velocity returned {}.", code);
    let code = client
        .set_joint_max_acceleration(config.limits.max_acceleration)
        .await?;
    log::debug!(target: MOTION_TEST_LOG_TARGET, "Joint max acceleration returned {}.", code);
    console.line("✓ Parameters set");

    console.line(format!(
        "\n7. Moving joint {} by {} rad ({:.2}°)...",
        config.joint_index + 1,
        config.joint_offset,
        config.joint_offset.to_degrees()
    ));
    let target = current.with_offset(config.joint_index, config.joint_offset);
    console.line(format!("   From: {}", current.format_radians()));
    console.line(format!("   To:   {}", target.format_radians()));

    console.line("\n   Attempting move_joint (async mode)...");
    let outbound = issue_move(client, console, target, false).await;
    if !outbound.is_accepted() {
        console.line(format!("✗ Motion failed: {outbound}"));
        console.line(format!("   Error code {REJECTED_MOTION_CODE} usually means:"));
        console.line("   - Robot is in wrong mode (check teach pendant)");
        console.line("   - Safety limits exceeded");
        console.line("   - Robot needs to be enabled manually first");
        return Ok(MotionTestOutcome::Finished {
            outbound,
            inbound: None,
        });
    }

    console.line("✓ Motion command accepted!");
    console.line(format!(
        "   Waiting {} seconds for completion...",
        config.motion_settle.as_secs_f64()
    ));
    // Fixed delay, not a completion signal: the controller may still be moving.
    tokio::time::sleep(config.motion_settle).await;
    report_displacement(client, console, config, &current).await;

    console.line("\n8. Moving back to original position...");
    let inbound = issue_move(client, console, current, true).await;
    if inbound.is_accepted() {
        console.line("✓ Return motion accepted!");
        tokio::time::sleep(config.motion_settle).await;
        console.line("✓ Motion test complete!");
    } else {
        console.line(format!("✗ Return motion failed: {inbound}"));
    }

    Ok(MotionTestOutcome::Finished {
        outbound,
        inbound: Some(inbound),
    })
}

async fn issue_move<C: RobotClient, W: Write>(
    client: &mut C,
    console: &mut OperatorConsole<W>,
    target: JointVector,
    blocking: bool,
) -> MoveVerdict {
    match client.move_joint(target, blocking).await {
        Ok(code) => {
            console.line(format!("   move_joint returned: {code}"));
            if code.is_success() {
                MoveVerdict::Accepted
            } else {
                log::warn!(target: MOTION_TEST_LOG_TARGET, "move_joint rejected with {}.", code);
                MoveVerdict::Rejected(code)
            }
        }
        Err(e) => {
            console.line(format!("   ✗ move_joint exception: {e}"));
            log::warn!(target: MOTION_TEST_LOG_TARGET, "move_joint raised {:?}, treating it as rejected.", e);
            MoveVerdict::Faulted(e.to_string())
        }
    }
}

/// Read-back after the outbound move. Purely informational, so faults here
/// do not stop the return move.
async fn report_displacement<C: RobotClient, W: Write>(
    client: &mut C,
    console: &mut OperatorConsole<W>,
    config: &MotionTestConfig,
    start: &JointVector,
) {
    match client.get_current_waypoint().await {
        Ok(waypoint) => {
            if let Some(fin) = waypoint.as_ref().and_then(Waypoint::joints) {
                let moved = fin.0[config.joint_index] - start.0[config.joint_index];
                console.line(format!("   Final: {}", fin.format_radians()));
                console.line(format!(
                    "   Moved: {:.4} rad ({:.2}°)",
                    moved,
                    moved.to_degrees()
                ));
            }
        }
        Err(e) => {
            log::warn!(target: MOTION_TEST_LOG_TARGET, "Could not read back the pose: {}", e);
        }
    }
}

fn report_ready_timeout<W: Write>(console: &mut OperatorConsole<W>, last: Option<ServiceState>) {
    console.line("\n   ⚠️  TIMEOUT: Robot did not reach WORKING state!");
    match last {
        Some(state) => console.line(format!("   Current service state: {state}")),
        None => console.line("   Current service state: never read"),
    }
    console.line("\n   DIAGNOSIS:");
    console.line("   - The robot is powered on but not in operational state");
    console.line("   - Check the teach pendant screen for error messages");
    console.line("   - Verify the STANDBY indicator is lit on control box");
    console.line("   - Try manually starting a program on teach pendant");
    console.line("   - The robot may need to be enabled via teach pendant first");
    console.line("\n   Cannot proceed with motion test.");
}

fn report_fault<W: Write>(console: &mut OperatorConsole<W>, e: &MotionTestError) {
    console.line(format!("\n✗ Exception: {e}"));
    log::error!(target: MOTION_TEST_LOG_TARGET, "Motion test fault: {:#?}", e);
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

async fn cleanup<C: RobotClient, W: Write>(
    client: &mut C,
    console: &mut OperatorConsole<W>,
) -> CleanupReport {
    console.line("\n9. Shutting down robot...");
    let shutdown = match client.robot_shutdown().await {
        Ok(code) if code.is_success() => true,
        Ok(code) => {
            log::warn!(target: MOTION_TEST_LOG_TARGET, "Shutdown returned {}.", code);
            false
        }
        Err(e) => cleanup_step("shutdown", Err::<(), _>(e)),
    };

    console.line("\n10. Disconnecting...");
    let disconnect = cleanup_step("disconnect", client.disconnect().await);
    let destroy_context = cleanup_step("destroy context", client.destroy_context().await);
    let uninitialize = cleanup_step("uninitialize", client.uninitialize().await);
    console.line("✓ Done");

    CleanupReport {
        shutdown,
        disconnect,
        destroy_context,
        uninitialize,
    }
}

fn cleanup_step<T>(step: &str, result: Result<T, ClientError>) -> bool {
    match result {
        Ok(_) => true,
        Err(e) => {
            log::warn!(target: MOTION_TEST_LOG_TARGET, "Cleanup step '{}' failed: {}", step, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_become_messages() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("bang".to_string())), "bang");
        assert_eq!(panic_message(Box::new(7u8)), "unknown panic payload");
    }

    #[test]
    fn cleanup_report_needs_every_step() {
        let mut report = CleanupReport {
            shutdown: true,
            disconnect: true,
            destroy_context: true,
            uninitialize: true,
        };
        assert!(report.is_clean());
        report.destroy_context = false;
        assert!(!report.is_clean());
    }

    #[test]
    fn outcome_reads_well_in_logs() {
        let outcome = MotionTestOutcome::Finished {
            outbound: MoveVerdict::Accepted,
            inbound: Some(MoveVerdict::Rejected(ResultCode(10023))),
        };
        assert_eq!(
            outcome.to_string(),
            "outbound move accepted, return move 10023"
        );
    }
}
