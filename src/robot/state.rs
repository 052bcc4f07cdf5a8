use std::io::Write;
use std::time::Duration;

use tokio::time::Instant;

use crate::*;

pub static STATE_LOG_TARGET: &'static str = "service_state";

/// Polls the service state until the controller reports WORKING.
///
/// Returns the number of polls it took. Gives up once `timeout` has elapsed
/// since the first poll, reporting the last state it saw.
pub async fn wait_for_working<C: RobotClient, W: Write>(
    client: &mut C,
    console: &mut OperatorConsole<W>,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<u32, MotionTestError> {
    let started = Instant::now();
    let mut last = None;
    let mut polls = 0;

    while started.elapsed() < timeout {
        let state = client.get_robot_state().await?;
        polls += 1;
        last = Some(state);
        console.partial(format!("   Service state: {state} "));
        match state {
            ServiceState::Working => {
                console.line("✓ WORKING!");
                log::info!(target: STATE_LOG_TARGET, "Controller WORKING after {} polls.", polls);
                return Ok(polls);
            }
            ServiceState::Starting => console.line("(STARTING...)"),
            ServiceState::Ready => console.line("(READY, waiting for startup...)"),
            other => console.line(format!("(Unexpected state {other})")),
        }
        log::debug!(target: STATE_LOG_TARGET, "Poll {}: state {:?}.", polls, state);
        tokio::time::sleep(poll_interval).await;
    }

    log::error!(target: STATE_LOG_TARGET, "Controller not WORKING after {:?}, last state {:?}.", timeout, last);
    Err(MotionTestError::ReadyTimeout { timeout, last })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console() -> OperatorConsole<Vec<u8>> {
        OperatorConsole::new(Vec::new())
    }

    #[tokio::test(start_paused = true)]
    async fn returns_once_working_is_seen() {
        let mut client = StubClient::new().with_states(&[
            ServiceState::Ready,
            ServiceState::Starting,
            ServiceState::Starting,
            ServiceState::Working,
        ]);
        let mut console = console();
        let started = Instant::now();

        let polls = wait_for_working(
            &mut client,
            &mut console,
            Duration::from_millis(500),
            Duration::from_secs(10),
        )
        .await
        .unwrap();

        assert_eq!(polls, 4);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(1500) && waited < Duration::from_millis(2000));
        let text = String::from_utf8(console.into_inner()).unwrap();
        assert!(text.contains("(READY, waiting for startup...)"));
        assert!(text.contains("(STARTING...)"));
        assert!(text.contains("✓ WORKING!"));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_with_last_state() {
        let mut client = StubClient::new().with_states(&[ServiceState::Unknown(9)]);
        let mut console = console();

        let err = wait_for_working(
            &mut client,
            &mut console,
            Duration::from_millis(500),
            Duration::from_secs(10),
        )
        .await
        .unwrap_err();

        match err {
            MotionTestError::ReadyTimeout { timeout, last } => {
                assert_eq!(timeout, Duration::from_secs(10));
                assert_eq!(last, Some(ServiceState::Unknown(9)));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(client.count(StubCall::GetRobotState), 20);
        let text = String::from_utf8(console.into_inner()).unwrap();
        assert!(text.contains("(Unexpected state 9)"));
    }
}
