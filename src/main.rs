use aubo_motion_test::*;
use std::error::Error;

pub static NODE_ID: &'static str = "aubo_motion_test";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    initialize_env_logger();
    let config = MotionTestConfig::from_env();

    let mut console = OperatorConsole::new(std::io::stdout());
    let mut input = std::io::stdin().lock();

    let report = if config.dry_run {
        log::warn!(target: NODE_ID, "Dry run, no controller will be contacted.");
        let mut client = StubClient::new();
        operator_motion_test(&mut client, &config, &mut input, &mut console).await?
    } else {
        log::info!(target: NODE_ID, "Testing the controller at {}.", config.address());
        let mut client = AuboClient::new();
        operator_motion_test(&mut client, &config, &mut input, &mut console).await?
    };

    match &report.cleanup {
        Some(cleanup) if !cleanup.is_clean() => {
            log::warn!(target: NODE_ID, "Teardown was incomplete: {:?}", cleanup)
        }
        _ => (),
    }
    log::info!(target: NODE_ID, "Finished: {}.", report.outcome);

    Ok(())
}
