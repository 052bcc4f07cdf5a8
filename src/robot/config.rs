use std::time::Duration;

use crate::MotionLimits;

pub static CONFIG_LOG_TARGET: &'static str = "motion_test_config";
pub static DEFAULT_AUBO_ADDRESS: &'static str = "192.168.1.10";
pub const DEFAULT_AUBO_PORT: u16 = 8899;
pub static CONFIRMATION_TOKEN: &'static str = "YES";

#[derive(Clone, Debug, PartialEq)]
pub struct MotionTestConfig {
    pub host: String,
    pub port: u16,
    pub confirmation: String,
    pub collision_class: u8,
    pub limits: MotionLimits,
    pub joint_index: usize,
    pub joint_offset: f64,
    pub poll_interval: Duration,
    pub ready_timeout: Duration,
    pub ready_settle: Duration,
    // Stands in for a motion-complete signal the controller never sends.
    pub motion_settle: Duration,
    pub dry_run: bool,
}

impl Default for MotionTestConfig {
    fn default() -> Self {
        MotionTestConfig {
            host: DEFAULT_AUBO_ADDRESS.to_string(),
            port: DEFAULT_AUBO_PORT,
            confirmation: CONFIRMATION_TOKEN.to_string(),
            collision_class: 6,
            limits: MotionLimits::default(),
            joint_index: 4,
            joint_offset: 0.5,
            poll_interval: Duration::from_millis(500),
            ready_timeout: Duration::from_secs(10),
            ready_settle: Duration::from_secs(1),
            motion_settle: Duration::from_secs(5),
            dry_run: false,
        }
    }
}

impl MotionTestConfig {
    /// Defaults with the endpoint and dry-run flag taken from
    /// `AUBO_ADDRESS`, `AUBO_PORT` and `MOTION_TEST_DRY_RUN`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = MotionTestConfig::default();

        match lookup("AUBO_ADDRESS") {
            Some(address) if !address.trim().is_empty() => config.host = address.trim().to_string(),
            _ => {
                log::warn!(target: CONFIG_LOG_TARGET, "AUBO_ADDRESS is not set, using {}.", config.host);
            }
        }

        if let Some(val_str) = lookup("AUBO_PORT") {
            match val_str.trim().parse::<u16>() {
                Ok(port) => config.port = port,
                Err(e) => {
                    log::error!(target: CONFIG_LOG_TARGET, "Failed to parse AUBO_PORT value '{}' as port: {}", val_str, e);
                    log::error!(target: CONFIG_LOG_TARGET, "Setting AUBO_PORT to {}.", config.port);
                }
            }
        }

        if let Some(val_str) = lookup("MOTION_TEST_DRY_RUN") {
            match val_str.trim().to_lowercase().parse::<bool>() {
                Ok(b_val) => config.dry_run = b_val,
                Err(e) => {
                    log::error!(target: CONFIG_LOG_TARGET, "Failed to parse MOTION_TEST_DRY_RUN value '{}' as boolean: {}", val_str, e);
                    log::error!(target: CONFIG_LOG_TARGET, "Setting MOTION_TEST_DRY_RUN to false.");
                }
            }
        }

        config
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
