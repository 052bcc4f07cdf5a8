use std::io::Write;

/// Logs go to stderr so the operator console on stdout stays readable.
/// Level defaults to `info`; `RUST_LOG` overrides it.
pub fn initialize_env_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {:<5} {}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .try_init();
}
