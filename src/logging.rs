//! Logger setup. Records go to stderr, tagged with the request id of the
//! call running on the current task.

use std::io::Write;

use crate::context::current_request_id;

pub const LOG_ENV: &str = "COMPUTER_USE_LOG";

/// Filter precedence: `COMPUTER_USE_LOG`, then `debug` when verbose, then
/// the configured level.
pub fn filter(configured: &str, verbose: bool) -> String {
    match std::env::var(LOG_ENV) {
        Ok(value) if !value.trim().is_empty() => value,
        _ if verbose => "debug".to_string(),
        _ => configured.to_string(),
    }
}

pub fn init(filters: &str) {
    env_logger::Builder::new()
        .parse_filters(filters)
        .filter_module("hyper", log::LevelFilter::Warn)
        .filter_module("reqwest", log::LevelFilter::Warn)
        .target(env_logger::Target::Stderr)
        .format(|buf, record| {
            let request_id = current_request_id();
            writeln!(
                buf,
                "{} {:<5} [{}] {}: {}",
                buf.timestamp_millis(),
                record.level(),
                request_id.as_deref().unwrap_or("-"),
                record.target(),
                record.args()
            )
        })
        .init();
}
