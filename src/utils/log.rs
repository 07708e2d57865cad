// src/utils/log.rs

//! Step and summary lines for pipeline progress.
//!
//! Everything goes through the `log` facade, so the CLI (env_logger) and
//! the Lambda (tracing) both pick it up.

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    ::log::info!("[STEP {}/{}] {}", step_num, total, message);
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    ::log::info!("[SUMMARY] {}", title);
    for (key, value) in items {
        ::log::info!("    {}: {}", key, value);
    }
}
