/*
 * Library root for context_picker. The `core` module holds the platform-agnostic
 * data structures and algorithms (tree model, selection reconciliation, token
 * accounting, scroll following, folder sources and settings). The `app_logic`
 * module composes them into session-level state objects that a front-end drives.
 */
pub mod app_logic;
pub mod core;

use simplelog::{ConfigBuilder, LevelFilter};
use std::sync::Once;

static LOGGING_INIT: Once = Once::new();

/*
 * Initializes the global logger once. Subsequent calls are no-ops, which lets
 * every unit test call this freely. Under `cfg(test)` a `TestLogger` is used so
 * output is captured by the test harness.
 */
pub fn initialize_logging() {
    initialize_logging_at(LevelFilter::Debug);
}

pub fn initialize_logging_at(level: LevelFilter) {
    LOGGING_INIT.call_once(|| {
        let config = ConfigBuilder::new()
            .set_time_level(LevelFilter::Debug)
            .set_target_level(LevelFilter::Trace)
            .build();

        #[cfg(test)]
        let result = simplelog::TestLogger::init(level, config);
        #[cfg(not(test))]
        let result = simplelog::TermLogger::init(
            level,
            config,
            simplelog::TerminalMode::Stderr,
            simplelog::ColorChoice::Auto,
        );

        match result {
            Ok(()) => log::debug!("Logging initialized at level {level:?}."),
            Err(e) => eprintln!("Failed to initialize logger: {e}"),
        }
    });
}
