use std::sync::Mutex;

use slog::Drain;
use slog::Fuse;
use slog_async::Async;
use slog_json::Json;

pub use slog::{debug, error, info, o, trace, warn, Discard, Logger};

/// Creates the root logger: JSON lines on stderr, written from a
/// background thread.
#[cfg(not(feature = "env_logging"))]
pub fn initialize_logger() -> Logger {
    let drain = Mutex::new(Json::default(std::io::stderr())).map(Fuse);
    let drain = Async::new(drain).build().fuse();

    Logger::root(
        drain,
        o!(
            "name" => info::NAME,
            "version" => info::VERSION,
            "revision" => info::REVISION,
            "build_timestamp" => info::BUILD_TIMESTAMP
        ),
    )
}

/// Creates the root logger, filtered by `RUST_LOG`.
#[cfg(feature = "env_logging")]
pub fn initialize_logger() -> Logger {
    let drain = Mutex::new(Json::default(std::io::stderr())).map(Fuse);
    let drain = slog_envlogger::new(drain);
    let drain = Async::new(drain).build().fuse();

    Logger::root(
        drain,
        o!(
            "name" => info::NAME,
            "version" => info::VERSION,
            "revision" => info::REVISION,
            "build_timestamp" => info::BUILD_TIMESTAMP
        ),
    )
}

/// Creates a logger that drops every record.
pub fn discard() -> Logger {
    Logger::root(Discard, o!())
}
