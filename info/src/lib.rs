//! Build metadata shared by the server, its helpers and the logger.

pub const NAME: &str = "dojo";

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The VCS revision the binary was built from, if the build exported it.
pub const REVISION: Option<&str> = option_env!("DOJO_REVISION");

pub const BUILD_TIMESTAMP: Option<&str> = option_env!("DOJO_BUILD_TIMESTAMP");
