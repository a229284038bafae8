use std::sync::Arc;

use log::Logger;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::config::Config;
use crate::db::Db;
use crate::urls::Urls;

/// Returns the current local time at the club.
pub type Clock = dyn Fn() -> PrimitiveDateTime + Send + Sync;

#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub db: Arc<dyn Db + Send + Sync>,
    pub urls: Arc<Urls>,
    pub clock: Arc<Clock>,
    pub config: Arc<Config>,
}

impl Environment {
    pub fn new(
        logger: Arc<Logger>,
        db: Arc<dyn Db + Send + Sync>,
        urls: Arc<Urls>,
        clock: Arc<Clock>,
        config: Config,
    ) -> Self {
        Self {
            logger,
            db,
            urls,
            clock,
            config: Arc::new(config),
        }
    }

    pub fn now(&self) -> PrimitiveDateTime {
        (self.clock)()
    }

    pub fn today(&self) -> Date {
        self.now().date()
    }
}

/// A clock reading the system time, shifted to the given offset.
pub fn system_clock(utc_offset_hours: i8) -> Arc<Clock> {
    let offset = UtcOffset::hours(utc_offset_hours);

    Arc::new(move || {
        let now = OffsetDateTime::now_utc().to_offset(offset);
        PrimitiveDateTime::new(now.date(), now.time())
    })
}

/// A clock stuck at `at`.
pub fn fixed_clock(at: PrimitiveDateTime) -> Arc<Clock> {
    Arc::new(move || at)
}
