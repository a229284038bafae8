use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use log::debug;
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, Reply};
use warp::Filter;

use super::response::SuccessResponse;
use crate::environment::Environment;

pub fn make_healthz_route(
    _environment: Environment,
) -> impl warp::Filter<Extract = (impl Reply,), Error = reject::Rejection> + Clone {
    warp::path("healthz").and(warp::get()).map(move || {
        json(&SuccessResponse::Healthz {
            revision: info::REVISION,
            timestamp: info::BUILD_TIMESTAMP,
            version: info::VERSION,
        })
    })
}

type TerminationFuture<'a> = BoxFuture<'a, ()>;

pub type TerminationFunctionWrapper<'a> =
    Arc<dyn Fn() -> TerminationFuture<'a> + Send + Sync + 'a>;

pub fn make_termination_route<'a>(
    environment: Environment,
    terminate: TerminationFunctionWrapper<'a>,
) -> impl warp::Filter<Extract = (impl Reply,), Error = reject::Rejection> + Clone + 'a {
    let handler = move || -> BoxFuture<Result<StatusCode, std::convert::Infallible>> {
        let terminate = terminate.clone();
        let logger = environment.logger.clone();

        async move {
            debug!(logger, "Termination requested");
            terminate().await;
            Ok(StatusCode::NO_CONTENT)
        }
        .boxed()
    };

    warp::path("terminate").and(warp::post()).and_then(handler)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use futures::future::FutureExt;
    use serde_json::Value;
    use time::PrimitiveDateTime;

    use crate::config::Config;
    use crate::dates::{hm, ymd};
    use crate::db::mock::MockDb;
    use crate::environment::{fixed_clock, Environment};
    use crate::urls::Urls;

    fn environment() -> Environment {
        Environment::new(
            Arc::new(log::discard()),
            Arc::new(MockDb::seeded()),
            Arc::new(Urls::new("https://dojo.example.com/")),
            fixed_clock(PrimitiveDateTime::new(ymd(2024, 3, 13), hm(9, 0))),
            Config::default(),
        )
    }

    #[tokio::test]
    async fn healthz_reports_the_version() {
        let response = warp::test::request()
            .path("/healthz")
            .reply(&super::make_healthz_route(environment()))
            .await;

        assert!(response.status().is_success());

        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["version"], info::VERSION);
    }

    #[tokio::test]
    async fn terminate_calls_the_shutdown_hook() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();

        let terminate: super::TerminationFunctionWrapper<'static> = Arc::new(move || {
            let flag = flag.clone();
            async move { flag.store(true, Ordering::SeqCst) }.boxed()
        });

        let response = warp::test::request()
            .method("POST")
            .path("/terminate")
            .reply(&super::make_termination_route(environment(), terminate))
            .await;

        assert_eq!(response.status().as_u16(), 204);
        assert!(called.load(Ordering::SeqCst));
    }
}
