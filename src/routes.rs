use std::sync::Arc;

use log::{error, Logger};
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, WithStatus};

use crate::errors::BackendError;

pub mod admin;
mod handlers;
mod query;
mod rejection;
mod response;

pub use internal::*;

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        error!(logger, "Backend error"; "context" => ?r.context, "error" => ?r.error, "status" => %status_code_for(e), "message" => %r.error);
        let flattened = r.flatten();

        return Ok(with_status(json(&flattened), status_code_for(e)));
    }

    Err(rej)
}

fn status_code_for(e: &BackendError) -> StatusCode {
    use BackendError::*;

    match e {
        Unauthenticated | InvalidCredentials => StatusCode::UNAUTHORIZED,
        Forbidden | IncorrectPassword => StatusCode::FORBIDDEN,
        NonExistentAccount(..) => StatusCode::NOT_FOUND,
        EmailAlreadyExists(..) => StatusCode::CONFLICT,
        InvalidId(..)
        | InvalidDate(..)
        | InvalidTime(..)
        | InvalidWeekday(..)
        | InvalidClassType(..)
        | InvalidAdminLevel(..)
        | InvalidReport(..)
        | InvertedDateRange { .. }
        | InvalidSessionLimit(..)
        | PasswordMismatch
        | MissingField(..) => StatusCode::BAD_REQUEST,
        Sqlx { .. } | Csv { .. } | PasswordHash(..) | UnknownMembership(..) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

mod internal {
    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::Filter;
    use warp::Reply;
    use warp::{
        body::json as body, delete, get as g, header::optional as header, path as p,
        path::param as par, post, put, query,
    };

    use super::{handlers, query as q};
    use crate::account::{
        AccountUpdate, AdminLevelUpdate, Login, NewDependent, NewMembership, PasswordChange,
        Registration,
    };
    use crate::class::ClassSubmission;
    use crate::environment::Environment;

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    const AUTHORIZATION: &str = "authorization";

    macro_rules! route_filter {
    ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
    ($route_variable:ident; $first:expr, $($rest:expr),+) => (
        let $route_variable = $route_variable.and($first);
        route_filter!($route_variable; $($rest),+);
    )
}

    macro_rules! route {
    ($name:ident => $handler:ident, $route_variable:ident; $($filters:expr),+) => (
        pub fn $name(environment: Environment) -> Route {
            let $route_variable = warp::any().map(move || environment.clone());

            route_filter!($route_variable; $($filters),+);

            $route_variable.and_then(handlers::$handler)
                .boxed()
        }
    );
}

    route!(make_register_route => register, rt; p("auth"), p("register"), end(), post(), body::<Registration>());
    route!(make_login_route => login, rt; p("auth"), p("login"), end(), post(), body::<Login>());
    route!(make_logout_route => logout, rt; p("auth"), p("logout"), end(), post(), header::<String>(AUTHORIZATION));
    route!(make_check_in_route => check_in, rt; p("classes"), p("check-in"), end(), g(), query::<q::CheckInQuery>(), header::<String>(AUTHORIZATION));
    route!(make_classes_list_route => classes_list, rt; p("classes"), end(), g(), header::<String>(AUTHORIZATION));
    route!(make_add_class_route => add_class, rt; p("classes"), end(), post(), body::<ClassSubmission>(), header::<String>(AUTHORIZATION));
    route!(make_add_dependent_route => add_dependent, rt; p!("users" / "me" / "dependents"), end(), post(), body::<NewDependent>(), header::<String>(AUTHORIZATION));
    route!(make_users_list_route => users_list, rt; p("users"), end(), g(), header::<String>(AUTHORIZATION));
    route!(make_toggle_coach_route => toggle_coach, rt; p("users"), par::<String>(), p("coach"), end(), post(), header::<String>(AUTHORIZATION));
    route!(make_set_admin_route => set_admin, rt; p("users"), par::<String>(), p("admin"), end(), put(), body::<AdminLevelUpdate>(), header::<String>(AUTHORIZATION));
    route!(make_delete_user_route => delete_user, rt; p("users"), par::<String>(), end(), delete(), header::<String>(AUTHORIZATION));
    route!(make_edit_user_route => edit_user, rt; p("users"), par::<String>(), end(), put(), body::<AccountUpdate>(), header::<String>(AUTHORIZATION));
    route!(make_change_password_route => change_password, rt; p("users"), par::<String>(), p("password"), end(), put(), body::<PasswordChange>(), header::<String>(AUTHORIZATION));
    route!(make_clear_sessions_route => clear_sessions, rt; p("users"), par::<String>(), p("sessions"), end(), delete(), header::<String>(AUTHORIZATION));
    route!(make_memberships_list_route => memberships_list, rt; p("admin"), p("memberships"), end(), g(), header::<String>(AUTHORIZATION));
    route!(make_add_membership_route => add_membership, rt; p("admin"), p("memberships"), end(), post(), body::<NewMembership>(), header::<String>(AUTHORIZATION));
    route!(make_age_groups_list_route => age_groups_list, rt; p("admin"), p("age-groups"), end(), g(), header::<String>(AUTHORIZATION));
    route!(make_attendance_report_route => attendance_report, rt; p("reports"), p("attendance"), par::<String>(), end(), g(), query::<q::ReportQuery>(), header::<String>(AUTHORIZATION));
    route!(make_user_report_route => user_report, rt; p("reports"), p("users"), par::<String>(), end(), g(), header::<String>(AUTHORIZATION));
    route!(make_class_report_route => class_report, rt; p!("reports" / "classes" / "total-attendance"), end(), g(), header::<String>(AUTHORIZATION));
    route!(make_csv_report_route => csv_report, rt; p("reports"), p("csv"), end(), g(), query::<q::CsvQuery>(), header::<String>(AUTHORIZATION));

    /// Every route of the main server, without rejection handling.
    pub fn make_routes(environment: Environment) -> Route {
        make_register_route(environment.clone())
            .or(make_login_route(environment.clone()))
            .unify()
            .or(make_logout_route(environment.clone()))
            .unify()
            .or(make_check_in_route(environment.clone()))
            .unify()
            .or(make_classes_list_route(environment.clone()))
            .unify()
            .or(make_add_class_route(environment.clone()))
            .unify()
            .or(make_add_dependent_route(environment.clone()))
            .unify()
            .or(make_users_list_route(environment.clone()))
            .unify()
            .or(make_toggle_coach_route(environment.clone()))
            .unify()
            .or(make_set_admin_route(environment.clone()))
            .unify()
            .or(make_delete_user_route(environment.clone()))
            .unify()
            .or(make_edit_user_route(environment.clone()))
            .unify()
            .or(make_change_password_route(environment.clone()))
            .unify()
            .or(make_clear_sessions_route(environment.clone()))
            .unify()
            .or(make_memberships_list_route(environment.clone()))
            .unify()
            .or(make_add_membership_route(environment.clone()))
            .unify()
            .or(make_age_groups_list_route(environment.clone()))
            .unify()
            .or(make_attendance_report_route(environment.clone()))
            .unify()
            .or(make_user_report_route(environment.clone()))
            .unify()
            .or(make_class_report_route(environment.clone()))
            .unify()
            .or(make_csv_report_route(environment))
            .unify()
            .boxed()
    }
}
