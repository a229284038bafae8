use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::{debug, info, o};
use uuid::Uuid;
use warp::{
    http::StatusCode,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use crate::account::{
    Account, AccountUpdate, AdminLevelUpdate, Login, NewAccount, NewDependent, NewMembership,
    PasswordChange, Privilege, Registration,
};
use crate::attendance::{AttendanceFilter, AttendeeKey};
use crate::class::ClassSubmission;
use crate::credentials::{hash_password, verify_password};
use crate::dates::{self, DateRange};
use crate::environment::Environment;
use crate::errors::BackendError;
use crate::label::Id;
use crate::reports::{self, ReportKey};
use crate::routes::{
    query::{CheckInQuery, CsvQuery, ReportQuery},
    rejection::{Context, Rejection},
    response::{ClassSummary, SuccessResponse},
};
use crate::toggle::{self, Target};
use crate::{roster, view};

const SERVER_TIMING_HEADER: &str = "server-timing";
const BEARER_PREFIX: &str = "Bearer ";
const NO_CLASSES_MESSAGE: &str = "No classes available today.";

type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($body:tt)+) => {
        let start = Instant::now();

        // TODO when `try` blocks are stabilized, we can wrap the body
        // and return the headers even on errors
        let result = { $($body)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    };
}

pub async fn register(environment: Environment, registration: Registration) -> RouteResult {
    timed! {
        let error_handler =
            |e: BackendError| Rejection::new(Context::register(registration.email.clone()), e);

        registration.validate().map_err(error_handler)?;

        let memberships = environment
            .db
            .retrieve_memberships()
            .await
            .map_err(error_handler)?;

        let requested = std::iter::once(registration.membership_id).chain(
            registration
                .dependents
                .iter()
                .filter_map(|d| d.membership_id),
        );

        for id in requested {
            if !memberships.iter().any(|m| m.id == id) {
                return Err(error_handler(BackendError::InvalidId(id.to_string())).into());
            }
        }

        debug!(environment.logger, "Registering account..."; "email" => &registration.email);

        let account = NewAccount {
            email: registration.email.clone(),
            first_name: registration.first_name.clone(),
            last_name: registration.last_name.clone(),
            mobile: registration.mobile.clone(),
            membership_id: registration.membership_id,
            age_group_id: registration.age_group_id,
            credentials: hash_password(&registration.password).map_err(error_handler)?,
        };

        let account_id = environment
            .db
            .create_account(account, registration.dependents.clone())
            .await
            .map_err(error_handler)?;

        info!(environment.logger, "Registered account"; "account_id" => account_id);

        let token = environment
            .db
            .create_session(account_id, environment.now())
            .await
            .map_err(error_handler)?;

        with_status(
            json(&SuccessResponse::Session { token, account_id }),
            StatusCode::CREATED,
        )
    }
}

pub async fn login(environment: Environment, login: Login) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::login(login.email.clone()), e);

        let (account_id, credentials) = environment
            .db
            .retrieve_credentials(&login.email)
            .await
            .map_err(error_handler)?
            .ok_or_else(|| error_handler(BackendError::InvalidCredentials))?;

        if !verify_password(&credentials, &login.password) {
            return Err(error_handler(BackendError::InvalidCredentials).into());
        }

        let token = environment
            .db
            .create_session(account_id, environment.now())
            .await
            .map_err(error_handler)?;

        debug!(environment.logger, "Logged in"; "account_id" => account_id);

        json(&SuccessResponse::Session { token, account_id })
    }
}

pub async fn logout(environment: Environment, authorization: Option<String>) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::logout(), e);

        let token = parse_bearer(authorization.as_deref()).map_err(error_handler)?;
        let account = authenticate(&environment, authorization).await.map_err(error_handler)?;

        environment
            .db
            .delete_session(&token)
            .await
            .map_err(error_handler)?;

        debug!(environment.logger, "Logged out"; "account_id" => account.id);

        StatusCode::NO_CONTENT
    }
}

pub async fn check_in(
    environment: Environment,
    query: CheckInQuery,
    authorization: Option<String>,
) -> RouteResult {
    timed! {
        let context = Context::check_in(query.class_id.clone(), query.dependent_id.clone());
        let error_handler = |e: BackendError| Rejection::new(context.clone(), e);

        let account = match authenticate(&environment, authorization).await {
            Ok(account) => account,
            Err(BackendError::Unauthenticated) => {
                return Ok(login_redirect(&environment, &query));
            }
            Err(e) => return Err(error_handler(e).into()),
        };

        let logger = environment.logger.new(o!("account_id" => account.id));

        let attendee = match &query.dependent_id {
            Some(raw) => AttendeeKey::dependent(account.id, parse_id(raw).map_err(error_handler)?),
            None => AttendeeKey::account(account.id),
        };

        let target = query
            .class_id
            .as_deref()
            .map(str::parse::<Target>)
            .transpose()
            .map_err(error_handler)?;

        let now = environment.now();
        let today = now.date();

        debug!(logger, "Resolving roster...");
        let attendees = roster::load(
            environment.db.as_ref(),
            &account,
            environment.config.junior_age_group_id,
        )
        .await
        .map_err(error_handler)?;

        if !attendees.iter().any(|a| a.key == attendee) {
            let raw = query.dependent_id.clone().unwrap_or_default();
            return Err(error_handler(BackendError::InvalidId(raw)).into());
        }

        let classes = environment
            .db
            .retrieve_classes()
            .await
            .map_err(error_handler)?;

        let week = DateRange {
            start: dates::week_start(today),
            end: today,
        };
        let records = environment
            .db
            .attendance(AttendanceFilter::between(week).account(account.id))
            .await
            .map_err(error_handler)?
            .into_iter()
            .map(|row| row.record)
            .collect::<Vec<_>>();

        let response = match view::build(attendees, &classes, &records, today) {
            None => SuccessResponse::NoClasses {
                date: dates::iso(today),
                messages: vec![NO_CLASSES_MESSAGE.to_owned()],
            },
            Some(mut view) => {
                let messages = match target {
                    Some(target) => {
                        debug!(logger, "Toggling attendance..."; "target" => %target, "dependent_id" => ?attendee.dependent_id);

                        toggle::toggle(environment.db.as_ref(), &mut view, target, &attendee, now)
                            .await
                            .map_err(error_handler)?
                            .messages
                    }
                    None => vec![],
                };

                SuccessResponse::CheckIn { view, messages }
            }
        };

        json(&response)
    }
}

pub async fn classes_list(environment: Environment, authorization: Option<String>) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::classes(), e);

        let account = authenticate(&environment, authorization).await.map_err(error_handler)?;

        let classes = environment
            .db
            .retrieve_classes()
            .await
            .map_err(error_handler)?;
        let rows = environment
            .db
            .attendance(AttendanceFilter::all().account(account.id))
            .await
            .map_err(error_handler)?;

        let mut counts: HashMap<Id, i64> = HashMap::new();
        for row in rows {
            *counts.entry(row.record.class_id).or_default() += 1;
        }

        let classes = classes
            .into_iter()
            .map(|class| ClassSummary {
                attendance: counts.get(&class.id).copied().unwrap_or(0),
                class,
            })
            .collect();

        json(&SuccessResponse::Classes { classes })
    }
}

pub async fn add_class(
    environment: Environment,
    submission: ClassSubmission,
    authorization: Option<String>,
) -> RouteResult {
    timed! {
        let error_handler =
            |e: BackendError| Rejection::new(Context::add_class(submission.class_name.clone()), e);

        let account = authenticate(&environment, authorization).await.map_err(error_handler)?;
        require_write(&environment, &account).map_err(error_handler)?;

        let class = submission.clone().validate().map_err(error_handler)?;
        let id = environment.db.create_class(class).await.map_err(error_handler)?;

        info!(environment.logger, "Added class"; "class_id" => id, "account_id" => account.id);

        with_status(json(&SuccessResponse::Created { id }), StatusCode::CREATED)
    }
}

pub async fn add_dependent(
    environment: Environment,
    dependent: NewDependent,
    authorization: Option<String>,
) -> RouteResult {
    timed! {
        let error_handler =
            |e: BackendError| Rejection::new(Context::add_dependent(dependent.first_name.clone()), e);

        let account = authenticate(&environment, authorization).await.map_err(error_handler)?;
        dependent.validate().map_err(error_handler)?;

        let id = environment
            .db
            .create_dependent(account.id, dependent.clone())
            .await
            .map_err(error_handler)?;

        debug!(environment.logger, "Added dependent"; "account_id" => account.id, "dependent_id" => id);

        with_status(json(&SuccessResponse::Created { id }), StatusCode::CREATED)
    }
}

pub async fn users_list(environment: Environment, authorization: Option<String>) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::users(), e);

        let account = authenticate(&environment, authorization).await.map_err(error_handler)?;
        require_read(&environment, &account).map_err(error_handler)?;

        let accounts = environment
            .db
            .retrieve_accounts()
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::Accounts { accounts })
    }
}

pub async fn toggle_coach(
    environment: Environment,
    id: String,
    authorization: Option<String>,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::user(id.clone()), e);

        let account = authenticate(&environment, authorization).await.map_err(error_handler)?;
        require_write(&environment, &account).map_err(error_handler)?;

        let target = parse_id(&id).map_err(error_handler)?;
        let is_coach = environment
            .db
            .toggle_coach(target)
            .await
            .map_err(error_handler)?;

        info!(environment.logger, "Toggled coach"; "target" => target, "is_coach" => is_coach, "account_id" => account.id);

        json(&SuccessResponse::Coach { id: target, is_coach })
    }
}

pub async fn set_admin(
    environment: Environment,
    id: String,
    update: AdminLevelUpdate,
    authorization: Option<String>,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::user(id.clone()), e);

        let account = authenticate(&environment, authorization).await.map_err(error_handler)?;
        require_write(&environment, &account).map_err(error_handler)?;

        let target = parse_id(&id).map_err(error_handler)?;
        let privilege: Privilege = update.admin.parse().map_err(error_handler)?;

        environment
            .db
            .set_admin(target, privilege)
            .await
            .map_err(error_handler)?;

        info!(environment.logger, "Set admin level"; "target" => target, "admin" => %privilege, "account_id" => account.id);

        StatusCode::NO_CONTENT
    }
}

pub async fn delete_user(
    environment: Environment,
    id: String,
    authorization: Option<String>,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::user(id.clone()), e);

        let account = authenticate(&environment, authorization).await.map_err(error_handler)?;
        require_write(&environment, &account).map_err(error_handler)?;

        let target = parse_id(&id).map_err(error_handler)?;
        environment
            .db
            .delete_account(target)
            .await
            .map_err(error_handler)?;

        info!(environment.logger, "Deleted account"; "target" => target, "account_id" => account.id);

        StatusCode::NO_CONTENT
    }
}

pub async fn edit_user(
    environment: Environment,
    id: String,
    update: AccountUpdate,
    authorization: Option<String>,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::user(id.clone()), e);

        let account = authenticate(&environment, authorization).await.map_err(error_handler)?;
        require_write(&environment, &account).map_err(error_handler)?;

        let target = parse_id(&id).map_err(error_handler)?;
        update.validate().map_err(error_handler)?;

        let memberships = environment
            .db
            .retrieve_memberships()
            .await
            .map_err(error_handler)?;

        if !memberships.iter().any(|m| m.id == update.membership_id) {
            let raw = update.membership_id.to_string();
            return Err(error_handler(BackendError::InvalidId(raw)).into());
        }

        environment
            .db
            .update_account(target, update.clone())
            .await
            .map_err(error_handler)?;

        info!(environment.logger, "Updated account"; "target" => target, "membership_id" => update.membership_id, "account_id" => account.id);

        StatusCode::NO_CONTENT
    }
}

pub async fn change_password(
    environment: Environment,
    id: String,
    change: PasswordChange,
    authorization: Option<String>,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::user(id.clone()), e);

        let account = authenticate(&environment, authorization).await.map_err(error_handler)?;
        let target = parse_id(&id).map_err(error_handler)?;

        // read-write admins may reset anyone's password without the old one
        let is_writer = environment.config.admin_levels.can_write(account.admin);
        if account.id != target && !is_writer {
            return Err(error_handler(BackendError::Forbidden).into());
        }

        change.validate().map_err(error_handler)?;

        if !is_writer {
            let credentials = environment
                .db
                .retrieve_password(target)
                .await
                .map_err(error_handler)?
                .ok_or_else(|| error_handler(BackendError::NonExistentAccount(target)))?;

            if !verify_password(&credentials, &change.old_password) {
                return Err(error_handler(BackendError::IncorrectPassword).into());
            }
        }

        let credentials = hash_password(&change.new_password).map_err(error_handler)?;
        environment
            .db
            .update_password(target, credentials)
            .await
            .map_err(error_handler)?;

        info!(environment.logger, "Changed password"; "target" => target, "account_id" => account.id);

        StatusCode::NO_CONTENT
    }
}

pub async fn clear_sessions(
    environment: Environment,
    id: String,
    authorization: Option<String>,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::user(id.clone()), e);

        let account = authenticate(&environment, authorization).await.map_err(error_handler)?;
        require_write(&environment, &account).map_err(error_handler)?;

        let target = parse_id(&id).map_err(error_handler)?;
        let cleared = environment
            .db
            .delete_sessions(target)
            .await
            .map_err(error_handler)?;

        info!(environment.logger, "Cleared sessions"; "target" => target, "sessions" => cleared, "account_id" => account.id);

        StatusCode::NO_CONTENT
    }
}

pub async fn memberships_list(
    environment: Environment,
    authorization: Option<String>,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::memberships(), e);

        let account = authenticate(&environment, authorization).await.map_err(error_handler)?;
        require_read(&environment, &account).map_err(error_handler)?;

        let memberships = environment
            .db
            .retrieve_memberships()
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::Memberships { memberships })
    }
}

pub async fn add_membership(
    environment: Environment,
    membership: NewMembership,
    authorization: Option<String>,
) -> RouteResult {
    timed! {
        let error_handler =
            |e: BackendError| Rejection::new(Context::add_membership(membership.name.clone()), e);

        let account = authenticate(&environment, authorization).await.map_err(error_handler)?;
        require_write(&environment, &account).map_err(error_handler)?;
        membership.validate().map_err(error_handler)?;

        let id = environment
            .db
            .create_membership(membership.clone())
            .await
            .map_err(error_handler)?;

        with_status(json(&SuccessResponse::Created { id }), StatusCode::CREATED)
    }
}

pub async fn age_groups_list(
    environment: Environment,
    authorization: Option<String>,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::age_groups(), e);

        let account = authenticate(&environment, authorization).await.map_err(error_handler)?;
        require_read(&environment, &account).map_err(error_handler)?;

        let age_groups = environment
            .db
            .retrieve_age_groups()
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::AgeGroups { age_groups })
    }
}

pub async fn attendance_report(
    environment: Environment,
    kind: String,
    query: ReportQuery,
    authorization: Option<String>,
) -> RouteResult {
    use ReportKey::*;

    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::report(kind.clone()), e);

        let key = match kind.parse::<ReportKey>().map_err(error_handler)? {
            key @ (Headcount | Today | Yesterday | LastWeek | LastMonth | Custom) => key,
            _ => return Err(error_handler(BackendError::InvalidReport(kind.clone())).into()),
        };

        report(&environment, key, query.start_date, query.end_date, authorization)
            .await
            .map_err(error_handler)?
    }
}

pub async fn user_report(
    environment: Environment,
    kind: String,
    authorization: Option<String>,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::report(kind.clone()), e);

        let key = match kind.as_str() {
            "absentees" => ReportKey::Absentees,
            "exceeding-membership-limit" => ReportKey::ExcessAttendances,
            _ => return Err(error_handler(BackendError::InvalidReport(kind.clone())).into()),
        };

        report(&environment, key, None, None, authorization)
            .await
            .map_err(error_handler)?
    }
}

pub async fn class_report(environment: Environment, authorization: Option<String>) -> RouteResult {
    timed! {
        let key = ReportKey::ClassTotals;

        report(&environment, key, None, None, authorization)
            .await
            .map_err(|e| Rejection::new(Context::report(key.to_string()), e))?
    }
}

pub async fn csv_report(
    environment: Environment,
    query: CsvQuery,
    authorization: Option<String>,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::report(query.report.clone()), e);

        let account = authenticate(&environment, authorization).await.map_err(error_handler)?;
        require_read(&environment, &account).map_err(error_handler)?;

        let key: ReportKey = query.report.parse().map_err(error_handler)?;

        let report = reports::generate(
            environment.db.as_ref(),
            &environment.config,
            key,
            environment.today(),
            query.start_date.as_deref(),
            query.end_date.as_deref(),
        )
        .await
        .map_err(error_handler)?;

        let filename = report.filename();
        debug!(environment.logger, "Exporting report..."; "filename" => &filename, "rows" => report.table.rows.len());

        let csv = report.to_csv().map_err(error_handler)?;

        with_header(
            with_header(csv, "content-type", mime::TEXT_CSV.as_ref()),
            "content-disposition",
            format!("attachment; filename=\"{}\"", filename),
        )
    }
}

async fn report(
    environment: &Environment,
    key: ReportKey,
    start: Option<String>,
    end: Option<String>,
    authorization: Option<String>,
) -> Result<warp::reply::Json, BackendError> {
    let account = authenticate(environment, authorization).await?;
    require_read(environment, &account)?;

    let report = reports::generate(
        environment.db.as_ref(),
        &environment.config,
        key,
        environment.today(),
        start.as_deref(),
        end.as_deref(),
    )
    .await?;

    debug!(environment.logger, "Generated report"; "report" => %key, "rows" => report.table.rows.len(), "account_id" => account.id);

    Ok(json(&report))
}

/// Looks up the account for a bearer token and records the access.
async fn authenticate(
    environment: &Environment,
    authorization: Option<String>,
) -> Result<Account, BackendError> {
    let token = parse_bearer(authorization.as_deref())?;

    let account = environment
        .db
        .retrieve_session(&token)
        .await?
        .ok_or(BackendError::Unauthenticated)?;

    environment
        .db
        .touch_account(account.id, environment.now())
        .await?;

    Ok(account)
}

fn parse_bearer(authorization: Option<&str>) -> Result<Uuid, BackendError> {
    authorization
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .and_then(|token| Uuid::parse_str(token.trim()).ok())
        .ok_or(BackendError::Unauthenticated)
}

fn require_read(environment: &Environment, account: &Account) -> Result<(), BackendError> {
    if environment.config.admin_levels.can_read(account.admin) {
        Ok(())
    } else {
        Err(BackendError::Forbidden)
    }
}

fn require_write(environment: &Environment, account: &Account) -> Result<(), BackendError> {
    if environment.config.admin_levels.can_write(account.admin) {
        Ok(())
    } else {
        Err(BackendError::Forbidden)
    }
}

fn parse_id(raw: &str) -> Result<Id, BackendError> {
    raw.trim()
        .parse()
        .map_err(|_| BackendError::InvalidId(raw.to_owned()))
}

fn login_redirect(environment: &Environment, query: &CheckInQuery) -> Box<dyn Reply> {
    let mut next = environment.urls.check_in();
    {
        let mut pairs = next.query_pairs_mut();
        if let Some(class_id) = &query.class_id {
            pairs.append_pair("class_id", class_id);
        }
        if let Some(dependent_id) = &query.dependent_id {
            pairs.append_pair("dependent_id", dependent_id);
        }
    }

    let next = match next.query() {
        Some(q) if !q.is_empty() => format!("{}?{}", next.path(), q),
        _ => next.path().to_owned(),
    };

    Box::new(with_header(
        StatusCode::SEE_OTHER,
        "location",
        environment.urls.login_then(&next).as_str(),
    ))
}

fn format_server_timing(seconds: Duration) -> String {
    format!("handler;dur={}", seconds.as_secs_f64() * 1000.0)
}

