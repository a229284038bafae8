use std::sync::Arc;

use serde_json::{json, Value};
use time::{Date, PrimitiveDateTime, Time};
use warp::http::StatusCode;
use warp::Filter;

use dojo::account::{NewMembership, Privilege};
use dojo::class::{ClassType, NewClass};
use dojo::config::Config;
use dojo::db::mock::{MockDb, ADULTS, JUNIORS};
use dojo::db::Db;
use dojo::environment::{fixed_clock, Environment};
use dojo::routes;
use dojo::urls::Urls;

fn wednesday_evening() -> PrimitiveDateTime {
    PrimitiveDateTime::new(
        Date::try_from_ymd(2024, 3, 13).unwrap(),
        Time::try_from_hms(18, 30, 0).unwrap(),
    )
}

fn class(name: &str, hour: u8, age_group_id: i32) -> NewClass {
    NewClass {
        name: name.to_owned(),
        class_type: ClassType::Gi,
        weekday: 2,
        start_time: Time::try_from_hms(hour, 0, 0).unwrap(),
        duration_minutes: 60,
        age_group_id,
        coach_id: None,
    }
}

fn make_environment() -> (Arc<MockDb>, Environment, i32) {
    let db = Arc::new(MockDb::seeded());

    let family = db.add_membership(NewMembership {
        name: "family".to_owned(),
        membership_type: "family".to_owned(),
        age_group_id: ADULTS,
        sessions_per_week: 0,
    });

    db.add_class(class("Kids", 16, JUNIORS));
    db.add_class(class("Evening Gi", 19, ADULTS));

    let environment = Environment::new(
        Arc::new(log::discard()),
        db.clone(),
        Arc::new(Urls::new("https://dojo.example.com/")),
        fixed_clock(wednesday_evening()),
        Config::default(),
    );

    (db, environment, family)
}

fn make_filter(
    environment: Environment,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let logger = environment.logger.clone();

    routes::make_routes(environment).recover(move |r| routes::format_rejection(logger.clone(), r))
}

fn body(raw: &[u8]) -> Value {
    serde_json::from_slice(raw).expect("parse response as JSON")
}

#[tokio::test]
async fn a_family_checks_in_and_shows_up_in_reports() {
    let (db, environment, family) = make_environment();
    let filter = make_filter(environment);

    let response = warp::test::request()
        .method("POST")
        .path("/auth/register")
        .json(&json!({
            "email": "carlos@example.com",
            "password": "oss",
            "confirm_password": "oss",
            "first_name": "Carlos",
            "last_name": "Gracie",
            "membership_id": family,
            "dependents": [
                { "first_name": "Kyra", "last_name": "Gracie", "age_group_id": ADULTS },
            ],
        }))
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(response.headers().contains_key("server-timing"));

    let registered = body(response.body());
    let account_id = registered["account_id"].as_i64().unwrap() as i32;
    let token = format!("Bearer {}", registered["token"].as_str().unwrap());

    let dependent_id = db.retrieve_dependents(account_id).await.unwrap()[0].id;

    // the family membership moves Kyra into the junior classes
    let response = warp::test::request()
        .path(&format!(
            "/classes/check-in?class_id=all&dependent_id={}",
            dependent_id
        ))
        .header("authorization", &token)
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let view = body(response.body());
    assert_eq!(view["messages"], json!(["Kyra Gracie checked in to Kids."]));
    assert_eq!(view["attendees"].as_array().unwrap().len(), 2);

    let response = warp::test::request()
        .path("/classes/check-in?class_id=all")
        .header("authorization", &token)
        .reply(&filter)
        .await;

    assert_eq!(
        body(response.body())["messages"],
        json!(["Carlos Gracie checked in to Evening Gi."])
    );
    assert_eq!(db.records().len(), 2);

    let response = warp::test::request()
        .path("/reports/attendance/today")
        .header("authorization", &token)
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    db.set_admin(account_id, Privilege::ReadWrite).await.unwrap();

    let response = warp::test::request()
        .path("/reports/attendance/today")
        .header("authorization", &token)
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let report = body(response.body());
    assert_eq!(report["key"], "today");
    assert_eq!(
        report["table"]["columns"],
        json!(["Class", "Name", "Checked In"])
    );
    let rows = report["table"]["rows"].as_array().unwrap().clone();
    assert_eq!(rows.len(), 2);

    let response = warp::test::request()
        .path("/reports/csv?report=today")
        .header("authorization", &token)
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/csv");
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"today_2024-03-13.csv\""
    );

    let csv = String::from_utf8_lossy(response.body()).into_owned();
    let lines = csv.lines().collect::<Vec<_>>();
    assert_eq!(lines[0], "Class,Name,Checked In");
    assert_eq!(lines.len(), rows.len() + 1);

    let response = warp::test::request()
        .path("/reports/attendance/headcount")
        .header("authorization", &token)
        .reply(&filter)
        .await;

    assert_eq!(
        body(response.body())["table"]["rows"],
        json!([["Kids", 1], ["Evening Gi", 1]])
    );
}

#[tokio::test]
async fn custom_reports_need_a_start_date() {
    let (db, environment, family) = make_environment();
    let filter = make_filter(environment);

    let response = warp::test::request()
        .method("POST")
        .path("/auth/register")
        .json(&json!({
            "email": "helio@example.com",
            "password": "oss",
            "confirm_password": "oss",
            "first_name": "Helio",
            "last_name": "Gracie",
            "membership_id": family,
        }))
        .reply(&filter)
        .await;

    let registered = body(response.body());
    let account_id = registered["account_id"].as_i64().unwrap() as i32;
    let token = format!("Bearer {}", registered["token"].as_str().unwrap());
    db.set_admin(account_id, Privilege::Read).await.unwrap();

    let response = warp::test::request()
        .path("/reports/attendance/custom")
        .header("authorization", &token)
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(response.body())["report"], "custom");

    let response = warp::test::request()
        .path("/reports/attendance/custom?start_date=2024-03-01&end_date=2024-03-13")
        .header("authorization", &token)
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let report = body(response.body());
    assert_eq!(report["start_date"], "2024-03-01");
    assert_eq!(report["end_date"], "2024-03-13");
    assert!(report["message"].as_str().unwrap().starts_with("No classes were attended between"));
}

#[tokio::test]
async fn logging_out_ends_the_session() {
    let (_, environment, family) = make_environment();
    let filter = make_filter(environment);

    let response = warp::test::request()
        .method("POST")
        .path("/auth/register")
        .json(&json!({
            "email": "rickson@example.com",
            "password": "oss",
            "confirm_password": "oss",
            "first_name": "Rickson",
            "last_name": "Gracie",
            "membership_id": family,
        }))
        .reply(&filter)
        .await;

    let token = format!("Bearer {}", body(response.body())["token"].as_str().unwrap());

    let response = warp::test::request()
        .method("POST")
        .path("/auth/logout")
        .header("authorization", &token)
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = warp::test::request()
        .path("/classes")
        .header("authorization", &token)
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
