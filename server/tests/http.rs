use std::{path::Path, sync::Arc, time::Duration};

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response, StatusCode},
    Router,
};
use ride_share_data_management::DataManager;
use ride_share_lib::listing::ListFilter;
use serde_json::Value;
use server::{
    live::Envelope,
    mail::RecordingMailer,
    server_state::ServerState,
    session::SESSION_COOKIE,
};
use tower::ServiceExt; // for `app.oneshot()`

const TRIP: &str = "driver_name=Amy&contact=line%3Aamy&email=amy%40example.com&seats_total=3\
&departure=Taipei+City&destination=Tainan+City&date=2030-01-10";

async fn setup() -> (Router, Arc<ServerState>, RecordingMailer) {
    let data_manager = DataManager::in_memory().await.unwrap();
    let mailer = RecordingMailer::default();
    let state = ServerState::new(data_manager, Arc::new(mailer.clone()), 16, 16);
    let app = server::app(state.clone(), Path::new("static"));
    (app, state, mailer)
}

fn post(uri: &str, body: &str, cookie: Option<&str>, xhr: bool) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    if xhr {
        builder = builder.header("x-requested-with", "XMLHttpRequest");
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// `name=value` of the session cookie the response set, if any.
fn session_cookie(response: &Response<Body>) -> Option<String> {
    response.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(SESSION_COOKIE))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// Creates a trip and returns its id with the driver's cookie.
async fn create_trip(app: &Router, form: &str) -> (i64, String) {
    let response = app.clone().oneshot(post("/car/", form, None, true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).unwrap();
    let json = body_json(response).await;
    assert_eq!(json["ok"], true);
    (json["id"].as_i64().unwrap(), cookie)
}

async fn join(app: &Router, trip_id: i64, form: &str) -> (i64, String) {
    let response = app.clone()
        .oneshot(post(&format!("/driver/{trip_id}/join/"), form, None, true))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).unwrap();
    let json = body_json(response).await;
    (json["id"].as_i64().unwrap(), cookie)
}

#[tokio::test]
async fn health_check() {
    let (app, _, _) = setup().await;
    let response = app.oneshot(get("/healthz", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn index_lists_trips_and_remembers_sort() {
    let (app, _, _) = setup().await;
    create_trip(&app, TRIP).await;

    let response = app.oneshot(get("/?sort=dep_n2s", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let sort_cookie = response.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with("find_sort=dep_n2s"));
    assert!(sort_cookie);

    let html = body_text(response).await;
    assert!(html.contains("Taipei City"));
    assert!(html.contains(r#"data-sort="dep_n2s""#));
}

#[tokio::test]
async fn management_needs_the_drivers_grant() {
    let (app, _, _) = setup().await;
    let (trip_id, cookie) = create_trip(&app, TRIP).await;
    let url = format!("/driver/{trip_id}/manage/");

    let response = app.clone().oneshot(get(&url, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.clone().oneshot(get(&url, Some(&cookie))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains(&format!(r#"data-driver-socket="{trip_id}""#)));
}

#[tokio::test]
async fn password_check_issues_a_grant() {
    let (app, _, _) = setup().await;
    let (trip_id, _) = create_trip(&app, TRIP).await;
    let auth = format!("/driver/{trip_id}/auth/");

    let response = app.clone().oneshot(post(&auth, "", None, true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.clone().oneshot(post(&auth, "password=1234", None, true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "wrong password");

    // No password given at creation means the default one.
    let response = app.clone().oneshot(post(&auth, "password=0000", None, true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).unwrap();
    assert_eq!(body_json(response).await["url"], format!("/driver/{trip_id}/manage/"));

    let response = app.oneshot(get(&format!("/driver/{trip_id}/manage/"), Some(&cookie))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn second_accept_over_capacity_is_refused() {
    let (app, state, _) = setup().await;
    let (trip_id, driver) = create_trip(&app, TRIP).await;
    let (first, _) = join(&app, trip_id, "passenger_name=Ben&seats_needed=2").await;
    let (second, _) = join(&app, trip_id, "passenger_name=Cat&seats_needed=2").await;

    let accept = |pid: i64| format!("/driver/{trip_id}/passenger/{pid}/accept/");

    let response = app.clone().oneshot(post(&accept(first), "", None, true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.clone().oneshot(post(&accept(first), "", Some(&driver), true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["seats_filled"], 2);

    let response = app.clone().oneshot(post(&accept(second), "", Some(&driver), true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["ok"], false);

    let trip = state.data_manager.get_trip(trip_id).await.unwrap();
    assert_eq!(trip.seats_filled, 2);
    assert!(trip.is_active);
}

#[tokio::test]
async fn cancelling_returns_the_request_to_the_pool() {
    let (app, state, _) = setup().await;
    let (trip_id, driver) = create_trip(&app, TRIP).await;
    let (pid, _) = join(&app, trip_id, "passenger_name=Ben&seats_needed=3").await;

    let response = app.clone()
        .oneshot(post(&format!("/driver/{trip_id}/passenger/{pid}/accept/"), "", Some(&driver), true))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["is_active"], false);

    let response = app.clone()
        .oneshot(post(&format!("/driver/{trip_id}/passenger/{pid}/reject/"), "", Some(&driver), true))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["seats_filled"], 0);
    assert_eq!(json["is_active"], true);

    let request = state.data_manager.get_request(pid).await.unwrap();
    assert!(request.in_pool());
}

#[tokio::test]
async fn joining_emails_the_driver_after_commit() {
    let (app, _, mailer) = setup().await;
    let (trip_id, _) = create_trip(&app, TRIP).await;
    join(&app, trip_id, "passenger_name=Ben&contact=ben-phone").await;

    for _ in 0..50 {
        if !mailer.sent().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "amy@example.com");
    assert!(sent[0].body.contains("ben-phone"));
}

#[tokio::test]
async fn hidden_contact_is_withheld_from_the_public_view() {
    let (app, _, _) = setup().await;
    let form = "passenger_name=Ben&contact=ben-phone&email=ben%40example.com&hide_contact=on\
&departure=Taipei+City&destination=Tainan+City&date=2030-01-10";
    let response = app.clone().oneshot(post("/people/", form, None, true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).unwrap();
    let pid = body_json(response).await["id"].as_i64().unwrap();

    let response = app.clone().oneshot(get(&format!("/passenger/{pid}/json/"), None)).await.unwrap();
    let public = body_json(response).await;
    assert!(public["request"]["contact"].is_null());
    assert!(public["request"]["email"].is_null());

    let response = app.clone().oneshot(get(&format!("/passenger/{pid}/"), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.oneshot(get(&format!("/passenger/{pid}/"), Some(&cookie))).await.unwrap();
    assert_eq!(body_json(response).await["request"]["contact"], "ben-phone");
}

#[tokio::test]
async fn hiding_without_email_is_rejected() {
    let (app, _, _) = setup().await;
    let form = "passenger_name=Ben&hide_contact=on&departure=Taipei+City&destination=Tainan+City&date=2030-01-10";
    let response = app.oneshot(post("/people/", form, None, true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["ok"], false);
    assert!(json["error"].as_str().unwrap().contains("email"));
}

#[tokio::test]
async fn invalid_trip_form_is_shown_again() {
    let (app, _, _) = setup().await;
    let form = "driver_name=Amy&seats_total=three&departure=Taipei+City&destination=Tainan+City&date=2030-01-10";
    let response = app.oneshot(post("/car/", form, None, false)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let html = body_text(response).await;
    assert!(html.contains(r#"class="error""#));
    assert!(html.contains("seats_total must be a number"));
}

#[tokio::test]
async fn deleting_a_request_revokes_its_grant() {
    let (app, _, _) = setup().await;
    let (trip_id, _) = create_trip(&app, TRIP).await;
    let (pid, cookie) = join(&app, trip_id, "passenger_name=Ben").await;
    let delete = format!("/passenger/{pid}/delete/");

    let response = app.clone().oneshot(post(&delete, "", None, true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.clone().oneshot(post(&delete, "", Some(&cookie), true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get(&format!("/passenger/{pid}/json/"), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(post(&delete, "", Some(&cookie), true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn partial_update_keeps_other_fields() {
    let (app, state, _) = setup().await;
    let (trip_id, _) = create_trip(&app, TRIP).await;
    let (pid, cookie) = join(&app, trip_id, "passenger_name=Ben&contact=ben-phone").await;

    let response = app
        .oneshot(post(&format!("/passenger/{pid}/update/"), "note=bringing+a+bike", Some(&cookie), true))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = state.data_manager.get_request(pid).await.unwrap();
    assert_eq!(request.note, "bringing a bike");
    assert_eq!(request.contact, "ben-phone");
    assert_eq!(request.driver_id, Some(trip_id));
}

#[tokio::test]
async fn changes_are_broadcast_after_commit() {
    let (app, state, _) = setup().await;
    let mut rx = state.tx.subscribe();
    let (trip_id, _) = create_trip(&app, TRIP).await;

    let mut saw_lists = false;
    let mut saw_card = false;
    while let Ok(envelope) = rx.try_recv() {
        match envelope {
            Envelope::Update { drivers_html: Some(html), .. } => saw_lists = html.contains(&format!("driver-{trip_id}")),
            Envelope::DriverPartial { driver_id, active, .. } => saw_card = driver_id == trip_id && active,
            _ => {},
        }
    }
    assert!(saw_lists);
    assert!(saw_card);
}

#[tokio::test]
async fn huge_fares_are_refused_and_filtered_safely() {
    let (app, state, _) = setup().await;
    let form = "passenger_name=Ben&willing_to_pay=100000000000000000000\
&departure=Taipei+City&destination=Tainan+City&date=2030-01-10";
    let response = app.clone().oneshot(post("/people/", form, None, true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("at most"));
    assert!(state.data_manager.list_pool(&ListFilter::default()).await.unwrap().is_empty());

    let form = "passenger_name=Quillon&willing_to_pay=9999.99&departure=Taipei+City&destination=Tainan+City&date=2030-01-10";
    let response = app.clone().oneshot(post("/people/", form, None, true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/?fare=79228162514264337593543950335", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!body_text(response).await.contains("Quillon"));

    let response = app.oneshot(get("/?fare=9999", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Quillon"));
}

#[tokio::test]
async fn invalid_join_form_gets_a_page() {
    let (app, state, _) = setup().await;
    let (trip_id, _) = create_trip(&app, TRIP).await;
    let url = format!("/driver/{trip_id}/join/");

    let response = app.clone().oneshot(post(&url, "passenger_name=Ben&seats_needed=two", None, false)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
    let html = body_text(response).await;
    assert!(html.contains(r#"class="error""#));
    assert!(html.contains("seats_needed must be a number"));
    assert!(state.data_manager.get_trip_card(trip_id).await.unwrap().pending.is_empty());

    // Scripted posts still get JSON.
    let response = app.oneshot(post(&url, "passenger_name=Ben&seats_needed=two", None, true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["ok"], false);
}

#[tokio::test]
async fn index_filters_by_gender() {
    let (app, _, _) = setup().await;
    create_trip(&app, &format!("{TRIP}&gender=F")).await;

    let response = app.clone().oneshot(get("/?gender=F", None)).await.unwrap();
    let html = body_text(response).await;
    assert!(html.contains(r#"<option value="F" selected>"#));
    assert!(html.contains(r#"class="driver-card""#));

    let response = app.oneshot(get("/?gender=M", None)).await.unwrap();
    assert!(!body_text(response).await.contains(r#"class="driver-card""#));
}
