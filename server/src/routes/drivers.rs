//! Trip pages and the driver's JSON actions.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::CookieJar;
use ride_share_lib::notify::build_join_emails;
use serde_json::json;

use super::{forbidden_page, is_xhr, password, require, today, ListSort};
use crate::{
    error::AppError,
    forms::{request_draft, trip_draft, FormFields},
    live,
    render,
    server_state::ServerState,
    session::Grant,
};

fn manage_url(trip_id: i64) -> String {
    format!("/driver/{trip_id}/manage/")
}

pub async fn new_trip_form() -> Html<String> {
    Html(render::trip_form_page(None))
}

/// Creating a trip logs the creator in as its driver.
pub async fn create_trip(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    sort: ListSort,
    jar: CookieJar,
    Form(fields): Form<FormFields>,
) -> Result<Response, AppError> {
    let xhr = is_xhr(&headers);
    let created = match trip_draft(&fields, false) {
        Ok(draft) => state.data_manager.create_trip(draft).await.map_err(AppError::from),
        Err(err) => Err(err.into()),
    };

    let trip = match created {
        Ok(trip) => trip,
        Err(err) if !xhr && err.status() != StatusCode::INTERNAL_SERVER_ERROR => {
            let page = render::trip_form_page(Some(&err.public_message()));
            return Ok((err.status(), Html(page)).into_response());
        },
        Err(err) => return Err(err),
    };

    let jar = state.sessions.grant(jar, Grant::Driver(trip.id)).await;
    live::publish_trip_change(&state, trip.id, sort.resolve(fields.get("sort"))).await;

    let url = manage_url(trip.id);
    if xhr {
        Ok((jar, Json(json!({ "ok": true, "id": trip.id, "url": url }))).into_response())
    } else {
        Ok((jar, Redirect::to(&url)).into_response())
    }
}

/// Attaches a new pending request to the trip and lets both sides know by
/// email once it is stored.
pub async fn join(
    State(state): State<Arc<ServerState>>,
    Path(trip_id): Path<i64>,
    headers: HeaderMap,
    sort: ListSort,
    jar: CookieJar,
    Form(fields): Form<FormFields>,
) -> Result<Response, AppError> {
    let xhr = is_xhr(&headers);
    let trip = state.data_manager.get_trip(trip_id).await?;
    let joined = match request_draft(&fields, Some(&trip)) {
        Ok(draft) => state.data_manager.join_trip(trip_id, draft).await.map_err(AppError::from),
        Err(err) => Err(err.into()),
    };

    let (trip, request) = match joined {
        Ok(joined) => joined,
        Err(err) if !xhr && err.status() != StatusCode::INTERNAL_SERVER_ERROR => {
            let page = render::join_error_page(trip_id, &err.public_message());
            return Ok((err.status(), Html(page)).into_response());
        },
        Err(err) => return Err(err),
    };

    state.mail.enqueue(build_join_emails(&trip, &request, today()));
    let jar = state.sessions.grant(jar, Grant::Passenger(request.id)).await;
    live::publish_trip_change(&state, trip_id, sort.resolve(fields.get("sort"))).await;

    let url = format!("/passenger/{}/manage/", request.id);
    if xhr {
        Ok((jar, Json(json!({ "ok": true, "id": request.id, "url": url }))).into_response())
    } else {
        let page = render::notice_page(
            "Request sent",
            &format!("{} will see your request for ride #{trip_id} and can confirm it.", trip.driver_name),
        );
        Ok((jar, Html(page)).into_response())
    }
}

pub async fn auth(
    State(state): State<Arc<ServerState>>,
    Path(trip_id): Path<i64>,
    jar: CookieJar,
    Form(fields): Form<FormFields>,
) -> Result<Response, AppError> {
    let password = password(&fields)?;
    if !state.data_manager.verify_trip_password(trip_id, &password).await? {
        tracing::debug!("Wrong password for trip {trip_id}");
        return Err(AppError::WrongPassword);
    }

    let jar = state.sessions.grant(jar, Grant::Driver(trip_id)).await;
    Ok((jar, Json(json!({ "ok": true, "url": manage_url(trip_id) }))).into_response())
}

async fn render_manage(state: &ServerState, trip_id: i64, error: Option<&str>, notice: Option<&str>) -> Result<String, AppError> {
    let card = state.data_manager.get_trip_card(trip_id).await?;
    let candidates = state.data_manager.candidates(&card.trip).await?;
    Ok(render::manage_page(&card, &candidates, error, notice))
}

pub async fn manage_page(
    State(state): State<Arc<ServerState>>,
    Path(trip_id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if require(&state, &jar, Grant::Driver(trip_id)).await.is_err() {
        return Ok(forbidden_page());
    }
    Ok(Html(render_manage(&state, trip_id, None, None).await?).into_response())
}

/// The management page posts back here with `action` set to
/// `update_driver` or `accept_passengers`.
pub async fn manage_submit(
    State(state): State<Arc<ServerState>>,
    Path(trip_id): Path<i64>,
    sort: ListSort,
    jar: CookieJar,
    Form(fields): Form<FormFields>,
) -> Result<Response, AppError> {
    if require(&state, &jar, Grant::Driver(trip_id)).await.is_err() {
        return Ok(forbidden_page());
    }

    let outcome = match fields.text("action").as_str() {
        "update_driver" => {
            let updated = match trip_draft(&fields, true) {
                Ok(draft) => state.data_manager.update_trip(trip_id, draft, today()).await.map_err(AppError::from),
                Err(err) => Err(err.into()),
            };
            updated.map(|_| "Ride updated.".to_string())
        },
        "accept_passengers" => {
            let ids: Vec<i64> = fields.all("passenger_ids")
                .filter_map(|id| id.trim().parse().ok())
                .collect();
            state.data_manager.accept_requests(trip_id, &ids).await
                .map(|summary| match summary.skipped.len() {
                    0 => format!("Accepted {} passengers.", summary.accepted.len()),
                    skipped => format!("Accepted {} passengers, {skipped} did not fit.", summary.accepted.len()),
                })
                .map_err(AppError::from)
        },
        other => Err(AppError::BadRequest(format!("unknown action {other:?}"))),
    };

    match outcome {
        Ok(notice) => {
            live::publish_trip_change(&state, trip_id, sort.resolve(fields.get("sort"))).await;
            Ok(Html(render_manage(&state, trip_id, None, Some(&notice)).await?).into_response())
        },
        Err(err) if err.status() == StatusCode::INTERNAL_SERVER_ERROR => Err(err),
        Err(err) => {
            let page = render_manage(&state, trip_id, Some(&err.public_message()), None).await?;
            Ok((err.status(), Html(page)).into_response())
        },
    }
}

pub async fn delete(
    State(state): State<Arc<ServerState>>,
    Path(trip_id): Path<i64>,
    headers: HeaderMap,
    sort: ListSort,
    jar: CookieJar,
) -> Result<Response, AppError> {
    require(&state, &jar, Grant::Driver(trip_id)).await?;

    let released = state.data_manager.delete_trip(trip_id).await?;
    state.sessions.revoke_everywhere(Grant::Driver(trip_id)).await;
    tracing::debug!("Trip {trip_id} deleted, released {} requests", released.len());

    live::publish_trip_change(&state, trip_id, sort.resolve(None)).await;

    if is_xhr(&headers) {
        Ok(Json(json!({ "ok": true, "url": "/", "released": released })).into_response())
    } else {
        Ok(Redirect::to("/").into_response())
    }
}

pub async fn privacy(
    State(state): State<Arc<ServerState>>,
    Path(trip_id): Path<i64>,
    sort: ListSort,
    jar: CookieJar,
    Form(fields): Form<FormFields>,
) -> Result<Json<serde_json::Value>, AppError> {
    require(&state, &jar, Grant::Driver(trip_id)).await?;

    let trip = state.data_manager.set_trip_privacy(trip_id, fields.privacy()).await?;
    live::publish_trip_change(&state, trip_id, sort.resolve(fields.get("sort"))).await;

    Ok(Json(json!({
        "ok": true,
        "hide_contact": trip.hide_contact,
        "auto_email_contact": trip.auto_email_contact,
    })))
}

pub async fn accept(
    State(state): State<Arc<ServerState>>,
    Path((trip_id, request_id)): Path<(i64, i64)>,
    sort: ListSort,
    jar: CookieJar,
) -> Result<Json<serde_json::Value>, AppError> {
    require(&state, &jar, Grant::Driver(trip_id)).await?;

    let (trip, _request) = state.data_manager.accept_request(trip_id, request_id).await?;
    live::publish_trip_change(&state, trip_id, sort.resolve(None)).await;

    Ok(Json(json!({
        "ok": true,
        "seats_filled": trip.seats_filled,
        "seats_left": trip.seats_left(),
        "is_active": trip.is_active,
    })))
}

/// Rejects a pending request or cancels an accepted one. Either way the
/// request goes back to the pool.
pub async fn reject(
    State(state): State<Arc<ServerState>>,
    Path((trip_id, request_id)): Path<(i64, i64)>,
    sort: ListSort,
    jar: CookieJar,
) -> Result<Json<serde_json::Value>, AppError> {
    require(&state, &jar, Grant::Driver(trip_id)).await?;

    let (trip, _request) = state.data_manager.reject_request(trip_id, request_id).await?;
    live::publish_trip_change(&state, trip_id, sort.resolve(None)).await;

    Ok(Json(json!({
        "ok": true,
        "seats_filled": trip.seats_filled,
        "seats_left": trip.seats_left(),
        "is_active": trip.is_active,
    })))
}

pub async fn memo(
    State(state): State<Arc<ServerState>>,
    Path((trip_id, request_id)): Path<(i64, i64)>,
    jar: CookieJar,
    Form(fields): Form<FormFields>,
) -> Result<Json<serde_json::Value>, AppError> {
    require(&state, &jar, Grant::Driver(trip_id)).await?;

    let request = state.data_manager.set_driver_memo(trip_id, request_id, &fields.text("memo")).await?;
    // Only the driver's own panel shows memos.
    live::publish_trip(&state, trip_id).await;

    Ok(Json(json!({ "ok": true, "memo": request.driver_memo })))
}
