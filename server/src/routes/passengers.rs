//! Ride requests: creation, self-service and the public view.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::CookieJar;
use ride_share_lib::{listing::SortOrder, PassengerRequest};
use serde_json::{json, Value};

use super::{forbidden_page, is_xhr, password, require, ListSort};
use crate::{
    error::AppError,
    forms::{request_defaults, request_draft, FormFields},
    live,
    render,
    server_state::ServerState,
    session::Grant,
};

fn manage_url(request_id: i64) -> String {
    format!("/passenger/{request_id}/manage/")
}

/// What anyone may see of a request.
fn public_view(request: &PassengerRequest) -> Value {
    json!({
        "id": request.id,
        "passenger_name": request.passenger_name,
        "contact": request.public_contact(),
        "email": request.public_email(),
        "gender": request.gender.code(),
        "seats_needed": request.seats_needed,
        "willing_to_pay": request.willing_to_pay,
        "departure": request.departure,
        "destination": request.destination,
        "date": request.date,
        "return_date": request.return_date,
        "note": request.note,
        "is_matched": request.is_matched,
        "driver_id": request.driver_id,
        "together_return": request.together_return,
    })
}

/// Refreshes whatever shows the request: the pool, or its trip's card.
async fn publish_request(state: &ServerState, request: &PassengerRequest, order: SortOrder) {
    match request.driver_id {
        Some(trip_id) => live::publish_trip_change(state, trip_id, order).await,
        None => live::publish_pool(state, order).await,
    }
}

pub async fn new_request_form() -> Html<String> {
    Html(render::request_form_page(None))
}

/// Puts the request in the pool and shows the rides going the same way.
pub async fn create_request(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    sort: ListSort,
    jar: CookieJar,
    Form(fields): Form<FormFields>,
) -> Result<Response, AppError> {
    let xhr = is_xhr(&headers);
    let created = match request_draft(&fields, None) {
        Ok(draft) => state.data_manager.create_request(draft).await.map_err(AppError::from),
        Err(err) => Err(err.into()),
    };

    let request = match created {
        Ok(request) => request,
        Err(err) if !xhr && err.status() != StatusCode::INTERNAL_SERVER_ERROR => {
            let page = render::request_form_page(Some(&err.public_message()));
            return Ok((err.status(), Html(page)).into_response());
        },
        Err(err) => return Err(err),
    };

    let jar = state.sessions.grant(jar, Grant::Passenger(request.id)).await;
    live::publish_pool(&state, sort.resolve(fields.get("sort"))).await;

    if xhr {
        return Ok((jar, Json(json!({ "ok": true, "id": request.id, "url": manage_url(request.id) }))).into_response());
    }

    let mut cards = Vec::new();
    for trip in state.data_manager.trips_for_request(&request).await? {
        cards.push(state.data_manager.get_trip_card(trip.id).await?);
    }
    Ok((jar, Html(render::matches_page(&request, &cards))).into_response())
}

pub async fn auth(
    State(state): State<Arc<ServerState>>,
    Path(request_id): Path<i64>,
    jar: CookieJar,
    Form(fields): Form<FormFields>,
) -> Result<Response, AppError> {
    let password = password(&fields)?;
    if !state.data_manager.verify_request_password(request_id, &password).await? {
        tracing::debug!("Wrong password for request {request_id}");
        return Err(AppError::WrongPassword);
    }

    let jar = state.sessions.grant(jar, Grant::Passenger(request_id)).await;
    Ok((jar, Json(json!({ "ok": true, "url": manage_url(request_id) }))).into_response())
}

/// Password form on the public list. Leads to the manage page on success.
pub async fn edit(
    State(state): State<Arc<ServerState>>,
    Path(request_id): Path<i64>,
    jar: CookieJar,
    Form(fields): Form<FormFields>,
) -> Result<Response, AppError> {
    let verified = match fields.opt("password") {
        Some(password) => state.data_manager.verify_request_password(request_id, &password).await?,
        None => false,
    };

    if !verified {
        let page = render::notice_page("Wrong password", "That password does not match this request.");
        return Ok((StatusCode::FORBIDDEN, Html(page)).into_response());
    }

    let jar = state.sessions.grant(jar, Grant::Passenger(request_id)).await;
    Ok((jar, Redirect::to(&manage_url(request_id))).into_response())
}

pub async fn own(
    State(state): State<Arc<ServerState>>,
    Path(request_id): Path<i64>,
    jar: CookieJar,
) -> Result<Json<Value>, AppError> {
    require(&state, &jar, Grant::Passenger(request_id)).await?;

    let request = state.data_manager.get_request(request_id).await?;
    Ok(Json(json!({ "ok": true, "request": request })))
}

pub async fn public_json(
    State(state): State<Arc<ServerState>>,
    Path(request_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let request = state.data_manager.get_request(request_id).await?;
    Ok(Json(json!({ "ok": true, "request": public_view(&request) })))
}

/// Partial updates are fine: fields not sent keep their current value.
async fn apply_update(state: &ServerState, request_id: i64, fields: FormFields) -> Result<PassengerRequest, AppError> {
    let current = state.data_manager.get_request(request_id).await?;
    let fields = fields.with_defaults(request_defaults(&current));
    let draft = request_draft(&fields, None)?;
    Ok(state.data_manager.update_request(request_id, draft).await?)
}

pub async fn update(
    State(state): State<Arc<ServerState>>,
    Path(request_id): Path<i64>,
    sort: ListSort,
    jar: CookieJar,
    Form(fields): Form<FormFields>,
) -> Result<Json<Value>, AppError> {
    require(&state, &jar, Grant::Passenger(request_id)).await?;

    let order = sort.resolve(fields.get("sort"));
    let request = apply_update(&state, request_id, fields).await?;
    publish_request(&state, &request, order).await;

    Ok(Json(json!({ "ok": true, "request": request })))
}

async fn remove(state: &ServerState, request_id: i64, order: SortOrder) -> Result<PassengerRequest, AppError> {
    let deleted = state.data_manager.delete_request(request_id).await?;
    state.sessions.revoke_everywhere(Grant::Passenger(request_id)).await;
    publish_request(state, &deleted, order).await;
    Ok(deleted)
}

pub async fn delete(
    State(state): State<Arc<ServerState>>,
    Path(request_id): Path<i64>,
    headers: HeaderMap,
    sort: ListSort,
    jar: CookieJar,
) -> Result<Response, AppError> {
    require(&state, &jar, Grant::Passenger(request_id)).await?;

    remove(&state, request_id, sort.resolve(None)).await?;

    if is_xhr(&headers) {
        Ok(Json(json!({ "ok": true, "url": "/" })).into_response())
    } else {
        Ok(Redirect::to("/").into_response())
    }
}

pub async fn privacy(
    State(state): State<Arc<ServerState>>,
    Path(request_id): Path<i64>,
    sort: ListSort,
    jar: CookieJar,
    Form(fields): Form<FormFields>,
) -> Result<Json<Value>, AppError> {
    require(&state, &jar, Grant::Passenger(request_id)).await?;

    let request = state.data_manager.set_request_privacy(request_id, fields.privacy()).await?;
    publish_request(&state, &request, sort.resolve(fields.get("sort"))).await;

    Ok(Json(json!({
        "ok": true,
        "hide_contact": request.hide_contact,
        "auto_email_contact": request.auto_email_contact,
    })))
}

pub async fn manage_page(
    State(state): State<Arc<ServerState>>,
    Path(request_id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if require(&state, &jar, Grant::Passenger(request_id)).await.is_err() {
        return Ok(forbidden_page());
    }

    let request = state.data_manager.get_request(request_id).await?;
    Ok(Html(render::passenger_manage_page(&request, None, None)).into_response())
}

/// Form posts from the manage page, `action` being `update` or `delete`.
pub async fn manage_submit(
    State(state): State<Arc<ServerState>>,
    Path(request_id): Path<i64>,
    sort: ListSort,
    jar: CookieJar,
    Form(fields): Form<FormFields>,
) -> Result<Response, AppError> {
    if require(&state, &jar, Grant::Passenger(request_id)).await.is_err() {
        return Ok(forbidden_page());
    }
    let order = sort.resolve(fields.get("sort"));

    match fields.text("action").as_str() {
        "delete" => {
            remove(&state, request_id, order).await?;
            let page = render::notice_page("Request deleted", "Your ride request has been removed.");
            Ok(Html(page).into_response())
        },
        "update" => match apply_update(&state, request_id, fields).await {
            Ok(request) => {
                publish_request(&state, &request, order).await;
                Ok(Html(render::passenger_manage_page(&request, None, Some("Request updated."))).into_response())
            },
            Err(err) if err.status() == StatusCode::INTERNAL_SERVER_ERROR => Err(err),
            Err(err) => {
                let request = state.data_manager.get_request(request_id).await?;
                let page = render::passenger_manage_page(&request, Some(&err.public_message()), None);
                Ok((err.status(), Html(page)).into_response())
            },
        },
        other => Err(AppError::BadRequest(format!("unknown action {other:?}"))),
    }
}
