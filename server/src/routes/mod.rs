use std::{convert::Infallible, net::SocketAddr, path::Path, sync::Arc};

use axum::{
    body::Body,
    extract::{ConnectInfo, FromRequestParts, Query, State},
    http::{request::Parts, HeaderMap, Request, StatusCode},
    middleware::{from_fn_with_state, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use axum_extra::extract::{cookie::Cookie, CookieJar};
use chrono::NaiveDate;
use ride_share_lib::listing::SortOrder;
use serde::Deserialize;
use tower_http::services::ServeDir;

use crate::{
    error::AppError,
    forms::FormFields,
    live,
    render,
    server_state::ServerState,
    session::Grant,
};

mod drivers;
mod index;
mod passengers;

pub const SORT_COOKIE: &str = "find_sort";

pub fn router(state: Arc<ServerState>, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get(index::index))
        .route("/healthz", get(index::healthz))
        .route("/car/", get(drivers::new_trip_form).post(drivers::create_trip))
        .route("/driver/{id}/join/", post(drivers::join))
        .route("/driver/{id}/auth/", post(drivers::auth))
        .route("/driver/{id}/manage/", get(drivers::manage_page).post(drivers::manage_submit))
        .route("/driver/{id}/delete/", post(drivers::delete))
        .route("/driver/{id}/privacy/", post(drivers::privacy))
        .route("/driver/{id}/passenger/{pid}/accept/", post(drivers::accept))
        .route("/driver/{id}/passenger/{pid}/reject/", post(drivers::reject))
        .route("/driver/{id}/passenger/{pid}/memo/", post(drivers::memo))
        .route("/people/", get(passengers::new_request_form).post(passengers::create_request))
        .route("/passenger/{pid}/", get(passengers::own))
        .route("/passenger/{pid}/json/", get(passengers::public_json))
        .route("/passenger/{pid}/auth/", post(passengers::auth))
        .route("/passenger/{pid}/update/", post(passengers::update))
        .route("/passenger/{pid}/delete/", post(passengers::delete))
        .route("/passenger/{pid}/privacy/", post(passengers::privacy))
        .route("/passenger/{pid}/edit/", post(passengers::edit))
        .route("/passenger/{pid}/manage/", get(passengers::manage_page).post(passengers::manage_submit))
        .route("/ws/find/", get(live::public_socket))
        .route("/ws/find/driver/{id}/", get(live::driver_socket))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state.clone())
        .layer(from_fn_with_state(state, log_request))
}

async fn log_request(State(_state): State<Arc<ServerState>>, req: Request<Body>, next: Next) -> Response {
    let path = req.uri().path();

    // Static assets and health checks would drown everything else.
    if !path.starts_with("/static/") && path != "/healthz" {
        match req.extensions().get::<ConnectInfo<SocketAddr>>() {
            Some(ConnectInfo(addr)) => tracing::debug!("{} {} from {}", req.method(), path, addr.ip()),
            None => tracing::debug!("{} {}", req.method(), path),
        }
    }

    next.run(req).await
}

/// Sort preference from the query string and the `find_sort` cookie. A form
/// field, when there is one, beats both.
pub struct ListSort {
    query: Option<String>,
    cookie: Option<String>,
}

#[derive(Deserialize)]
struct SortParam {
    sort: Option<String>,
}

impl ListSort {
    pub fn resolve(&self, form: Option<&str>) -> SortOrder {
        SortOrder::resolve([form, self.query.as_deref(), self.cookie.as_deref()])
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ListSort {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = Query::<SortParam>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(param)| param.sort);
        let cookie = CookieJar::from_headers(&parts.headers)
            .get(SORT_COOKIE)
            .map(|cookie| cookie.value().to_string());

        Ok(ListSort { query, cookie })
    }
}

pub fn sort_cookie(order: SortOrder) -> Cookie<'static> {
    Cookie::build((SORT_COOKIE, order.key()))
        .path("/")
        .build()
}

/// Requests sent by the page script expect JSON back instead of a page.
pub fn is_xhr(headers: &HeaderMap) -> bool {
    headers.get("x-requested-with")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("XMLHttpRequest"))
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub async fn require(state: &ServerState, jar: &CookieJar, grant: Grant) -> Result<(), AppError> {
    if state.sessions.has(jar, grant).await {
        Ok(())
    } else {
        Err(AppError::Unauthorised)
    }
}

/// Page-flavoured refusal for browsers that followed a link without a grant.
pub fn forbidden_page() -> Response {
    let page = render::notice_page("Password needed", "Enter the password from the list page to manage this entry.");
    (StatusCode::FORBIDDEN, Html(page)).into_response()
}

pub fn password(fields: &FormFields) -> Result<String, AppError> {
    fields.opt("password").ok_or(AppError::MissingPassword)
}
