use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::CookieJar;

use super::{sort_cookie, ListSort};
use crate::{error::AppError, forms::FindQuery, render, server_state::ServerState};

/// Public list. The chosen sort is remembered in a cookie for the sockets
/// and later visits.
pub async fn index(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<FindQuery>,
    sort: ListSort,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let order = sort.resolve(None);
    let filter = query.to_filter();

    let cards = state.data_manager.list_trip_cards(&filter, order).await?;
    let pool = state.data_manager.list_pool(&filter).await?;

    let page = render::index_page(&cards, &pool, order, &query);
    Ok((jar.add(sort_cookie(order)), Html(page)).into_response())
}

pub async fn healthz() -> &'static str {
    "ok"
}
