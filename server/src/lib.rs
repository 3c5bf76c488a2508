use std::{path::Path, sync::Arc};

use axum::Router;

pub mod config;
pub mod error;
pub mod forms;
pub mod live;
pub mod mail;
pub mod render;
pub mod routes;
pub mod server_state;
pub mod session;

use server_state::ServerState;

/// The whole site: pages, JSON actions, sockets and static files.
pub fn app(state: Arc<ServerState>, static_dir: &Path) -> Router {
    routes::router(state, static_dir)
}
