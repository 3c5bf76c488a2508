//! Live list refresh over websockets.
//!
//! After a change is committed the affected fragments are re-rendered and
//! pushed through the shared broadcast channel. Each socket forwards what is
//! meant for it. Nothing is diffed or replayed; a socket that falls behind
//! just skips messages.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use futures::{sink::SinkExt, stream::{SplitSink, StreamExt}};
use ride_share_data_management::{DataManagerError, TripCard};
use ride_share_lib::listing::{ListFilter, SortOrder};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast::error::RecvError, mpsc};

use crate::{error::AppError, render, routes::SORT_COOKIE, server_state::ServerState, session::Grant};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// Both public lists. `drivers_html` is left out when only the pool changed.
    Update {
        drivers_html: Option<String>,
        passengers_html: String,
        sort: String,
    },
    /// One public card. Empty html with `active: false` removes it.
    DriverPartial {
        driver_id: i64,
        driver_html: String,
        active: bool,
    },
    /// Management panel of one trip.
    ManagePartial {
        driver_id: i64,
        pending_html: String,
        accepted_html: String,
    },
    JoinResult {
        success: bool,
        message: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Public,
    Driver(i64),
}

impl Envelope {
    pub fn is_for(&self, topic: Topic) -> bool {
        match (self, topic) {
            (Envelope::Update { .. }, Topic::Public) => true,
            (Envelope::DriverPartial { .. }, Topic::Public) => true,
            (Envelope::DriverPartial { driver_id, .. }, Topic::Driver(id)) => *driver_id == id,
            (Envelope::ManagePartial { driver_id, .. }, Topic::Driver(id)) => *driver_id == id,
            _ => false,
        }
    }
}

// Envelope builders

pub async fn lists_envelope(state: &ServerState, order: SortOrder) -> Result<Envelope, DataManagerError> {
    let all = ListFilter::default();
    let cards = state.data_manager.list_trip_cards(&all, order).await?;
    let pool = state.data_manager.list_pool(&all).await?;

    Ok(Envelope::Update {
        drivers_html: Some(render::driver_list(&cards)),
        passengers_html: render::passenger_list(&pool),
        sort: order.key().to_string(),
    })
}

pub async fn pool_envelope(state: &ServerState, order: SortOrder) -> Result<Envelope, DataManagerError> {
    let pool = state.data_manager.list_pool(&ListFilter::default()).await?;

    Ok(Envelope::Update {
        drivers_html: None,
        passengers_html: render::passenger_list(&pool),
        sort: order.key().to_string(),
    })
}

pub async fn driver_envelope(state: &ServerState, trip_id: i64) -> Result<Envelope, DataManagerError> {
    let card = match state.data_manager.get_trip_card(trip_id).await {
        Ok(card) => Some(card),
        Err(DataManagerError::NotFound(..)) => None,
        Err(err) => return Err(err),
    };

    Ok(match card {
        Some(card) if card.trip.is_active => Envelope::DriverPartial {
            driver_id: trip_id,
            driver_html: render::driver_card(&card),
            active: true,
        },
        _ => Envelope::DriverPartial {
            driver_id: trip_id,
            driver_html: String::new(),
            active: false,
        },
    })
}

pub fn manage_envelope(card: &TripCard) -> Envelope {
    Envelope::ManagePartial {
        driver_id: card.trip.id,
        pending_html: render::pending_list(card.trip.id, &card.pending),
        accepted_html: render::accepted_list(card.trip.id, &card.accepted),
    }
}

// Publishing. Failures only cost a refresh, so they are logged and dropped.

fn send(state: &ServerState, envelope: Envelope) {
    // Errors only mean nobody is listening.
    let _ = state.tx.send(envelope);
}

pub async fn publish_lists(state: &ServerState, order: SortOrder) {
    match lists_envelope(state, order).await {
        Ok(envelope) => send(state, envelope),
        Err(err) => tracing::error!("Failed to render lists: {err}"),
    }
}

pub async fn publish_pool(state: &ServerState, order: SortOrder) {
    match pool_envelope(state, order).await {
        Ok(envelope) => send(state, envelope),
        Err(err) => tracing::error!("Failed to render pool: {err}"),
    }
}

/// Public card and management panel of one trip.
pub async fn publish_trip(state: &ServerState, trip_id: i64) {
    match driver_envelope(state, trip_id).await {
        Ok(envelope) => send(state, envelope),
        Err(err) => tracing::error!("Failed to render trip {trip_id}: {err}"),
    }

    match state.data_manager.get_trip_card(trip_id).await {
        Ok(card) => send(state, manage_envelope(&card)),
        Err(DataManagerError::NotFound(..)) => {},
        Err(err) => tracing::error!("Failed to render management of trip {trip_id}: {err}"),
    }
}

/// Everything a change to one trip can touch.
pub async fn publish_trip_change(state: &ServerState, trip_id: i64, order: SortOrder) {
    publish_lists(state, order).await;
    publish_trip(state, trip_id).await;
}

// Sockets

#[derive(Debug, Default, Deserialize)]
pub struct SocketQuery {
    sort: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientAction {
    action: String,
    passenger_id: Option<i64>,
}

pub async fn public_socket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
    Query(query): Query<SocketQuery>,
    jar: CookieJar,
) -> Response {
    let order = SortOrder::resolve([query.sort.as_deref(), jar.get(SORT_COOKIE).map(|c| c.value())]);
    ws.on_upgrade(move |socket| run_socket(socket, state, Topic::Public, order, jar))
}

pub async fn driver_socket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
    Path(trip_id): Path<i64>,
    jar: CookieJar,
) -> Response {
    if !state.sessions.has(&jar, Grant::Driver(trip_id)).await {
        return AppError::Unauthorised.into_response();
    }
    ws.on_upgrade(move |socket| run_socket(socket, state, Topic::Driver(trip_id), SortOrder::default(), jar))
}

async fn initial_envelope(state: &ServerState, topic: Topic, order: SortOrder) -> Result<Envelope, DataManagerError> {
    match topic {
        Topic::Public => lists_envelope(state, order).await,
        Topic::Driver(trip_id) => Ok(manage_envelope(&state.data_manager.get_trip_card(trip_id).await?)),
    }
}

async fn send_envelope(sender: &mut SplitSink<WebSocket, Message>, envelope: &Envelope) -> Result<(), anyhow::Error> {
    let text = serde_json::to_string(envelope)?;
    sender.send(Message::Text(text.into())).await?;
    Ok(())
}

async fn run_socket(socket: WebSocket, state: Arc<ServerState>, topic: Topic, order: SortOrder, jar: CookieJar) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.tx.subscribe();
    let (reply_tx, mut reply_rx) = mpsc::channel::<Envelope>(8);

    match initial_envelope(&state, topic, order).await {
        Ok(envelope) => {
            if send_envelope(&mut sender, &envelope).await.is_err() {
                return;
            }
        },
        Err(err) => tracing::error!("Failed to render initial socket state: {err}"),
    }

    let viewer_state = state.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let envelope = tokio::select! {
                message = rx.recv() => match message {
                    Ok(envelope) if envelope.is_for(topic) => match for_viewer(&viewer_state, envelope, order).await {
                        Some(envelope) => envelope,
                        None => continue,
                    },
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!("Socket lagged, skipped {skipped} messages");
                        continue;
                    },
                    Err(RecvError::Closed) => break,
                },
                Some(reply) = reply_rx.recv() => reply,
            };

            if send_envelope(&mut sender, &envelope).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => {
                    if let Some(reply) = handle_client_message(&state, &jar, topic, text.as_str()).await {
                        if reply_tx.send(reply).await.is_err() {
                            break;
                        }
                    }
                },
                Message::Close(_) => break,
                _ => {},
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

/// List updates are rendered in the sort order of whoever caused them.
/// Sockets watching another order get their own rendering instead.
async fn for_viewer(state: &ServerState, envelope: Envelope, order: SortOrder) -> Option<Envelope> {
    let (pool_only, sort) = match &envelope {
        Envelope::Update { drivers_html, sort, .. } => (drivers_html.is_none(), sort.as_str()),
        _ => return Some(envelope),
    };
    if sort == order.key() {
        return Some(envelope);
    }

    let rendered = if pool_only {
        pool_envelope(state, order).await
    } else {
        lists_envelope(state, order).await
    };
    match rendered {
        Ok(envelope) => Some(envelope),
        Err(err) => {
            tracing::error!("Failed to render lists for socket: {err}");
            None
        },
    }
}

async fn handle_client_message(state: &ServerState, jar: &CookieJar, topic: Topic, text: &str) -> Option<Envelope> {
    let action: ClientAction = match serde_json::from_str(text) {
        Ok(action) => action,
        Err(err) => {
            tracing::debug!("Ignoring socket message: {err}");
            return None;
        },
    };

    match (action.action.as_str(), topic) {
        ("join", Topic::Public) => Some(join(state, jar, action.passenger_id).await),
        _ => None,
    }
}

/// Auto-match from the socket. Only the request's owner may trigger it.
async fn join(state: &ServerState, jar: &CookieJar, passenger_id: Option<i64>) -> Envelope {
    let failure = |message: &str| Envelope::JoinResult { success: false, message: Some(message.to_string()) };

    let Some(passenger_id) = passenger_id else {
        return failure("passenger_id is required");
    };
    if !state.sessions.has(jar, Grant::Passenger(passenger_id)).await {
        return failure("not authorised");
    }

    match state.data_manager.auto_match(passenger_id).await {
        Ok(Some(trip)) => {
            publish_trip_change(state, trip.id, SortOrder::default()).await;
            Envelope::JoinResult {
                success: true,
                message: Some(format!("Matched with {} on {}", trip.driver_name, trip.date)),
            }
        },
        Ok(None) => failure("no driver is available right now"),
        Err(DataManagerError::NotFound(..)) => failure("request not found"),
        Err(err) => {
            tracing::warn!("Auto-match of request {passenger_id} failed: {err}");
            failure(&err.to_string())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelopes_reach_their_audience() {
        let update = Envelope::Update { drivers_html: None, passengers_html: String::new(), sort: "date_desc".into() };
        let card = Envelope::DriverPartial { driver_id: 2, driver_html: String::new(), active: false };
        let manage = Envelope::ManagePartial { driver_id: 2, pending_html: String::new(), accepted_html: String::new() };

        assert!(update.is_for(Topic::Public));
        assert!(!update.is_for(Topic::Driver(2)));
        assert!(card.is_for(Topic::Public));
        assert!(card.is_for(Topic::Driver(2)));
        assert!(manage.is_for(Topic::Driver(2)));
        assert!(!manage.is_for(Topic::Driver(3)));
        assert!(!manage.is_for(Topic::Public));
    }

    #[test]
    fn envelopes_serialise_with_type_tag() {
        let card = Envelope::DriverPartial { driver_id: 2, driver_html: String::new(), active: false };
        let json: serde_json::Value = serde_json::to_value(&card).unwrap();
        assert_eq!(json["type"], "driver_partial");
        assert_eq!(json["driver_id"], 2);
        assert_eq!(json["active"], false);

        let update = Envelope::Update { drivers_html: None, passengers_html: "<ul></ul>".into(), sort: "dep_n2s".into() };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["type"], "update");
        assert!(json["drivers_html"].is_null());
    }
}
