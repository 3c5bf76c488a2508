//! Grants earned by entering a record's password (or by creating it).
//!
//! The browser only holds a random token; what it unlocks lives here in memory
//! and is lost on restart, after which the password has to be entered again.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::{Duration, Instant},
};

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tokio::sync::Mutex;

pub const SESSION_COOKIE: &str = "ride_share_session";

/// Sessions unused for this long are forgotten.
pub const SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grant {
    Driver(i64),
    Passenger(i64),
}

struct Session {
    grants: HashSet<Grant>,
    last_seen: Instant,
}

impl Session {
    fn expired(&self, ttl: Duration) -> bool {
        self.last_seen.elapsed() >= ttl
    }
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(SESSION_TTL)
    }
}

impl SessionStore {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            ttl,
        }
    }

    /// Adds the grant to the caller's session, starting one if needed.
    /// Expired sessions are dropped on the way.
    pub async fn grant(&self, jar: CookieJar, grant: Grant) -> CookieJar {
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, session| !session.expired(self.ttl));

        let existing = jar.get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| sessions.contains_key(token));

        let (token, jar) = match existing {
            Some(token) => (token, jar),
            None => {
                let token = hex::encode(rand::random::<[u8; 16]>());
                let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax);
                (token, jar.add(cookie))
            },
        };

        let session = sessions.entry(token).or_insert_with(|| Session {
            grants: HashSet::new(),
            last_seen: Instant::now(),
        });
        session.grants.insert(grant);
        session.last_seen = Instant::now();
        jar
    }

    /// Checking a grant counts as use and keeps the session alive.
    pub async fn has(&self, jar: &CookieJar, grant: Grant) -> bool {
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return false;
        };

        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get_mut(cookie.value()) else {
            return false;
        };
        if session.expired(self.ttl) {
            sessions.remove(cookie.value());
            return false;
        }

        session.last_seen = Instant::now();
        session.grants.contains(&grant)
    }

    /// Drops the grant from every session, for records that no longer exist.
    /// Sessions left with nothing are removed.
    pub async fn revoke_everywhere(&self, grant: Grant) {
        self.sessions.lock().await.retain(|_, session| {
            session.grants.remove(&grant);
            !session.grants.is_empty()
        });
    }
}
