use std::{path::{Path, PathBuf}, sync::Arc};

use chrono::NaiveDate;
use ride_share_lib::{
    listing::{ListFilter, SortOrder},
    matching::{self, SeatsInsufficient},
    secret::{hash_or_default, hash_password, verify_password},
    validation::{check_schedule, non_blank, Privacy, RequestDraft, TripDraft},
    DriverTrip, PassengerRequest, ValidationError,
};
use sqlx::SqliteConnection;
use tokio::sync::Mutex;

use crate::{database::db::{self, RideDatabase}, DataManagerError, DATABASE_PATH, DATA_DIR};

/// A trip with the requests attached to it, split by state.
#[derive(Debug, Clone, PartialEq)]
pub struct TripCard {
    pub trip: DriverTrip,
    pub pending: Vec<PassengerRequest>,
    pub accepted: Vec<PassengerRequest>,
}

impl TripCard {
    fn assemble(trip: DriverTrip, requests: &[PassengerRequest]) -> Self {
        let (accepted, pending) = requests.iter()
            .filter(|request| request.driver_id == Some(trip.id))
            .cloned()
            .partition(|request| request.is_matched);

        Self { trip, pending, accepted }
    }
}

/// Result of accepting a batch of requests on one trip.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptSummary {
    pub trip: DriverTrip,
    pub accepted: Vec<PassengerRequest>,
    /// Requests that did not fit in the remaining seats.
    pub skipped: Vec<i64>,
}

#[derive(Clone)]
pub struct DataManager {
    pub(crate) database: RideDatabase,
    // Serialises read-modify-write transactions, standing in for row locks.
    write_lock: Arc<Mutex<()>>,
}

/// The public interface for all ride share data.
impl DataManager {
    /// Opens the database under the project's data directory.
    pub async fn start() -> Result<Self, DataManagerError> {
        let root: PathBuf = project_root::get_project_root()
            .map_err(|err| DataManagerError::Database(format!("Failed to locate project root: {err}")))?;
        let data_dir = root.join(DATA_DIR);
        if !data_dir.exists() {
            std::fs::create_dir_all(&data_dir)
                .map_err(|_| DataManagerError::Database(format!("Failed to create data directory: {:?}", data_dir)))?;
        }

        Self::open(&root.join(DATABASE_PATH)).await
    }

    pub async fn open(path: &Path) -> Result<Self, DataManagerError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|_| DataManagerError::Database(format!("Failed to create data directory: {:?}", parent)))?;
        }

        let database = RideDatabase::connect(path).await?;
        tracing::info!("Opened database at {:?}", path);
        Ok(Self::with_database(database))
    }

    pub async fn in_memory() -> Result<Self, DataManagerError> {
        Ok(Self::with_database(RideDatabase::in_memory().await?))
    }

    fn with_database(database: RideDatabase) -> Self {
        Self {
            database,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    // Trips

    pub async fn create_trip(&self, draft: TripDraft) -> Result<DriverTrip, DataManagerError> {
        let draft = draft.validate()?;
        let password_hash = hash_or_default(draft.password.as_deref());

        let trip_id = db::insert_trip(self.database.pool(), &draft, password_hash).await?;
        tracing::info!("Created trip {trip_id} {} -> {} on {}", draft.departure, draft.destination, draft.date);
        self.get_trip(trip_id).await
    }

    pub async fn get_trip(&self, trip_id: i64) -> Result<DriverTrip, DataManagerError> {
        db::fetch_trip(self.database.pool(), trip_id).await?
            .ok_or(DataManagerError::NotFound("trip", trip_id))
    }

    /// Owner edit. Seat totals may not drop below seats already taken, and a
    /// full trip stays inactive whatever the form says.
    pub async fn update_trip(&self, trip_id: i64, draft: TripDraft, today: NaiveDate) -> Result<DriverTrip, DataManagerError> {
        let mut draft = draft.validate()?;
        check_schedule(draft.date, draft.return_date, Some(today))?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.database.begin().await?;

        let existing = require_trip(&mut tx, trip_id).await?;
        if draft.seats_total < existing.seats_filled {
            return Err(ValidationError::SeatsBelowFilled(existing.seats_filled).into());
        }

        draft.privacy = existing.privacy().normalized(draft.email.as_deref());
        draft.is_active = draft.is_active && existing.seats_filled < draft.seats_total;
        let password_hash = non_blank(draft.password.clone()).map(|p| hash_password(&p));

        db::update_trip(&mut *tx, trip_id, &draft, password_hash).await?;
        let updated = require_trip(&mut tx, trip_id).await?;
        commit(tx).await?;

        tracing::info!("Updated trip {trip_id}");
        Ok(updated)
    }

    pub async fn set_trip_privacy(&self, trip_id: i64, privacy: Privacy) -> Result<DriverTrip, DataManagerError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.database.begin().await?;

        let mut trip = require_trip(&mut tx, trip_id).await?;
        let privacy = privacy.checked(trip.email.as_deref())?;
        db::set_trip_privacy(&mut *tx, trip_id, privacy).await?;
        commit(tx).await?;

        trip.hide_contact = privacy.hide_contact;
        trip.auto_email_contact = privacy.auto_email_contact;
        Ok(trip)
    }

    /// Deletes the trip and releases every request that referenced it.
    /// Returns the ids of the released requests.
    pub async fn delete_trip(&self, trip_id: i64) -> Result<Vec<i64>, DataManagerError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.database.begin().await?;

        require_trip(&mut tx, trip_id).await?;
        let released = db::release_trip_requests(&mut *tx, trip_id).await?;
        db::delete_trip(&mut *tx, trip_id).await?;
        commit(tx).await?;

        tracing::info!("Deleted trip {trip_id}, released {} requests", released.len());
        Ok(released)
    }

    pub async fn verify_trip_password(&self, trip_id: i64, password: &str) -> Result<bool, DataManagerError> {
        let trip = self.get_trip(trip_id).await?;
        Ok(verify_password(&trip.password_hash, password))
    }

    pub async fn set_trip_password(&self, trip_id: i64, password: &str) -> Result<(), DataManagerError> {
        if db::set_trip_password(self.database.pool(), trip_id, hash_or_default(Some(password))).await? {
            Ok(())
        } else {
            Err(DataManagerError::NotFound("trip", trip_id))
        }
    }

    pub async fn get_trip_card(&self, trip_id: i64) -> Result<TripCard, DataManagerError> {
        let trip = self.get_trip(trip_id).await?;
        let requests = db::fetch_requests_for_trips(self.database.pool(), &[trip_id]).await?;
        Ok(TripCard::assemble(trip, &requests))
    }

    /// Active trips for the public list.
    pub async fn list_trip_cards(&self, filter: &ListFilter, order: SortOrder) -> Result<Vec<TripCard>, DataManagerError> {
        let trips = db::list_trips(self.database.pool(), filter, order, true).await?;
        let ids: Vec<i64> = trips.iter().map(|trip| trip.id).collect();
        let requests = db::fetch_requests_for_trips(self.database.pool(), &ids).await?;

        Ok(trips.into_iter()
            .map(|trip| TripCard::assemble(trip, &requests))
            .collect())
    }

    /// Every trip, active or not.
    pub async fn all_trips(&self, filter: &ListFilter) -> Result<Vec<DriverTrip>, DataManagerError> {
        db::list_trips(self.database.pool(), filter, SortOrder::DateAsc, false).await
    }

    /// Pool requests on the trip's route and day that the driver could accept.
    pub async fn candidates(&self, trip: &DriverTrip) -> Result<Vec<PassengerRequest>, DataManagerError> {
        db::fetch_candidates(self.database.pool(), trip).await
    }

    pub async fn trips_for_request(&self, request: &PassengerRequest) -> Result<Vec<DriverTrip>, DataManagerError> {
        db::fetch_trips_for_route(self.database.pool(), request).await
    }

    // Requests

    /// Adds a request to the open pool.
    pub async fn create_request(&self, draft: RequestDraft) -> Result<PassengerRequest, DataManagerError> {
        let draft = draft.validate()?;
        let password_hash = hash_or_default(draft.password.as_deref());

        let request_id = db::insert_request(self.database.pool(), &draft, password_hash, None).await?;
        tracing::info!("Created pool request {request_id}");
        self.get_request(request_id).await
    }

    /// Adds a pending request attached to the trip. The driver still has to accept it.
    pub async fn join_trip(&self, trip_id: i64, draft: RequestDraft) -> Result<(DriverTrip, PassengerRequest), DataManagerError> {
        let draft = draft.validate()?;
        let password_hash = hash_or_default(draft.password.as_deref());

        let _guard = self.write_lock.lock().await;
        let mut tx = self.database.begin().await?;

        let trip = require_trip(&mut tx, trip_id).await?;
        let request_id = db::insert_request(&mut *tx, &draft, password_hash, Some(trip_id)).await?;
        let request = require_request(&mut tx, request_id).await?;
        commit(tx).await?;

        tracing::info!("Request {request_id} joined trip {trip_id}");
        Ok((trip, request))
    }

    pub async fn get_request(&self, request_id: i64) -> Result<PassengerRequest, DataManagerError> {
        db::fetch_request(self.database.pool(), request_id).await?
            .ok_or(DataManagerError::NotFound("request", request_id))
    }

    /// Owner edit. Changing the seat count of a matched request moves the
    /// difference on the trip, and fails if the trip cannot take it.
    pub async fn update_request(&self, request_id: i64, draft: RequestDraft) -> Result<PassengerRequest, DataManagerError> {
        let mut draft = draft.validate()?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.database.begin().await?;

        let existing = require_request(&mut tx, request_id).await?;
        draft.privacy = existing.privacy().normalized(draft.email.as_deref());

        if let (true, Some(trip_id)) = (existing.is_matched, existing.driver_id) {
            let delta = draft.seats_needed - existing.seats_needed;
            if delta != 0 {
                let trip = require_trip(&mut tx, trip_id).await?;
                let change = if delta > 0 {
                    matching::reserve(&trip, delta)?
                } else {
                    matching::release(&trip, -delta)
                };
                if !db::set_trip_seats(&mut *tx, trip_id, trip.seats_filled, change).await? {
                    return Err(DataManagerError::Conflict(trip_id));
                }
            }
        }

        let password_hash = non_blank(draft.password.clone()).map(|p| hash_password(&p));
        db::update_request(&mut *tx, request_id, &draft, password_hash).await?;
        let updated = require_request(&mut tx, request_id).await?;
        commit(tx).await?;

        tracing::info!("Updated request {request_id}");
        Ok(updated)
    }

    /// Deletes the request, giving its seats back if it was matched.
    pub async fn delete_request(&self, request_id: i64) -> Result<PassengerRequest, DataManagerError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.database.begin().await?;

        let request = require_request(&mut tx, request_id).await?;
        if let (true, Some(trip_id)) = (request.is_matched, request.driver_id) {
            release_seats(&mut tx, trip_id, request.seats_needed).await?;
        }
        db::delete_request(&mut *tx, request_id).await?;
        commit(tx).await?;

        tracing::info!("Deleted request {request_id}");
        Ok(request)
    }

    pub async fn set_request_privacy(&self, request_id: i64, privacy: Privacy) -> Result<PassengerRequest, DataManagerError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.database.begin().await?;

        let mut request = require_request(&mut tx, request_id).await?;
        let privacy = privacy.checked(request.email.as_deref())?;
        db::set_request_privacy(&mut *tx, request_id, privacy).await?;
        commit(tx).await?;

        request.hide_contact = privacy.hide_contact;
        request.auto_email_contact = privacy.auto_email_contact;
        Ok(request)
    }

    /// Free text only the trip's driver sees.
    pub async fn set_driver_memo(&self, trip_id: i64, request_id: i64, memo: &str) -> Result<PassengerRequest, DataManagerError> {
        let mut request = self.get_request(request_id).await?;
        if request.driver_id != Some(trip_id) {
            return Err(DataManagerError::NotAttached(request_id, trip_id));
        }

        let memo = memo.trim();
        db::set_request_memo(self.database.pool(), request_id, memo).await?;
        request.driver_memo = memo.to_string();
        Ok(request)
    }

    pub async fn verify_request_password(&self, request_id: i64, password: &str) -> Result<bool, DataManagerError> {
        let request = self.get_request(request_id).await?;
        Ok(verify_password(&request.password_hash, password))
    }

    pub async fn set_request_password(&self, request_id: i64, password: &str) -> Result<(), DataManagerError> {
        if db::set_request_password(self.database.pool(), request_id, hash_or_default(Some(password))).await? {
            Ok(())
        } else {
            Err(DataManagerError::NotFound("request", request_id))
        }
    }

    /// Unattached, unmatched requests for the public pool.
    pub async fn list_pool(&self, filter: &ListFilter) -> Result<Vec<PassengerRequest>, DataManagerError> {
        db::list_requests(self.database.pool(), filter, true).await
    }

    pub async fn all_requests(&self, filter: &ListFilter) -> Result<Vec<PassengerRequest>, DataManagerError> {
        db::list_requests(self.database.pool(), filter, false).await
    }

    // Matching

    /// Driver accepts one request. Fails without touching anything when the
    /// seats do not fit.
    pub async fn accept_request(&self, trip_id: i64, request_id: i64) -> Result<(DriverTrip, PassengerRequest), DataManagerError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.database.begin().await?;

        let mut trip = require_trip(&mut tx, trip_id).await?;
        let request = require_request(&mut tx, request_id).await?;
        accept_in(&mut tx, &mut trip, &request).await?;
        let request = require_request(&mut tx, request_id).await?;
        commit(tx).await?;

        tracing::info!("Trip {trip_id} accepted request {request_id}, {} seats left", trip.seats_left());
        Ok((trip, request))
    }

    /// Accepts the requests in order, skipping the ones that do not fit and
    /// stopping once the trip is full.
    pub async fn accept_requests(&self, trip_id: i64, request_ids: &[i64]) -> Result<AcceptSummary, DataManagerError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.database.begin().await?;

        let mut trip = require_trip(&mut tx, trip_id).await?;
        let mut accepted = Vec::new();
        let mut skipped = Vec::new();

        for &request_id in request_ids {
            let Some(request) = db::fetch_request(&mut *tx, request_id).await? else {
                continue;
            };
            if request.is_matched {
                continue;
            }

            match accept_in(&mut tx, &mut trip, &request).await {
                Ok(()) => accepted.push(require_request(&mut tx, request_id).await?),
                Err(DataManagerError::SeatsInsufficient(_) | DataManagerError::NotAttached(..)) => skipped.push(request_id),
                Err(err) => return Err(err),
            }

            if trip.is_full() {
                break;
            }
        }
        commit(tx).await?;

        tracing::info!("Trip {trip_id} accepted {} requests, skipped {}", accepted.len(), skipped.len());
        Ok(AcceptSummary { trip, accepted, skipped })
    }

    /// Rejects a pending request or cancels an accepted one. Either way the
    /// request goes back to the open pool; cancelled seats are released.
    pub async fn reject_request(&self, trip_id: i64, request_id: i64) -> Result<(DriverTrip, PassengerRequest), DataManagerError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.database.begin().await?;

        let request = require_request(&mut tx, request_id).await?;
        if request.driver_id != Some(trip_id) {
            return Err(DataManagerError::NotAttached(request_id, trip_id));
        }
        if request.is_matched {
            release_seats(&mut tx, trip_id, request.seats_needed).await?;
        }
        db::set_request_link(&mut *tx, request_id, None, false).await?;

        let trip = require_trip(&mut tx, trip_id).await?;
        let request = require_request(&mut tx, request_id).await?;
        commit(tx).await?;

        tracing::info!("Trip {trip_id} released request {request_id}");
        Ok((trip, request))
    }

    /// First-fit: links the request to the earliest posted active trip with
    /// room for it. A pending request only matches its own trip.
    pub async fn auto_match(&self, request_id: i64) -> Result<Option<DriverTrip>, DataManagerError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.database.begin().await?;

        let request = require_request(&mut tx, request_id).await?;
        if request.is_matched {
            return Err(DataManagerError::AlreadyMatched(request_id));
        }

        let trips = match request.driver_id {
            Some(trip_id) => vec![require_trip(&mut tx, trip_id).await?],
            None => db::fetch_active_trips(&mut *tx).await?,
        };
        let Some(mut trip) = matching::first_fit(&trips, request.seats_needed).cloned() else {
            return Ok(None);
        };

        accept_in(&mut tx, &mut trip, &request).await?;
        commit(tx).await?;

        tracing::info!("Auto-matched request {request_id} to trip {}", trip.id);
        Ok(Some(trip))
    }
}

async fn require_trip(conn: &mut SqliteConnection, trip_id: i64) -> Result<DriverTrip, DataManagerError> {
    db::fetch_trip(conn, trip_id).await?
        .ok_or(DataManagerError::NotFound("trip", trip_id))
}

async fn require_request(conn: &mut SqliteConnection, request_id: i64) -> Result<PassengerRequest, DataManagerError> {
    db::fetch_request(conn, request_id).await?
        .ok_or(DataManagerError::NotFound("request", request_id))
}

async fn commit(tx: sqlx::Transaction<'static, sqlx::Sqlite>) -> Result<(), DataManagerError> {
    tx.commit().await
        .map_err(|err| DataManagerError::Database(format!("Failed to commit: {err}")))
}

/// Reserves the request's seats on the trip and marks it matched.
async fn accept_in(conn: &mut SqliteConnection, trip: &mut DriverTrip, request: &PassengerRequest) -> Result<(), DataManagerError> {
    if request.is_matched {
        return Err(DataManagerError::AlreadyMatched(request.id));
    }
    if request.driver_id.is_some_and(|id| id != trip.id) {
        return Err(DataManagerError::NotAttached(request.id, trip.id));
    }

    let change = matching::reserve(trip, request.seats_needed)
        .map_err(|err: SeatsInsufficient| {
            tracing::debug!("Trip {} cannot take request {}: {err}", trip.id, request.id);
            err
        })?;

    if !db::set_trip_seats(&mut *conn, trip.id, trip.seats_filled, change).await? {
        return Err(DataManagerError::Conflict(trip.id));
    }
    db::set_request_link(&mut *conn, request.id, Some(trip.id), true).await?;
    change.apply(trip);
    Ok(())
}

async fn release_seats(conn: &mut SqliteConnection, trip_id: i64, seats: i64) -> Result<(), DataManagerError> {
    // The trip may already be gone; then there is nothing to give back.
    let Some(trip) = db::fetch_trip(&mut *conn, trip_id).await? else {
        return Ok(());
    };
    let change = matching::release(&trip, seats);
    if !db::set_trip_seats(&mut *conn, trip_id, trip.seats_filled, change).await? {
        return Err(DataManagerError::Conflict(trip_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ride_share_lib::{listing::FareFilter, trip::{FlexiblePickup, Gender}};
    use rust_decimal::Decimal;

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, d).unwrap()
    }

    fn trip_draft(seats_total: i64) -> TripDraft {
        TripDraft {
            driver_name: "Amy".into(),
            contact: "line:amy".into(),
            email: Some("amy@example.com".into()),
            password: Some("pw".into()),
            gender: Gender::Female,
            seats_total,
            departure: "Taipei City".into(),
            destination: "Tainan City".into(),
            date: day(10),
            return_date: None,
            flexible_pickup: FlexiblePickup::Maybe,
            note: String::new(),
            fare_note: "split gas".into(),
            is_active: true,
            privacy: Privacy::default(),
        }
    }

    fn request_draft(seats_needed: i64) -> RequestDraft {
        RequestDraft {
            passenger_name: "Ben".into(),
            contact: "0912".into(),
            email: None,
            password: None,
            gender: Gender::Male,
            seats_needed,
            willing_to_pay: None,
            departure: "Taipei City".into(),
            destination: "Tainan City".into(),
            date: day(10),
            return_date: None,
            note: String::new(),
            together_return: None,
            privacy: Privacy::default(),
        }
    }

    #[tokio::test]
    async fn second_accept_fails_when_seats_insufficient() {
        let dm = DataManager::in_memory().await.unwrap();
        let trip = dm.create_trip(trip_draft(3)).await.unwrap();
        let (_, first) = dm.join_trip(trip.id, request_draft(2)).await.unwrap();
        let (_, second) = dm.join_trip(trip.id, request_draft(2)).await.unwrap();

        let (trip_after, first) = dm.accept_request(trip.id, first.id).await.unwrap();
        assert_eq!(trip_after.seats_filled, 2);
        assert_eq!(trip_after.seats_left(), 1);
        assert!(first.is_matched);

        let err = dm.accept_request(trip.id, second.id).await.unwrap_err();
        assert!(matches!(err, DataManagerError::SeatsInsufficient(SeatsInsufficient { remaining: 1, requested: 2 })));

        assert_eq!(dm.get_trip(trip.id).await.unwrap().seats_filled, 2);
        assert!(!dm.get_request(second.id).await.unwrap().is_matched);
    }

    #[tokio::test]
    async fn concurrent_accepts_never_overbook() {
        let dm = DataManager::in_memory().await.unwrap();
        let trip = dm.create_trip(trip_draft(3)).await.unwrap();
        let (_, a) = dm.join_trip(trip.id, request_draft(2)).await.unwrap();
        let (_, b) = dm.join_trip(trip.id, request_draft(2)).await.unwrap();

        let (dm_a, dm_b) = (dm.clone(), dm.clone());
        let task_a = tokio::spawn(async move { dm_a.accept_request(trip.id, a.id).await });
        let task_b = tokio::spawn(async move { dm_b.accept_request(trip.id, b.id).await });
        let results = [task_a.await.unwrap(), task_b.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let trip = dm.get_trip(trip.id).await.unwrap();
        assert_eq!(trip.seats_filled, 2);
        assert!(trip.seats_filled <= trip.seats_total);
    }

    #[tokio::test]
    async fn filling_deactivates_and_cancel_reopens() {
        let dm = DataManager::in_memory().await.unwrap();
        let trip = dm.create_trip(trip_draft(2)).await.unwrap();
        let (_, request) = dm.join_trip(trip.id, request_draft(2)).await.unwrap();

        let (full, _) = dm.accept_request(trip.id, request.id).await.unwrap();
        assert!(!full.is_active);
        assert_eq!(full.seats_filled, full.seats_total);

        let (reopened, released) = dm.reject_request(trip.id, request.id).await.unwrap();
        assert!(reopened.is_active);
        assert_eq!(reopened.seats_filled, 0);
        assert!(released.in_pool());
    }

    #[tokio::test]
    async fn deleting_trip_releases_requests() {
        let dm = DataManager::in_memory().await.unwrap();
        let trip = dm.create_trip(trip_draft(4)).await.unwrap();
        let (_, accepted) = dm.join_trip(trip.id, request_draft(1)).await.unwrap();
        let (_, pending) = dm.join_trip(trip.id, request_draft(1)).await.unwrap();
        dm.accept_request(trip.id, accepted.id).await.unwrap();

        let mut released = dm.delete_trip(trip.id).await.unwrap();
        released.sort();
        assert_eq!(released, vec![accepted.id, pending.id]);

        for id in [accepted.id, pending.id] {
            let request = dm.get_request(id).await.unwrap();
            assert_eq!(request.driver_id, None);
            assert!(!request.is_matched);
        }
        assert!(matches!(dm.get_trip(trip.id).await, Err(DataManagerError::NotFound("trip", _))));
    }

    #[tokio::test]
    async fn accept_many_skips_misfits_and_stops_when_full() {
        let dm = DataManager::in_memory().await.unwrap();
        let trip = dm.create_trip(trip_draft(3)).await.unwrap();
        let big = dm.create_request(request_draft(4)).await.unwrap();
        let two = dm.create_request(request_draft(2)).await.unwrap();
        let one = dm.create_request(request_draft(1)).await.unwrap();
        let late = dm.create_request(request_draft(1)).await.unwrap();

        let summary = dm.accept_requests(trip.id, &[big.id, two.id, one.id, late.id]).await.unwrap();
        assert_eq!(summary.accepted.iter().map(|r| r.id).collect::<Vec<_>>(), vec![two.id, one.id]);
        assert_eq!(summary.skipped, vec![big.id]);
        assert!(summary.trip.is_full());
        assert!(!summary.trip.is_active);
        assert!(dm.get_request(late.id).await.unwrap().in_pool());
    }

    #[tokio::test]
    async fn deleting_matched_request_gives_seats_back() {
        let dm = DataManager::in_memory().await.unwrap();
        let trip = dm.create_trip(trip_draft(2)).await.unwrap();
        let (_, request) = dm.join_trip(trip.id, request_draft(2)).await.unwrap();
        dm.accept_request(trip.id, request.id).await.unwrap();

        let deleted = dm.delete_request(request.id).await.unwrap();
        assert_eq!(deleted.driver_id, Some(trip.id));
        let trip = dm.get_trip(trip.id).await.unwrap();
        assert_eq!(trip.seats_filled, 0);
        assert!(trip.is_active);
    }

    #[tokio::test]
    async fn matched_seat_change_moves_the_difference() {
        let dm = DataManager::in_memory().await.unwrap();
        let trip = dm.create_trip(trip_draft(3)).await.unwrap();
        let (_, request) = dm.join_trip(trip.id, request_draft(1)).await.unwrap();
        dm.accept_request(trip.id, request.id).await.unwrap();

        dm.update_request(request.id, request_draft(3)).await.unwrap();
        assert_eq!(dm.get_trip(trip.id).await.unwrap().seats_filled, 3);

        let err = dm.update_request(request.id, request_draft(4)).await.unwrap_err();
        assert!(matches!(err, DataManagerError::SeatsInsufficient(_)));
        assert_eq!(dm.get_request(request.id).await.unwrap().seats_needed, 3);
    }

    #[tokio::test]
    async fn trip_edit_guards_capacity_and_privacy() {
        let dm = DataManager::in_memory().await.unwrap();
        let trip = dm.create_trip(trip_draft(3)).await.unwrap();
        let (_, request) = dm.join_trip(trip.id, request_draft(2)).await.unwrap();
        dm.accept_request(trip.id, request.id).await.unwrap();
        dm.set_trip_privacy(trip.id, Privacy { hide_contact: true, auto_email_contact: true }).await.unwrap();

        let err = dm.update_trip(trip.id, trip_draft(1), day(1)).await.unwrap_err();
        assert!(matches!(err, DataManagerError::Validation(ValidationError::SeatsBelowFilled(2))));

        let mut no_email = trip_draft(2);
        no_email.email = None;
        let updated = dm.update_trip(trip.id, no_email, day(1)).await.unwrap();
        assert!(!updated.hide_contact);
        assert!(!updated.auto_email_contact);
        assert!(!updated.is_active, "a trip edited down to its filled seats is full");

        let err = dm.update_trip(trip.id, trip_draft(3), day(11)).await.unwrap_err();
        assert!(matches!(err, DataManagerError::Validation(ValidationError::DateInPast(_))));
    }

    #[tokio::test]
    async fn hiding_contact_needs_an_email() {
        let dm = DataManager::in_memory().await.unwrap();
        let request = dm.create_request(request_draft(1)).await.unwrap();

        let err = dm.set_request_privacy(request.id, Privacy { hide_contact: true, auto_email_contact: false }).await.unwrap_err();
        assert!(matches!(err, DataManagerError::Validation(ValidationError::HideWithoutEmail)));
        assert!(!dm.get_request(request.id).await.unwrap().hide_contact);
    }

    #[tokio::test]
    async fn auto_match_is_first_fit() {
        let dm = DataManager::in_memory().await.unwrap();
        let small = dm.create_trip(trip_draft(1)).await.unwrap();
        let large = dm.create_trip(trip_draft(4)).await.unwrap();
        let request = dm.create_request(request_draft(2)).await.unwrap();

        let matched = dm.auto_match(request.id).await.unwrap().unwrap();
        assert_eq!(matched.id, large.id);
        assert_eq!(dm.get_trip(small.id).await.unwrap().seats_filled, 0);

        let request = dm.get_request(request.id).await.unwrap();
        assert!(request.is_matched);
        assert_eq!(request.driver_id, Some(large.id));

        let nobody = dm.create_request(request_draft(5)).await.unwrap();
        assert_eq!(dm.auto_match(nobody.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn memo_only_for_own_requests() {
        let dm = DataManager::in_memory().await.unwrap();
        let trip = dm.create_trip(trip_draft(3)).await.unwrap();
        let other = dm.create_trip(trip_draft(3)).await.unwrap();
        let (_, request) = dm.join_trip(trip.id, request_draft(1)).await.unwrap();

        let updated = dm.set_driver_memo(trip.id, request.id, "  pick up at gate 2 ").await.unwrap();
        assert_eq!(updated.driver_memo, "pick up at gate 2");
        assert!(matches!(dm.set_driver_memo(other.id, request.id, "x").await, Err(DataManagerError::NotAttached(..))));
    }

    #[tokio::test]
    async fn passwords_default_and_verify() {
        let dm = DataManager::in_memory().await.unwrap();
        let trip = dm.create_trip(trip_draft(3)).await.unwrap();
        let request = dm.create_request(request_draft(1)).await.unwrap();

        assert!(dm.verify_trip_password(trip.id, "pw").await.unwrap());
        assert!(!dm.verify_trip_password(trip.id, "0000").await.unwrap());
        assert!(dm.verify_request_password(request.id, "0000").await.unwrap());

        dm.set_request_password(request.id, "new").await.unwrap();
        assert!(dm.verify_request_password(request.id, "new").await.unwrap());
    }

    #[tokio::test]
    async fn list_sorts_and_filters() {
        let dm = DataManager::in_memory().await.unwrap();
        let mut south = trip_draft(3);
        south.departure = "Kaohsiung City".into();
        south.date = day(12);
        let mut north = trip_draft(3);
        north.departure = "Keelung City".into();
        north.fare_note = "free ride".into();
        let mut nowhere = trip_draft(1);
        nowhere.departure = "Atlantis".into();
        nowhere.date = day(11);

        let south = dm.create_trip(south).await.unwrap();
        let north = dm.create_trip(north).await.unwrap();
        let nowhere = dm.create_trip(nowhere).await.unwrap();

        let ids = |cards: Vec<TripCard>| cards.into_iter().map(|c| c.trip.id).collect::<Vec<_>>();
        let all = ListFilter::default();

        assert_eq!(ids(dm.list_trip_cards(&all, SortOrder::DepN2s).await.unwrap()), vec![north.id, south.id, nowhere.id]);
        assert_eq!(ids(dm.list_trip_cards(&all, SortOrder::DepS2n).await.unwrap()), vec![nowhere.id, south.id, north.id]);
        assert_eq!(ids(dm.list_trip_cards(&all, SortOrder::DateDesc).await.unwrap()), vec![south.id, nowhere.id, north.id]);
        assert_eq!(ids(dm.list_trip_cards(&all, SortOrder::DepAsc).await.unwrap()), vec![nowhere.id, south.id, north.id]);

        let filter = ListFilter { min_free_seats: Some(2), ..ListFilter::default() };
        assert_eq!(ids(dm.list_trip_cards(&filter, SortOrder::DateAsc).await.unwrap()), vec![north.id, south.id]);

        let filter = ListFilter { fare: Some(FareFilter::Keyword("free".into())), ..ListFilter::default() };
        assert_eq!(ids(dm.list_trip_cards(&filter, SortOrder::DateAsc).await.unwrap()), vec![north.id]);

        let filter = ListFilter { dates: vec![day(11), day(12)], ..ListFilter::default() };
        assert_eq!(ids(dm.list_trip_cards(&filter, SortOrder::DateAsc).await.unwrap()), vec![nowhere.id, south.id]);

        let filter = ListFilter { terms: vec!["amy".into(), "kaohsiung".into()], ..ListFilter::default() };
        assert_eq!(ids(dm.list_trip_cards(&filter, SortOrder::DateAsc).await.unwrap()), vec![south.id]);
    }

    #[tokio::test]
    async fn pool_excludes_attached_and_filters_by_fare() {
        let dm = DataManager::in_memory().await.unwrap();
        let trip = dm.create_trip(trip_draft(3)).await.unwrap();
        let mut generous = request_draft(1);
        generous.willing_to_pay = Some(Decimal::new(500, 0));
        let generous = dm.create_request(generous).await.unwrap();
        let cheap = dm.create_request(request_draft(1)).await.unwrap();
        dm.join_trip(trip.id, request_draft(1)).await.unwrap();

        let pool: Vec<i64> = dm.list_pool(&ListFilter::default()).await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(pool, vec![cheap.id, generous.id]);

        let filter = ListFilter { fare: Some(FareFilter::AtLeast(Decimal::new(300, 0))), ..ListFilter::default() };
        let pool: Vec<i64> = dm.list_pool(&filter).await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(pool, vec![generous.id]);

        let card = dm.get_trip_card(trip.id).await.unwrap();
        assert_eq!(card.pending.len(), 1);
        assert!(card.accepted.is_empty());
        assert_eq!(dm.candidates(&card.trip).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn search_wildcards_match_literally() {
        let dm = DataManager::in_memory().await.unwrap();
        let mut discount = request_draft(1);
        discount.note = "50% off_peak".into();
        let discount = dm.create_request(discount).await.unwrap();
        dm.create_request(request_draft(1)).await.unwrap();

        let search = |term: &str| ListFilter { terms: vec![term.to_string()], ..ListFilter::default() };
        let ids = |requests: Vec<PassengerRequest>| requests.into_iter().map(|r| r.id).collect::<Vec<_>>();

        assert_eq!(ids(dm.list_pool(&search("_")).await.unwrap()), vec![discount.id]);
        assert_eq!(ids(dm.list_pool(&search("%")).await.unwrap()), vec![discount.id]);
        assert!(dm.list_pool(&search("50_")).await.unwrap().is_empty());

        let trip = dm.create_trip(trip_draft(2)).await.unwrap();
        let filter = ListFilter { fare: Some(FareFilter::Keyword("_".into())), ..ListFilter::default() };
        assert!(dm.list_trip_cards(&filter, SortOrder::DateAsc).await.unwrap().is_empty());
        let filter = ListFilter { fare: Some(FareFilter::Keyword("gas".into())), ..ListFilter::default() };
        assert_eq!(dm.list_trip_cards(&filter, SortOrder::DateAsc).await.unwrap()[0].trip.id, trip.id);
    }

    #[tokio::test]
    async fn oversized_fare_is_refused_not_dropped() {
        let dm = DataManager::in_memory().await.unwrap();
        let mut greedy = request_draft(1);
        greedy.willing_to_pay = Some(Decimal::MAX);
        let err = dm.create_request(greedy).await.unwrap_err();
        assert!(matches!(err, DataManagerError::Validation(ValidationError::TooLarge("willing_to_pay", _))));
        assert!(dm.list_pool(&ListFilter::default()).await.unwrap().is_empty());

        let mut generous = request_draft(1);
        generous.willing_to_pay = Some(Decimal::new(999_999, 2));
        let generous = dm.create_request(generous).await.unwrap();
        let filter = ListFilter { fare: Some(FareFilter::AtLeast(Decimal::new(9999, 0))), ..ListFilter::default() };
        assert_eq!(dm.list_pool(&filter).await.unwrap()[0].id, generous.id);

        let filter = ListFilter { fare: Some(FareFilter::AtLeast(Decimal::MAX)), ..ListFilter::default() };
        assert!(dm.list_pool(&filter).await.unwrap().is_empty());
    }
}
