use std::{path::Path, str::FromStr};

use const_format::concatcp;
use ride_share_lib::{
    listing::{FareFilter, ListFilter, SortOrder, CITY_N2S, UNKNOWN_CITY_RANK},
    matching::SeatChange,
    passenger::{fare_to_cents, max_fare},
    validation::{Privacy, RequestDraft, TripDraft},
    DriverTrip, PassengerRequest, ValidationError,
};
use rust_decimal::Decimal;
use sqlx::{
    query, query_as,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Executor, Pool, QueryBuilder, Sqlite, SqliteExecutor, Transaction,
};

use crate::DataManagerError;

use super::constants::*;

#[derive(Clone)]
pub struct RideDatabase {
    pool: Pool<Sqlite>,
}

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> DataManagerError {
    move |err| DataManagerError::Database(format!("{context}: {err}"))
}

fn fare_cents(draft: &RequestDraft) -> Result<Option<i64>, DataManagerError> {
    draft.willing_to_pay
        .map(|amount| fare_to_cents(amount).ok_or(ValidationError::TooLarge("willing_to_pay", max_fare())))
        .transpose()
        .map_err(DataManagerError::from)
}

impl RideDatabase {
    pub async fn connect(path: &Path) -> Result<Self, DataManagerError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options).await
            .map_err(db_error("Failed to connect to database"))?;

        let db = Self { pool };
        db.init().await?;
        Ok(db)
    }

    /// Single connection, so every query sees the same memory database.
    pub async fn in_memory() -> Result<Self, DataManagerError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(db_error("Invalid in-memory database url"))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options).await
            .map_err(db_error("Failed to open in-memory database"))?;

        let db = Self { pool };
        db.init().await?;
        Ok(db)
    }

    pub async fn init(&self) -> Result<(), DataManagerError> {
        self.pool.execute(concatcp!("
            CREATE TABLE IF NOT EXISTS ", TRIPS_TABLE_NAME, "(",
                ID,                 " INTEGER PRIMARY KEY AUTOINCREMENT,",
                DRIVER_NAME,        " TEXT NOT NULL,",
                CONTACT,            " TEXT NOT NULL,",
                EMAIL,              " TEXT,",
                PASSWORD_HASH,      " TEXT NOT NULL,",
                GENDER,             " TEXT NOT NULL,",
                SEATS_TOTAL,        " INTEGER NOT NULL CHECK (", SEATS_TOTAL, " >= 1),",
                SEATS_FILLED,       " INTEGER NOT NULL DEFAULT 0 CHECK (", SEATS_FILLED, " BETWEEN 0 AND ", SEATS_TOTAL, "),",
                DEPARTURE,          " TEXT NOT NULL,",
                DESTINATION,        " TEXT NOT NULL,",
                DATE,               " TEXT NOT NULL,",
                RETURN_DATE,        " TEXT,",
                FLEXIBLE_PICKUP,    " TEXT NOT NULL,",
                NOTE,               " TEXT NOT NULL,",
                FARE_NOTE,          " TEXT NOT NULL,",
                IS_ACTIVE,          " BOOLEAN NOT NULL,",
                HIDE_CONTACT,       " BOOLEAN NOT NULL,",
                AUTO_EMAIL_CONTACT, " BOOLEAN NOT NULL);

            CREATE TABLE IF NOT EXISTS ", REQUESTS_TABLE_NAME, "(",
                ID,                   " INTEGER PRIMARY KEY AUTOINCREMENT,",
                PASSENGER_NAME,       " TEXT NOT NULL,",
                CONTACT,              " TEXT NOT NULL,",
                EMAIL,                " TEXT,",
                PASSWORD_HASH,        " TEXT NOT NULL,",
                GENDER,               " TEXT NOT NULL,",
                SEATS_NEEDED,         " INTEGER NOT NULL CHECK (", SEATS_NEEDED, " >= 1),",
                WILLING_TO_PAY_CENTS, " INTEGER,",
                DEPARTURE,            " TEXT NOT NULL,",
                DESTINATION,          " TEXT NOT NULL,",
                DATE,                 " TEXT NOT NULL,",
                RETURN_DATE,          " TEXT,",
                NOTE,                 " TEXT NOT NULL,",
                IS_MATCHED,           " BOOLEAN NOT NULL,",
                DRIVER_ID,            " INTEGER,",
                TOGETHER_RETURN,      " BOOLEAN,",
                DRIVER_MEMO,          " TEXT NOT NULL,",
                HIDE_CONTACT,         " BOOLEAN NOT NULL,",
                AUTO_EMAIL_CONTACT,   " BOOLEAN NOT NULL,
                FOREIGN KEY(", DRIVER_ID, ") REFERENCES ", TRIPS_TABLE_NAME, "(", ID, ") ON DELETE SET NULL
            );

            CREATE INDEX IF NOT EXISTS idx_requests_driver ON ", REQUESTS_TABLE_NAME, "(", DRIVER_ID, ");
        ")).await
            .map_err(db_error("Failed to create tables"))
            .map(|_| ())
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, DataManagerError> {
        self.pool.begin().await.map_err(db_error("Failed to begin transaction"))
    }
}

// Trips

pub async fn insert_trip<'e>(executor: impl SqliteExecutor<'e>, draft: &TripDraft, password_hash: String) -> Result<i64, DataManagerError> {
    query_as::<_, (i64,)>(concatcp!("
        INSERT INTO ", TRIPS_TABLE_NAME, "(",
        DRIVER_NAME, ", ", CONTACT, ", ", EMAIL, ", ", PASSWORD_HASH, ", ", GENDER, ", ",
        SEATS_TOTAL, ", ", SEATS_FILLED, ", ", DEPARTURE, ", ", DESTINATION, ", ", DATE, ", ", RETURN_DATE, ", ",
        FLEXIBLE_PICKUP, ", ", NOTE, ", ", FARE_NOTE, ", ", IS_ACTIVE, ", ", HIDE_CONTACT, ", ", AUTO_EMAIL_CONTACT, ")
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16) RETURNING ", ID))
            .bind(&draft.driver_name)
            .bind(&draft.contact)
            .bind(&draft.email)
            .bind(password_hash)
            .bind(draft.gender.code())
            .bind(draft.seats_total)
            .bind(&draft.departure)
            .bind(&draft.destination)
            .bind(draft.date)
            .bind(draft.return_date)
            .bind(draft.flexible_pickup.code())
            .bind(&draft.note)
            .bind(&draft.fare_note)
            .bind(draft.is_active)
            .bind(draft.privacy.hide_contact)
            .bind(draft.privacy.auto_email_contact)
            .fetch_one(executor).await
            .map_err(db_error("Failed to insert trip"))
            .map(|row| row.0)
}

pub async fn fetch_trip<'e>(executor: impl SqliteExecutor<'e>, trip_id: i64) -> Result<Option<DriverTrip>, DataManagerError> {
    query_as::<_, DriverTrip>(concatcp!("SELECT * FROM ", TRIPS_TABLE_NAME, " WHERE ", ID, " = ?1"))
        .bind(trip_id)
        .fetch_optional(executor).await
        .map_err(db_error("Failed to get trip"))
}

/// Overwrites the editable columns. Seat counts are left alone.
pub async fn update_trip<'e>(executor: impl SqliteExecutor<'e>, trip_id: i64, draft: &TripDraft, password_hash: Option<String>) -> Result<(), DataManagerError> {
    query(concatcp!("
        UPDATE ", TRIPS_TABLE_NAME, " SET ",
            DRIVER_NAME, " = ?1, ", CONTACT, " = ?2, ", EMAIL, " = ?3, ",
            PASSWORD_HASH, " = COALESCE(?4, ", PASSWORD_HASH, "), ", GENDER, " = ?5, ",
            SEATS_TOTAL, " = ?6, ", DEPARTURE, " = ?7, ", DESTINATION, " = ?8, ", DATE, " = ?9, ", RETURN_DATE, " = ?10, ",
            FLEXIBLE_PICKUP, " = ?11, ", NOTE, " = ?12, ", FARE_NOTE, " = ?13, ", IS_ACTIVE, " = ?14, ",
            HIDE_CONTACT, " = ?15, ", AUTO_EMAIL_CONTACT, " = ?16
        WHERE ", ID, " = ?17"))
            .bind(&draft.driver_name)
            .bind(&draft.contact)
            .bind(&draft.email)
            .bind(password_hash)
            .bind(draft.gender.code())
            .bind(draft.seats_total)
            .bind(&draft.departure)
            .bind(&draft.destination)
            .bind(draft.date)
            .bind(draft.return_date)
            .bind(draft.flexible_pickup.code())
            .bind(&draft.note)
            .bind(&draft.fare_note)
            .bind(draft.is_active)
            .bind(draft.privacy.hide_contact)
            .bind(draft.privacy.auto_email_contact)
            .bind(trip_id)
            .execute(executor).await
            .map_err(db_error("Failed to update trip"))
            .map(|_| ())
}

/// Compare-and-set on the seat count; false when another writer got there first.
pub async fn set_trip_seats<'e>(executor: impl SqliteExecutor<'e>, trip_id: i64, expected_filled: i64, change: SeatChange) -> Result<bool, DataManagerError> {
    query(concatcp!("
        UPDATE ", TRIPS_TABLE_NAME, " SET ", SEATS_FILLED, " = ?1, ", IS_ACTIVE, " = ?2
        WHERE ", ID, " = ?3 AND ", SEATS_FILLED, " = ?4 AND ?1 <= ", SEATS_TOTAL))
            .bind(change.seats_filled)
            .bind(change.is_active)
            .bind(trip_id)
            .bind(expected_filled)
            .execute(executor).await
            .map_err(db_error("Failed to update trip seats"))
            .map(|result| result.rows_affected() == 1)
}

pub async fn set_trip_privacy<'e>(executor: impl SqliteExecutor<'e>, trip_id: i64, privacy: Privacy) -> Result<(), DataManagerError> {
    query(concatcp!("UPDATE ", TRIPS_TABLE_NAME, " SET ", HIDE_CONTACT, " = ?1, ", AUTO_EMAIL_CONTACT, " = ?2 WHERE ", ID, " = ?3"))
        .bind(privacy.hide_contact)
        .bind(privacy.auto_email_contact)
        .bind(trip_id)
        .execute(executor).await
        .map_err(db_error("Failed to set trip privacy"))
        .map(|_| ())
}

pub async fn set_trip_password<'e>(executor: impl SqliteExecutor<'e>, trip_id: i64, password_hash: String) -> Result<bool, DataManagerError> {
    query(concatcp!("UPDATE ", TRIPS_TABLE_NAME, " SET ", PASSWORD_HASH, " = ?1 WHERE ", ID, " = ?2"))
        .bind(password_hash)
        .bind(trip_id)
        .execute(executor).await
        .map_err(db_error("Failed to set trip password"))
        .map(|result| result.rows_affected() == 1)
}

pub async fn delete_trip<'e>(executor: impl SqliteExecutor<'e>, trip_id: i64) -> Result<bool, DataManagerError> {
    query(concatcp!("DELETE FROM ", TRIPS_TABLE_NAME, " WHERE ", ID, " = ?1"))
        .bind(trip_id)
        .execute(executor).await
        .map_err(db_error("Failed to delete trip"))
        .map(|result| result.rows_affected() == 1)
}

/// Detaches and unmatches every request of the trip, returning their ids.
pub async fn release_trip_requests<'e>(executor: impl SqliteExecutor<'e>, trip_id: i64) -> Result<Vec<i64>, DataManagerError> {
    query_as::<_, (i64,)>(concatcp!("
        UPDATE ", REQUESTS_TABLE_NAME, " SET ", DRIVER_ID, " = NULL, ", IS_MATCHED, " = 0
        WHERE ", DRIVER_ID, " = ?1 RETURNING ", ID))
            .bind(trip_id)
            .fetch_all(executor).await
            .map_err(db_error("Failed to release trip requests"))
            .map(|rows| rows.into_iter().map(|row| row.0).collect())
}

/// Active trips, oldest first.
pub async fn fetch_active_trips<'e>(executor: impl SqliteExecutor<'e>) -> Result<Vec<DriverTrip>, DataManagerError> {
    query_as::<_, DriverTrip>(concatcp!("SELECT * FROM ", TRIPS_TABLE_NAME, " WHERE ", IS_ACTIVE, " = 1 ORDER BY ", ID))
        .fetch_all(executor).await
        .map_err(db_error("Failed to get active trips"))
}

/// Active trips on exactly the same route and day as the request.
pub async fn fetch_trips_for_route<'e>(executor: impl SqliteExecutor<'e>, request: &PassengerRequest) -> Result<Vec<DriverTrip>, DataManagerError> {
    query_as::<_, DriverTrip>(concatcp!("
        SELECT * FROM ", TRIPS_TABLE_NAME, "
        WHERE ", DEPARTURE, " = ?1 AND ", DESTINATION, " = ?2 AND ", DATE, " = ?3 AND ", IS_ACTIVE, " = 1
        ORDER BY ", ID))
            .bind(&request.departure)
            .bind(&request.destination)
            .bind(request.date)
            .fetch_all(executor).await
            .map_err(db_error("Failed to get trips for route"))
}

pub async fn list_trips(pool: &Pool<Sqlite>, filter: &ListFilter, order: SortOrder, only_active: bool) -> Result<Vec<DriverTrip>, DataManagerError> {
    let mut builder = QueryBuilder::<Sqlite>::new(concatcp!("SELECT * FROM ", TRIPS_TABLE_NAME, " WHERE 1 = 1"));
    if only_active {
        builder.push(concatcp!(" AND ", IS_ACTIVE, " = 1"));
    }
    push_route_filter(&mut builder, filter);
    if let Some(min_free) = filter.min_free_seats {
        builder.push(concatcp!(" AND ", SEATS_TOTAL, " - ", SEATS_FILLED, " >= ")).push_bind(min_free);
    }
    if let Some(FareFilter::Keyword(keyword)) = &filter.fare {
        builder.push(concatcp!(" AND ", FARE_NOTE, " LIKE ")).push_bind(like_pattern(keyword)).push(" ESCAPE '\\'");
    }
    push_terms(&mut builder, &filter.terms, &[DRIVER_NAME, DEPARTURE, DESTINATION, NOTE, FARE_NOTE]);
    push_trip_order(&mut builder, order);

    builder.build_query_as::<DriverTrip>()
        .fetch_all(pool).await
        .map_err(db_error("Failed to list trips"))
}

// Requests

pub async fn insert_request<'e>(executor: impl SqliteExecutor<'e>, draft: &RequestDraft, password_hash: String, driver_id: Option<i64>) -> Result<i64, DataManagerError> {
    query_as::<_, (i64,)>(concatcp!("
        INSERT INTO ", REQUESTS_TABLE_NAME, "(",
        PASSENGER_NAME, ", ", CONTACT, ", ", EMAIL, ", ", PASSWORD_HASH, ", ", GENDER, ", ",
        SEATS_NEEDED, ", ", WILLING_TO_PAY_CENTS, ", ", DEPARTURE, ", ", DESTINATION, ", ", DATE, ", ", RETURN_DATE, ", ",
        NOTE, ", ", IS_MATCHED, ", ", DRIVER_ID, ", ", TOGETHER_RETURN, ", ", DRIVER_MEMO, ", ", HIDE_CONTACT, ", ", AUTO_EMAIL_CONTACT, ")
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0, ?13, ?14, '', ?15, ?16) RETURNING ", ID))
            .bind(&draft.passenger_name)
            .bind(&draft.contact)
            .bind(&draft.email)
            .bind(password_hash)
            .bind(draft.gender.code())
            .bind(draft.seats_needed)
            .bind(fare_cents(draft)?)
            .bind(&draft.departure)
            .bind(&draft.destination)
            .bind(draft.date)
            .bind(draft.return_date)
            .bind(&draft.note)
            .bind(driver_id)
            .bind(draft.together_return)
            .bind(draft.privacy.hide_contact)
            .bind(draft.privacy.auto_email_contact)
            .fetch_one(executor).await
            .map_err(db_error("Failed to insert request"))
            .map(|row| row.0)
}

pub async fn fetch_request<'e>(executor: impl SqliteExecutor<'e>, request_id: i64) -> Result<Option<PassengerRequest>, DataManagerError> {
    query_as::<_, PassengerRequest>(concatcp!("SELECT * FROM ", REQUESTS_TABLE_NAME, " WHERE ", ID, " = ?1"))
        .bind(request_id)
        .fetch_optional(executor).await
        .map_err(db_error("Failed to get request"))
}

pub async fn update_request<'e>(executor: impl SqliteExecutor<'e>, request_id: i64, draft: &RequestDraft, password_hash: Option<String>) -> Result<(), DataManagerError> {
    query(concatcp!("
        UPDATE ", REQUESTS_TABLE_NAME, " SET ",
            PASSENGER_NAME, " = ?1, ", CONTACT, " = ?2, ", EMAIL, " = ?3, ",
            PASSWORD_HASH, " = COALESCE(?4, ", PASSWORD_HASH, "), ", GENDER, " = ?5, ",
            SEATS_NEEDED, " = ?6, ", WILLING_TO_PAY_CENTS, " = ?7, ", DEPARTURE, " = ?8, ", DESTINATION, " = ?9, ",
            DATE, " = ?10, ", RETURN_DATE, " = ?11, ", NOTE, " = ?12, ", TOGETHER_RETURN, " = ?13, ",
            HIDE_CONTACT, " = ?14, ", AUTO_EMAIL_CONTACT, " = ?15
        WHERE ", ID, " = ?16"))
            .bind(&draft.passenger_name)
            .bind(&draft.contact)
            .bind(&draft.email)
            .bind(password_hash)
            .bind(draft.gender.code())
            .bind(draft.seats_needed)
            .bind(fare_cents(draft)?)
            .bind(&draft.departure)
            .bind(&draft.destination)
            .bind(draft.date)
            .bind(draft.return_date)
            .bind(&draft.note)
            .bind(draft.together_return)
            .bind(draft.privacy.hide_contact)
            .bind(draft.privacy.auto_email_contact)
            .bind(request_id)
            .execute(executor).await
            .map_err(db_error("Failed to update request"))
            .map(|_| ())
}

pub async fn set_request_link<'e>(executor: impl SqliteExecutor<'e>, request_id: i64, driver_id: Option<i64>, is_matched: bool) -> Result<(), DataManagerError> {
    query(concatcp!("UPDATE ", REQUESTS_TABLE_NAME, " SET ", DRIVER_ID, " = ?1, ", IS_MATCHED, " = ?2 WHERE ", ID, " = ?3"))
        .bind(driver_id)
        .bind(is_matched)
        .bind(request_id)
        .execute(executor).await
        .map_err(db_error("Failed to link request"))
        .map(|_| ())
}

pub async fn set_request_privacy<'e>(executor: impl SqliteExecutor<'e>, request_id: i64, privacy: Privacy) -> Result<(), DataManagerError> {
    query(concatcp!("UPDATE ", REQUESTS_TABLE_NAME, " SET ", HIDE_CONTACT, " = ?1, ", AUTO_EMAIL_CONTACT, " = ?2 WHERE ", ID, " = ?3"))
        .bind(privacy.hide_contact)
        .bind(privacy.auto_email_contact)
        .bind(request_id)
        .execute(executor).await
        .map_err(db_error("Failed to set request privacy"))
        .map(|_| ())
}

pub async fn set_request_memo<'e>(executor: impl SqliteExecutor<'e>, request_id: i64, memo: &str) -> Result<(), DataManagerError> {
    query(concatcp!("UPDATE ", REQUESTS_TABLE_NAME, " SET ", DRIVER_MEMO, " = ?1 WHERE ", ID, " = ?2"))
        .bind(memo)
        .bind(request_id)
        .execute(executor).await
        .map_err(db_error("Failed to set driver memo"))
        .map(|_| ())
}

pub async fn set_request_password<'e>(executor: impl SqliteExecutor<'e>, request_id: i64, password_hash: String) -> Result<bool, DataManagerError> {
    query(concatcp!("UPDATE ", REQUESTS_TABLE_NAME, " SET ", PASSWORD_HASH, " = ?1 WHERE ", ID, " = ?2"))
        .bind(password_hash)
        .bind(request_id)
        .execute(executor).await
        .map_err(db_error("Failed to set request password"))
        .map(|result| result.rows_affected() == 1)
}

pub async fn delete_request<'e>(executor: impl SqliteExecutor<'e>, request_id: i64) -> Result<bool, DataManagerError> {
    query(concatcp!("DELETE FROM ", REQUESTS_TABLE_NAME, " WHERE ", ID, " = ?1"))
        .bind(request_id)
        .execute(executor).await
        .map_err(db_error("Failed to delete request"))
        .map(|result| result.rows_affected() == 1)
}

/// Requests attached to any of the trips, newest first.
pub async fn fetch_requests_for_trips(pool: &Pool<Sqlite>, trip_ids: &[i64]) -> Result<Vec<PassengerRequest>, DataManagerError> {
    if trip_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = QueryBuilder::<Sqlite>::new(concatcp!("SELECT * FROM ", REQUESTS_TABLE_NAME, " WHERE ", DRIVER_ID, " IN ("));
    let mut separated = builder.separated(", ");
    for trip_id in trip_ids {
        separated.push_bind(*trip_id);
    }
    separated.push_unseparated(concatcp!(") ORDER BY ", ID, " DESC"));

    builder.build_query_as::<PassengerRequest>()
        .fetch_all(pool).await
        .map_err(db_error("Failed to get trip requests"))
}

/// Unattached, unmatched requests on the trip's route and day, oldest first.
pub async fn fetch_candidates<'e>(executor: impl SqliteExecutor<'e>, trip: &DriverTrip) -> Result<Vec<PassengerRequest>, DataManagerError> {
    query_as::<_, PassengerRequest>(concatcp!("
        SELECT * FROM ", REQUESTS_TABLE_NAME, "
        WHERE ", DEPARTURE, " = ?1 AND ", DESTINATION, " = ?2 AND ", DATE, " = ?3
          AND ", IS_MATCHED, " = 0 AND ", DRIVER_ID, " IS NULL
        ORDER BY ", ID))
            .bind(&trip.departure)
            .bind(&trip.destination)
            .bind(trip.date)
            .fetch_all(executor).await
            .map_err(db_error("Failed to get candidates"))
}

/// With `pool_only`, just the unattached unmatched requests. Newest first.
pub async fn list_requests(pool: &Pool<Sqlite>, filter: &ListFilter, pool_only: bool) -> Result<Vec<PassengerRequest>, DataManagerError> {
    let mut builder = QueryBuilder::<Sqlite>::new(concatcp!("SELECT * FROM ", REQUESTS_TABLE_NAME, " WHERE 1 = 1"));
    if pool_only {
        builder.push(concatcp!(" AND ", IS_MATCHED, " = 0 AND ", DRIVER_ID, " IS NULL"));
    }
    push_route_filter(&mut builder, filter);
    if let Some(FareFilter::AtLeast(amount)) = &filter.fare {
        // Past the largest fare nothing can match.
        let cents = fare_to_cents((*amount).min(max_fare() + Decimal::ONE)).unwrap_or_default();
        builder.push(concatcp!(" AND ", WILLING_TO_PAY_CENTS, " >= ")).push_bind(cents);
    }
    push_terms(&mut builder, &filter.terms, &[PASSENGER_NAME, DEPARTURE, DESTINATION, NOTE]);
    builder.push(concatcp!(" ORDER BY ", ID, " DESC"));

    builder.build_query_as::<PassengerRequest>()
        .fetch_all(pool).await
        .map_err(db_error("Failed to list requests"))
}

// Query building

fn push_route_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &ListFilter) {
    if let Some(departure) = &filter.departure {
        builder.push(concatcp!(" AND ", DEPARTURE, " = ")).push_bind(departure.clone());
    }
    if let Some(destination) = &filter.destination {
        builder.push(concatcp!(" AND ", DESTINATION, " = ")).push_bind(destination.clone());
    }
    if !filter.dates.is_empty() {
        builder.push(concatcp!(" AND ", DATE, " IN ("));
        let mut separated = builder.separated(", ");
        for date in &filter.dates {
            separated.push_bind(*date);
        }
        separated.push_unseparated(")");
    }
    if let Some(gender) = filter.gender {
        builder.push(concatcp!(" AND ", GENDER, " = ")).push_bind(gender.code());
    }
}

/// `%term%` with the LIKE wildcards in `term` escaped by `\`.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn push_terms(builder: &mut QueryBuilder<'_, Sqlite>, terms: &[String], columns: &[&str]) {
    for term in terms {
        let pattern = like_pattern(term);
        builder.push(" AND (");
        let mut separated = builder.separated(" OR ");
        for column in columns {
            separated.push(*column);
            separated.push_unseparated(" LIKE ");
            separated.push_bind_unseparated(pattern.clone());
            separated.push_unseparated(" ESCAPE '\\'");
        }
        separated.push_unseparated(")");
    }
}

fn push_trip_order(builder: &mut QueryBuilder<'_, Sqlite>, order: SortOrder) {
    match order {
        SortOrder::DateDesc => {
            builder.push(concatcp!(" ORDER BY ", DATE, " DESC, ", ID, " DESC"));
        },
        SortOrder::DateAsc => {
            builder.push(concatcp!(" ORDER BY ", DATE, " ASC, ", ID, " ASC"));
        },
        SortOrder::DepAsc => {
            builder.push(concatcp!(" ORDER BY ", DEPARTURE, " ASC, ", DATE, " ASC, ", ID, " ASC"));
        },
        SortOrder::DepDesc => {
            builder.push(concatcp!(" ORDER BY ", DEPARTURE, " DESC, ", DATE, " ASC, ", ID, " ASC"));
        },
        SortOrder::DepN2s | SortOrder::DepS2n => {
            builder.push(concatcp!(" ORDER BY CASE ", DEPARTURE));
            for (rank, city) in CITY_N2S.iter().enumerate() {
                builder.push(" WHEN ").push_bind(*city).push(" THEN ").push(rank);
            }
            builder.push(" ELSE ").push(UNKNOWN_CITY_RANK).push(" END");
            builder.push(if order == SortOrder::DepN2s { " ASC" } else { " DESC" });
            builder.push(concatcp!(", ", DATE, " ASC, ", ID, " ASC"));
        },
    }
}
