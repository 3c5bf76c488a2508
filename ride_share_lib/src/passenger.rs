use std::fmt;

use chrono::NaiveDate;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};
#[cfg(feature = "sqlx")]
use sqlx::{prelude::*, sqlite::SqliteRow};

use crate::{trip::Gender, validation::Privacy};

/// A passenger asking for seats, either in the open pool or attached to a trip.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PassengerRequest {
    pub id: i64,
    pub passenger_name: String,
    pub contact: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub gender: Gender,
    pub seats_needed: i64,
    pub willing_to_pay: Option<Decimal>,
    pub departure: String,
    pub destination: String,
    pub date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub note: String,
    pub is_matched: bool,
    pub driver_id: Option<i64>,
    pub together_return: Option<bool>,
    #[serde(skip_serializing)]
    pub driver_memo: String,
    pub hide_contact: bool,
    pub auto_email_contact: bool,
}

impl PassengerRequest {
    pub fn privacy(&self) -> Privacy {
        Privacy {
            hide_contact: self.hide_contact,
            auto_email_contact: self.auto_email_contact,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.driver_id.is_some() && !self.is_matched
    }

    pub fn in_pool(&self) -> bool {
        self.driver_id.is_none() && !self.is_matched
    }

    pub fn public_contact(&self) -> Option<&str> {
        (!self.hide_contact).then_some(self.contact.as_str())
    }

    pub fn public_email(&self) -> Option<&str> {
        if self.hide_contact {
            None
        } else {
            self.email.as_deref()
        }
    }

    pub fn together_return_label(&self) -> &'static str {
        match self.together_return {
            Some(true) => "Returning together",
            Some(false) => "Not returning together",
            None => "Unspecified",
        }
    }
}

impl fmt::Display for PassengerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} -> {}", self.passenger_name, self.departure, self.destination)
    }
}

/// Largest fare a request may offer: six digits, two of them decimals.
pub fn max_fare() -> Decimal {
    Decimal::new(999_999, 2)
}

/// Fares are stored as whole cents. `None` when the amount does not fit.
pub fn fare_to_cents(amount: Decimal) -> Option<i64> {
    amount.round_dp(2).checked_mul(Decimal::ONE_HUNDRED)?.to_i64()
}

pub fn cents_to_fare(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

#[cfg(feature = "sqlx")]
impl FromRow<'_, SqliteRow> for PassengerRequest {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let gender: String = row.try_get("gender")?;
        let willing_to_pay: Option<i64> = row.try_get("willing_to_pay_cents")?;

        Ok(Self {
            id: row.try_get("id")?,
            passenger_name: row.try_get("passenger_name")?,
            contact: row.try_get("contact")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            gender: gender.parse().unwrap_or_default(),
            seats_needed: row.try_get("seats_needed")?,
            willing_to_pay: willing_to_pay.map(cents_to_fare),
            departure: row.try_get("departure")?,
            destination: row.try_get("destination")?,
            date: row.try_get("date")?,
            return_date: row.try_get("return_date")?,
            note: row.try_get("note")?,
            is_matched: row.try_get("is_matched")?,
            driver_id: row.try_get("driver_id")?,
            together_return: row.try_get("together_return")?,
            driver_memo: row.try_get("driver_memo")?,
            hide_contact: row.try_get("hide_contact")?,
            auto_email_contact: row.try_get("auto_email_contact")?,
        })
    }
}
