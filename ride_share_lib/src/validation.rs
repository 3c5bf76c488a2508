use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    passenger::max_fare,
    trip::{FlexiblePickup, Gender},
};

pub const ANONYMOUS_DRIVER: &str = "Anonymous driver";
pub const ANONYMOUS_PASSENGER: &str = "Anonymous";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{0} must be a number")]
    InvalidNumber(&'static str),

    #[error("{0} must be a date (YYYY-MM-DD)")]
    InvalidDate(&'static str),

    #[error("invalid {0}: {1}")]
    InvalidChoice(&'static str, String),

    #[error("{0} must be at least {1}")]
    TooSmall(&'static str, i64),

    #[error("{0} must be at most {1}")]
    TooLarge(&'static str, Decimal),

    #[error("return date cannot be earlier than the departure date")]
    ReturnBeforeDeparture,

    #[error("{0} cannot be earlier than today")]
    DateInPast(&'static str),

    #[error("hiding contact details requires a valid email address")]
    HideWithoutEmail,

    #[error("total seats cannot be lower than the {0} seats already taken")]
    SeatsBelowFilled(i64),
}

/// The hide-contact / auto-email pair carried by both record kinds.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct Privacy {
    pub hide_contact: bool,
    pub auto_email_contact: bool,
}

impl Privacy {
    /// Validates a requested setting against the record's email.
    pub fn checked(self, email: Option<&str>) -> Result<Privacy, ValidationError> {
        if self.hide_contact && !has_verified_email(email) {
            return Err(ValidationError::HideWithoutEmail);
        }
        Ok(self.normalized(email))
    }

    /// Forces both flags off when there is no usable email, and auto-email off
    /// whenever contact is not hidden.
    pub fn normalized(self, email: Option<&str>) -> Privacy {
        if !has_verified_email(email) || !self.hide_contact {
            return Privacy::default();
        }
        self
    }
}

pub fn has_verified_email(email: Option<&str>) -> bool {
    email
        .map(str::trim)
        .is_some_and(|e| e.parse::<lettre::Address>().is_ok())
}

/// Blank strings become `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Checks the departure/return pair. With `today` set, neither date may be in the past.
pub fn check_schedule(date: NaiveDate, return_date: Option<NaiveDate>, today: Option<NaiveDate>) -> Result<(), ValidationError> {
    if let Some(today) = today {
        if date < today {
            return Err(ValidationError::DateInPast("departure date"));
        }
        if return_date.is_some_and(|r| r < today) {
            return Err(ValidationError::DateInPast("return date"));
        }
    }
    if return_date.is_some_and(|r| r < date) {
        return Err(ValidationError::ReturnBeforeDeparture);
    }
    Ok(())
}

/// Validated input for creating or editing a trip.
#[derive(Debug, Clone, PartialEq)]
pub struct TripDraft {
    pub driver_name: String,
    pub contact: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub gender: Gender,
    pub seats_total: i64,
    pub departure: String,
    pub destination: String,
    pub date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub flexible_pickup: FlexiblePickup,
    pub note: String,
    pub fare_note: String,
    pub is_active: bool,
    pub privacy: Privacy,
}

impl TripDraft {
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.driver_name = default_name(&self.driver_name, ANONYMOUS_DRIVER);
        self.contact = self.contact.trim().to_string();
        self.email = non_blank(self.email);
        self.departure = required(&self.departure, "departure")?;
        self.destination = required(&self.destination, "destination")?;
        if self.seats_total < 1 {
            return Err(ValidationError::TooSmall("seats_total", 1));
        }
        check_schedule(self.date, self.return_date, None)?;
        self.privacy = self.privacy.checked(self.email.as_deref())?;
        Ok(self)
    }
}

/// Validated input for creating a ride request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDraft {
    pub passenger_name: String,
    pub contact: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub gender: Gender,
    pub seats_needed: i64,
    pub willing_to_pay: Option<Decimal>,
    pub departure: String,
    pub destination: String,
    pub date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub note: String,
    pub together_return: Option<bool>,
    pub privacy: Privacy,
}

impl RequestDraft {
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.passenger_name = default_name(&self.passenger_name, ANONYMOUS_PASSENGER);
        self.contact = self.contact.trim().to_string();
        self.email = non_blank(self.email);
        self.departure = required(&self.departure, "departure")?;
        self.destination = required(&self.destination, "destination")?;
        if self.seats_needed < 1 {
            return Err(ValidationError::TooSmall("seats_needed", 1));
        }
        if self.willing_to_pay.is_some_and(|p| p.is_sign_negative()) {
            return Err(ValidationError::TooSmall("willing_to_pay", 0));
        }
        if self.willing_to_pay.is_some_and(|p| p > max_fare()) {
            return Err(ValidationError::TooLarge("willing_to_pay", max_fare()));
        }
        check_schedule(self.date, self.return_date, None)?;
        self.privacy = self.privacy.checked(self.email.as_deref())?;
        Ok(self)
    }
}

fn default_name(name: &str, fallback: &str) -> String {
    let name = name.trim();
    if name.is_empty() { fallback.to_string() } else { name.to_string() }
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(value.to_string())
}
