use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
#[cfg(feature = "sqlx")]
use sqlx::{prelude::*, sqlite::SqliteRow};

use crate::{validation::Privacy, ValidationError};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[default]
    #[serde(rename = "X")]
    Undisclosed,
}

impl Gender {
    pub fn code(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Undisclosed => "X",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Undisclosed => "Prefer not to say",
        }
    }
}

impl FromStr for Gender {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "M" => Ok(Gender::Male),
            "F" => Ok(Gender::Female),
            "X" | "" => Ok(Gender::Undisclosed),
            other => Err(ValidationError::InvalidChoice("gender", other.to_string())),
        }
    }
}

/// Whether the driver is willing to detour for pickups.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlexiblePickup {
    #[serde(rename = "YES")]
    OnTheWay,
    #[serde(rename = "NO")]
    Anywhere,
    #[default]
    #[serde(rename = "MAYBE")]
    Maybe,
}

impl FlexiblePickup {
    pub fn code(&self) -> &'static str {
        match self {
            FlexiblePickup::OnTheWay => "YES",
            FlexiblePickup::Anywhere => "NO",
            FlexiblePickup::Maybe => "MAYBE",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FlexiblePickup::OnTheWay => "Pickup along the route",
            FlexiblePickup::Anywhere => "Pickup off the route is fine",
            FlexiblePickup::Maybe => "Depends",
        }
    }
}

impl FromStr for FlexiblePickup {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "YES" => Ok(FlexiblePickup::OnTheWay),
            "NO" => Ok(FlexiblePickup::Anywhere),
            "MAYBE" | "" => Ok(FlexiblePickup::Maybe),
            other => Err(ValidationError::InvalidChoice("flexible_pickup", other.to_string())),
        }
    }
}

impl fmt::Display for FlexiblePickup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A ride posted by a driver.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DriverTrip {
    pub id: i64,
    pub driver_name: String,
    pub contact: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub gender: Gender,
    pub seats_total: i64,
    pub seats_filled: i64,
    pub departure: String,
    pub destination: String,
    pub date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub flexible_pickup: FlexiblePickup,
    pub note: String,
    pub fare_note: String,
    pub is_active: bool,
    pub hide_contact: bool,
    pub auto_email_contact: bool,
}

impl DriverTrip {
    pub fn seats_left(&self) -> i64 {
        self.seats_total - self.seats_filled
    }

    pub fn is_full(&self) -> bool {
        self.seats_filled >= self.seats_total
    }

    pub fn privacy(&self) -> Privacy {
        Privacy {
            hide_contact: self.hide_contact,
            auto_email_contact: self.auto_email_contact,
        }
    }

    /// Contact line safe to show to the public.
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
}

impl fmt::Display for DriverTrip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} -> {}", self.driver_name, self.departure, self.destination)
    }
}

#[cfg(feature = "sqlx")]
impl FromRow<'_, SqliteRow> for DriverTrip {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let gender: String = row.try_get("gender")?;
        let flexible_pickup: String = row.try_get("flexible_pickup")?;

        Ok(Self {
            id: row.try_get("id")?,
            driver_name: row.try_get("driver_name")?,
            contact: row.try_get("contact")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            gender: gender.parse().unwrap_or_default(),
            seats_total: row.try_get("seats_total")?,
            seats_filled: row.try_get("seats_filled")?,
            departure: row.try_get("departure")?,
            destination: row.try_get("destination")?,
            date: row.try_get("date")?,
            return_date: row.try_get("return_date")?,
            flexible_pickup: flexible_pickup.parse().unwrap_or_default(),
            note: row.try_get("note")?,
            fare_note: row.try_get("fare_note")?,
            is_active: row.try_get("is_active")?,
            hide_contact: row.try_get("hide_contact")?,
            auto_email_contact: row.try_get("auto_email_contact")?,
        })
    }
}
