//! Which emails go out when a passenger joins a trip.
//!
//! | case | passenger hidden | passenger auto | driver hidden | driver auto | email sent                 |
//! |------|------------------|----------------|---------------|-------------|----------------------------|
//! | 1    | yes              | yes            |               |             | full passenger -> driver   |
//! | 2    | yes              | no             |               |             | notice only -> driver      |
//! | 3    | no               |                |               |             | full passenger -> driver   |
//! | 4    |                  |                | yes           | yes         | driver contact -> passenger|
//! | 5    |                  |                | yes           | no          | nothing                    |
//! | 6    |                  |                | no            |             | nothing                    |
//!
//! Cases 1-3 need a driver email, case 4 a passenger email.

use chrono::NaiveDate;
use serde::Serialize;

use crate::{validation::has_verified_email, DriverTrip, PassengerRequest};

const UNSET: &str = "not given";
const HIDDEN: &str = "(hidden or not given)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub fn build_join_emails(trip: &DriverTrip, request: &PassengerRequest, today: NaiveDate) -> Vec<OutboundEmail> {
    let mut emails = Vec::new();

    let driver_email = trip.email.as_deref().filter(|e| has_verified_email(Some(*e)));
    let passenger_email = request.email.as_deref().filter(|e| has_verified_email(Some(*e)));

    let subject_full = format!("[New sign-up with contact] {} joined your trip - {}", request.passenger_name, today);
    let subject_notice = format!("[New sign-up] {} joined your trip - {}", request.passenger_name, today);
    let subject_driver = format!("[Driver contact] How to reach {} - {}", trip.driver_name, today);

    if let Some(to) = driver_email {
        let privacy = request.privacy();
        if privacy.hide_contact && privacy.auto_email_contact {
            emails.push(OutboundEmail {
                to: to.to_string(),
                subject: subject_full,
                body: format!(
                    "A new passenger signed up for your trip (automatic contact email enabled):\n\n{}\n\n\
                     This message was sent on the passenger's behalf. Reply to their email or use their contact details.",
                    passenger_block(request)
                ),
            });
        } else if privacy.hide_contact {
            emails.push(OutboundEmail {
                to: to.to_string(),
                subject: subject_notice,
                body: format!(
                    "A passenger signed up for your trip (contact details hidden):\n\n\
                     Passenger: {}\nSeats: {}\nPickup: {} -> Destination: {}\n{}\n\n\
                     The passenger has not enabled automatic contact email. Check the trip page for details.",
                    request.passenger_name,
                    request.seats_needed,
                    or_unset(&request.departure),
                    or_unset(&request.destination),
                    schedule(request.date, request.return_date),
                ),
            });
        } else {
            emails.push(OutboundEmail {
                to: to.to_string(),
                subject: subject_full,
                body: format!(
                    "A passenger signed up for your trip (contact details public):\n\n{}\n\n\
                     Contact the passenger directly or handle the sign-up on the trip page.",
                    passenger_block(request)
                ),
            });
        }
    }

    if let Some(to) = passenger_email {
        if trip.hide_contact && trip.auto_email_contact {
            emails.push(OutboundEmail {
                to: to.to_string(),
                subject: subject_driver,
                body: format!(
                    "The driver's contact details (automatic contact email enabled):\n\n{}\n\n\
                     This message was sent on the driver's behalf. Reply to their email or use their contact details.",
                    driver_block(trip)
                ),
            });
        }
    }

    emails
}

fn or_unset(value: &str) -> &str {
    if value.trim().is_empty() { UNSET } else { value }
}

fn or_hidden(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => HIDDEN,
    }
}

fn schedule(date: NaiveDate, return_date: Option<NaiveDate>) -> String {
    let back = return_date.map(|d| d.to_string()).unwrap_or_else(|| "undecided".to_string());
    format!("Departure: {date}\nReturn: {back}")
}

fn passenger_block(request: &PassengerRequest) -> String {
    let pay = request
        .willing_to_pay
        .map(|p| format!("Willing to pay: NT$ {p}"))
        .unwrap_or_else(|| "Willing to pay: not given".to_string());

    format!(
        "Passenger: {}\nGender: {}\nSeats: {}\n{}\nPickup: {}\nDestination: {}\n{}\nReturn together: {}\nContact: {}\nEmail: {}\nNote: {}",
        request.passenger_name,
        request.gender.label(),
        request.seats_needed,
        pay,
        or_unset(&request.departure),
        or_unset(&request.destination),
        schedule(request.date, request.return_date),
        request.together_return_label(),
        or_hidden(Some(request.contact.as_str())),
        or_hidden(request.email.as_deref()),
        if request.note.is_empty() { "none" } else { request.note.as_str() },
    )
}

fn driver_block(trip: &DriverTrip) -> String {
    format!(
        "Driver: {}\nGender: {}\n{}\nPickup preference: {}\nFare: {}\nContact: {}\nEmail: {}\nNote: {}",
        trip.driver_name,
        trip.gender.label(),
        schedule(trip.date, trip.return_date),
        trip.flexible_pickup.label(),
        or_unset(&trip.fare_note),
        or_hidden(Some(trip.contact.as_str())),
        or_hidden(trip.email.as_deref()),
        if trip.note.is_empty() { "none" } else { trip.note.as_str() },
    )
}
