#![allow(dead_code)]

pub const TRIPS_TABLE_NAME: &str = "DriverTrips";
pub const ID: &str = "id";
pub const DRIVER_NAME: &str = "driver_name";
pub const CONTACT: &str = "contact";
pub const EMAIL: &str = "email";
pub const PASSWORD_HASH: &str = "password_hash";
pub const GENDER: &str = "gender";
pub const SEATS_TOTAL: &str = "seats_total";
pub const SEATS_FILLED: &str = "seats_filled";
pub const DEPARTURE: &str = "departure";
pub const DESTINATION: &str = "destination";
pub const DATE: &str = "date";
pub const RETURN_DATE: &str = "return_date";
pub const FLEXIBLE_PICKUP: &str = "flexible_pickup";
pub const NOTE: &str = "note";
pub const FARE_NOTE: &str = "fare_note";
pub const IS_ACTIVE: &str = "is_active";
pub const HIDE_CONTACT: &str = "hide_contact";
pub const AUTO_EMAIL_CONTACT: &str = "auto_email_contact";

pub const REQUESTS_TABLE_NAME: &str = "PassengerRequests";
// ID, CONTACT, EMAIL, PASSWORD_HASH, GENDER
pub const PASSENGER_NAME: &str = "passenger_name";
pub const SEATS_NEEDED: &str = "seats_needed";
pub const WILLING_TO_PAY_CENTS: &str = "willing_to_pay_cents";
// DEPARTURE, DESTINATION, DATE, RETURN_DATE, NOTE
pub const IS_MATCHED: &str = "is_matched";
pub const DRIVER_ID: &str = "driver_id";
pub const TOGETHER_RETURN: &str = "together_return";
pub const DRIVER_MEMO: &str = "driver_memo";
// HIDE_CONTACT, AUTO_EMAIL_CONTACT
