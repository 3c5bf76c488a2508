//! Turning submitted form fields into drafts and filters.

use std::str::FromStr;

use chrono::NaiveDate;
use ride_share_lib::{
    listing::{FareFilter, ListFilter},
    trip::Gender,
    validation::{Privacy, RequestDraft, TripDraft},
    DriverTrip, PassengerRequest, ValidationError,
};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Raw urlencoded pairs. Keeps repeated keys, which checkbox lists need.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn text(&self, name: &str) -> String {
        self.get(name).map(str::trim).unwrap_or_default().to_string()
    }

    pub fn opt(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0.iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn checked(&self, name: &str) -> bool {
        matches!(self.get(name).map(str::trim), Some("on" | "true" | "1" | "yes"))
    }

    fn int(&self, name: &'static str) -> Result<Option<i64>, ValidationError> {
        self.opt(name)
            .map(|value| value.parse().map_err(|_| ValidationError::InvalidNumber(name)))
            .transpose()
    }

    fn date(&self, name: &'static str) -> Result<Option<NaiveDate>, ValidationError> {
        self.opt(name)
            .map(|value| NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate(name)))
            .transpose()
    }

    fn decimal(&self, name: &'static str) -> Result<Option<Decimal>, ValidationError> {
        self.opt(name)
            .map(|value| Decimal::from_str(&value).map_err(|_| ValidationError::InvalidNumber(name)))
            .transpose()
    }

    /// A city picked from the dropdown, unless a custom one was typed or
    /// the dropdown says `custom`.
    fn city(&self, name: &str) -> String {
        let custom = self.opt(&format!("{name}_custom"));
        let picked = self.text(name);
        match custom {
            Some(custom) => custom,
            None if picked == "custom" => String::new(),
            None => picked,
        }
    }

    pub fn privacy(&self) -> Privacy {
        Privacy {
            hide_contact: self.checked("hide_contact"),
            auto_email_contact: self.checked("auto_email_contact"),
        }
    }

    /// Fills in fields the client did not send.
    pub fn with_defaults(mut self, defaults: Vec<(&str, String)>) -> Self {
        for (key, value) in defaults {
            if self.get(key).is_none() {
                self.0.push((key.to_string(), value));
            }
        }
        self
    }
}

impl From<Vec<(String, String)>> for FormFields {
    fn from(fields: Vec<(String, String)>) -> Self {
        Self(fields)
    }
}

/// New trips are always active; on edit the checkbox decides.
pub fn trip_draft(fields: &FormFields, editing: bool) -> Result<TripDraft, ValidationError> {
    let draft = TripDraft {
        driver_name: fields.text("driver_name"),
        contact: fields.text("contact"),
        email: fields.opt("email"),
        password: fields.opt("password"),
        gender: fields.text("gender").parse()?,
        seats_total: fields.int("seats_total")?.ok_or(ValidationError::MissingField("seats_total"))?,
        departure: fields.city("departure"),
        destination: fields.city("destination"),
        date: fields.date("date")?.ok_or(ValidationError::MissingField("date"))?,
        return_date: fields.date("return_date")?,
        flexible_pickup: fields.text("flexible_pickup").parse()?,
        note: fields.text("note"),
        fare_note: fields.text("fare_note"),
        is_active: !editing || fields.checked("is_active"),
        privacy: fields.privacy(),
    };
    Ok(draft)
}

/// When joining a trip, a blank route or date is taken from the trip.
pub fn request_draft(fields: &FormFields, trip: Option<&DriverTrip>) -> Result<RequestDraft, ValidationError> {
    let departure = fields.city("departure");
    let destination = fields.city("destination");
    let date = match (fields.date("date")?, trip) {
        (Some(date), _) => date,
        (None, Some(trip)) => trip.date,
        (None, None) => return Err(ValidationError::MissingField("date")),
    };

    let draft = RequestDraft {
        passenger_name: fields.text("passenger_name"),
        contact: fields.text("contact"),
        email: fields.opt("email"),
        password: fields.opt("password"),
        gender: fields.text("gender").parse()?,
        seats_needed: fields.int("seats_needed")?.unwrap_or(1),
        willing_to_pay: fields.decimal("willing_to_pay")?,
        departure: match trip {
            Some(trip) if departure.is_empty() => trip.departure.clone(),
            _ => departure,
        },
        destination: match trip {
            Some(trip) if destination.is_empty() => trip.destination.clone(),
            _ => destination,
        },
        date,
        return_date: fields.date("return_date")?,
        note: fields.text("note"),
        together_return: match fields.text("together_return").as_str() {
            "yes" | "true" => Some(true),
            "no" | "false" => Some(false),
            _ => None,
        },
        privacy: fields.privacy(),
    };
    Ok(draft)
}

/// Current values of a request, for updates that only send some fields.
pub fn request_defaults(request: &PassengerRequest) -> Vec<(&'static str, String)> {
    let optional = |value: Option<String>| value.unwrap_or_default();
    vec![
        ("passenger_name", request.passenger_name.clone()),
        ("contact", request.contact.clone()),
        ("email", optional(request.email.clone())),
        ("gender", request.gender.code().to_string()),
        ("seats_needed", request.seats_needed.to_string()),
        ("willing_to_pay", optional(request.willing_to_pay.map(|p| p.to_string()))),
        ("departure", request.departure.clone()),
        ("destination", request.destination.clone()),
        ("date", request.date.to_string()),
        ("return_date", optional(request.return_date.map(|d| d.to_string()))),
        ("note", request.note.clone()),
        ("together_return", match request.together_return {
            Some(true) => "yes".to_string(),
            Some(false) => "no".to_string(),
            None => String::new(),
        }),
    ]
}

/// Query string of the public list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FindQuery {
    pub sort: Option<String>,
    pub departure: Option<String>,
    pub destination: Option<String>,
    pub dates: Option<String>,
    pub gender: Option<String>,
    pub min_seats: Option<String>,
    pub fare: Option<String>,
    pub q: Option<String>,
}

impl FindQuery {
    /// Unparseable filters are ignored rather than rejected.
    pub fn to_filter(&self) -> ListFilter {
        let non_blank = |value: &Option<String>| value.as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        ListFilter {
            departure: non_blank(&self.departure),
            destination: non_blank(&self.destination),
            dates: self.dates.as_deref().map(ListFilter::parse_dates).unwrap_or_default(),
            gender: non_blank(&self.gender).and_then(|g| g.parse::<Gender>().ok()),
            min_free_seats: non_blank(&self.min_seats).and_then(|s| s.parse().ok()),
            fare: self.fare.as_deref().and_then(|f| f.parse::<FareFilter>().ok()),
            terms: self.q.as_deref().map(ListFilter::parse_terms).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use ride_share_lib::trip::FlexiblePickup;

    use super::*;

    fn sample_trip() -> DriverTrip {
        DriverTrip {
            id: 1,
            driver_name: "Amy".into(),
            contact: "line:amy".into(),
            email: None,
            password_hash: String::new(),
            gender: Gender::Female,
            seats_total: 3,
            seats_filled: 0,
            departure: "Taipei City".into(),
            destination: "Tainan City".into(),
            date: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            return_date: None,
            flexible_pickup: FlexiblePickup::Maybe,
            note: String::new(),
            fare_note: String::new(),
            is_active: true,
            hide_contact: false,
            auto_email_contact: false,
        }
    }

    fn fields(pairs: &[(&str, &str)]) -> FormFields {
        FormFields(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn custom_city_wins_over_dropdown() {
        let f = fields(&[("departure", "Taipei City"), ("departure_custom", " Jiufen "), ("destination", "custom")]);
        assert_eq!(f.city("departure"), "Jiufen");
        assert_eq!(f.city("destination"), "");
    }

    #[test]
    fn trip_form_parses_and_reports_bad_numbers() {
        let base = [
            ("driver_name", "Amy"), ("seats_total", "3"), ("departure", "Taipei City"),
            ("destination", "Tainan City"), ("date", "2026-11-01"), ("flexible_pickup", "YES"),
            ("hide_contact", "on"),
        ];
        let draft = trip_draft(&fields(&base), false).unwrap();
        assert_eq!(draft.seats_total, 3);
        assert!(draft.is_active);
        assert_eq!(draft.flexible_pickup, FlexiblePickup::OnTheWay);
        assert!(draft.privacy.hide_contact);

        let mut bad = base.to_vec();
        bad[1] = ("seats_total", "three");
        assert_eq!(trip_draft(&fields(&bad), false), Err(ValidationError::InvalidNumber("seats_total")));

        let draft = trip_draft(&fields(&base), true).unwrap();
        assert!(!draft.is_active, "unchecked box on edit closes the trip");
    }

    #[test]
    fn joining_fills_route_and_date_from_trip() {
        let trip = sample_trip();
        let draft = request_draft(&fields(&[("passenger_name", "Ben"), ("together_return", "yes")]), Some(&trip)).unwrap();
        assert_eq!(draft.departure, trip.departure);
        assert_eq!(draft.date, trip.date);
        assert_eq!(draft.seats_needed, 1);
        assert_eq!(draft.together_return, Some(true));

        assert_eq!(request_draft(&fields(&[]), None), Err(ValidationError::MissingField("date")));
        let bad_fare = fields(&[("date", "2026-11-01"), ("willing_to_pay", "lots")]);
        assert_eq!(request_draft(&bad_fare, None), Err(ValidationError::InvalidNumber("willing_to_pay")));
    }

    #[test]
    fn defaults_only_fill_missing_fields() {
        let f = fields(&[("note", "new")]).with_defaults(vec![("note", "old".into()), ("contact", "x".into())]);
        assert_eq!(f.text("note"), "new");
        assert_eq!(f.text("contact"), "x");
    }

    #[test]
    fn find_query_ignores_garbage() {
        let query = FindQuery {
            min_seats: Some("two".into()),
            gender: Some("F".into()),
            fare: Some("300".into()),
            q: Some("night bus".into()),
            ..FindQuery::default()
        };
        let filter = query.to_filter();
        assert_eq!(filter.min_free_seats, None);
        assert_eq!(filter.gender, Some(Gender::Female));
        assert_eq!(filter.fare, Some(FareFilter::AtLeast(Decimal::new(300, 0))));
        assert_eq!(filter.terms, vec!["night", "bus"]);
    }
}
