//! Server-side HTML. Pages share one layout; the list, card and management
//! fragments are also what the live sockets push.

use ride_share_data_management::TripCard;
use ride_share_lib::{
    listing::{SortOrder, CITY_N2S},
    trip::{FlexiblePickup, Gender},
    DriverTrip, PassengerRequest,
};

use crate::forms::FindQuery;

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

pub fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} - Ride Share</title>
<link rel="stylesheet" href="/static/style.css">
<script src="/static/find.js" defer></script>
</head>
<body>
<header><a href="/">Ride Share</a> <a href="/car/">Offer a ride</a> <a href="/people/">Look for a ride</a></header>
<main>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
    )
}

fn message(error: Option<&str>, notice: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(error) = error {
        out.push_str(&format!(r#"<p class="error">{}</p>"#, escape(error)));
    }
    if let Some(notice) = notice {
        out.push_str(&format!(r#"<p class="notice">{}</p>"#, escape(notice)));
    }
    out
}

fn selected(is: bool) -> &'static str {
    if is { " selected" } else { "" }
}

fn checked(is: bool) -> &'static str {
    if is { " checked" } else { "" }
}

fn date_range(date: chrono::NaiveDate, return_date: Option<chrono::NaiveDate>) -> String {
    match return_date {
        Some(back) => format!("{date}, back {back}"),
        None => date.to_string(),
    }
}

fn city_select(name: &str, current: &str) -> String {
    let known = CITY_N2S.contains(&current);
    let mut options = format!(r#"<option value=""{}>Choose a city</option>"#, selected(current.is_empty()));
    for city in CITY_N2S {
        options.push_str(&format!(r#"<option value="{city}"{}>{city}</option>"#, selected(city == current)));
    }
    options.push_str(&format!(r#"<option value="custom"{}>Other</option>"#, selected(!known && !current.is_empty())));

    let custom = if known { "" } else { current };
    format!(
        r#"<select name="{name}">{options}</select><input name="{name}_custom" placeholder="Other place" value="{}">"#,
        escape(custom)
    )
}

fn gender_select(current: Gender) -> String {
    let options: String = [Gender::Undisclosed, Gender::Female, Gender::Male]
        .iter()
        .map(|g| format!(r#"<option value="{}"{}>{}</option>"#, g.code(), selected(*g == current), g.label()))
        .collect();
    format!(r#"<select name="gender">{options}</select>"#)
}

fn pickup_select(current: FlexiblePickup) -> String {
    let options: String = [FlexiblePickup::Maybe, FlexiblePickup::OnTheWay, FlexiblePickup::Anywhere]
        .iter()
        .map(|p| format!(r#"<option value="{}"{}>{}</option>"#, p.code(), selected(*p == current), p.label()))
        .collect();
    format!(r#"<select name="flexible_pickup">{options}</select>"#)
}

fn privacy_fields(hide_contact: bool, auto_email_contact: bool) -> String {
    format!(
        r#"<label><input type="checkbox" name="hide_contact"{}> Hide my contact details (needs an email)</label>
<label><input type="checkbox" name="auto_email_contact"{}> Email my contact details to the other side when matched</label>"#,
        checked(hide_contact),
        checked(auto_email_contact),
    )
}

fn trip_fields(trip: Option<&DriverTrip>) -> String {
    let text = |f: fn(&DriverTrip) -> String| trip.map(f).map(|v| escape(&v)).unwrap_or_default();

    let mut fields = format!(
        r#"<label>Name <input name="driver_name" value="{name}"></label>
<label>Contact <input name="contact" value="{contact}"></label>
<label>Email <input type="email" name="email" value="{email}"></label>
<label>Gender {gender}</label>
<label>Seats <input type="number" min="1" name="seats_total" value="{seats}" required></label>
<label>From {departure}</label>
<label>To {destination}</label>
<label>Date <input type="date" name="date" value="{date}" required></label>
<label>Return <input type="date" name="return_date" value="{return_date}"></label>
<label>Pickup {pickup}</label>
<label>Fare <input name="fare_note" value="{fare_note}"></label>
<label>Note <textarea name="note">{note}</textarea></label>
<label>Password <input type="password" name="password" placeholder="{password_hint}"></label>"#,
        name = text(|t| t.driver_name.clone()),
        contact = text(|t| t.contact.clone()),
        email = text(|t| t.email.clone().unwrap_or_default()),
        gender = gender_select(trip.map(|t| t.gender).unwrap_or_default()),
        seats = trip.map(|t| t.seats_total).unwrap_or(3),
        departure = city_select("departure", trip.map(|t| t.departure.as_str()).unwrap_or_default()),
        destination = city_select("destination", trip.map(|t| t.destination.as_str()).unwrap_or_default()),
        date = text(|t| t.date.to_string()),
        return_date = text(|t| t.return_date.map(|d| d.to_string()).unwrap_or_default()),
        pickup = pickup_select(trip.map(|t| t.flexible_pickup).unwrap_or_default()),
        fare_note = text(|t| t.fare_note.clone()),
        note = text(|t| t.note.clone()),
        password_hint = if trip.is_some() { "Leave blank to keep" } else { "Defaults to 0000" },
    );

    match trip {
        Some(trip) => fields.push_str(&format!(
            r#"<label><input type="checkbox" name="is_active"{}> Open for sign-ups</label>"#,
            checked(trip.is_active)
        )),
        None => fields.push_str(&privacy_fields(false, false)),
    }
    fields
}

fn request_fields(request: Option<&PassengerRequest>, joining: bool) -> String {
    let text = |f: fn(&PassengerRequest) -> String| request.map(f).map(|v| escape(&v)).unwrap_or_default();
    let together = request.and_then(|r| r.together_return);
    // Joining takes route and date from the trip when left blank.
    let required = if joining { "" } else { " required" };

    let mut fields = format!(
        r#"<label>Name <input name="passenger_name" value="{name}"></label>
<label>Contact <input name="contact" value="{contact}"></label>
<label>Email <input type="email" name="email" value="{email}"></label>
<label>Gender {gender}</label>
<label>Seats <input type="number" min="1" name="seats_needed" value="{seats}"></label>
<label>Willing to pay <input type="number" min="0" step="0.01" name="willing_to_pay" value="{pay}"></label>
<label>From {departure}</label>
<label>To {destination}</label>
<label>Date <input type="date" name="date" value="{date}"{required}></label>
<label>Return <input type="date" name="return_date" value="{return_date}"></label>
<label>Return together <select name="together_return"><option value=""{t_none}>Undecided</option><option value="yes"{t_yes}>Yes</option><option value="no"{t_no}>No</option></select></label>
<label>Note <textarea name="note">{note}</textarea></label>
<label>Password <input type="password" name="password" placeholder="{password_hint}"></label>"#,
        name = text(|r| r.passenger_name.clone()),
        contact = text(|r| r.contact.clone()),
        email = text(|r| r.email.clone().unwrap_or_default()),
        gender = gender_select(request.map(|r| r.gender).unwrap_or_default()),
        seats = request.map(|r| r.seats_needed).unwrap_or(1),
        pay = text(|r| r.willing_to_pay.map(|p| p.to_string()).unwrap_or_default()),
        departure = city_select("departure", request.map(|r| r.departure.as_str()).unwrap_or_default()),
        destination = city_select("destination", request.map(|r| r.destination.as_str()).unwrap_or_default()),
        date = text(|r| r.date.to_string()),
        return_date = text(|r| r.return_date.map(|d| d.to_string()).unwrap_or_default()),
        t_none = selected(together.is_none()),
        t_yes = selected(together == Some(true)),
        t_no = selected(together == Some(false)),
        note = text(|r| r.note.clone()),
        password_hint = if request.is_some() { "Leave blank to keep" } else { "Defaults to 0000" },
    );

    if request.is_none() {
        fields.push_str(&privacy_fields(false, false));
    }
    fields
}

fn contact_line(contact: Option<&str>, email: Option<&str>) -> String {
    match (contact.filter(|c| !c.is_empty()), email) {
        (None, None) => r#"<span class="hidden-contact">Contact hidden</span>"#.to_string(),
        (contact, email) => {
            let parts: Vec<String> = contact.into_iter().chain(email).map(escape).collect();
            parts.join(" / ")
        },
    }
}

fn passenger_names(requests: &[PassengerRequest]) -> String {
    if requests.is_empty() {
        return r#"<li class="empty">None</li>"#.to_string();
    }
    requests.iter()
        .map(|r| format!("<li>{} ({} seats)</li>", escape(&r.passenger_name), r.seats_needed))
        .collect()
}

pub fn driver_card(card: &TripCard) -> String {
    let trip = &card.trip;
    let fare = if trip.fare_note.is_empty() {
        String::new()
    } else {
        format!(r#"<p class="fare">Fare: {}</p>"#, escape(&trip.fare_note))
    };
    let note = if trip.note.is_empty() {
        String::new()
    } else {
        format!(r#"<p class="note">{}</p>"#, escape(&trip.note))
    };

    format!(
        r#"<article class="driver-card" id="driver-{id}" data-driver-id="{id}">
<h3>{name} <small>{gender}</small></h3>
<p class="route">{departure} -&gt; {destination}</p>
<p>{dates}</p>
<p class="seats">{left} of {total} seats free</p>
<p>{pickup}</p>
{fare}{note}<p class="contact">{contact}</p>
<div class="passengers">
<h4>Waiting ({pending_count})</h4><ul>{pending}</ul>
<h4>Confirmed ({accepted_count})</h4><ul>{accepted}</ul>
</div>
<details><summary>Join this ride</summary>
<form method="post" action="/driver/{id}/join/" data-json>{fields}<button>Join</button></form>
</details>
<form class="manage" method="post" action="/driver/{id}/auth/" data-json><input type="password" name="password" placeholder="Driver password"><button>Manage</button></form>
</article>"#,
        id = trip.id,
        name = escape(&trip.driver_name),
        gender = trip.gender.label(),
        departure = escape(&trip.departure),
        destination = escape(&trip.destination),
        dates = date_range(trip.date, trip.return_date),
        left = trip.seats_left(),
        total = trip.seats_total,
        pickup = trip.flexible_pickup.label(),
        contact = contact_line(trip.public_contact(), trip.public_email()),
        pending_count = card.pending.len(),
        pending = passenger_names(&card.pending),
        accepted_count = card.accepted.len(),
        accepted = passenger_names(&card.accepted),
        fields = request_fields(None, true),
    )
}

/// Inner html of the driver list container.
pub fn driver_list(cards: &[TripCard]) -> String {
    if cards.is_empty() {
        return r#"<p class="empty">No rides offered right now.</p>"#.to_string();
    }
    cards.iter().map(driver_card).collect::<Vec<_>>().join("\n")
}

fn passenger_item(request: &PassengerRequest) -> String {
    let pay = request.willing_to_pay
        .map(|p| format!("pays {p}"))
        .unwrap_or_else(|| "fare open".to_string());

    format!(
        r#"<li class="passenger" id="passenger-{id}">
<strong>{name}</strong> <small>{gender}</small> {departure} -&gt; {destination}, {dates}, {seats} seats, {pay}
<span class="contact">{contact}</span>
<form method="post" action="/passenger/{id}/edit/"><input type="password" name="password" placeholder="Password"><button>Edit</button></form>
</li>"#,
        id = request.id,
        name = escape(&request.passenger_name),
        gender = request.gender.label(),
        departure = escape(&request.departure),
        destination = escape(&request.destination),
        dates = date_range(request.date, request.return_date),
        seats = request.seats_needed,
        contact = contact_line(request.public_contact(), request.public_email()),
    )
}

/// Inner html of the passenger pool container.
pub fn passenger_list(requests: &[PassengerRequest]) -> String {
    if requests.is_empty() {
        return r#"<p class="empty">Nobody is waiting for a ride.</p>"#.to_string();
    }
    format!("<ul>{}</ul>", requests.iter().map(passenger_item).collect::<String>())
}

fn filter_form(order: SortOrder, query: &FindQuery) -> String {
    let value = |v: &Option<String>| escape(v.as_deref().unwrap_or_default());
    let sorts: String = SortOrder::ALL
        .iter()
        .map(|o| format!(r#"<option value="{}"{}>{}</option>"#, o.key(), selected(*o == order), o.label()))
        .collect();
    let current_gender = query.gender.as_deref().unwrap_or_default().trim();
    let mut genders = format!(r#"<option value=""{}>Any gender</option>"#, selected(current_gender.is_empty()));
    for gender in [Gender::Female, Gender::Male, Gender::Undisclosed] {
        genders.push_str(&format!(
            r#"<option value="{}"{}>{}</option>"#,
            gender.code(),
            selected(gender.code() == current_gender),
            gender.label(),
        ));
    }

    format!(
        r#"<form class="filters" method="get" action="/">
<select name="sort">{sorts}</select>
<input name="departure" placeholder="From" value="{departure}">
<input name="destination" placeholder="To" value="{destination}">
<input name="dates" placeholder="Dates, e.g. 2026-11-01,2026-11-02" value="{dates}">
<select name="gender">{genders}</select>
<input name="min_seats" type="number" min="1" placeholder="Free seats" value="{min_seats}">
<input name="fare" placeholder="Fare" value="{fare}">
<input name="q" placeholder="Search" value="{q}">
<button>Apply</button>
</form>"#,
        departure = value(&query.departure),
        destination = value(&query.destination),
        dates = value(&query.dates),
        min_seats = value(&query.min_seats),
        fare = value(&query.fare),
        q = value(&query.q),
    )
}

pub fn index_page(cards: &[TripCard], pool: &[PassengerRequest], order: SortOrder, query: &FindQuery) -> String {
    let body = format!(
        r#"<h1>Rides</h1>
{filters}
<div data-find-socket data-sort="{sort}">
<section id="driver-list">{drivers}</section>
<h2>Looking for a ride</h2>
<section id="passenger-list">{passengers}</section>
</div>"#,
        filters = filter_form(order, query),
        sort = order.key(),
        drivers = driver_list(cards),
        passengers = passenger_list(pool),
    );
    layout("Rides", &body)
}

pub fn trip_form_page(error: Option<&str>) -> String {
    let body = format!(
        r#"<h1>Offer a ride</h1>
{message}
<form method="post" action="/car/">{fields}<button>Post ride</button></form>"#,
        message = message(error, None),
        fields = trip_fields(None),
    );
    layout("Offer a ride", &body)
}

pub fn request_form_page(error: Option<&str>) -> String {
    let body = format!(
        r#"<h1>Look for a ride</h1>
{message}
<form method="post" action="/people/">{fields}<button>Find rides</button></form>"#,
        message = message(error, None),
        fields = request_fields(None, false),
    );
    layout("Look for a ride", &body)
}

/// Shown after a pool request is created.
pub fn matches_page(request: &PassengerRequest, trips: &[TripCard]) -> String {
    let list = if trips.is_empty() {
        r#"<p class="empty">No ride on that route and day yet. Your request stays in the list for drivers to see.</p>"#.to_string()
    } else {
        driver_list(trips)
    };

    let body = format!(
        r#"<h1>Rides for {departure} -&gt; {destination} on {date}</h1>
<p>Your request #{id} is listed. Manage it from <a href="/passenger/{id}/manage/">your request page</a>.</p>
<div data-find-socket>
<button data-auto-match="{id}">Match me with the first driver who has room</button>
<p id="join-result"></p>
</div>
{list}"#,
        id = request.id,
        departure = escape(&request.departure),
        destination = escape(&request.destination),
        date = request.date,
    );
    layout("Matching rides", &body)
}

fn memo_form(trip_id: i64, request: &PassengerRequest) -> String {
    format!(
        r#"<form method="post" action="/driver/{trip_id}/passenger/{id}/memo/" data-json><input name="memo" placeholder="Private memo" value="{memo}"><button>Save</button></form>"#,
        id = request.id,
        memo = escape(&request.driver_memo),
    )
}

/// Pending requests as the driver sees them. Contact only when public.
pub fn pending_list(trip_id: i64, pending: &[PassengerRequest]) -> String {
    if pending.is_empty() {
        return r#"<p class="empty">No pending requests.</p>"#.to_string();
    }

    let items: String = pending.iter().map(|r| format!(
        r#"<li id="pending-{id}"><strong>{name}</strong>, {seats} seats, {pay} <span class="contact">{contact}</span> {note}
<form method="post" action="/driver/{trip_id}/passenger/{id}/accept/" data-json><button>Accept</button></form>
<form method="post" action="/driver/{trip_id}/passenger/{id}/reject/" data-json><button>Reject</button></form>
{memo}</li>"#,
        id = r.id,
        name = escape(&r.passenger_name),
        seats = r.seats_needed,
        pay = r.willing_to_pay.map(|p| format!("pays {p}")).unwrap_or_default(),
        contact = contact_line(r.public_contact(), r.public_email()),
        note = escape(&r.note),
        memo = memo_form(trip_id, r),
    )).collect();
    format!("<ul>{items}</ul>")
}

/// Accepted passengers. The driver always sees their contact details.
pub fn accepted_list(trip_id: i64, accepted: &[PassengerRequest]) -> String {
    if accepted.is_empty() {
        return r#"<p class="empty">Nobody confirmed yet.</p>"#.to_string();
    }

    let items: String = accepted.iter().map(|r| format!(
        r#"<li id="accepted-{id}"><strong>{name}</strong>, {seats} seats, {together} <span class="contact">{contact}</span> {note}
<form method="post" action="/driver/{trip_id}/passenger/{id}/reject/" data-json><button>Cancel</button></form>
{memo}</li>"#,
        id = r.id,
        name = escape(&r.passenger_name),
        seats = r.seats_needed,
        together = r.together_return_label(),
        contact = contact_line(Some(r.contact.as_str()), r.email.as_deref()),
        note = escape(&r.note),
        memo = memo_form(trip_id, r),
    )).collect();
    format!("<ul>{items}</ul>")
}

pub fn manage_page(card: &TripCard, candidates: &[PassengerRequest], error: Option<&str>, notice: Option<&str>) -> String {
    let trip = &card.trip;
    let candidate_items: String = candidates.iter().map(|r| format!(
        r#"<label><input type="checkbox" name="passenger_ids" value="{id}"> {name}, {seats} seats</label>"#,
        id = r.id,
        name = escape(&r.passenger_name),
        seats = r.seats_needed,
    )).collect();
    let candidates_form = if candidates.is_empty() {
        r#"<p class="empty">No open requests on this route and day.</p>"#.to_string()
    } else {
        format!(
            r#"<form method="post" action="/driver/{id}/manage/"><input type="hidden" name="action" value="accept_passengers">{candidate_items}<button>Accept selected</button></form>"#,
            id = trip.id,
        )
    };

    let body = format!(
        r#"<h1>{name}: {departure} -&gt; {destination}</h1>
<p class="seats">{filled} of {total} seats taken{closed}</p>
{message}
<div data-driver-socket="{id}">
<h2>Waiting for you</h2>
<section id="pending-list">{pending}</section>
<h2>Confirmed</h2>
<section id="accepted-list">{accepted}</section>
</div>
<h2>Open requests on your route</h2>
{candidates_form}
<h2>Edit ride</h2>
<form method="post" action="/driver/{id}/manage/"><input type="hidden" name="action" value="update_driver">{fields}<button>Save</button></form>
<h2>Privacy</h2>
<form method="post" action="/driver/{id}/privacy/" data-json>{privacy}<button>Save privacy</button></form>
<form method="post" action="/driver/{id}/delete/" data-confirm="Delete this ride?"><button class="danger">Delete ride</button></form>"#,
        id = trip.id,
        name = escape(&trip.driver_name),
        departure = escape(&trip.departure),
        destination = escape(&trip.destination),
        filled = trip.seats_filled,
        total = trip.seats_total,
        closed = if trip.is_active { "" } else { " (closed)" },
        message = message(error, notice),
        pending = pending_list(trip.id, &card.pending),
        accepted = accepted_list(trip.id, &card.accepted),
        fields = trip_fields(Some(trip)),
        privacy = privacy_fields(trip.hide_contact, trip.auto_email_contact),
    );
    layout("Manage ride", &body)
}

pub fn passenger_manage_page(request: &PassengerRequest, error: Option<&str>, notice: Option<&str>) -> String {
    let status = match (request.driver_id, request.is_matched) {
        (Some(trip_id), true) => format!("Confirmed on ride #{trip_id}."),
        (Some(trip_id), false) => format!("Waiting for the driver of ride #{trip_id} to confirm."),
        (None, _) => "Listed for drivers to see.".to_string(),
    };

    let body = format!(
        r#"<h1>Your request #{id}</h1>
<p>{status}</p>
{message}
<form method="post" action="/passenger/{id}/manage/"><input type="hidden" name="action" value="update">{fields}<button>Save</button></form>
<h2>Privacy</h2>
<form method="post" action="/passenger/{id}/privacy/" data-json>{privacy}<button>Save privacy</button></form>
<form method="post" action="/passenger/{id}/manage/" data-confirm="Delete this request?"><input type="hidden" name="action" value="delete"><button class="danger">Delete request</button></form>"#,
        id = request.id,
        message = message(error, notice),
        fields = request_fields(Some(request), false),
        privacy = privacy_fields(request.hide_contact, request.auto_email_contact),
    );
    layout("Your request", &body)
}

/// Shown when a plain form post to join a ride is refused.
pub fn join_error_page(trip_id: i64, error: &str) -> String {
    let body = format!(
        r#"<h1>Could not join ride #{trip_id}</h1>
{message}
<p><a href="/">Back to the list</a></p>"#,
        message = message(Some(error), None),
    );
    layout("Could not join", &body)
}

pub fn notice_page(title: &str, text: &str) -> String {
    let body = format!(
        r#"<h1>{}</h1>
<p>{}</p>
<p><a href="/">Back to the list</a></p>"#,
        escape(title),
        escape(text),
    );
    layout(title, &body)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn trip() -> DriverTrip {
        DriverTrip {
            id: 4,
            driver_name: "<Amy>".into(),
            contact: "line:amy".into(),
            email: Some("amy@example.com".into()),
            password_hash: String::new(),
            gender: Gender::Female,
            seats_total: 3,
            seats_filled: 1,
            departure: "Taipei City".into(),
            destination: "Hualien County".into(),
            date: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            return_date: None,
            flexible_pickup: FlexiblePickup::Maybe,
            note: String::new(),
            fare_note: "split gas".into(),
            is_active: true,
            hide_contact: true,
            auto_email_contact: false,
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"<b>"Tom" & 'Jerry'</b>"#), "&lt;b&gt;&quot;Tom&quot; &amp; &#x27;Jerry&#x27;&lt;/b&gt;");
    }

    #[test]
    fn card_hides_contact_and_escapes_name() {
        let card = TripCard { trip: trip(), pending: vec![], accepted: vec![] };
        let html = driver_card(&card);
        assert!(html.contains(r#"id="driver-4""#));
        assert!(html.contains("&lt;Amy&gt;"));
        assert!(!html.contains("line:amy"));
        assert!(html.contains("2 of 3 seats free"));
    }

    #[test]
    fn custom_city_lands_in_text_box() {
        let html = city_select("departure", "Jiufen");
        assert!(html.contains(r#"<option value="custom" selected>"#));
        assert!(html.contains(r#"value="Jiufen""#));

        let html = city_select("departure", "Taipei City");
        assert!(html.contains(r#"<option value="Taipei City" selected>"#));
    }

    #[test]
    fn empty_lists_say_so() {
        assert!(driver_list(&[]).contains("No rides"));
        assert!(passenger_list(&[]).contains("Nobody"));
    }

    #[test]
    fn filter_form_offers_gender() {
        let html = filter_form(SortOrder::default(), &FindQuery::default());
        assert!(html.contains(r#"<select name="gender">"#));
        assert!(html.contains(r#"<option value="" selected>Any gender</option>"#));

        let query = FindQuery { gender: Some("F".into()), ..FindQuery::default() };
        let html = filter_form(SortOrder::default(), &query);
        assert!(html.contains(r#"<option value="F" selected>Female</option>"#));
        assert!(!html.contains(r#"<option value="" selected>"#));
    }
}
