//! Sort orders and filters for the public trip and request lists.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{passenger::max_fare, trip::Gender};

/// Cities from north to south, used for geographic ordering.
pub const CITY_N2S: [&str; 22] = [
    "Keelung City", "Taipei City", "New Taipei City", "Taoyuan City", "Hsinchu City", "Hsinchu County", "Miaoli County",
    "Taichung City", "Changhua County", "Nantou County", "Yunlin County",
    "Chiayi City", "Chiayi County",
    "Tainan City", "Kaohsiung City", "Pingtung County",
    "Yilan County", "Hualien County", "Taitung County",
    "Penghu County", "Kinmen County", "Lienchiang County",
];

/// Rank for cities missing from [`CITY_N2S`].
pub const UNKNOWN_CITY_RANK: usize = 999;

pub fn city_rank(city: &str) -> usize {
    CITY_N2S
        .iter()
        .position(|c| *c == city)
        .unwrap_or(UNKNOWN_CITY_RANK)
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    DateDesc,
    DateAsc,
    DepAsc,
    DepDesc,
    /// North to south by departure city.
    DepN2s,
    /// South to north by departure city.
    DepS2n,
}

impl SortOrder {
    pub const ALL: [SortOrder; 6] = [
        SortOrder::DateDesc,
        SortOrder::DateAsc,
        SortOrder::DepAsc,
        SortOrder::DepDesc,
        SortOrder::DepN2s,
        SortOrder::DepS2n,
    ];

    /// Unknown or empty keys fall back to the default order.
    pub fn from_key(key: &str) -> SortOrder {
        match key.trim() {
            "date_asc" => SortOrder::DateAsc,
            "dep_asc" => SortOrder::DepAsc,
            "dep_desc" => SortOrder::DepDesc,
            "dep_n2s" => SortOrder::DepN2s,
            "dep_s2n" => SortOrder::DepS2n,
            _ => SortOrder::DateDesc,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            SortOrder::DateDesc => "date_desc",
            SortOrder::DateAsc => "date_asc",
            SortOrder::DepAsc => "dep_asc",
            SortOrder::DepDesc => "dep_desc",
            SortOrder::DepN2s => "dep_n2s",
            SortOrder::DepS2n => "dep_s2n",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::DateDesc => "Date (newest first)",
            SortOrder::DateAsc => "Date (oldest first)",
            SortOrder::DepAsc => "Departure A-Z",
            SortOrder::DepDesc => "Departure Z-A",
            SortOrder::DepN2s => "Departure north to south",
            SortOrder::DepS2n => "Departure south to north",
        }
    }

    /// Picks the first non-empty candidate, in priority order (form, query, cookie).
    pub fn resolve<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> SortOrder {
        candidates
            .into_iter()
            .flatten()
            .find(|key| !key.trim().is_empty())
            .map(SortOrder::from_key)
            .unwrap_or_default()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum FareFilter {
    /// Requests offering at least this much.
    AtLeast(Decimal),
    /// Trips whose fare note mentions this.
    Keyword(String),
}

impl FromStr for FareFilter {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(());
        }
        // Amounts are kept within what a fare can be: anything above the
        // largest fare matches no request, anything below zero matches all.
        Ok(match Decimal::from_str(s) {
            Ok(amount) => FareFilter::AtLeast(amount.clamp(Decimal::ZERO, max_fare() + Decimal::new(1, 2))),
            Err(_) => FareFilter::Keyword(s.to_string()),
        })
    }
}

/// Conjunctive filters for the list views. Empty fields do not filter.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ListFilter {
    pub departure: Option<String>,
    pub destination: Option<String>,
    pub dates: Vec<NaiveDate>,
    pub gender: Option<Gender>,
    pub min_free_seats: Option<i64>,
    pub fare: Option<FareFilter>,
    /// Every term must appear in at least one text column.
    pub terms: Vec<String>,
}

impl ListFilter {
    pub fn is_empty(&self) -> bool {
        *self == ListFilter::default()
    }

    /// Dates separated by commas or whitespace. Unparseable entries are skipped.
    pub fn parse_dates(raw: &str) -> Vec<NaiveDate> {
        raw.split(|c: char| c == ',' || c.is_whitespace())
            .filter_map(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
            .collect()
    }

    pub fn parse_terms(raw: &str) -> Vec<String> {
        raw.split_whitespace().map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_sort_key_falls_back_to_date_desc() {
        assert_eq!(SortOrder::from_key("bogus"), SortOrder::DateDesc);
        assert_eq!(SortOrder::from_key(""), SortOrder::DateDesc);
        for order in SortOrder::ALL {
            assert_eq!(SortOrder::from_key(order.key()), order);
        }
    }

    #[test]
    fn resolve_prefers_earlier_sources() {
        let order = SortOrder::resolve([None, Some(" "), Some("dep_n2s"), Some("date_asc")]);
        assert_eq!(order, SortOrder::DepN2s);
        assert_eq!(SortOrder::resolve([None, None]), SortOrder::DateDesc);
    }

    #[test]
    fn city_rank_follows_table() {
        assert_eq!(city_rank("Keelung City"), 0);
        assert!(city_rank("Taipei City") < city_rank("Kaohsiung City"));
        assert_eq!(city_rank("Atlantis"), UNKNOWN_CITY_RANK);
    }

    #[test]
    fn fare_filter_is_amount_or_keyword() {
        assert_eq!("300".parse::<FareFilter>(), Ok(FareFilter::AtLeast(Decimal::new(300, 0))));
        assert_eq!("free".parse::<FareFilter>(), Ok(FareFilter::Keyword("free".into())));
        assert!(" ".parse::<FareFilter>().is_err());
    }

    #[test]
    fn fare_filter_amount_is_capped() {
        let cap = Decimal::new(1_000_000, 2);
        assert_eq!("79228162514264337593543950335".parse::<FareFilter>(), Ok(FareFilter::AtLeast(cap)));
        assert_eq!("-5".parse::<FareFilter>(), Ok(FareFilter::AtLeast(Decimal::ZERO)));
        assert_eq!("9999.99".parse::<FareFilter>(), Ok(FareFilter::AtLeast(max_fare())));
    }

    #[test]
    fn dates_and_terms_parse_loosely() {
        let dates = ListFilter::parse_dates("2026-11-01, nope 2026-11-03");
        assert_eq!(dates.len(), 2);
        assert_eq!(ListFilter::parse_terms("  taipei  night "), vec!["taipei", "night"]);
    }
}
