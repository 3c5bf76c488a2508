//! Seat bookkeeping for a single trip.
//!
//! These functions only compute the new state; persisting it (and guarding it
//! against concurrent writers) is the data layer's job.

use thiserror::Error;

use crate::DriverTrip;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("seats insufficient: {remaining} left, {requested} requested")]
pub struct SeatsInsufficient {
    pub remaining: i64,
    pub requested: i64,
}

/// Seat state of a trip after a reservation or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatChange {
    pub seats_filled: i64,
    pub is_active: bool,
}

impl SeatChange {
    pub fn apply(self, trip: &mut DriverTrip) {
        trip.seats_filled = self.seats_filled;
        trip.is_active = self.is_active;
    }
}

/// Reserves `seats` on the trip. A trip that becomes full is deactivated.
pub fn reserve(trip: &DriverTrip, seats: i64) -> Result<SeatChange, SeatsInsufficient> {
    let remaining = trip.seats_left();
    if seats > remaining {
        return Err(SeatsInsufficient { remaining, requested: seats });
    }

    let seats_filled = trip.seats_filled + seats;
    Ok(SeatChange {
        seats_filled,
        is_active: trip.is_active && seats_filled < trip.seats_total,
    })
}

/// Gives `seats` back. A trip that was closed for being full reopens once a
/// seat frees up; a trip the driver closed by hand stays closed.
pub fn release(trip: &DriverTrip, seats: i64) -> SeatChange {
    let was_full = trip.is_full();
    let seats_filled = (trip.seats_filled - seats).max(0);
    let reopened = was_full && seats_filled < trip.seats_total;

    SeatChange {
        seats_filled,
        is_active: trip.is_active || reopened,
    }
}

/// First-fit: the earliest posted active trip with room for `seats`.
pub fn first_fit(trips: &[DriverTrip], seats: i64) -> Option<&DriverTrip> {
    trips
        .iter()
        .filter(|trip| trip.is_active && trip.seats_left() >= seats)
        .min_by_key(|trip| trip.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trip::tests::sample_trip;

    #[test]
    fn second_request_of_two_does_not_fit_three_seats() {
        let mut trip = sample_trip();
        assert_eq!(trip.seats_total, 3);

        reserve(&trip, 2).unwrap().apply(&mut trip);
        assert_eq!(trip.seats_filled, 2);
        assert_eq!(trip.seats_left(), 1);
        assert!(trip.is_active);

        let err = reserve(&trip, 2).unwrap_err();
        assert_eq!(err, SeatsInsufficient { remaining: 1, requested: 2 });
        assert_eq!(trip.seats_filled, 2);
    }

    #[test]
    fn filling_to_capacity_deactivates() {
        let trip = sample_trip();
        let change = reserve(&trip, 3).unwrap();
        assert_eq!(change, SeatChange { seats_filled: 3, is_active: false });
    }

    #[test]
    fn release_reopens_a_full_trip() {
        let mut trip = sample_trip();
        reserve(&trip, 3).unwrap().apply(&mut trip);
        let change = release(&trip, 1);
        assert_eq!(change, SeatChange { seats_filled: 2, is_active: true });
    }

    #[test]
    fn release_keeps_manual_deactivation() {
        let mut trip = sample_trip();
        trip.seats_filled = 1;
        trip.is_active = false;
        assert_eq!(release(&trip, 1), SeatChange { seats_filled: 0, is_active: false });
    }

    #[test]
    fn release_never_goes_negative() {
        let mut trip = sample_trip();
        trip.seats_filled = 1;
        assert_eq!(release(&trip, 5).seats_filled, 0);
    }

    #[test]
    fn first_fit_picks_earliest_with_room() {
        let mut a = sample_trip();
        a.id = 4;
        a.seats_filled = 2;
        let mut b = sample_trip();
        b.id = 9;
        let mut c = sample_trip();
        c.id = 6;
        c.is_active = false;

        let trips = vec![b.clone(), a.clone(), c];
        assert_eq!(first_fit(&trips, 1).map(|t| t.id), Some(4));
        assert_eq!(first_fit(&trips, 2).map(|t| t.id), Some(9));
        assert_eq!(first_fit(&trips, 4), None);
    }
}
