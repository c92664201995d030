use chrono::{DateTime, Utc};

/// Trip lifecycle status. `Cancelled` is only reachable by explicit driver
/// action from `Planned`; the time-derived transitions never produce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripStatus {
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Planned => "planned",
            TripStatus::InProgress => "in_progress",
            TripStatus::Completed => "completed",
            TripStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "planned" => Some(TripStatus::Planned),
            "in_progress" => Some(TripStatus::InProgress),
            "completed" => Some(TripStatus::Completed),
            "cancelled" => Some(TripStatus::Cancelled),
            _ => None,
        }
    }
}

/// Derive the lifecycle status of a trip from wall-clock time.
///
/// Pure and idempotent; callers persist the result when it differs from the
/// stored status. Terminal states are never left. A one-way trip (no
/// `return_date`) enters `in_progress` at `date_time` and stays there until
/// the driver explicitly completes it.
pub fn derive_status(
    current: TripStatus,
    date_time: DateTime<Utc>,
    return_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> TripStatus {
    match current {
        TripStatus::Cancelled | TripStatus::Completed => current,
        TripStatus::Planned | TripStatus::InProgress => {
            if now < date_time {
                return current;
            }
            match return_date {
                Some(ret) if now >= ret => TripStatus::Completed,
                _ => TripStatus::InProgress,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn planned_before_departure_stays_planned() {
        let status = derive_status(TripStatus::Planned, at(12), None, at(10));
        assert_eq!(status, TripStatus::Planned);
    }

    #[test]
    fn planned_past_departure_becomes_in_progress() {
        let status = derive_status(TripStatus::Planned, at(12), None, at(13));
        assert_eq!(status, TripStatus::InProgress);
    }

    #[test]
    fn one_way_trip_stays_in_progress_after_departure() {
        // Resolved policy: without a return date the trip only completes by
        // explicit driver action.
        let much_later = at(12) + Duration::days(30);
        let status = derive_status(TripStatus::Planned, at(12), None, much_later);
        assert_eq!(status, TripStatus::InProgress);
    }

    #[test]
    fn round_trip_completes_at_return_date() {
        let status = derive_status(TripStatus::Planned, at(8), Some(at(18)), at(19));
        assert_eq!(status, TripStatus::Completed);

        let status = derive_status(TripStatus::Planned, at(8), Some(at(18)), at(12));
        assert_eq!(status, TripStatus::InProgress);
    }

    #[test]
    fn terminal_states_are_sticky() {
        let status = derive_status(TripStatus::Cancelled, at(8), Some(at(18)), at(19));
        assert_eq!(status, TripStatus::Cancelled);

        let status = derive_status(TripStatus::Completed, at(8), None, at(6));
        assert_eq!(status, TripStatus::Completed);
    }

    #[test]
    fn derivation_is_idempotent() {
        let first = derive_status(TripStatus::Planned, at(8), Some(at(18)), at(12));
        let second = derive_status(first, at(8), Some(at(18)), at(12));
        assert_eq!(first, second);
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            TripStatus::Planned,
            TripStatus::InProgress,
            TripStatus::Completed,
            TripStatus::Cancelled,
        ] {
            assert_eq!(TripStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TripStatus::parse("boarding"), None);
    }
}
