// libs/appointment-cell/src/services/slots.rs
use chrono::{DateTime, Duration, NaiveDateTime, Timelike, Utc};
use serde::Serialize;

use doctor_cell::models::{SlotDate, SlotMap, SlotTime};

/// First bookable hour of a clinic day.
pub const OPENING_HOUR: u32 = 10;
/// Clinic day ends here; a slot must start strictly before it.
pub const CLOSING_HOUR: u32 = 21;
/// Slot grid granularity.
pub const SLOT_INTERVAL_MINUTES: i64 = 30;
/// Rolling booking horizon, today included.
pub const BOOKING_WINDOW_DAYS: i64 = 7;

/// One offerable slot. Not persisted; recomputed from the booked-slot map
/// whenever a client asks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotCandidate {
    pub starts_at: NaiveDateTime,
    pub date: SlotDate,
    pub time: SlotTime,
}

/// Compute the open slots for the next [`BOOKING_WINDOW_DAYS`] days, today
/// first. Pure function of the booked map and the instant handed in; the
/// clock is never read here so results are replayable.
///
/// Day zero starts at `max(now.hour + 1, 10)`, minute snapped to 30 when the
/// current minute is past the half hour and to 0 otherwise; that is the next
/// on-grid slot strictly after "now", never before opening. Every other day
/// starts at opening. A day whose start lands at or past closing yields an
/// empty sequence, which is a normal late-evening outcome, not an error.
pub fn generate(booked: &SlotMap, now: DateTime<Utc>) -> Vec<Vec<SlotCandidate>> {
    let today = now.date_naive();

    (0..BOOKING_WINDOW_DAYS)
        .map(|offset| {
            let day = today + Duration::days(offset);
            let date = SlotDate::from(day);
            let closing = day.and_hms_opt(CLOSING_HOUR, 0, 0).unwrap();

            let start = if offset == 0 {
                let hour = (now.hour() + 1).max(OPENING_HOUR);
                let minute = if now.minute() > 30 { 30 } else { 0 };
                if hour >= CLOSING_HOUR {
                    return Vec::new();
                }
                day.and_hms_opt(hour, minute, 0).unwrap()
            } else {
                day.and_hms_opt(OPENING_HOUR, 0, 0).unwrap()
            };

            let mut candidates = Vec::new();
            let mut cursor = start;
            while cursor < closing {
                let time = SlotTime::from(cursor.time());
                if !booked.is_booked(&date, &time) {
                    candidates.push(SlotCandidate {
                        starts_at: cursor,
                        date,
                        time,
                    });
                }
                cursor += Duration::minutes(SLOT_INTERVAL_MINUTES);
            }

            candidates
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn labels(day: &[SlotCandidate]) -> Vec<String> {
        day.iter().map(|c| c.time.to_string()).collect()
    }

    #[test]
    fn window_is_seven_days_today_first() {
        let days = generate(&SlotMap::new(), at(2025, 3, 5, 9, 0));
        assert_eq!(days.len(), 7);
        assert_eq!(days[0][0].date.to_string(), "5_3_2025");
        assert_eq!(days[6][0].date.to_string(), "11_3_2025");
    }

    #[test]
    fn morning_day_starts_at_opening() {
        let days = generate(&SlotMap::new(), at(2025, 3, 5, 9, 0));
        let today = labels(&days[0]);

        // 10:00 through 20:30 on the half-hour grid.
        assert_eq!(today.first().map(String::as_str), Some("10:00 AM"));
        assert_eq!(today.last().map(String::as_str), Some("08:30 PM"));
        assert_eq!(today.len(), 22);
    }

    #[test]
    fn afternoon_day_starts_after_now_on_the_grid() {
        // 14:45: next hour is 15, minute past the half hour snaps to 30.
        let days = generate(&SlotMap::new(), at(2025, 3, 5, 14, 45));
        assert_eq!(labels(&days[0]).first().map(String::as_str), Some("03:30 PM"));

        // 14:10: minute at or before the half hour snaps to 00.
        let days = generate(&SlotMap::new(), at(2025, 3, 5, 14, 10));
        assert_eq!(labels(&days[0]).first().map(String::as_str), Some("03:00 PM"));

        // 10:15: hour after ten beats the opening floor.
        let days = generate(&SlotMap::new(), at(2025, 3, 5, 10, 15));
        assert_eq!(labels(&days[0]).first().map(String::as_str), Some("11:00 AM"));
    }

    #[test]
    fn late_evening_today_is_empty_not_an_error() {
        let days = generate(&SlotMap::new(), at(2025, 3, 5, 20, 30));
        assert!(days[0].is_empty());
        assert_eq!(days[1].len(), 22);

        // Near midnight the next-hour arithmetic walks past 24; still fine.
        let days = generate(&SlotMap::new(), at(2025, 3, 5, 23, 55));
        assert!(days[0].is_empty());
    }

    #[test]
    fn booked_slots_are_withheld_for_their_day_only() {
        let mut booked = SlotMap::new();
        booked.reserve("5_3_2025".parse().unwrap(), "10:00 AM".parse().unwrap());
        booked.reserve("6_3_2025".parse().unwrap(), "10:30 AM".parse().unwrap());

        let days = generate(&booked, at(2025, 3, 5, 9, 0));

        assert!(!labels(&days[0]).contains(&"10:00 AM".to_string()));
        assert!(labels(&days[0]).contains(&"10:30 AM".to_string()));
        assert_eq!(days[0].len(), 21);

        assert!(!labels(&days[1]).contains(&"10:30 AM".to_string()));
        assert!(labels(&days[1]).contains(&"10:00 AM".to_string()));

        // Other days are untouched by either reservation.
        assert_eq!(days[2].len(), 22);
    }

    #[test]
    fn every_day_is_strictly_ascending_and_conflict_free() {
        let mut booked = SlotMap::new();
        booked.reserve("7_3_2025".parse().unwrap(), "02:00 PM".parse().unwrap());
        booked.reserve("7_3_2025".parse().unwrap(), "08:30 PM".parse().unwrap());

        let days = generate(&booked, at(2025, 3, 5, 16, 40));
        assert_eq!(days.len(), 7);

        for day in &days {
            for pair in day.windows(2) {
                assert!(pair[0].starts_at < pair[1].starts_at);
            }
            for candidate in day {
                assert!(!booked.is_booked(&candidate.date, &candidate.time));
            }
        }
    }

    #[test]
    fn candidate_keys_match_the_stored_wire_form() {
        let days = generate(&SlotMap::new(), at(2025, 3, 5, 9, 0));
        let candidate = &days[0][0];

        assert_eq!(candidate.date.to_string(), "5_3_2025");
        assert_eq!(candidate.time.to_string(), "10:00 AM");
        assert_eq!(candidate.starts_at.time().hour(), 10);
    }
}
