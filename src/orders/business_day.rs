// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cambio

//! Business-day (inventory date) assignment.
//!
//! Payouts are batched per business day with a cutover in local business
//! time (fixed UTC-05:00 in production):
//!
//! - Sunday always rolls to Monday.
//! - Monday through Thursday roll to the next calendar day at 17:00.
//! - Friday rolls to Saturday at 17:00.
//! - Saturday rolls to Monday at 15:00 (Sunday is skipped).

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveTime, Weekday};

const WEEKDAY_CUTOFF: NaiveTime = match NaiveTime::from_hms_opt(17, 0, 0) {
    Some(t) => t,
    None => unreachable!(),
};

const SATURDAY_CUTOFF: NaiveTime = match NaiveTime::from_hms_opt(15, 0, 0) {
    Some(t) => t,
    None => unreachable!(),
};

/// The inventory date an order created at `local` time belongs to.
///
/// Pure function of the timestamp; the caller supplies the business-timezone
/// local time.
pub fn inventory_date(local: DateTime<FixedOffset>) -> NaiveDate {
    let date = local.date_naive();
    let time = local.time();

    let days_forward = match date.weekday() {
        Weekday::Sun => 1,
        Weekday::Mon | Weekday::Tue | Weekday::Wed | Weekday::Thu | Weekday::Fri => {
            if time >= WEEKDAY_CUTOFF {
                1
            } else {
                0
            }
        }
        Weekday::Sat => {
            if time >= SATURDAY_CUTOFF {
                2
            } else {
                0
            }
        }
    };

    date + Days::new(days_forward)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bogota() -> FixedOffset {
        FixedOffset::west_opt(5 * 3600).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        bogota().with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // 2026-08-21 is a Friday, 22 Saturday, 23 Sunday, 24 Monday.

    #[test]
    fn friday_before_cutoff_stays_friday() {
        assert_eq!(inventory_date(at(2026, 8, 21, 16, 59)), date(2026, 8, 21));
    }

    #[test]
    fn friday_at_cutoff_rolls_to_saturday() {
        assert_eq!(inventory_date(at(2026, 8, 21, 17, 0)), date(2026, 8, 22));
    }

    #[test]
    fn saturday_before_cutoff_stays_saturday() {
        assert_eq!(inventory_date(at(2026, 8, 22, 14, 59)), date(2026, 8, 22));
    }

    #[test]
    fn saturday_at_cutoff_skips_sunday() {
        assert_eq!(inventory_date(at(2026, 8, 22, 15, 0)), date(2026, 8, 24));
    }

    #[test]
    fn sunday_always_rolls_to_monday() {
        assert_eq!(inventory_date(at(2026, 8, 23, 0, 0)), date(2026, 8, 24));
        assert_eq!(inventory_date(at(2026, 8, 23, 12, 30)), date(2026, 8, 24));
        assert_eq!(inventory_date(at(2026, 8, 23, 23, 59)), date(2026, 8, 24));
    }

    #[test]
    fn weekday_cutoff_rolls_to_next_day() {
        // Monday
        assert_eq!(inventory_date(at(2026, 8, 24, 16, 59)), date(2026, 8, 24));
        assert_eq!(inventory_date(at(2026, 8, 24, 17, 0)), date(2026, 8, 25));
        // Thursday rolls to Friday
        assert_eq!(inventory_date(at(2026, 8, 20, 17, 0)), date(2026, 8, 21));
        assert_eq!(inventory_date(at(2026, 8, 20, 9, 0)), date(2026, 8, 20));
    }
}
