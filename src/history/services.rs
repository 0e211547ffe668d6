use time::macros::format_description;
use time::{Duration, OffsetDateTime, Time, UtcOffset, Weekday};

use super::dto::DaySummary;
use super::repo::sum_protein_since;
use crate::nutrition::FoodLogEntry;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;
pub const DEFAULT_RECENT_LIMIT: usize = 20;

fn to_millis(t: OffsetDateTime) -> i64 {
    (t.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Epoch millis of local midnight for the day containing `now`.
pub fn start_of_day_ms(now: OffsetDateTime, offset: UtcOffset) -> i64 {
    to_millis(now.to_offset(offset).replace_time(Time::MIDNIGHT))
}

/// Abbreviated French weekday, as shown in the history chart.
pub fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Monday => "lun.",
        Weekday::Tuesday => "mar.",
        Weekday::Wednesday => "mer.",
        Weekday::Thursday => "jeu.",
        Weekday::Friday => "ven.",
        Weekday::Saturday => "sam.",
        Weekday::Sunday => "dim.",
    }
}

pub fn total_protein(entries: &[FoodLogEntry]) -> f64 {
    entries.iter().map(|e| e.protein).sum()
}

pub fn daily_protein(entries: &[FoodLogEntry], now: OffsetDateTime, offset: UtcOffset) -> f64 {
    sum_protein_since(entries, start_of_day_ms(now, offset))
}

/// Seven local days ending today, oldest first.
pub fn weekly_breakdown(
    entries: &[FoodLogEntry],
    now: OffsetDateTime,
    offset: UtcOffset,
) -> Vec<DaySummary> {
    let today = now.to_offset(offset).replace_time(Time::MIDNIGHT);
    let date_fmt = format_description!("[year]-[month]-[day]");

    (0..7i64)
        .rev()
        .map(|days_back| {
            let day = today - Duration::days(days_back);
            let from = to_millis(day);
            let to = from + DAY_MS;
            let total = entries
                .iter()
                .filter(|e| e.timestamp >= from && e.timestamp < to)
                .map(|e| e.protein)
                .sum();
            DaySummary {
                date: day.date().format(&date_fmt).unwrap_or_default(),
                label: weekday_label(day.weekday()).to_owned(),
                total,
                is_today: days_back == 0,
            }
        })
        .collect()
}

/// Newest first.
pub fn recent(entries: &[FoodLogEntry], limit: usize) -> Vec<FoodLogEntry> {
    entries.iter().rev().take(limit).cloned().collect()
}

#[cfg(test)]
mod rollup_tests {
    use super::*;
    use crate::nutrition::LogMethod;
    use time::macros::datetime;
    use uuid::Uuid;

    fn entry_at(ts: OffsetDateTime, protein: f64) -> FoodLogEntry {
        FoodLogEntry {
            id: Uuid::new_v4(),
            user_id_hash: "h".into(),
            timestamp: to_millis(ts),
            food_name: "meal".into(),
            protein,
            weight: 0.0,
            method: LogMethod::QuickLog,
        }
    }

    #[test]
    fn start_of_day_respects_offset() {
        let now = datetime!(2026-10-18 01:30 UTC);
        assert_eq!(start_of_day_ms(now, UtcOffset::UTC), to_millis(datetime!(2026-10-18 00:00 UTC)));

        // 01:30 UTC is still the 17th at UTC-5.
        let west = UtcOffset::from_hms(-5, 0, 0).unwrap();
        assert_eq!(start_of_day_ms(now, west), to_millis(datetime!(2026-10-17 05:00 UTC)));
    }

    #[test]
    fn daily_protein_counts_only_today() {
        let now = datetime!(2026-10-18 20:00 UTC);
        let entries = vec![
            entry_at(datetime!(2026-10-17 23:59 UTC), 40.0),
            entry_at(datetime!(2026-10-18 08:00 UTC), 30.0),
            entry_at(datetime!(2026-10-18 12:00 UTC), 18.0),
            entry_at(datetime!(2026-10-18 19:00 UTC), 25.0),
        ];
        assert_eq!(daily_protein(&entries, now, UtcOffset::UTC), 73.0);
        assert_eq!(total_protein(&entries), 113.0);
    }

    #[test]
    fn weekly_breakdown_buckets_by_local_day() {
        let now = datetime!(2026-10-18 10:00 UTC);
        let entries = vec![
            entry_at(datetime!(2026-10-11 12:00 UTC), 99.0), // before the window
            entry_at(datetime!(2026-10-12 00:00 UTC), 10.0),
            entry_at(datetime!(2026-10-15 09:00 UTC), 20.0),
            entry_at(datetime!(2026-10-15 21:00 UTC), 5.0),
            entry_at(datetime!(2026-10-18 09:00 UTC), 30.0),
        ];
        let week = weekly_breakdown(&entries, now, UtcOffset::UTC);
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].date, "2026-10-12");
        assert_eq!(week[0].total, 10.0);
        assert_eq!(week[3].date, "2026-10-15");
        assert_eq!(week[3].total, 25.0);
        assert_eq!(week[6].date, "2026-10-18");
        assert_eq!(week[6].label, "dim.");
        assert_eq!(week[0].label, "lun.");
        assert!(week[6].is_today);
        assert!(week[..6].iter().all(|d| !d.is_today));
        assert_eq!(week.iter().map(|d| d.total).sum::<f64>(), 65.0);
    }

    #[test]
    fn recent_is_newest_first_and_limited() {
        let base = datetime!(2026-10-18 10:00 UTC);
        let entries: Vec<_> = (0..5)
            .map(|i| entry_at(base + Duration::minutes(i), i as f64))
            .collect();
        let latest = recent(&entries, 3);
        assert_eq!(latest.iter().map(|e| e.protein).collect::<Vec<_>>(), vec![4.0, 3.0, 2.0]);
        assert_eq!(recent(&entries, 50).len(), 5);
    }
}
