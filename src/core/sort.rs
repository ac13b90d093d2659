use crate::core::window::Calendar;
use crate::domain::model::ShipmentRecord;
use chrono::{DateTime, TimeDelta, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EtaTier {
    Upcoming,
    Overdue,
    Missing,
}

fn sort_key(eta: Option<DateTime<Utc>>, reference: DateTime<Utc>) -> (EtaTier, TimeDelta) {
    match eta {
        Some(ts) if ts >= reference => (EtaTier::Upcoming, ts - reference),
        Some(ts) => (EtaTier::Overdue, reference - ts),
        None => (EtaTier::Missing, TimeDelta::zero()),
    }
}

/// Orders records soonest-first relative to `reference`.
///
/// Upcoming ETAs (at or after `reference`) come first, then overdue ones, then
/// records without an ETA. Within a tier the ETA closest to `reference` wins.
/// The sort is stable, so ties keep their input order. `calendar` only
/// resolves ETAs written without an offset.
pub fn sort_by_eta_soonest_first<'a, I>(
    records: I,
    reference: DateTime<Utc>,
    calendar: &Calendar,
) -> Vec<&'a ShipmentRecord>
where
    I: IntoIterator<Item = &'a ShipmentRecord>,
{
    let offset = calendar.offset();
    let mut sorted: Vec<&ShipmentRecord> = records.into_iter().collect();
    sorted.sort_by_cached_key(|record| sort_key(record.eta(offset), reference));
    sorted
}

/// 列表預設畫面：只保留今天（本地時區）之後到港的記錄
pub fn upcoming<'a>(
    records: &'a [ShipmentRecord],
    reference: DateTime<Utc>,
    calendar: &Calendar,
) -> Vec<&'a ShipmentRecord> {
    let today = calendar.start_of_day(reference);
    sort_by_eta_soonest_first(
        records
            .iter()
            .filter(|record| record.eta(calendar.offset()).is_some_and(|eta| eta >= today)),
        reference,
        calendar,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone, Weekday};
    use serde_json::json;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap()
    }

    fn shipment(title: &str, eta: Option<DateTime<Utc>>) -> ShipmentRecord {
        serde_json::from_value(json!({
            "title": title,
            "new_eta": eta.map(|ts| ts.to_rfc3339()),
        }))
        .unwrap()
    }

    fn titles(records: &[&ShipmentRecord]) -> Vec<String> {
        records
            .iter()
            .map(|r| r.idtra().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_upcoming_before_overdue_before_missing() {
        let records = vec![
            shipment("missing", None),
            shipment("overdue", Some(t0() - TimeDelta::days(5))),
            shipment("soon", Some(t0() + TimeDelta::hours(2))),
        ];

        let sorted = sort_by_eta_soonest_first(&records, t0(), &Calendar::default());
        assert_eq!(titles(&sorted), vec!["soon", "overdue", "missing"]);
    }

    #[test]
    fn test_nearest_first_within_each_tier() {
        let records = vec![
            shipment("far-past", Some(t0() - TimeDelta::days(30))),
            shipment("far-future", Some(t0() + TimeDelta::days(30))),
            shipment("near-past", Some(t0() - TimeDelta::hours(1))),
            shipment("now", Some(t0())),
            shipment("near-future", Some(t0() + TimeDelta::hours(1))),
        ];

        let sorted = sort_by_eta_soonest_first(&records, t0(), &Calendar::default());
        assert_eq!(
            titles(&sorted),
            vec!["now", "near-future", "far-future", "near-past", "far-past"]
        );
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let same = Some(t0() + TimeDelta::days(1));
        let records = vec![
            shipment("first", same),
            shipment("no-eta-1", None),
            shipment("second", same),
            shipment("no-eta-2", None),
        ];

        let sorted = sort_by_eta_soonest_first(&records, t0(), &Calendar::default());
        assert_eq!(titles(&sorted), vec!["first", "second", "no-eta-1", "no-eta-2"]);
    }

    #[test]
    fn test_sort_is_idempotent() {
        let records = vec![
            shipment("a", Some(t0() - TimeDelta::days(2))),
            shipment("b", None),
            shipment("c", Some(t0() + TimeDelta::days(3))),
            shipment("d", Some(t0() + TimeDelta::days(3))),
            shipment("e", Some(t0() - TimeDelta::minutes(1))),
        ];

        let once = sort_by_eta_soonest_first(&records, t0(), &Calendar::default());
        let twice = sort_by_eta_soonest_first(once.iter().copied(), t0(), &Calendar::default());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_upcoming_keeps_today_and_later() {
        let calendar = Calendar::new(FixedOffset::west_opt(6 * 3600).unwrap(), Weekday::Sun);
        // 本地 06:00，今天從 06:00 UTC 開始
        let records = vec![
            shipment("earlier-today", Some(t0() - TimeDelta::hours(5))),
            shipment("yesterday", Some(t0() - TimeDelta::hours(7))),
            shipment("tomorrow", Some(t0() + TimeDelta::days(1))),
            shipment("missing", None),
        ];

        let listed = upcoming(&records, t0(), &calendar);
        assert_eq!(titles(&listed), vec!["tomorrow", "earlier-today"]);
    }
}
