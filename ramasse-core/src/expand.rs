//! Turns raw iCalendar feed bytes into concrete pickup occurrences.
//!
//! Every event is expanded against the horizon window: recurring events
//! through their `RRULE` (plus `RDATE` additions and `EXDATE` removals),
//! plain events through their `DTSTART` alone. All resulting timestamps are
//! normalized into the civic timezone.

use std::collections::HashSet;
use std::io::{BufReader, Cursor};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use ical::{IcalParser, parser::ical::component::IcalEvent, property::Property};
use rrule::{RRule, Tz as RRuleTz, Unvalidated};

use crate::model::{CIVIC_TZ, Horizon, Occurrence, civic_midnight, localize_in, localize_naive};
use crate::ports::PortError;

/// Cap on instances generated per rule; a municipal feed stays far below it.
const EXPANSION_LIMIT: u16 = 1000;

/// Expand a feed into the occurrences whose dates fall inside `horizon`.
///
/// The output is unordered; [`crate::model::ScheduleSnapshot::assemble`]
/// sorts and indexes it.
///
/// # Errors
///
/// [`PortError::Parse`] when the bytes are not an iCalendar document or an
/// event carries an unreadable `DTSTART` or `RRULE`.
pub fn expand_feed(bytes: &[u8], horizon: &Horizon) -> Result<Vec<Occurrence>, PortError> {
    let parser = IcalParser::new(BufReader::new(Cursor::new(bytes)));
    let mut occurrences = Vec::new();
    let mut calendars = 0_usize;
    for calendar in parser {
        let calendar = calendar.map_err(|err| PortError::Parse(err.to_string()))?;
        calendars += 1;
        for event in &calendar.events {
            expand_event(event, horizon, &mut occurrences)?;
        }
    }
    if calendars == 0 && !bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(PortError::Parse("no calendar component in feed".to_owned()));
    }
    tracing::debug!(calendars, count = occurrences.len(), "expanded feed");
    Ok(occurrences)
}

fn expand_event(
    event: &IcalEvent,
    horizon: &Horizon,
    out: &mut Vec<Occurrence>,
) -> Result<(), PortError> {
    let Some(start_property) = property(event, "DTSTART") else {
        tracing::debug!("skipping event without DTSTART");
        return Ok(());
    };
    let Some(raw_start) = start_property.value.as_deref() else {
        tracing::debug!("skipping event with an empty DTSTART");
        return Ok(());
    };
    let Some(dtstart) = parse_stamp(raw_start, param_tz(start_property)) else {
        return Err(PortError::Parse(format!("unreadable DTSTART `{raw_start}`")));
    };

    let mut starts = match property_value(event, "RRULE") {
        Some(rule) => recurrence_starts(rule, dtstart, horizon)?,
        None => vec![dtstart],
    };
    starts.extend(stamp_list(event, "RDATE"));

    // Exclusions match on the civic-local day, the granularity the portal
    // actually publishes.
    let excluded: HashSet<NaiveDate> = stamp_list(event, "EXDATE")
        .iter()
        .map(|stamp| stamp.date_naive())
        .collect();
    starts.retain(|start| {
        horizon.contains(start.date_naive()) && !excluded.contains(&start.date_naive())
    });
    starts.sort_unstable();
    starts.dedup();

    let title = property_value(event, "SUMMARY")
        .unwrap_or_default()
        .trim()
        .to_owned();
    let description = property_value(event, "DESCRIPTION")
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned);

    for start in starts {
        out.push(Occurrence {
            date: start,
            title: title.clone(),
            description: description.clone(),
        });
    }
    Ok(())
}

/// Materialize a recurrence rule anchored at `dtstart`.
///
/// Iteration runs one day wide of the horizon and the caller filters on
/// civic-local dates afterwards, so boundary inclusion never depends on the
/// iterator's open or closed endpoint conventions.
fn recurrence_starts(
    rule: &str,
    dtstart: DateTime<Tz>,
    horizon: &Horizon,
) -> Result<Vec<DateTime<Tz>>, PortError> {
    let parsed = rule
        .parse::<RRule<Unvalidated>>()
        .map_err(|err| PortError::Parse(format!("unreadable RRULE `{rule}`: {err}")))?;
    let set = parsed
        .build(dtstart.with_timezone(&RRuleTz::Tz(CIVIC_TZ)))
        .map_err(|err| PortError::Parse(format!("invalid RRULE `{rule}`: {err}")))?;

    let lower = civic_midnight(horizon.start - Duration::days(1));
    let upper = civic_midnight(horizon.end + Duration::days(1));
    let result = set
        .after(lower.with_timezone(&RRuleTz::Tz(CIVIC_TZ)))
        .before(upper.with_timezone(&RRuleTz::Tz(CIVIC_TZ)))
        .all(EXPANSION_LIMIT);
    if result.limited {
        tracing::warn!(
            rule,
            limit = EXPANSION_LIMIT,
            "recurrence expansion truncated at the instance cap"
        );
    }
    Ok(result
        .dates
        .into_iter()
        .map(|instance| instance.with_timezone(&CIVIC_TZ))
        .collect())
}

/// Collect every timestamp carried by properties named `name` (`RDATE`,
/// `EXDATE`), honoring comma-separated values and repeated properties.
/// Unreadable entries are logged and skipped rather than failing the feed.
fn stamp_list(event: &IcalEvent, name: &str) -> Vec<DateTime<Tz>> {
    let mut stamps = Vec::new();
    for property in event
        .properties
        .iter()
        .filter(|property| property.name == name)
    {
        let zone = param_tz(property);
        let Some(value) = property.value.as_deref() else {
            continue;
        };
        for piece in value.split(',') {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            match parse_stamp(piece, zone) {
                Some(stamp) => stamps.push(stamp),
                None => tracing::warn!(name, piece, "skipping unreadable date list entry"),
            }
        }
    }
    stamps
}

/// Parse one iCalendar date or date-time value into a civic timestamp.
///
/// Handles the three shapes feeds publish: bare dates (`20250106`), floating
/// local times (`20250106T070000`, optionally scoped by a `TZID` parameter),
/// and UTC times (`20250106T120000Z`). Bare dates sit at civic midnight.
fn parse_stamp(raw: &str, zone: Option<Tz>) -> Option<DateTime<Tz>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y%m%d") {
        return Some(civic_midnight(date));
    }
    if let Some(utc_part) = raw.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc_part, "%Y%m%dT%H%M%S").ok()?;
        return Some(Utc.from_utc_datetime(&naive).with_timezone(&CIVIC_TZ));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%S").ok()?;
    Some(match zone {
        Some(tz) => localize_in(tz, naive).with_timezone(&CIVIC_TZ),
        None => localize_naive(naive),
    })
}

fn property<'event>(event: &'event IcalEvent, name: &str) -> Option<&'event Property> {
    event
        .properties
        .iter()
        .find(|property| property.name == name)
}

fn property_value<'event>(event: &'event IcalEvent, name: &str) -> Option<&'event str> {
    property(event, name).and_then(|property| property.value.as_deref())
}

fn param_tz(property: &Property) -> Option<Tz> {
    property
        .params
        .as_ref()?
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("TZID"))
        .and_then(|(_, values)| values.first())
        .and_then(|tzid| tzid.parse::<Tz>().ok())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;
    use crate::model::Category;

    const WEEKLY: &str = include_str!("expand/tests/weekly.ics");
    const BOUNDARY: &str = include_str!("expand/tests/boundary.ics");
    const EXCEPTIONS: &str = include_str!("expand/tests/exceptions.ics");
    const TIMED: &str = include_str!("expand/tests/timed.ics");
    const TRUNCATED: &str = include_str!("expand/tests/truncated.ics");

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn horizon_from(year: i32, month: u32, day: u32) -> Horizon {
        Horizon::starting(date(year, month, day))
    }

    #[test]
    fn weekly_rule_fills_the_horizon() {
        let occurrences = expand_feed(WEEKLY.as_bytes(), &horizon_from(2025, 1, 1)).unwrap();

        assert_eq!(occurrences.len(), 52);
        let first = occurrences.first().unwrap();
        assert_eq!(first.date.date_naive(), date(2025, 1, 6));
        assert_eq!(first.date.time(), NaiveTime::MIN);
        let last = occurrences.last().unwrap();
        assert_eq!(last.date.date_naive(), date(2025, 12, 29));

        assert!(occurrences
            .iter()
            .all(|occurrence| Category::classify(&occurrence.title) == Some(Category::Waste)));
        assert!(occurrences
            .iter()
            .zip(occurrences.iter().skip(1))
            .all(|(earlier, later)| {
                later.date.date_naive() - earlier.date.date_naive() == Duration::days(7)
            }));
    }

    #[test]
    fn horizon_keeps_day_365_and_drops_day_366() {
        // Window starts 2025-01-01, so 2026-01-01 is the last date in.
        let occurrences = expand_feed(BOUNDARY.as_bytes(), &horizon_from(2025, 1, 1)).unwrap();
        assert_eq!(occurrences.len(), 1);
        let only = occurrences.first().unwrap();
        assert_eq!(only.date.date_naive(), date(2026, 1, 1));
    }

    #[test]
    fn exdates_remove_and_rdates_add_instances() {
        let occurrences = expand_feed(EXCEPTIONS.as_bytes(), &horizon_from(2025, 1, 1)).unwrap();

        let compost: Vec<NaiveDate> = occurrences
            .iter()
            .filter(|occurrence| occurrence.title.contains("Compost"))
            .map(|occurrence| occurrence.date.date_naive())
            .collect();
        // COUNT=4 generates Jan 6/13/20/27; the EXDATE list removes 13 and 20,
        // and the duplicate RDATE on Jan 6 collapses.
        assert_eq!(compost, vec![date(2025, 1, 6), date(2025, 1, 27)]);

        let bulky: Vec<NaiveDate> = occurrences
            .iter()
            .filter(|occurrence| occurrence.title.contains("Encombrants"))
            .map(|occurrence| occurrence.date.date_naive())
            .collect();
        assert_eq!(bulky, vec![date(2025, 6, 2), date(2025, 9, 22)]);
    }

    #[test]
    fn timed_events_normalize_into_the_civic_zone() {
        let occurrences = expand_feed(TIMED.as_bytes(), &horizon_from(2025, 7, 1)).unwrap();
        let local_time = |title: &str| {
            occurrences
                .iter()
                .find(|occurrence| occurrence.title == title)
                .map(|occurrence| occurrence.date.naive_local())
        };

        // Floating local time stays as written.
        assert_eq!(
            local_time("Collecte spéciale"),
            date(2025, 7, 4).and_hms_opt(10, 30, 0)
        );
        // 04:00 UTC is midnight in Toronto during DST.
        assert_eq!(
            local_time("Collecte UTC"),
            date(2025, 7, 4).and_hms_opt(0, 0, 0)
        );
        // 21:00 in Vancouver is already the next civic day.
        assert_eq!(
            local_time("Collecte côte ouest"),
            date(2025, 7, 5).and_hms_opt(0, 0, 0)
        );
    }

    #[test]
    fn empty_feed_expands_to_nothing() {
        assert!(expand_feed(b"", &horizon_from(2025, 1, 1)).unwrap().is_empty());
        assert!(expand_feed(b"  \n", &horizon_from(2025, 1, 1))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn garbage_bytes_are_a_parse_error() {
        let err = expand_feed(b"<html>page d'erreur</html>", &horizon_from(2025, 1, 1))
            .unwrap_err();
        assert!(matches!(err, PortError::Parse(_)));
    }

    #[test]
    fn truncated_calendar_is_a_parse_error() {
        let err = expand_feed(TRUNCATED.as_bytes(), &horizon_from(2025, 1, 1)).unwrap_err();
        assert!(matches!(err, PortError::Parse(_)));
    }

    #[test]
    fn unreadable_dtstart_is_a_parse_error() {
        let feed = "BEGIN:VCALENDAR\nVERSION:2.0\nBEGIN:VEVENT\nUID:x\nDTSTART:demain\nSUMMARY:Compost\nEND:VEVENT\nEND:VCALENDAR\n";
        let err = expand_feed(feed.as_bytes(), &horizon_from(2025, 1, 1)).unwrap_err();
        assert!(matches!(err, PortError::Parse(_)));
    }
}
