//! Pure parsing of portal markup: picker options and the feed link inside
//! the schedule fragment. Everything here is synchronous and side-effect
//! free so it can be exercised against fixture files.

use regex::Regex;
use scraper::{Html, Selector};

/// Prefix of the picker's "choose a street" placeholder entries.
const STREET_SENTINEL: &str = "--";
/// Placeholder label of the civic-number dropdown.
const CIVIC_PLACEHOLDER: &str = "Saisir un no. civique";

/// Street names offered by the calendar page picker, deduplicated and
/// sorted. An entry counts only when its option value is usable (non-blank,
/// not the `--` placeholder); the display label is collected, and it is the
/// label the portal expects back in the street form field.
pub(crate) fn street_options(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("option").expect("static selector");
    let mut streets: Vec<String> = document
        .select(&selector)
        .filter_map(|option| {
            let value = option.value().attr("value").unwrap_or_default().trim();
            if value.is_empty() || value.starts_with(STREET_SENTINEL) {
                return None;
            }
            let label = option.text().collect::<String>().trim().to_owned();
            (!label.is_empty()).then_some(label)
        })
        .collect();
    streets.sort();
    streets.dedup();
    streets
}

/// Civic-number labels in a dropdown fragment, in source order. The portal
/// already orders them; reordering here would surprise anyone comparing the
/// list against the site.
pub(crate) fn civic_options(fragment: &str) -> Vec<String> {
    let document = Html::parse_fragment(fragment);
    let selector = Selector::parse("option").expect("static selector");
    document
        .select(&selector)
        .filter_map(|option| {
            let label = option.text().collect::<String>().trim().to_owned();
            (!label.is_empty() && label != CIVIC_PLACEHOLDER).then_some(label)
        })
        .collect()
}

/// Find the downloadable feed URL inside a schedule fragment.
///
/// The portal usually renders a `webcal://` subscription link, whose scheme
/// is swapped for `https`. Some sectors render only a direct export link; in
/// that case the URL is rebuilt from the sector code so it always points at
/// the configured origin.
pub(crate) fn feed_url(fragment: &str, base_url: &str) -> Option<String> {
    let webcal = Regex::new(r#"href="(webcal://[^"]+\.ics[^"]*)""#).expect("static pattern");
    if let Some(captures) = webcal.captures(fragment) {
        let link = captures.get(1)?.as_str();
        return Some(link.replacen("webcal://", "https://", 1));
    }
    let sector =
        Regex::new(r"/avis/collectes/calendrier\.ics\?secteurs=(\d+)").expect("static pattern");
    sector
        .captures(fragment)
        .and_then(|captures| captures.get(1))
        .map(|code| {
            format!(
                "{base_url}/avis/collectes/calendrier.ics?secteurs={}",
                code.as_str()
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALENDAR_PAGE: &str = include_str!("scrape/tests/calendar_page.html");
    const CIVIC_FRAGMENT: &str = include_str!("scrape/tests/civic_fragment.html");
    const WEBCAL_FRAGMENT: &str = include_str!("scrape/tests/schedule_fragment.html");
    const SECTOR_FRAGMENT: &str = include_str!("scrape/tests/schedule_fragment_sector.html");
    const LINKLESS_FRAGMENT: &str =
        include_str!("scrape/tests/schedule_fragment_without_link.html");

    #[test]
    fn street_options_filter_placeholders_then_sort_and_dedupe() {
        let streets = street_options(CALENDAR_PAGE);
        assert_eq!(
            streets,
            vec![
                "Avenue Principale".to_owned(),
                "Boulevard Québec".to_owned(),
                "Rue Perreault Est".to_owned(),
            ]
        );
    }

    #[test]
    fn civic_options_keep_source_order_and_drop_the_placeholder() {
        let numbers = civic_options(CIVIC_FRAGMENT);
        assert_eq!(
            numbers,
            vec![
                "101".to_owned(),
                "105".to_owned(),
                "103".to_owned(),
                "103A".to_owned(),
            ]
        );
    }

    #[test]
    fn civic_options_of_an_empty_fragment_are_empty() {
        assert!(civic_options("").is_empty());
    }

    #[test]
    fn webcal_link_becomes_https() {
        let url = feed_url(WEBCAL_FRAGMENT, "https://citoyen.rouyn-noranda.ca");
        assert_eq!(
            url.as_deref(),
            Some("https://citoyen.rouyn-noranda.ca/avis/collectes/calendrier.ics?secteurs=3")
        );
    }

    #[test]
    fn sector_link_is_rebuilt_on_the_configured_origin() {
        let url = feed_url(SECTOR_FRAGMENT, "http://127.0.0.1:8080");
        assert_eq!(
            url.as_deref(),
            Some("http://127.0.0.1:8080/avis/collectes/calendrier.ics?secteurs=7")
        );
    }

    #[test]
    fn webcal_link_wins_over_a_sector_link() {
        let combined = format!("{SECTOR_FRAGMENT}\n{WEBCAL_FRAGMENT}");
        let url = feed_url(&combined, "https://citoyen.rouyn-noranda.ca");
        assert_eq!(
            url.as_deref(),
            Some("https://citoyen.rouyn-noranda.ca/avis/collectes/calendrier.ics?secteurs=3")
        );
    }

    #[test]
    fn fragment_without_any_link_yields_none() {
        assert!(feed_url(LINKLESS_FRAGMENT, "https://citoyen.rouyn-noranda.ca").is_none());
    }
}
