use std::sync::Arc;

use scraper::{Html, Selector};
use tokio::task::spawn_blocking;

use crate::record::Record;
use crate::{Error, Result};

/// The form wraps every generated field in one of these containers.
const FIELD_CONTAINER_SELECTOR: &str = "div.row.small-collapse";

/// The form surfaces the state registration under a short code; it is
/// persisted under its full name.
const STATE_REGISTRATION_SHORT: &str = "ie";
const STATE_REGISTRATION_FULL: &str = "inscricao_estadual";

/// Scrapes a markup payload into a [`Record`].
///
/// Parsing is pure CPU work and `scraper`'s DOM is not `Send`, so the whole
/// extraction runs on the blocking pool.
pub async fn parse_markup(html: Arc<String>) -> Result<Record> {
    spawn_blocking(move || scrape_fields(&html)).await?
}

/// Extracts field containers from the markup.
///
/// Each container contributes the `id`/`value` attributes of its first
/// `<input>`. Containers missing the input or either attribute are skipped,
/// so unexpected markup degrades toward an emptier record instead of failing.
fn scrape_fields(html: &str) -> Result<Record> {
    let doc = Html::parse_document(html);

    let container_selector = create_selector(FIELD_CONTAINER_SELECTOR)?;
    let input_selector = create_selector("input")?;

    let mut record = Record::new();
    for container in doc.select(&container_selector) {
        let Some(input) = container.select(&input_selector).next() else {
            continue;
        };
        if let (Some(id), Some(value)) = (input.value().attr("id"), input.value().attr("value")) {
            record.insert(field_name(id), value.to_string());
        }
    }
    Ok(record)
}

/// Normalizes a scraped field identifier: lower-case, spaces to underscores,
/// and the one known short-code rename.
fn field_name(raw: &str) -> String {
    let normalized = raw.to_lowercase().replace(' ', "_");
    if normalized == STATE_REGISTRATION_SHORT {
        STATE_REGISTRATION_FULL.to_string()
    } else {
        normalized
    }
}

#[inline]
fn create_selector(sel_str: &str) -> Result<Selector> {
    Selector::parse(sel_str).map_err(|_| Error::ParseInvalidSelector(sel_str.into()))
}
