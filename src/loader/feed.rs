//! Feed document formats.
//!
//! Two shapes are accepted:
//! - a seed list: `[{"country_code", "country_name", "polygon_data"}, ...]`
//!   where `polygon_data` is a geometry object or a JSON string holding one
//! - a GeoJSON FeatureCollection (or single Feature) with Natural Earth
//!   style properties

use anyhow::{bail, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::CountryCode;

/// Property names tried, in order, for the country code of a feature
const CODE_PROPERTIES: &[&str] = &["ISO_A3", "ADM0_A3", "ISO3166-1-Alpha-3", "iso_a3"];

/// Property names tried, in order, for the display name of a feature
const NAME_PROPERTIES: &[&str] = &["NAME", "ADMIN", "name", "admin"];

/// One (code, name, geometry) triple, geometry still undecoded
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub country_code: String,
    pub country_name: String,
    pub geometry: Value,
}

/// Entries extracted from one feed document
#[derive(Debug, Default)]
pub struct Feed {
    pub entries: Vec<FeedEntry>,
    /// Items dropped because they could not be attributed to a country
    pub skipped: usize,
}

#[derive(Deserialize)]
struct SeedEntry {
    country_code: String,
    country_name: String,
    polygon_data: Value,
}

/// Extract feed entries from a decoded document
pub fn parse_feed(doc: Value) -> Result<Feed> {
    if let Value::Array(items) = doc {
        return Ok(parse_seed_list(items));
    }

    let kind = doc.get("type").and_then(Value::as_str).map(str::to_owned);
    match kind.as_deref() {
        Some("FeatureCollection") => {
            let features = match doc {
                Value::Object(mut map) => map.remove("features"),
                _ => None,
            };
            match features {
                Some(Value::Array(features)) => Ok(parse_features(features)),
                _ => bail!("FeatureCollection has no features array"),
            }
        }
        Some("Feature") => Ok(parse_features(vec![doc])),
        other => bail!(
            "unrecognized feed document (type {:?}): expected a seed list or a GeoJSON FeatureCollection",
            other
        ),
    }
}

fn parse_seed_list(items: Vec<Value>) -> Feed {
    let mut feed = Feed::default();
    for (i, item) in items.into_iter().enumerate() {
        match SeedEntry::deserialize(&item) {
            Ok(seed) => feed.entries.push(FeedEntry {
                country_code: seed.country_code,
                country_name: seed.country_name,
                geometry: decode_polygon_data(seed.polygon_data),
            }),
            Err(e) => {
                warn!("Skipping seed entry {}: {}", i, e);
                feed.skipped += 1;
            }
        }
    }
    feed
}

/// Stored geometry is often a JSON string rather than an object. Strings
/// that do not decode are passed through so geometry parsing reports them.
pub fn decode_polygon_data(data: Value) -> Value {
    match data {
        Value::String(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        other => other,
    }
}

fn parse_features(features: Vec<Value>) -> Feed {
    let mut feed = Feed::default();
    for feature in features {
        let properties = feature.get("properties");
        // Natural Earth marks missing ISO codes with "-99", so fall through
        // to the next property until one parses
        let code = property_values(properties, CODE_PROPERTIES).find_map(CountryCode::parse);
        let name = property_values(properties, NAME_PROPERTIES).next();

        let (Some(code), Some(name)) = (code, name) else {
            debug!("Skipping feature without a 3-letter code and a name");
            feed.skipped += 1;
            continue;
        };

        let name = name.to_string();
        let geometry = feature.get("geometry").cloned().unwrap_or(Value::Null);
        feed.entries.push(FeedEntry {
            country_code: code.to_string(),
            country_name: name,
            geometry,
        });
    }
    feed
}

fn property_values<'a>(
    properties: Option<&'a Value>,
    keys: &'a [&'a str],
) -> impl Iterator<Item = &'a str> + 'a {
    keys.iter()
        .filter_map(move |k| properties?.get(*k)?.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
