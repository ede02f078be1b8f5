//! Helpers to turn page URIs and WADO manifests into lists of data URLs.
//!
//! A viewer page is typically opened as `index.html?input=<encoded uri>`. The
//! `input` URI may repeat one query key to address several files, e.g.
//! `wado?studyUID=1&objectUID=a&objectUID=b`, which expands into one URL per
//! value.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Query parameter selecting the repeat key replace mode.
pub const REPLACE_MODE_KEY: &str = "replaceMode";

/// Query parameter holding the data URI.
pub const INPUT_KEY: &str = "input";

#[derive(Debug, thiserror::Error)]
pub enum UriError {
    #[error("Invalid manifest: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Manifest is missing the '{0}' attribute")]
    MissingAttribute(&'static str),

    #[error("Manifest has no '{0}' element")]
    MissingElement(&'static str),
}

/// Value of a query key in a [`SplitUri`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    /// Key given once. `None` when it had no `=value`.
    Single(Option<String>),
    /// Key repeated; value-less repeats are `None`.
    List(Vec<Option<String>>),
}

/// A URI split into base and raw (not decoded) query pairs, in key order.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitUri {
    pub base: String,
    pub query: Vec<(String, QueryValue)>,
}

impl SplitUri {
    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Split a URI at its first `?`. Anything after `#` is dropped.
///
/// Returns `None` for URIs without a query.
pub fn split_uri(uri: &str) -> Option<SplitUri> {
    let (base, query) = uri.split_once('?')?;
    let query = query.split('#').next().unwrap_or_default();

    let mut pairs: Vec<(String, QueryValue)> = Vec::new();
    for part in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = match part.split_once('=') {
            Some((key, value)) => (key, Some(value.to_string())),
            None => (part, None),
        };
        match pairs.iter_mut().find(|(k, _)| k == key) {
            Some((_, QueryValue::List(values))) => values.push(value),
            Some((_, existing)) => {
                let first = match existing {
                    QueryValue::Single(first) => first.take(),
                    QueryValue::List(_) => None,
                };
                *existing = QueryValue::List(vec![first, value]);
            }
            None => pairs.push((key.to_string(), QueryValue::Single(value))),
        }
    }

    Some(SplitUri {
        base: base.to_string(),
        query: pairs,
    })
}

/// Decoded query parameters of a URI, in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// First value of a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Percent-decoded query parameters of a URI; `None` without a query.
pub fn get_uri_query(uri: &str) -> Option<QueryParams> {
    let (_, query) = uri.split_once('?')?;
    let query = query.split('#').next().unwrap_or_default();
    Some(QueryParams(
        url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect(),
    ))
}

/// Expand a URI with a repeated query key into one URI per value.
///
/// Only the first repeated key is expanded. `replace_mode` `"void"` drops the
/// `key=` prefix in front of each value; any other mode keeps it. URIs
/// without a repeated key are returned unchanged.
pub fn decode_key_value_uri(uri: &str, replace_mode: Option<&str>) -> Vec<String> {
    let keep_key = replace_mode.is_none_or(|mode| mode != "void");

    let Some(split) = split_uri(uri) else {
        return vec![uri.to_string()];
    };
    let Some((repeat_key, values)) = split.query.iter().find_map(|(key, value)| match value {
        QueryValue::List(values) => Some((key.as_str(), values)),
        QueryValue::Single(_) => None,
    }) else {
        return vec![uri.to_string()];
    };

    let mut base = split.base.clone();
    // root/path/to/?file=0.jpg&file=1.jpg keeps the path as is
    if !base.is_empty() && repeat_key != "file" {
        base.push('?');
    }
    let others: Vec<String> = split
        .query
        .iter()
        .filter(|(key, _)| key != repeat_key)
        .filter_map(|(key, value)| match value {
            QueryValue::Single(Some(value)) => Some(format!("{}={}", key, value)),
            _ => None,
        })
        .collect();
    base.push_str(&others.join("&"));

    values
        .iter()
        .flatten()
        .map(|value| {
            let mut url = base.clone();
            if !others.is_empty() {
                url.push('&');
            }
            if keep_key {
                url.push_str(repeat_key);
                url.push('=');
            }
            url.push_str(value);
            url
        })
        .collect()
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>, UriError> {
    match element
        .try_get_attribute(name)
        .map_err(quick_xml::Error::from)?
    {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// Read a WADO XML manifest into WADO links.
///
/// Only the first study and its first series are read, up to `max_slices`
/// instances.
pub fn decode_manifest(xml: &str, max_slices: usize) -> Result<Vec<String>, UriError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut wado_url: Option<String> = None;
    let mut study_uid: Option<String> = None;
    let mut series_uid: Option<String> = None;
    let mut in_study = false;
    let mut in_series = false;
    let mut series_done = false;
    let mut sop_uids: Vec<String> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                _ if wado_url.is_none() => {
                    wado_url = Some(
                        attribute(&e, "wadoURL")?.ok_or(UriError::MissingAttribute("wadoURL"))?,
                    );
                }
                b"Study" if study_uid.is_none() => {
                    study_uid = attribute(&e, "StudyInstanceUID")?;
                    in_study = true;
                }
                b"Series" if in_study && series_uid.is_none() => {
                    series_uid = attribute(&e, "SeriesInstanceUID")?;
                    in_series = true;
                }
                b"Instance" if in_series && sop_uids.len() < max_slices => {
                    if let Some(uid) = attribute(&e, "SOPInstanceUID")? {
                        sop_uids.push(uid);
                    }
                }
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"Series" if in_series => {
                    in_series = false;
                    series_done = true;
                }
                b"Study" if in_study => in_study = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        if series_done {
            break;
        }
    }

    let wado_url = wado_url.ok_or(UriError::MissingElement("wado_query"))?;
    let study_uid = study_uid.ok_or(UriError::MissingElement("Study"))?;
    let series_uid = series_uid.ok_or(UriError::MissingElement("Series"))?;

    let root = format!(
        "{}?requestType=WADO&contentType=application/dicom&&studyUID={}&seriesUID={}",
        wado_url, study_uid, series_uid
    );
    Ok(sop_uids
        .into_iter()
        .map(|sop| format!("{}&objectUID={}", root, sop))
        .collect())
}

/// Data URLs addressed by the `input` parameter of a page URI.
pub fn input_urls(page_uri: &str) -> Vec<String> {
    let Some(params) = get_uri_query(page_uri) else {
        return Vec::new();
    };
    match params.get(INPUT_KEY) {
        Some(input) => decode_key_value_uri(input, params.get(REPLACE_MODE_KEY)),
        None => Vec::new(),
    }
}
