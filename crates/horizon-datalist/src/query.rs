//! Query string translation.
//!
//! The address bar is one of the widget's sources of truth. This module
//! turns a raw query string into:
//!
//! - a [`QueryObject`]: the verbatim key/value view of the string,
//! - [`PaginationParams`]: the `skip`/`take`/`page` keys, coerced to a
//!   [`Pagination`] with defaults for anything missing or malformed,
//! - a [`Translation`]: one [`FilterChange`] per remaining key, plus an
//!   optional [`SortDirective`] when `sort` carries a JSON object.
//!
//! Nothing in here fails. Malformed input degrades to defaults, and keys
//! that match no filter definition are forwarded untouched; deciding whether
//! a filter exists is the job of [`dispatch`](crate::dispatch).
//!
//! # Example
//!
//! ```
//! use horizon_datalist::query::translate;
//!
//! let translation = translate("?page=2&view=main&status=active&sort={\"price\":\"ASC\"}");
//!
//! assert_eq!(translation.view.as_deref(), Some("main"));
//! assert_eq!(translation.filter_batch.len(), 1);
//! assert_eq!(translation.filter_batch[0].id, "status");
//! assert_eq!(translation.sort.unwrap().id(), "sort-price");
//! ```

use serde_json::{Map, Value};
use url::form_urlencoded;

use horizon_datalist_core::logging::targets;
use horizon_datalist_core::Property;

use crate::config::{PaginationDefaults, DEFAULT_TAKE};
use crate::types::{FilterChange, Pagination, SortDirection, SortDirective};

/// Pagination keys, extracted before filter translation.
pub const PAGINATION_KEYS: [&str; 3] = ["skip", "take", "page"];

/// Key addressing the view the remaining filters belong to.
pub const VIEW_KEY: &str = "view";

/// Key whose object value is a sort directive.
pub const SORT_KEY: &str = "sort";


/// A decoded query value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    /// A plain value. May be empty.
    Text(String),
    /// The values of a repeated key, in order.
    List(Vec<String>),
    /// A value that decoded as a JSON object.
    Object(Map<String, Value>),
}

impl QueryValue {
    /// Decode one raw value.
    fn decode(raw: &str) -> Self {
        if raw.trim_start().starts_with('{') {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) {
                return Self::Object(map);
            }
        }
        Self::Text(raw.to_string())
    }

    /// The first textual value, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::List(values) => values.first().map(String::as_str),
            Self::Object(_) => None,
        }
    }

    /// The object value, if this is one.
    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// The value as the JSON a filter change carries.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::List(values) => Value::Array(values.iter().cloned().map(Value::String).collect()),
            Self::Object(map) => Value::Object(map.clone()),
        }
    }

    fn push(&mut self, raw: &str) {
        match self {
            Self::List(values) => values.push(raw.to_string()),
            Self::Text(first) => {
                *self = Self::List(vec![std::mem::take(first), raw.to_string()]);
            }
            // A later plain value replaces a structured one.
            Self::Object(_) => *self = Self::decode(raw),
        }
    }
}

/// Insertion-ordered mapping from query key to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryObject {
    entries: Vec<(String, QueryValue)>,
}

impl QueryObject {
    /// Create an empty query object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw value, folding repeated keys into a list.
    pub fn insert_raw(&mut self, key: &str, raw: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, value)) => value.push(raw),
            None => self.entries.push((key.to_string(), QueryValue::decode(raw))),
        }
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Remove and return a value.
    pub fn remove(&mut self, key: &str) -> Option<QueryValue> {
        let position = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(position).1)
    }

    /// Whether the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode back into a query string (without the leading `?`).
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.entries {
            match value {
                QueryValue::Text(text) => {
                    serializer.append_pair(key, text);
                }
                QueryValue::List(values) => {
                    for text in values {
                        serializer.append_pair(key, text);
                    }
                }
                QueryValue::Object(map) => {
                    let json = Value::Object(map.clone()).to_string();
                    serializer.append_pair(key, &json);
                }
            }
        }
        serializer.finish()
    }
}

/// Parse a query string into a [`QueryObject`]. A leading `?` is optional.
pub fn parse_query_string(query_string: &str) -> QueryObject {
    let trimmed = query_string.trim().trim_start_matches('?');
    let mut object = QueryObject::new();
    for (key, value) in form_urlencoded::parse(trimmed.as_bytes()) {
        object.insert_raw(&key, &value);
    }
    object
}

/// Raw pagination values read from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationParams {
    /// Raw `skip`.
    pub skip: Option<String>,
    /// Raw `take`.
    pub take: Option<String>,
    /// Raw `page`.
    pub page: Option<String>,
}

impl PaginationParams {
    /// Pick the pagination keys out of a query object.
    pub fn from_query(query: &QueryObject) -> Self {
        let pick = |key: &str| query.get(key).and_then(QueryValue::as_text).map(str::to_string);
        Self {
            skip: pick("skip"),
            take: pick("take"),
            page: pick("page"),
        }
    }

    /// Coerce into a pagination state, falling back to defaults per field.
    ///
    /// `skip` defaults to 0, `take` to the configured page size and `page` to
    /// 1. Values that are not non-negative whole numbers, a zero `take` and a
    /// zero `page` all take the default.
    pub fn resolve(&self, defaults: &PaginationDefaults, id: impl Into<String>) -> Pagination {
        let default_take = if defaults.take == 0 {
            DEFAULT_TAKE
        } else {
            defaults.take
        };
        Pagination {
            skip: coerce(self.skip.as_deref(), 0, 0),
            take: coerce(self.take.as_deref(), default_take, 1),
            page: coerce(self.page.as_deref(), 1, 1),
            id: id.into(),
        }
    }
}

fn coerce(raw: Option<&str>, default: u64, min: u64) -> u64 {
    match raw.and_then(parse_whole_number) {
        Some(n) if n >= min => n,
        Some(_) | None => {
            if let Some(raw) = raw {
                tracing::debug!(target: targets::QUERY, raw, default, "pagination value coerced to default");
            }
            default
        }
    }
}

fn parse_whole_number(text: &str) -> Option<u64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(n) = text.parse::<u64>() {
        return Some(n);
    }
    let float = text.parse::<f64>().ok()?;
    // `1e2` and `3.0` are whole numbers; `2.5`, `-1`, `NaN` and `inf` are not.
    (float.is_finite() && float >= 0.0 && float.fract() == 0.0 && float < u64::MAX as f64)
        .then_some(float as u64)
}

/// Encode pagination as query parameters (without the leading `?`).
pub fn encode_pagination(pagination: &Pagination) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("skip", &pagination.skip.to_string())
        .append_pair("take", &pagination.take.to_string())
        .append_pair("page", &pagination.page.to_string())
        .finish()
}

/// The result of translating a query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Translation {
    /// The query string as read.
    pub query_string: String,
    /// The full, verbatim query object, reserved keys included.
    pub query_object: QueryObject,
    /// The addressed view, from the `view` key.
    pub view: Option<String>,
    /// One record per non-reserved key, in query order.
    pub filter_batch: Vec<FilterChange>,
    /// The sort directive, when `sort` held an object.
    pub sort: Option<SortDirective>,
}

/// Translate a query string into a filter batch and sort directive.
pub fn translate(query_string: &str) -> Translation {
    let query_object = parse_query_string(query_string);
    let mut working = query_object.clone();
    for key in PAGINATION_KEYS {
        working.remove(key);
    }
    working.remove("");

    let view = working
        .remove(VIEW_KEY)
        .and_then(|value| value.as_text().map(str::to_string))
        .filter(|view| !view.is_empty());

    let mut filter_batch = Vec::with_capacity(working.len());
    let mut sort = None;
    for (key, value) in working.iter() {
        match (key, value.as_object()) {
            (SORT_KEY, Some(object)) => {
                if sort.is_none() {
                    sort = sort_from_object(object);
                }
            }
            _ => filter_batch.push(FilterChange {
                id: key.to_string(),
                view: view.clone(),
                value: value.to_json(),
            }),
        }
    }

    tracing::debug!(
        target: targets::QUERY,
        filters = filter_batch.len(),
        has_sort = sort.is_some(),
        view = view.as_deref().unwrap_or(""),
        "translated query string"
    );

    Translation {
        query_string: query_string.to_string(),
        query_object,
        view,
        filter_batch,
        sort,
    }
}

fn sort_from_object(object: &Map<String, Value>) -> Option<SortDirective> {
    let mut entries = object.iter();
    let (key, direction) = entries.next()?;
    if entries.next().is_some() {
        tracing::debug!(target: targets::QUERY, key = %key, "multiple sort keys, using the first");
    }
    Some(SortDirective::new(key.clone(), SortDirection::from_value(direction)))
}

/// Where the widget reads the current query string from.
pub trait QuerySource: Send + Sync {
    /// The current query string, with or without a leading `?`.
    fn query_string(&self) -> String;
}

impl QuerySource for String {
    fn query_string(&self) -> String {
        self.clone()
    }
}

impl QuerySource for &'static str {
    fn query_string(&self) -> String {
        (*self).to_string()
    }
}

impl QuerySource for url::Url {
    fn query_string(&self) -> String {
        self.query().map(|query| format!("?{query}")).unwrap_or_default()
    }
}

/// A query string the host keeps current as the address bar changes.
impl QuerySource for Property<String> {
    fn query_string(&self) -> String {
        self.get()
    }
}
