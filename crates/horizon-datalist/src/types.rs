//! Records exchanged between the widget, the host and the store.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use horizon_datalist_core::logging::targets;

/// Prefix of the filter id a sort directive is dispatched under.
pub const SORT_ID_PREFIX: &str = "sort-";

/// Pagination state of one widget instance.
///
/// This is also the payload of the host's pagination-change signal; `id`
/// routes the signal to the instance it was meant for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Rows to skip.
    pub skip: u64,
    /// Page size, always greater than zero.
    pub take: u64,
    /// One-based page number.
    pub page: u64,
    /// Instance pagination id (`dl__items__<listId>`).
    pub id: String,
}

impl Pagination {
    /// Create a pagination record.
    pub fn new(id: impl Into<String>, skip: u64, take: u64, page: u64) -> Self {
        Self {
            skip,
            take,
            page,
            id: id.into(),
        }
    }
}

/// A single filter value change addressed to a filter definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterChange {
    /// Filter definition id (or `sort-<key>` for sort directives).
    pub id: String,
    /// The view the filter belongs to, when filter ids are ambiguous.
    pub view: Option<String>,
    /// The filter value; an empty string is a value, not an absence.
    pub value: Value,
}

impl FilterChange {
    /// Create a filter change record.
    pub fn new(id: impl Into<String>, view: Option<String>, value: impl Into<Value>) -> Self {
        Self {
            id: id.into(),
            view,
            value: value.into(),
        }
    }

    /// Whether this record carries a sort directive.
    pub fn is_sort(&self) -> bool {
        self.id.starts_with(SORT_ID_PREFIX)
    }
}

/// Sort direction. Anything that is not recognizably ascending sorts descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortDirection {
    /// `ASC`
    Asc,
    /// `DESC`
    #[default]
    Desc,
}

impl SortDirection {
    /// The wire form, `ASC` or `DESC`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Parse leniently: `asc` in any case is ascending, everything else descending.
    pub fn parse(text: &str) -> Self {
        if text.trim().eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }

    /// Parse a JSON value; non-strings fall back to the default.
    pub fn from_value(value: &Value) -> Self {
        value.as_str().map(Self::parse).unwrap_or_default()
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to sort the list by one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortDirective {
    /// The sort key.
    pub key: String,
    /// The direction.
    pub direction: SortDirection,
}

impl SortDirective {
    /// Create a sort directive.
    pub fn new(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: key.into(),
            direction,
        }
    }

    /// The filter id this directive is dispatched under.
    pub fn id(&self) -> String {
        format!("{SORT_ID_PREFIX}{}", self.key)
    }

    /// The directive as a filter change record, the shape the store consumes.
    pub fn to_filter_change(&self) -> FilterChange {
        FilterChange {
            id: self.id(),
            view: None,
            value: Value::String(self.direction.as_str().to_string()),
        }
    }
}

impl From<SortDirective> for FilterChange {
    fn from(sort: SortDirective) -> Self {
        sort.to_filter_change()
    }
}

/// The argument of a store filter-change call: one record or an ordered batch.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterChangeBatch {
    /// A single record.
    Single(FilterChange),
    /// An ordered batch, possibly empty.
    Batch(Vec<FilterChange>),
}

impl FilterChangeBatch {
    /// The records in dispatch order.
    pub fn records(&self) -> &[FilterChange] {
        match self {
            Self::Single(record) => std::slice::from_ref(record),
            Self::Batch(records) => records,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// Whether there are no records.
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

impl From<FilterChange> for FilterChangeBatch {
    fn from(record: FilterChange) -> Self {
        Self::Single(record)
    }
}

impl From<Vec<FilterChange>> for FilterChangeBatch {
    fn from(records: Vec<FilterChange>) -> Self {
        Self::Batch(records)
    }
}

/// An externally fetched result set.
///
/// Deserializes from both `{Items, count}` and the render-signal shape
/// `{Items, total}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemsPayload {
    /// The items of the current page.
    #[serde(rename = "Items", default)]
    pub items: Vec<Value>,
    /// Total number of items across all pages.
    #[serde(default, alias = "total")]
    pub count: u64,
}

impl ItemsPayload {
    /// Create a payload ready to be pushed.
    pub fn new(items: Vec<Value>, count: u64) -> Arc<Self> {
        Arc::new(Self { items, count })
    }

    /// Decode a render-signal JSON body, substituting an empty payload for malformed input.
    pub fn from_json_lenient(json: &str) -> Arc<Self> {
        match serde_json::from_str(json) {
            Ok(payload) => Arc::new(payload),
            Err(err) => {
                tracing::debug!(target: targets::BRIDGE, error = %err, "malformed items payload");
                Arc::new(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sort_direction_parse() {
        assert_eq!(SortDirection::parse("ASC"), SortDirection::Asc);
        assert_eq!(SortDirection::parse("asc"), SortDirection::Asc);
        assert_eq!(SortDirection::parse("DESC"), SortDirection::Desc);
        assert_eq!(SortDirection::parse("sideways"), SortDirection::Desc);
        assert_eq!(SortDirection::from_value(&json!(1)), SortDirection::Desc);
    }

    #[test]
    fn test_sort_directive_as_filter_change() {
        let change = SortDirective::new("price", SortDirection::Asc).to_filter_change();
        assert_eq!(change.id, "sort-price");
        assert_eq!(change.view, None);
        assert_eq!(change.value, json!("ASC"));
        assert!(change.is_sort());
    }

    #[test]
    fn test_batch_records() {
        let single = FilterChangeBatch::from(FilterChange::new("a", None, "1"));
        assert_eq!(single.len(), 1);

        let empty = FilterChangeBatch::from(Vec::new());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_items_payload_accepts_total_alias() {
        let payload = ItemsPayload::from_json_lenient(r#"{"Items": [{"id": 1}], "total": 7}"#);
        assert_eq!(payload.items.len(), 1);
        assert_eq!(payload.count, 7);

        let payload: ItemsPayload = serde_json::from_value(json!({"Items": [], "count": 3})).unwrap();
        assert_eq!(payload.count, 3);
    }

    #[test]
    fn test_items_payload_malformed_defaults() {
        let payload = ItemsPayload::from_json_lenient("nope");
        assert!(payload.items.is_empty());
        assert_eq!(payload.count, 0);
    }

    #[test]
    fn test_pagination_from_signal_json() {
        let pagination: Pagination =
            serde_json::from_value(json!({"id": "dl__items__x", "skip": 20, "take": 10, "page": 3}))
                .unwrap();
        assert_eq!(pagination, Pagination::new("dl__items__x", 20, 10, 3));
    }
}
