//! Host configuration.
//!
//! The host hands the widget a [`DataListConfig`] once, at construction. It
//! carries the instance id, presentation flags the core passes through
//! untouched, pagination defaults and the static view hierarchy used to
//! route filter changes. Hooks are code, not data, and are supplied
//! separately through [`Hooks`](crate::hooks::Hooks).
//!
//! # Example
//!
//! ```
//! use horizon_datalist::config::DataListConfig;
//!
//! let config = DataListConfig::from_json(r#"{
//!     "id": "orders",
//!     "pagination": { "take": 25 },
//!     "views": [{
//!         "id": "main",
//!         "filterGroups": [{ "filters": [{ "id": "status" }] }]
//!     }]
//! }"#).unwrap();
//!
//! assert_eq!(config.pagination_id(), "dl__items__orders");
//! assert_eq!(config.pagination.take, 25);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Prefix of the id correlating pagination signals with one widget instance.
pub const PAGINATION_ID_PREFIX: &str = "dl__items__";

/// Default page size when neither the URL nor the config provides one.
pub const DEFAULT_TAKE: u64 = 10;

/// Configuration supplied by the host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataListConfig {
    /// The list id; unique per page.
    pub id: String,
    /// Run the query string through the filters on first render.
    ///
    /// Parsed for compatibility. The initial filter population always runs.
    #[serde(rename = "runQueryStringURLOnRender", default)]
    pub run_query_string_url_on_render: bool,
    /// Whether the filter panel is shown (presentation only).
    #[serde(default)]
    pub show_filters: bool,
    /// Extra CSS selector for the root element (presentation only).
    #[serde(default)]
    pub selector: String,
    /// Pagination fallbacks.
    #[serde(default)]
    pub pagination: PaginationDefaults,
    /// The static view hierarchy.
    #[serde(default)]
    pub views: Vec<View>,
}

impl DataListConfig {
    /// Create a config with the given id and defaults for everything else.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            run_query_string_url_on_render: false,
            show_filters: false,
            selector: String::new(),
            pagination: PaginationDefaults::default(),
            views: Vec::new(),
        }
    }

    /// Parse a config from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the default page size.
    pub fn with_take(mut self, take: u64) -> Self {
        self.pagination.take = take;
        self
    }

    /// Append a view to the hierarchy.
    pub fn with_view(mut self, view: View) -> Self {
        self.views.push(view);
        self
    }

    /// The id used to correlate pagination signals with this instance.
    pub fn pagination_id(&self) -> String {
        format!("{PAGINATION_ID_PREFIX}{}", self.id)
    }

    /// Look up a view by id.
    pub fn view(&self, id: &str) -> Option<&View> {
        self.views.iter().find(|view| view.id == id)
    }
}

/// Pagination values used when the URL does not provide them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationDefaults {
    /// Page size.
    #[serde(default = "default_take")]
    pub take: u64,
}

fn default_take() -> u64 {
    DEFAULT_TAKE
}

impl Default for PaginationDefaults {
    fn default() -> Self {
        Self { take: DEFAULT_TAKE }
    }
}

/// A selectable dataset perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    /// View id, addressed by the `view` query key.
    pub id: String,
    /// Display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Ordered filter groups.
    #[serde(default)]
    pub filter_groups: Vec<FilterGroup>,
}

impl View {
    /// Create an empty view.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            filter_groups: Vec::new(),
        }
    }

    /// Append a filter group.
    pub fn with_group(mut self, group: FilterGroup) -> Self {
        self.filter_groups.push(group);
        self
    }

    /// All filter definitions in group order.
    pub fn filters(&self) -> impl Iterator<Item = &FilterDefinition> {
        self.filter_groups.iter().flat_map(|group| group.filters.iter())
    }
}

/// An ordered collection of filter definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    /// Optional group id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Ordered filter definitions.
    #[serde(default)]
    pub filters: Vec<FilterDefinition>,
}

impl FilterGroup {
    /// Create a group from filter ids.
    pub fn with_filters<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: None,
            label: None,
            filters: ids.into_iter().map(FilterDefinition::new).collect(),
        }
    }
}

/// A static, host-configured filter descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDefinition {
    /// Filter id, unique within its view.
    pub id: String,
    /// Display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// UI type (select, date, checkbox, link, ...).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl FilterDefinition {
    /// Create a definition with only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            kind: None,
        }
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_json_defaults() {
        let config = DataListConfig::from_json(r#"{ "id": "people" }"#).unwrap();
        assert_eq!(config.id, "people");
        assert_eq!(config.pagination.take, DEFAULT_TAKE);
        assert!(!config.run_query_string_url_on_render);
        assert!(config.views.is_empty());
    }

    #[test]
    fn test_config_from_json_full() {
        let config = DataListConfig::from_json(
            r#"{
                "id": "orders",
                "runQueryStringURLOnRender": true,
                "showFilters": true,
                "selector": "orders-list",
                "pagination": { "take": 50 },
                "views": [{
                    "id": "main",
                    "label": "Main",
                    "filterGroups": [
                        { "label": "General", "filters": [{ "id": "status", "type": "select" }] }
                    ]
                }]
            }"#,
        )
        .unwrap();

        assert!(config.run_query_string_url_on_render);
        assert!(config.show_filters);
        assert_eq!(config.selector, "orders-list");
        assert_eq!(config.pagination.take, 50);

        let view = config.view("main").unwrap();
        let filter = view.filters().next().unwrap();
        assert_eq!(filter.id, "status");
        assert_eq!(filter.kind.as_deref(), Some("select"));
    }

    #[test]
    fn test_config_from_json_invalid() {
        assert!(DataListConfig::from_json("{ not json").is_err());
        assert!(DataListConfig::from_json(r#"{ "views": [] }"#).is_err());
    }

    #[test]
    fn test_pagination_id() {
        assert_eq!(DataListConfig::new("42").pagination_id(), "dl__items__42");
    }

    #[test]
    fn test_view_filters_in_group_order() {
        let view = View::new("main")
            .with_group(FilterGroup::with_filters(["a", "b"]))
            .with_group(FilterGroup::with_filters(["c"]));
        let ids: Vec<_> = view.filters().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
