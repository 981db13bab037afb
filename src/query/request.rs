use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Filter key → accepted values. Keys iterate in lexicographic order.
pub type Filters = BTreeMap<String, Vec<String>>;

/// Who is asking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub tenant_id: String,
}

impl RequestContext {
    pub fn admin() -> Self {
        Self {
            is_admin: true,
            tenant_id: String::new(),
        }
    }

    pub fn tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            is_admin: false,
            tenant_id: tenant_id.into(),
        }
    }
}

/// A resource listing: filters to apply and fields to return.
///
/// Deserializes from the shape the API layer forwards:
///
/// ```json
/// {
///   "context": { "is_admin": false, "tenant_id": "0ed483e0-..." },
///   "filters": { "device_owner": ["compute:nova"] },
///   "fields": ["id", "name"]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRequest {
    #[serde(default)]
    pub context: RequestContext,
    #[serde(default)]
    pub filters: Filters,
    /// Empty means the default field set.
    #[serde(default)]
    pub fields: Vec<String>,
}

impl ListingRequest {
    pub fn new(context: RequestContext) -> Self {
        Self {
            context,
            ..Default::default()
        }
    }

    pub fn with_filter<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters
            .entry(key.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserialization_defaults() {
        let request: ListingRequest = serde_json::from_str(r#"{"filters": {"id": ["a"]}}"#).unwrap();
        assert!(!request.context.is_admin);
        assert!(request.fields.is_empty());
        assert_eq!(request.filters["id"], vec!["a".to_string()]);
    }

    #[test]
    fn test_with_filter_appends() {
        let request = ListingRequest::new(RequestContext::admin())
            .with_filter("id", ["a"])
            .with_filter("id", ["b"]);
        assert_eq!(request.filters["id"], vec!["a".to_string(), "b".to_string()]);
    }
}
