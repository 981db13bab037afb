//! Consistency checks over the imported graph.
//!
//! Every import stamps vertices with the unix time of the write (`updated`).
//! A vertex whose stamp is older than the sync interval was not touched by
//! the last full sync and is likely gone from the object store.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::client::{decode_items, BindingAllocator, Bindings, GremlinExecutor};
use crate::schema::labels::{self, UPDATED_PROPERTY};

use super::errors::QueryError;

/// Stamp cutoff for "older than `secs` seconds before `now`". Saturates at
/// `i64::MIN`, which selects every stamped vertex.
pub fn stale_cutoff(now: i64, secs: u64) -> i64 {
    i64::try_from(secs)
        .ok()
        .and_then(|secs| now.checked_sub(secs))
        .unwrap_or(i64::MIN)
}

/// A resource as reported by an audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceRef {
    /// Object store type name (`virtual-machine-interface`).
    pub resource_type: String,
    pub uuid: String,
    pub fq_name: Vec<String>,
}

/// Vertices stamped before `cutoff`, optionally restricted to one label.
pub fn stale_query(label: Option<&str>, cutoff: i64) -> (String, Bindings) {
    let mut allocator = BindingAllocator::new();
    let mut query = format!(
        "g.V().has('{}', lt({}))",
        UPDATED_PROPERTY,
        allocator.bind(cutoff)
    );
    if let Some(label) = label {
        query.push_str(&format!(".hasLabel({})", allocator.bind(label)));
    }
    query.push_str(
        ".project('type', 'uuid', 'fq_name').by(label).by(id).by(coalesce(values('fq_name').fold(), constant([])))",
    );
    (query, allocator.into_bindings())
}

fn resource_ref(row: &Value) -> Result<ResourceRef, QueryError> {
    let malformed = || QueryError::MalformedRow(row.to_string());
    let label = row.get("type").and_then(Value::as_str).ok_or_else(malformed)?;
    let uuid = match row.get("uuid") {
        Some(Value::String(s)) => s.clone(),
        Some(other) if !other.is_null() => other.to_string(),
        _ => return Err(malformed()),
    };
    let fq_name = match row.get("fq_name") {
        Some(Value::Array(parts)) => parts
            .iter()
            .map(|p| p.as_str().map(str::to_string).ok_or_else(malformed))
            .collect::<Result<Vec<_>, _>>()?,
        Some(Value::String(single)) => vec![single.clone()],
        _ => Vec::new(),
    };
    Ok(ResourceRef {
        resource_type: labels::label_to_resource_type(label),
        uuid,
        fq_name,
    })
}

pub struct AuditService<E> {
    executor: E,
}

impl<E: GremlinExecutor> AuditService<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Resources not re-imported during the last `older_than_secs` seconds.
    pub async fn stale_resources(
        &self,
        label: Option<&str>,
        older_than_secs: u64,
    ) -> Result<Vec<ResourceRef>, QueryError> {
        let cutoff = stale_cutoff(Utc::now().timestamp(), older_than_secs);
        let (query, bindings) = stale_query(label, cutoff);
        log::debug!("Query: {}, Bindings: {:?}", query, bindings);

        let payload = self.executor.execute(&query, &bindings).await?;
        let resources = decode_items(&payload)?
            .iter()
            .map(resource_ref)
            .collect::<Result<Vec<_>, _>>()?;
        if !resources.is_empty() {
            log::info!("Found {} stale resource(s)", resources.len());
        }
        Ok(resources)
    }
}
