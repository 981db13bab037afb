//! Column set → `ResourceRecord`.
//!
//! Column conventions:
//! - `type`: JSON string, the resource type (vertex label)
//! - `prop:<name>`: JSON value, flattened into dotted paths
//! - `ref:<type>:<uuid>`, `parent:<type>:<uuid>`, `back_ref:<type>:<uuid>`:
//!   one relation each; the column value is not used
//!
//! Anything else is ignored so that new column families never break a sync.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{flatten_into, LinkKind, PropertyBag, PropertyError};

use super::{ColumnSet, DecodeError, Relation, ResourceRecord, UnknownDecodePolicy};

const TYPE_COLUMN: &str = "type";
const PROPERTY_PREFIX: &str = "prop:";

/// What to do with a property or relation column that fails to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// The whole record fails.
    #[default]
    Strict,
    /// The column is skipped with a warning.
    Lenient,
}

impl std::str::FromStr for DecodePolicy {
    type Err = UnknownDecodePolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(DecodePolicy::Strict),
            "lenient" => Ok(DecodePolicy::Lenient),
            _ => Err(UnknownDecodePolicy(s.to_string())),
        }
    }
}

/// Decode the columns of resource `id`.
pub fn decode_record(
    id: &str,
    columns: &ColumnSet,
    policy: DecodePolicy,
) -> Result<ResourceRecord, DecodeError> {
    let resource_type = match columns.get(TYPE_COLUMN) {
        Some(raw) => decode_type(id, raw)?,
        None => {
            return Err(DecodeError::MissingType { id: id.to_string() });
        }
    };

    let mut record = ResourceRecord::new(id, resource_type);

    for (column, raw) in columns {
        if column == TYPE_COLUMN {
            continue;
        }

        let outcome = if let Some(name) = column.strip_prefix(PROPERTY_PREFIX) {
            decode_property(name, raw, &mut record.properties).map_err(|source| {
                DecodeError::Property {
                    id: id.to_string(),
                    source,
                }
            })
        } else if let Some((kind, rest)) = LinkKind::from_column(column) {
            decode_relation(id, column, kind, rest).map(|relation| record.relations.push(relation))
        } else {
            log::trace!("Ignoring column {} of {}", column, id);
            Ok(())
        };

        if let Err(e) = outcome {
            match policy {
                DecodePolicy::Strict => return Err(e),
                DecodePolicy::Lenient => log::warn!("Skipping undecodable column: {}", e),
            }
        }
    }

    Ok(record)
}

fn decode_type(id: &str, raw: &str) -> Result<String, DecodeError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(s)) if !s.is_empty() => Ok(s),
        Ok(other) => Err(DecodeError::InvalidType {
            id: id.to_string(),
            reason: format!("expected a non-empty string, got {}", other),
        }),
        Err(e) => Err(DecodeError::InvalidType {
            id: id.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Decode one `prop:` column into `bag`. Nothing is inserted on failure.
fn decode_property(name: &str, raw: &str, bag: &mut PropertyBag) -> Result<(), PropertyError> {
    if name.is_empty() {
        return Err(PropertyError {
            path: String::new(),
            reason: "empty property name".to_string(),
        });
    }

    let value: Value = serde_json::from_str(raw).map_err(|e| PropertyError {
        path: name.to_string(),
        reason: e.to_string(),
    })?;

    // Flatten into a scratch bag so a failure deep inside an object does not
    // leave half of it behind.
    let mut scratch = PropertyBag::new();
    flatten_into(name, &value, &mut scratch)?;
    bag.extend(scratch);
    Ok(())
}

fn decode_relation(
    id: &str,
    column: &str,
    kind: LinkKind,
    rest: &str,
) -> Result<Relation, DecodeError> {
    // `<type>:<uuid>` or bare `<uuid>`
    let target = rest.rsplit(':').next().unwrap_or_default();
    if target.is_empty() {
        return Err(DecodeError::Relation {
            id: id.to_string(),
            column: column.to_string(),
        });
    }
    Ok(Relation::new(id, target, kind))
}
