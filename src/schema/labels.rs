//! Vertex labels and reserved vertex properties.
//!
//! Resource types are open-ended (a vertex label is whatever `type` column
//! the row carries); the constants here are the ones the listing catalogs
//! and the audit query refer to by name.

pub const VIRTUAL_MACHINE_INTERFACE: &str = "virtual_machine_interface";
pub const VIRTUAL_NETWORK: &str = "virtual_network";
pub const VIRTUAL_MACHINE: &str = "virtual_machine";
pub const INSTANCE_IP: &str = "instance_ip";
pub const SECURITY_GROUP: &str = "security_group";
pub const LOGICAL_ROUTER: &str = "logical_router";
pub const PROJECT: &str = "project";

/// Unix timestamp (seconds) of the last import that touched the vertex.
pub const UPDATED_PROPERTY: &str = "updated";

/// Keys stored as lists. Multi-properties alone cannot tell a one-element
/// list from a scalar, nor keep an empty list.
pub const LIST_PROPERTIES: &str = "list_properties";

/// List keys whose elements are stored as JSON text (lists holding objects
/// or nested lists).
pub const JSON_PROPERTIES: &str = "json_properties";

/// Bookkeeping properties written by the importer, never part of a record.
pub const RESERVED_PROPERTIES: &[&str] = &[UPDATED_PROPERTY, LIST_PROPERTIES, JSON_PROPERTIES];

pub fn is_reserved(property: &str) -> bool {
    RESERVED_PROPERTIES.contains(&property)
}

/// Vertex labels use underscores, API resource types use dashes.
pub fn label_to_resource_type(label: &str) -> String {
    label.replace('_', "-")
}

pub fn resource_type_to_label(resource_type: &str) -> String {
    resource_type.replace('-', "_")
}
