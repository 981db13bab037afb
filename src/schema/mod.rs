pub mod catalog;
pub mod errors;
pub mod labels;
pub mod link;
pub mod property;

// Re-export commonly used types
pub use catalog::{
    catalog_for, port_catalog, CompositeRule, FieldRule, FilterClause, FilterRule, FilterScope,
    ListingCatalog, ShortCircuitRule,
};
pub use errors::{PropertyError, SchemaError};
pub use link::LinkKind;
pub use property::{flatten_into, join_path, property_path, PropertyBag, PropertyValue};
