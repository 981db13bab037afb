//! contrail-gremlin - Contrail inventory to Gremlin graph bridge
//!
//! Two directions over one resource inventory:
//! - import: wide-row object store records decoded and written as vertices
//!   and edges (`record`, `import`, `sync`)
//! - query: resource listings compiled into parameterized Gremlin
//!   traversals and run against a Gremlin server (`query`, `client`)
//!
//! Both sides share the static tables of `schema` and nothing else.

pub mod client;
pub mod config;
pub mod import;
pub mod query;
pub mod record;
pub mod schema;
pub mod sync;
