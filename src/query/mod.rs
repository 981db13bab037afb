//! Read side: resource listings and graph audits.
//!
//! A `ListingRequest` is compiled against a static `ListingCatalog` into a
//! Gremlin traversal where every request value is a binding. The services
//! run compiled traversals through a `GremlinExecutor`.

pub mod audit;
pub mod compiler;
mod errors;
pub mod listing;
pub mod request;

pub use audit::{AuditService, ResourceRef};
pub use compiler::{Compiled, CompiledQuery, TraversalCompiler};
pub use errors::{CompileWarning, QueryError};
pub use listing::ListingService;
pub use request::{Filters, ListingRequest, RequestContext};
