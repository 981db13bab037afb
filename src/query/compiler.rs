//! Listing request → parameterized Gremlin traversal.
//!
//! Compilation order:
//! 1. composite filters are expanded into their sub-keys
//! 2. short-circuit rules may answer the request without a traversal
//! 3. scope: every vertex of the label, or the tenant's visible children
//! 4. one clause per filter, in key order, values always bound
//! 5. `.project(...)` with one `.by(...)` per selected field
//!
//! Nothing in a request can fail compilation. Unknown keys and fields,
//! malformed composite values and empty filters are dropped, logged and
//! reported as `CompileWarning`s.

use crate::client::{BindingAllocator, Bindings};
use crate::schema::{port_catalog, FieldRule, FilterClause, FilterScope, ListingCatalog};

use super::errors::CompileWarning;
use super::request::{Filters, ListingRequest, RequestContext};

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub query: String,
    pub bindings: Bindings,
    pub warnings: Vec<CompileWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Compiled {
    /// The request is known to match nothing; no traversal is needed.
    Empty,
    Query(CompiledQuery),
}

impl Compiled {
    pub fn is_empty(&self) -> bool {
        matches!(self, Compiled::Empty)
    }

    pub fn into_query(self) -> Option<CompiledQuery> {
        match self {
            Compiled::Empty => None,
            Compiled::Query(query) => Some(query),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TraversalCompiler {
    catalog: &'static ListingCatalog,
}

impl TraversalCompiler {
    pub fn new(catalog: &'static ListingCatalog) -> Self {
        Self { catalog }
    }

    pub fn for_ports() -> Self {
        Self::new(port_catalog())
    }

    pub fn catalog(&self) -> &'static ListingCatalog {
        self.catalog
    }

    pub fn compile(&self, request: &ListingRequest) -> Compiled {
        let mut warnings = Vec::new();
        let filters = self.expand_composites(&request.filters, &mut warnings);

        for (key, values) in &filters {
            if let Some(rule) = self.catalog.short_circuit(key, values) {
                log::debug!(
                    "Listing of {} short-circuited by {}={}",
                    self.catalog.resource,
                    rule.key,
                    rule.value
                );
                return Compiled::Empty;
            }
        }

        let mut allocator = BindingAllocator::new();
        let mut query = self.scope(&request.context, &mut allocator);

        for (key, values) in &filters {
            if let Some(clause) =
                self.filter_clause(key, values, &request.context, &mut allocator, &mut warnings)
            {
                query.push_str(&clause);
            }
        }

        let fields = self.select_fields(&request.fields, &mut warnings);
        query.push_str(&projection(&fields));

        let bindings = allocator.into_bindings();
        log::debug!("Query: {}, Bindings: {:?}", query, bindings);

        Compiled::Query(CompiledQuery {
            query,
            bindings,
            warnings,
        })
    }

    /// Merge `subkey<sep>value` entries of composite keys into `subkey`.
    /// The composite key itself stays, its table entry is inert.
    fn expand_composites(&self, filters: &Filters, warnings: &mut Vec<CompileWarning>) -> Filters {
        let mut expanded = filters.clone();
        for composite in &self.catalog.composites {
            let Some(values) = filters.get(composite.key) else {
                continue;
            };
            for value in values {
                match value.split_once(composite.separator) {
                    Some((subkey, subvalue)) => expanded
                        .entry(subkey.to_string())
                        .or_default()
                        .push(subvalue.to_string()),
                    None => warn(
                        warnings,
                        CompileWarning::MalformedCompositeValue {
                            key: composite.key.to_string(),
                            value: value.clone(),
                            separator: composite.separator,
                        },
                    ),
                }
            }
        }
        expanded
    }

    fn scope(&self, context: &RequestContext, allocator: &mut BindingAllocator) -> String {
        if context.is_admin {
            format!("g.V().hasLabel('{}')", self.catalog.label)
        } else {
            let tenant = allocator.bind(context.tenant_id.as_str());
            format!(
                "g.V({}).in('parent').hasLabel('{}').has('id_perms.user_visible', true)",
                tenant, self.catalog.label
            )
        }
    }

    fn filter_clause(
        &self,
        key: &str,
        values: &[String],
        context: &RequestContext,
        allocator: &mut BindingAllocator,
        warnings: &mut Vec<CompileWarning>,
    ) -> Option<String> {
        let Some(rule) = self.catalog.filter(key) else {
            warn(
                warnings,
                CompileWarning::UnsupportedFilterKey {
                    key: key.to_string(),
                    values: values.join(","),
                },
            );
            return None;
        };
        if values.is_empty() {
            warn(warnings, CompileWarning::EmptyFilter(key.to_string()));
            return None;
        }
        if rule.scope == FilterScope::PrivilegedOnly && !context.is_admin {
            return None;
        }

        match rule.clause {
            FilterClause::Inert => None,
            FilterClause::Id => Some(format!(".has(id, {})", allocator.bind_predicate(values))),
            FilterClause::Property(property) => Some(format!(
                ".has('{}', {})",
                property,
                allocator.bind_predicate(values)
            )),
            FilterClause::Exists(template) => Some(format!(
                ".where({})",
                template.replacen("{}", &allocator.bind_predicate(values), 1)
            )),
        }
    }

    /// Requested fields that the catalog knows, in request order and without
    /// duplicates. Falls back to the default set when nothing usable is left.
    fn select_fields(&self, requested: &[String], warnings: &mut Vec<CompileWarning>) -> Vec<&'static FieldRule> {
        let mut selected: Vec<&'static FieldRule> = Vec::new();
        for name in requested {
            match self.catalog.field(name) {
                Some(rule) if selected.iter().any(|f| f.name == rule.name) => {}
                Some(rule) => selected.push(rule),
                None => warn(warnings, CompileWarning::UnsupportedField(name.clone())),
            }
        }
        if selected.is_empty() {
            selected = self.catalog.default_fields().collect();
        }
        selected
    }
}

fn projection(fields: &[&FieldRule]) -> String {
    let names: Vec<String> = fields.iter().map(|f| format!("'{}'", f.name)).collect();
    let mut out = format!(".project({})", names.join(", "));
    for field in fields {
        out.push_str(".by(");
        out.push_str(field.projection);
        out.push(')');
    }
    out
}

fn warn(warnings: &mut Vec<CompileWarning>, warning: CompileWarning) {
    log::warn!("{}", warning);
    warnings.push(warning);
}
