//! Listing catalogs: the fixed filter and field tables per listable resource.
//!
//! Adding a filter or a field is a table entry here, the compiler never
//! branches on key names.
use std::collections::HashMap;

use super::errors::SchemaError;
use super::labels;

/// How one filter key turns into a traversal step.
///
/// Templates carry a `{}` placeholder where the value predicate goes: either
/// a single binding name or `within(_b1,_b2)`.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterClause {
    /// `.has(id, P)`
    Id,
    /// `.has('<property>', P)`
    Property(&'static str),
    /// `.where(<template>)`, an existence sub-traversal across an edge.
    Exists(&'static str),
    /// Consumed by a composite expansion; generates nothing.
    Inert,
}

/// When a filter applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterScope {
    Always,
    /// Only for privileged requests; other requests are already scoped by
    /// the base traversal.
    PrivilegedOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterRule {
    pub clause: FilterClause,
    pub scope: FilterScope,
}

impl FilterRule {
    fn always(clause: FilterClause) -> Self {
        Self {
            clause,
            scope: FilterScope::Always,
        }
    }
}

/// A projected field and the `.by(...)` modulator that produces it.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub name: &'static str,
    pub projection: &'static str,
}

/// A filter key whose values are `subkey<separator>value` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeRule {
    pub key: &'static str,
    pub separator: char,
}

/// A filter value known to always yield nothing for this resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortCircuitRule {
    pub key: &'static str,
    pub value: &'static str,
}

/// Everything the traversal compiler needs to know about one resource.
#[derive(Debug)]
pub struct ListingCatalog {
    /// API-facing resource name (`port`).
    pub resource: &'static str,
    /// Vertex label the resource is stored under.
    pub label: &'static str,
    pub short_circuits: Vec<ShortCircuitRule>,
    pub composites: Vec<CompositeRule>,
    pub filters: HashMap<&'static str, FilterRule>,
    /// Supported fields, in default projection order.
    pub fields: Vec<FieldRule>,
}

impl ListingCatalog {
    pub fn filter(&self, key: &str) -> Option<&FilterRule> {
        self.filters.get(key)
    }

    pub fn field(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn composite(&self, key: &str) -> Option<&CompositeRule> {
        self.composites.iter().find(|c| c.key == key)
    }

    /// First short-circuit rule matched by the given filter values.
    pub fn short_circuit<'a, I>(&self, key: &str, values: I) -> Option<&ShortCircuitRule>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let values: Vec<&String> = values.into_iter().collect();
        self.short_circuits
            .iter()
            .filter(|rule| rule.key == key)
            .find(|rule| values.iter().any(|v| v.as_str() == rule.value))
    }

    pub fn default_fields(&self) -> impl Iterator<Item = &FieldRule> {
        self.fields.iter()
    }
}

/// Look up the catalog for an API resource name.
pub fn catalog_for(resource: &str) -> Result<&'static ListingCatalog, SchemaError> {
    CATALOGS
        .get(resource)
        .copied()
        .ok_or_else(|| SchemaError::UnknownResource(resource.to_string()))
}

/// Catalog for Neutron ports, stored as `virtual_machine_interface` vertices.
pub fn port_catalog() -> &'static ListingCatalog {
    &PORT_CATALOG
}

// Static catalog tables
lazy_static::lazy_static! {
    static ref PORT_CATALOG: ListingCatalog = {
        let mut filters = HashMap::new();

        // ===== DIRECT MATCHES =====

        filters.insert("id", FilterRule::always(FilterClause::Id));
        filters.insert("name", FilterRule::always(FilterClause::Property("display_name")));
        filters.insert(
            "device_owner",
            FilterRule::always(FilterClause::Property("virtual_machine_interface_device_owner")),
        );

        // Non-privileged requests start from the tenant vertex already.
        filters.insert(
            "tenant_id",
            FilterRule {
                clause: FilterClause::Exists("__.out('parent').has(id, {})"),
                scope: FilterScope::PrivilegedOnly,
            },
        );

        // ===== RELATION EXISTENCE =====

        filters.insert(
            "network_id",
            FilterRule::always(FilterClause::Exists(
                "__.out('ref').hasLabel('virtual_network').has(id, {})",
            )),
        );
        // Devices are VMs (port refs them) or logical routers (they ref the port).
        filters.insert(
            "device_id",
            FilterRule::always(FilterClause::Exists("__.both('ref').has(id, {})")),
        );
        filters.insert(
            "ip_address",
            FilterRule::always(FilterClause::Exists(
                "__.in('ref').hasLabel('instance_ip').has('instance_ip_address', {})",
            )),
        );
        filters.insert(
            "subnet_id",
            FilterRule::always(FilterClause::Exists(
                "__.in('ref').hasLabel('instance_ip').has('subnet_uuid', {})",
            )),
        );

        // Expanded into ip_address / subnet_id before clause generation.
        filters.insert("fixed_ips", FilterRule::always(FilterClause::Inert));

        let fields = vec![
            FieldRule { name: "id", projection: "id" },
            FieldRule {
                name: "tenant_id",
                projection: "coalesce(__.out('parent').id().map{ it.get().toString().replace('-', '') }, constant(''))",
            },
            FieldRule {
                name: "network_id",
                projection: "coalesce(__.out('ref').hasLabel('virtual_network').id(), constant(''))",
            },
            FieldRule {
                name: "name",
                projection: "coalesce(values('display_name'), constant(''))",
            },
            FieldRule {
                name: "description",
                projection: "coalesce(values('id_perms.description'), constant(''))",
            },
            FieldRule {
                name: "security_groups",
                // only the project's placeholder group, matched on its whole fq_name
                projection: "__.out('ref').hasLabel('security_group').not(values('fq_name').fold().is(['default-domain', 'default-project', '__no_rule__'])).id().fold()",
            },
            FieldRule {
                name: "fixed_ips",
                projection: "__.in('ref').hasLabel('instance_ip').project('ip_address', 'subnet_id').by(coalesce(values('instance_ip_address'), constant(''))).by(coalesce(values('subnet_uuid'), constant(''))).fold()",
            },
            FieldRule {
                name: "mac_address",
                projection: "coalesce(values('virtual_machine_interface_mac_addresses.mac_address').limit(1), constant(''))",
            },
            FieldRule {
                name: "allowed_address_pairs",
                projection: "coalesce(__.values('neutron.allowed_address_pairs').fold(), constant([]))",
            },
            FieldRule {
                name: "device_id",
                projection: "coalesce(__.out('ref').hasLabel('virtual_machine').id(), __.in('ref').hasLabel('logical_router').id(), constant(''))",
            },
            FieldRule {
                name: "device_owner",
                projection: "coalesce(values('virtual_machine_interface_device_owner'), constant(''))",
            },
            FieldRule {
                name: "status",
                projection: "choose(__.has('virtual_machine_interface_device_owner'), constant('ACTIVE'), constant('DOWN'))",
            },
            FieldRule {
                name: "admin_state_up",
                projection: "coalesce(values('id_perms.enable'), constant(false))",
            },
            FieldRule { name: "binding:vif_details", projection: "constant([ port_filter : true ])" },
            FieldRule { name: "binding:vif_type", projection: "constant('vrouter')" },
            FieldRule { name: "binding:vnic_type", projection: "constant('normal')" },
            FieldRule { name: "binding:host_id", projection: "constant('none')" },
            FieldRule {
                name: "created_at",
                projection: "coalesce(values('id_perms.created'), constant(''))",
            },
            FieldRule {
                name: "updated_at",
                projection: "coalesce(values('id_perms.last_modified'), constant(''))",
            },
        ];

        ListingCatalog {
            resource: "port",
            label: labels::VIRTUAL_MACHINE_INTERFACE,
            // DHCP ports are owned by the infrastructure and never stored.
            short_circuits: vec![ShortCircuitRule { key: "device_owner", value: "network:dhcp" }],
            composites: vec![CompositeRule { key: "fixed_ips", separator: '=' }],
            filters,
            fields,
        }
    };

    static ref CATALOGS: HashMap<&'static str, &'static ListingCatalog> = {
        let mut m = HashMap::new();
        m.insert(PORT_CATALOG.resource, &*PORT_CATALOG);
        m
    };
}
