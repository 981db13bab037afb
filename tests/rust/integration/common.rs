use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use contrail_gremlin::client::{Bindings, ExecutionError, GremlinExecutor};
use contrail_gremlin::record::{ColumnSet, JsonDumpSource};

mockall::mock! {
    pub Executor {}

    #[async_trait]
    impl GremlinExecutor for Executor {
        async fn execute(&self, query: &str, bindings: &Bindings) -> Result<Bytes, ExecutionError>;
    }
}

/// Dump with a project, a network, a VM and two ports of the project.
pub fn inventory() -> JsonDumpSource {
    let dump = r#"{
        "project-1": {
            "type": "\"project\"",
            "prop:fq_name": "[\"default-domain\", \"admin\"]"
        },
        "vn-1": {
            "type": "\"virtual_network\"",
            "parent:project:project-1": "null"
        },
        "vm-1": {
            "type": "\"virtual_machine\""
        },
        "vmi-1": {
            "type": "\"virtual_machine_interface\"",
            "prop:display_name": "\"port-1\"",
            "prop:id_perms": "{\"user_visible\": true, \"enable\": true, \"description\": null}",
            "prop:virtual_machine_interface_device_owner": "\"compute:nova\"",
            "parent:project:project-1": "null",
            "ref:virtual_network:vn-1": "{\"attr\": null}",
            "ref:virtual_machine:vm-1": "{\"attr\": null}"
        },
        "vmi-2": {
            "type": "\"virtual_machine_interface\"",
            "prop:display_name": "\"port-2\"",
            "prop:virtual_machine_interface_mac_addresses": "{\"mac_address\": [\"02:00:00:00:00:02\"]}",
            "parent:project:project-1": "null",
            "ref:virtual_network:vn-1": "null"
        }
    }"#;
    JsonDumpSource::from_json_str(dump).expect("inventory dump is valid")
}

pub fn row(columns: &[(&str, &str)]) -> ColumnSet {
    columns
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn rows(entries: Vec<(&str, ColumnSet)>) -> JsonDumpSource {
    let rows: HashMap<String, ColumnSet> = entries
        .into_iter()
        .map(|(id, columns)| (id.to_string(), columns))
        .collect();
    JsonDumpSource::from_rows(rows)
}
