use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use contrail_gremlin::client::Bindings;
use contrail_gremlin::query::{ListingRequest, ListingService, RequestContext};
use serde_json::json;

use crate::common::MockExecutor;

type Seen = Arc<Mutex<Vec<(String, Bindings)>>>;

/// Executor answering `payload` and remembering every call.
fn recording_executor(payload: &'static [u8]) -> (MockExecutor, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut executor = MockExecutor::new();
    executor.expect_execute().returning(move |query, bindings| {
        sink.lock()
            .unwrap()
            .push((query.to_string(), bindings.clone()));
        Ok(Bytes::from_static(payload))
    });
    (executor, seen)
}

#[tokio::test]
async fn test_dhcp_ports_never_reach_the_server() {
    let mut executor = MockExecutor::new();
    executor.expect_execute().times(0);
    let service = ListingService::ports(executor);

    let request = ListingRequest::new(RequestContext::tenant("project-1"))
        .with_filter("device_owner", ["network:dhcp"]);
    let rows = service.list(&request).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_tenant_listing_is_scoped() {
    let (executor, seen) = recording_executor(br#"[{"id": "vmi-1", "name": "port-1"}]"#);
    let service = ListingService::ports(executor);

    let request = ListingRequest::new(RequestContext::tenant("project-1"))
        .with_filter("name", ["port-1"])
        .with_fields(["id", "name"]);
    let rows = service.list(&request).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "vmi-1");

    let seen = seen.lock().unwrap();
    let (query, bindings) = &seen[0];
    assert!(query.starts_with(
        "g.V(_b0).in('parent').hasLabel('virtual_machine_interface').has('id_perms.user_visible', true)"
    ));
    assert_eq!(bindings["_b0"], json!("project-1"));
    assert_eq!(bindings["_b1"], json!("port-1"));
}

#[tokio::test]
async fn test_fixed_ips_is_the_same_as_subnet_id() {
    let (executor, seen) = recording_executor(b"[]");
    let service = ListingService::ports(executor);

    let composite = ListingRequest::new(RequestContext::admin())
        .with_filter("fixed_ips", ["subnet_id=S1"]);
    let direct = ListingRequest::new(RequestContext::admin()).with_filter("subnet_id", ["S1"]);
    service.list(&composite).await.unwrap();
    service.list(&direct).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], seen[1]);
}

#[tokio::test]
async fn test_unknown_filters_are_not_enforced() {
    let (executor, seen) = recording_executor(b"[]");
    let service = ListingService::ports(executor);

    let request = ListingRequest::new(RequestContext::admin())
        .with_filter("binding:profile", ["x"])
        .with_fields(["id"]);
    service.list(&request).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(
        seen[0].0,
        "g.V().hasLabel('virtual_machine_interface').project('id').by(id)"
    );
    assert!(seen[0].1.is_empty());
}

#[tokio::test]
async fn test_multi_value_filters_bind_every_value() {
    let (executor, seen) = recording_executor(b"[]");
    let service = ListingService::ports(executor);

    let request = ListingRequest::new(RequestContext::tenant("project-1"))
        .with_filter("id", ["a", "b", "c"])
        .with_filter("network_id", ["n1", "n2"])
        .with_filter("device_id", ["d1"]);
    service.list(&request).await.unwrap();

    let seen = seen.lock().unwrap();
    let bindings = &seen[0].1;
    // tenant + 3 + 2 + 1
    assert_eq!(bindings.len(), 7);
    let names: HashSet<&String> = bindings.keys().collect();
    assert_eq!(names.len(), 7);
    for name in bindings.keys() {
        assert!(seen[0].0.contains(name.as_str()));
    }
}

#[tokio::test]
async fn test_empty_answer_is_an_empty_list() {
    let (executor, _) = recording_executor(b"");
    let service = ListingService::ports(executor);

    let request = ListingRequest::new(RequestContext::admin());
    assert!(service.list(&request).await.unwrap().is_empty());
    assert_eq!(service.list_raw(&request).await.unwrap(), Bytes::from_static(b"[]"));
}
