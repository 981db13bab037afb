use contrail_gremlin::import::{Importer, MemoryGraphStore};
use contrail_gremlin::record::{decode_record, DecodePolicy, RowSource};
use contrail_gremlin::schema::{LinkKind, PropertyValue};
use contrail_gremlin::sync::{SyncOutcome, Synchronizer};

use crate::common::{inventory, row, rows};

fn all_ids() -> Vec<String> {
    inventory().ids()
}

#[tokio::test]
async fn test_inventory_round_trip() {
    let sync = Synchronizer::new(inventory(), Importer::new(MemoryGraphStore::new()));
    let report = sync.sync_many(all_ids()).await;
    assert!(report.is_success(), "{:?}", report.failed);
    assert_eq!(report.created.len(), 5);

    for id in all_ids() {
        let columns = sync.source().fetch_columns(&id).await.unwrap();
        let decoded = decode_record(&id, &columns, DecodePolicy::Strict).unwrap();
        let derived = sync.importer().derive_record(&id).await.unwrap().unwrap();
        assert!(derived.equivalent_to(&decoded), "{} differs after import", id);
    }
}

#[tokio::test]
async fn test_resync_is_idempotent() {
    let sync = Synchronizer::new(inventory(), Importer::new(MemoryGraphStore::new()));
    sync.sync_many(all_ids()).await;
    let edges = sync.importer().store().edges().await;

    let report = sync.sync_many(all_ids()).await;
    assert!(report.is_success());
    assert_eq!(report.updated.len(), 5);
    assert_eq!(sync.importer().store().edges().await, edges);
    assert_eq!(sync.importer().store().vertex_count().await, 5);
}

#[tokio::test]
async fn test_moved_port_keeps_its_parent() {
    let sync = Synchronizer::new(inventory(), Importer::new(MemoryGraphStore::new()));
    sync.sync_many(all_ids()).await;
    let importer = sync.importer();

    // vmi-2 now refs vn-2; the row carries no parent column
    let moved = rows(vec![
        ("vn-2", row(&[("type", "\"virtual_network\"")])),
        (
            "vmi-2",
            row(&[
                ("type", "\"virtual_machine_interface\""),
                ("ref:virtual_network:vn-2", "null"),
            ]),
        ),
    ]);
    for id in ["vn-2", "vmi-2"] {
        let columns = moved.fetch_columns(id).await.unwrap();
        let record = decode_record(id, &columns, DecodePolicy::Strict).unwrap();
        importer.create(&record).await.unwrap();
        importer.update_links(&record).await.unwrap();
    }

    let derived = importer.derive_record("vmi-2").await.unwrap().unwrap();
    let targets: Vec<(LinkKind, &str)> = derived
        .relations
        .iter()
        .map(|r| (r.kind, r.target.as_str()))
        .collect();
    assert_eq!(
        targets,
        vec![(LinkKind::Parent, "project-1"), (LinkKind::Ref, "vn-2")]
    );
}

#[tokio::test]
async fn test_nested_properties_are_flattened() {
    let sync = Synchronizer::new(inventory(), Importer::new(MemoryGraphStore::new()));
    sync.sync_many(all_ids()).await;

    let port = sync.importer().derive_record("vmi-1").await.unwrap().unwrap();
    assert_eq!(port.properties["id_perms.user_visible"], PropertyValue::Bool(true));
    assert!(!port.properties.contains_key("id_perms.description"));

    let other = sync.importer().derive_record("vmi-2").await.unwrap().unwrap();
    assert_eq!(
        other.properties["virtual_machine_interface_mac_addresses.mac_address"],
        PropertyValue::List(vec!["02:00:00:00:00:02".into()])
    );
}

#[tokio::test]
async fn test_single_sync_after_batch() {
    let sync = Synchronizer::new(inventory(), Importer::new(MemoryGraphStore::new()))
        .with_concurrency(1);
    sync.sync_many(all_ids()).await;
    assert_eq!(sync.sync("vmi-1").await.unwrap(), SyncOutcome::Updated);
    sync.remove("vmi-1").await.unwrap();
    assert!(!sync.importer().exists("vmi-1").await.unwrap());
    assert_eq!(sync.importer().store().edges().await.len(), 3);
}
