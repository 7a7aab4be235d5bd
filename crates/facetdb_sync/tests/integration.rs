//! End-to-end sync tests: two stores converging through the in-memory
//! server over the loopback HTTP transport.

use facetdb_core::Keyword;
use facetdb_sync::{
    HttpTransport, LoopbackClient, MemorySyncServer, SyncEngine, UnreachableClient,
};
use facetdb_testkit::fixtures;
use std::sync::Arc;
use uuid::Uuid;

fn engine_for(
    server: &Arc<MemorySyncServer>,
) -> SyncEngine<HttpTransport<LoopbackClient<Arc<MemorySyncServer>>>> {
    let client = LoopbackClient::new(Arc::clone(server));
    let transport = HttpTransport::new("http://sync.local", client);
    SyncEngine::new(transport, Uuid::new_v4())
}

#[test]
fn two_stores_converge() {
    let server = Arc::new(MemorySyncServer::new(Uuid::new_v4()));
    let server_id = server.server_id();

    let store_a = fixtures::todo_store();
    let store_b = fixtures::todo_store();
    let engine_a = engine_for(&server);
    let engine_b = engine_for(&server);

    let (entity, uuid) = fixtures::create_item(&store_a, "Buy milk");

    let outcome = engine_a.sync(&store_a, server_id);
    assert!(outcome.ok, "push sync failed: {:?}", outcome.error);
    assert!(server.record_count() > 0);

    let outcome = engine_b.sync(&store_b, server_id);
    assert!(outcome.ok, "pull sync failed: {:?}", outcome.error);

    // The item arrived with its identity intact.
    let found = store_b
        .entid_for_unique(&Keyword::new("todo", "uuid"), &uuid.into())
        .unwrap();
    assert_eq!(found, Some(entity));
    assert_eq!(
        fixtures::item_name(&store_b, entity).as_deref(),
        Some("Buy milk")
    );
}

#[test]
fn resync_is_idempotent() {
    let server = Arc::new(MemorySyncServer::new(Uuid::new_v4()));
    let server_id = server.server_id();

    let store_a = fixtures::todo_store();
    let store_b = fixtures::todo_store();
    let engine_a = engine_for(&server);
    let engine_b = engine_for(&server);

    fixtures::create_item(&store_a, "once");
    assert!(engine_a.sync(&store_a, server_id).ok);
    assert!(engine_b.sync(&store_b, server_id).ok);

    let datoms_before = store_b.datom_count().unwrap();
    let records_before = server.record_count();

    assert!(engine_b.sync(&store_b, server_id).ok);
    assert!(engine_a.sync(&store_a, server_id).ok);

    assert_eq!(store_b.datom_count().unwrap(), datoms_before);
    assert_eq!(server.record_count(), records_before);
}

#[test]
fn changes_flow_both_ways() {
    let server = Arc::new(MemorySyncServer::new(Uuid::new_v4()));
    let server_id = server.server_id();

    let store_a = fixtures::todo_store();
    let store_b = fixtures::todo_store();
    let engine_a = engine_for(&server);
    let engine_b = engine_for(&server);

    let (entity_a, _) = fixtures::create_item(&store_a, "from a");
    assert!(engine_a.sync(&store_a, server_id).ok);
    assert!(engine_b.sync(&store_b, server_id).ok);

    let (entity_b, _) = fixtures::create_item(&store_b, "from b");
    assert!(engine_b.sync(&store_b, server_id).ok);
    assert!(engine_a.sync(&store_a, server_id).ok);

    assert_eq!(
        fixtures::item_name(&store_a, entity_b).as_deref(),
        Some("from b")
    );
    assert_eq!(
        fixtures::item_name(&store_b, entity_a).as_deref(),
        Some("from a")
    );
}

#[test]
fn unreachable_server_is_a_value_failure() {
    let store = fixtures::todo_store();
    fixtures::create_item(&store, "stays local");
    let datoms_before = store.datom_count().unwrap();

    let transport = HttpTransport::new("http://nowhere.invalid", UnreachableClient);
    let engine = SyncEngine::new(transport, Uuid::new_v4());

    let outcome = engine.sync(&store, Uuid::new_v4());
    assert!(!outcome.ok);
    let message = outcome.error.expect("error message present");
    assert!(!message.is_empty());

    // Local data untouched.
    assert_eq!(store.datom_count().unwrap(), datoms_before);
}

#[test]
fn wrong_server_id_is_rejected() {
    let server = Arc::new(MemorySyncServer::new(Uuid::new_v4()));
    let store = fixtures::todo_store();
    let engine = engine_for(&server);

    let outcome = engine.sync(&store, Uuid::new_v4());
    assert!(!outcome.ok);
    assert!(outcome.error.unwrap().contains("unknown server id"));
}
