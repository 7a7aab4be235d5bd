//! FacetDB todo demo.
//!
//! Demonstrates the full stack end to end:
//! - opening a store and installing the vocabulary
//! - creating, completing, and relabeling items
//! - observer-driven refresh
//! - a sync round-trip between two stores through the in-memory server
//!
//! Run with: cargo run -p todo_app

use chrono::{Duration, Utc};
use facetdb_core::Store;
use facetdb_sync::{LoopbackClient, MemorySyncServer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use todo_app::{Patch, TodoList};
use uuid::Uuid;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("FacetDB Todo Demo");
    println!("=================\n");

    let server = Arc::new(MemorySyncServer::new(Uuid::new_v4()));
    let server_id = server.server_id();

    // The composition root owns the store; everything else borrows it.
    let store = Arc::new(Store::open_in_memory()?);
    let list = TodoList::new(Arc::clone(&store))?
        .with_sync_client(Arc::new(LoopbackClient::new(Arc::clone(&server))));

    // React to item changes the way a list adapter would.
    let refreshes = Arc::new(AtomicUsize::new(0));
    {
        let refreshes = Arc::clone(&refreshes);
        list.on_items_changed(
            "list-adapter",
            Arc::new(move |report| {
                refreshes.fetch_add(1, Ordering::SeqCst);
                println!(
                    "  [observer] {} touched {} entities",
                    report.tx_id,
                    report.changed_entities.len()
                );
            }),
        )?;
    }

    println!("[+] Creating items...");
    let milk = list.create_item("Buy milk", Some(Utc::now() + Duration::days(1)))?;
    let taxes = list.create_item("File taxes", Some(Utc::now() + Duration::days(30)))?;
    list.create_item("Water plants", None)?;

    let chores = list.create_label("chores", "#00ff00")?;
    list.set_item_labels(&milk.uuid, &[chores.clone()])?;

    println!("\n[*] All items:");
    for item in list.fetch_items()? {
        let status = if item.is_done() { "x" } else { " " };
        let labels: Vec<&str> = item.labels.iter().map(|l| l.name.as_str()).collect();
        println!(
            "  [{}] {} (due: {}) {:?}",
            status,
            item.name,
            item.due_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".into()),
            labels
        );
    }

    println!("\n[~] Completing 'Buy milk'...");
    list.complete_item(&milk.uuid)?;

    println!("[~] Rescheduling 'File taxes' and clearing its due date again...");
    list.update_item_by_uuid(
        &taxes.uuid,
        None,
        Patch::Set(Utc::now() + Duration::days(60)),
        Patch::Keep,
    )?;
    list.update_item_by_uuid(&taxes.uuid, None, Patch::Clear, Patch::Keep)?;

    println!("\n[>] Syncing to the server...");
    let outcome = list.sync(server_id, "http://sync.local");
    println!("  ok: {}, records on server: {}", outcome.ok, server.record_count());

    // A second device pulls the same state.
    let other_store = Arc::new(Store::open_in_memory()?);
    let other = TodoList::new(Arc::clone(&other_store))?
        .with_sync_client(Arc::new(LoopbackClient::new(Arc::clone(&server))));
    let outcome = other.sync(server_id, "http://sync.local");
    println!(
        "  second device synced (ok: {}), sees {} items",
        outcome.ok,
        other.fetch_items()?.len()
    );

    println!(
        "\n[#] Observer fired {} times",
        refreshes.load(Ordering::SeqCst)
    );

    store.close()?;
    other_store.close()?;
    println!("[*] Stores closed");
    Ok(())
}
