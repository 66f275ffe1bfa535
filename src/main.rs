// Dropping Area Logistics Tracker - CLI
//
// Modes:
//   cargo run seed [db]     seed a demo dataset
//   cargo run report [db]   print stats, the admin view, and seller balances

use anyhow::Result;
use std::collections::HashSet;
use std::env;
use std::path::Path;

use dropping_area::{
    apply_status_change, compute_balances, compute_stats, compute_view, export_filename,
    export_selected, ItemStatus, ItemStore, NewItem, Role, SqliteStore, ViewFilters, APP_NAME,
};

const DEFAULT_DB: &str = "dropping_area.db";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let mode = args.get(1).map(String::as_str).unwrap_or("report");
    let db_path = args.get(2).map(String::as_str).unwrap_or(DEFAULT_DB);

    match mode {
        "seed" => run_seed(db_path),
        "report" => run_report(db_path),
        other => {
            eprintln!("❌ Unknown mode: {}", other);
            eprintln!("   Usage: dropping-area [seed|report] [db_path]");
            std::process::exit(1);
        }
    }
}

fn run_seed(db_path: &str) -> Result<()> {
    println!("📦 {} - Demo Seed", APP_NAME);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let store = SqliteStore::open(Path::new(db_path))?;

    let drops = [
        ("White Dress", "Maria Cruz", "Kath Shop", "SFC", "500", "10"),
        ("Denim Jacket", "Ana Reyes", "Kath Shop", "Bauang", "₱1,250.50", "0"),
        ("Sneakers", "Liza Soberano", "Thrift Hub", "Agoo", "899", "15"),
        ("Tote Bag", "Maria Cruz", "Thrift Hub", "San Juan", "150", "0"),
        ("Summer Hat", "Joy Santos", "Kath Shop", "Luna", "120", "5"),
    ];

    let mut created = Vec::new();
    for (item, buyer, seller, town, price, fee) in drops {
        let mut new_item = NewItem::new(item, buyer, seller);
        new_item.location = town.to_string();
        new_item.price = price.to_string();
        new_item.transfer_fee = fee.to_string();
        let new_item = new_item.normalized();
        new_item
            .validate()
            .map_err(|errors| anyhow::anyhow!("Invalid seed item: {}", errors[0]))?;
        created.push(store.create_item(&new_item)?);
    }
    println!("✓ Created {} drops", created.len());

    // Mark a couple claimed so balances have something to show
    apply_status_change(&store, &created[0].id, ItemStatus::Claimed)?;
    apply_status_change(&store, &created[2].id, ItemStatus::Claimed)?;
    println!("✓ Marked 2 items claimed");

    println!("\n✅ Seed complete → {}", db_path);
    println!("   Run: cargo run report {}", db_path);
    Ok(())
}

fn run_report(db_path: &str) -> Result<()> {
    println!("📊 {} - Report", APP_NAME);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if !Path::new(db_path).exists() {
        eprintln!("❌ Database not found: {}", db_path);
        eprintln!("   Run: cargo run seed");
        std::process::exit(1);
    }

    let store = SqliteStore::open(Path::new(db_path))?;
    let items = store.all_items()?;

    let stats = compute_stats(&items, Role::Admin, "Administrator");
    println!("\n🗃️  Totals");
    println!("   All items:  {}", stats.total);
    println!("   Ready:      {}", stats.dropped);
    println!("   Claimed:    {}", stats.claimed);
    println!("   Archived:   {}", stats.archived);

    let view = compute_view(&items, Role::Admin, "Administrator", &ViewFilters::default());
    println!(
        "\n📋 Active list (page 1 of {}, {} items)",
        view.total_pages, view.total_count
    );
    for item in &view.page_items {
        println!(
            "   [{}] {} → {} @ {} ({})",
            item.status,
            item.item_name,
            item.buyer_name,
            item.location,
            item.price
        );
    }

    let balances = compute_balances(&items, Role::Admin);
    println!("\n💰 Seller balances");
    if balances.is_empty() {
        println!("   No pending balances.");
    }
    for group in &balances {
        println!(
            "   {}: {} item(s), total ₱{:.2}",
            group.name,
            group.items.len(),
            group.total
        );
    }

    // Export everything claimed, just to show the artifact
    let claimed_ids: HashSet<String> = items
        .iter()
        .filter(|i| i.status == ItemStatus::Claimed)
        .map(|i| i.id.clone())
        .collect();
    if let Some(csv_text) = export_selected(&items, &claimed_ids)? {
        let filename = export_filename(chrono::Utc::now().date_naive());
        std::fs::write(&filename, csv_text)?;
        println!("\n📤 Exported {} claimed item(s) → {}", claimed_ids.len(), filename);
    }

    Ok(())
}
