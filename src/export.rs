// 📤 Mass Actions - bulk delete and CSV export over a selection
//
// Both operate on a set of selected item ids. Delete is PIN-gated and goes
// through one batched write; export serializes the selection to CSV with
// every field quoted (names carry commas: "Dress, White").

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;

use crate::items::DropItem;
use crate::store::{BatchOp, ItemStore};

/// Export column order, fixed
pub const CSV_HEADERS: [&str; 10] = [
    "Date Added",
    "Item Name",
    "Buyer",
    "Seller",
    "Location",
    "Price",
    "Transfer Fee",
    "Status",
    "Claimed Date",
    "Paid Externally?",
];

// ============================================================================
// MASS DELETE
// ============================================================================

/// Mass delete failure categories: authorization is distinct from backend
/// trouble so the UI can phrase them differently.
#[derive(Debug)]
pub enum MassDeleteError {
    /// PIN mismatch; nothing was mutated
    IncorrectPin,
    /// The batched delete failed; nothing was committed (single batch)
    Store(anyhow::Error),
}

impl std::fmt::Display for MassDeleteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MassDeleteError::IncorrectPin => write!(f, "Incorrect PIN. Deletion cancelled."),
            MassDeleteError::Store(err) => write!(f, "Error deleting items: {}", err),
        }
    }
}

impl std::error::Error for MassDeleteError {}

/// Delete every selected item in one atomic batch, gated by the admin PIN.
///
/// Empty selection is a no-op (Ok(0)). A wrong PIN aborts with zero
/// mutation. The selection is capped by the store's batch limit; an
/// oversized selection fails before anything is deleted.
pub fn mass_delete(
    store: &dyn ItemStore,
    selected: &HashSet<String>,
    pin: &str,
    admin_pin: &str,
) -> Result<usize, MassDeleteError> {
    if selected.is_empty() {
        return Ok(0);
    }
    if pin != admin_pin {
        return Err(MassDeleteError::IncorrectPin);
    }

    let ops: Vec<BatchOp> = selected
        .iter()
        .map(|id| BatchOp::Delete { id: id.clone() })
        .collect();

    store.commit_batch(&ops).map_err(MassDeleteError::Store)?;
    Ok(ops.len())
}

// ============================================================================
// CSV EXPORT
// ============================================================================

/// MM/DD/YY, the short date format used everywhere in the tracker
pub fn format_short_date(date: Option<DateTime<Utc>>) -> String {
    match date {
        Some(dt) => dt.format("%m/%d/%y").to_string(),
        None => String::new(),
    }
}

/// Export filename: `KishDBSoria_Export_<M-D-YYYY>.csv` (no leading zeros)
pub fn export_filename(date: NaiveDate) -> String {
    use chrono::Datelike;
    format!(
        "KishDBSoria_Export_{}-{}-{}.csv",
        date.month(),
        date.day(),
        date.year()
    )
}

/// Serialize the selected items to CSV text.
///
/// Selection order follows the snapshot, not the click order. Every field
/// is double-quote-wrapped with internal quotes doubled; a missing transfer
/// fee renders as "0". Returns None for an empty selection (no-op).
pub fn export_selected(
    items: &[DropItem],
    selected: &HashSet<String>,
) -> Result<Option<String>> {
    if selected.is_empty() {
        return Ok(None);
    }

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADERS)?;

    for item in items.iter().filter(|i| selected.contains(&i.id)) {
        let fee = if item.transfer_fee.trim().is_empty() {
            "0".to_string()
        } else {
            item.transfer_fee.clone()
        };
        writer.write_record([
            format_short_date(Some(item.created_at)),
            item.item_name.clone(),
            item.buyer_name.clone(),
            item.seller_name.clone(),
            item.location.clone(),
            item.price.clone(),
            fee,
            item.status.as_str().to_string(),
            format_short_date(item.claimed_at),
            if item.is_paid_externally { "Yes" } else { "No" }.to_string(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("CSV buffer error: {}", err))?;
    Ok(Some(String::from_utf8(bytes)?))
}

// ============================================================================
// TESTS
// ============================================================================
