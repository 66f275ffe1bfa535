// 💰 Cash-Out Workflow - pay a seller, archive the items
//
// Marks every claimed item in a seller's balance group as cashed_out using
// chunked batched writes (the backend caps a batch at 250 operations).
// Each chunk commits atomically; the workflow as a whole does not. A failure
// partway leaves earlier chunks committed, so the outcome report must say
// exactly how far it got and which items were left untouched.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::balance::SellerBalance;
use crate::items::ItemStatus;
use crate::session::Role;
use crate::store::{BatchOp, ItemPatch, ItemStore};

/// Items per batched write, matching the backend batch limit
pub const CASH_OUT_CHUNK_SIZE: usize = 250;

// ============================================================================
// OUTCOME
// ============================================================================

/// Three-way result of a cash-out run.
///
/// The caller must be able to tell "everything archived" from "nothing
/// happened" from "chunk k of n committed, these ids were not processed".
/// Retrying after Partial is safe: re-archiving an already cashed_out item
/// is a same-value overwrite.
#[derive(Debug, Clone, Serialize)]
pub enum CashOutOutcome {
    /// Every chunk committed
    Completed {
        seller: String,
        items_processed: usize,
        chunks_committed: usize,
    },

    /// Some chunks committed, then one failed; later chunks never started
    Partial {
        seller: String,
        items_processed: usize,
        chunks_committed: usize,
        chunks_total: usize,
        unprocessed_ids: Vec<String>,
        error: String,
    },

    /// The first chunk failed; nothing was committed
    Failed {
        seller: String,
        unprocessed_ids: Vec<String>,
        error: String,
    },
}

impl CashOutOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, CashOutOutcome::Completed { .. })
    }

    pub fn items_processed(&self) -> usize {
        match self {
            CashOutOutcome::Completed {
                items_processed, ..
            }
            | CashOutOutcome::Partial {
                items_processed, ..
            } => *items_processed,
            CashOutOutcome::Failed { .. } => 0,
        }
    }

    pub fn unprocessed_ids(&self) -> &[String] {
        match self {
            CashOutOutcome::Completed { .. } => &[],
            CashOutOutcome::Partial {
                unprocessed_ids, ..
            }
            | CashOutOutcome::Failed {
                unprocessed_ids, ..
            } => unprocessed_ids,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            CashOutOutcome::Completed {
                seller,
                items_processed,
                chunks_committed,
            } => format!(
                "Payout recorded for {}: {} items archived in {} batch(es)",
                seller, items_processed, chunks_committed
            ),
            CashOutOutcome::Partial {
                seller,
                items_processed,
                chunks_committed,
                chunks_total,
                unprocessed_ids,
                error,
            } => format!(
                "Partial payout for {}: batch {} of {} failed ({}); {} items archived, {} not processed",
                seller,
                chunks_committed + 1,
                chunks_total,
                error,
                items_processed,
                unprocessed_ids.len()
            ),
            CashOutOutcome::Failed { seller, error, .. } => {
                format!("Payout failed for {}: {} (nothing archived)", seller, error)
            }
        }
    }
}

// ============================================================================
// ERRORS (rejected before any write)
// ============================================================================

#[derive(Debug, PartialEq, Eq)]
pub enum CashOutError {
    /// Only admins may pay out
    NotAuthorized,
    /// Another cash-out is running; rejected, never queued
    AlreadyInFlight,
    /// The balance group had no items
    NothingToProcess,
}

impl std::fmt::Display for CashOutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CashOutError::NotAuthorized => write!(f, "Cash-out is an admin-only operation"),
            CashOutError::AlreadyInFlight => {
                write!(f, "A cash-out is already in progress")
            }
            CashOutError::NothingToProcess => write!(f, "No items to cash out"),
        }
    }
}

impl std::error::Error for CashOutError {}

// ============================================================================
// ENGINE
// ============================================================================

/// Runs cash-outs with a processing flag: one in flight at a time.
///
/// Callers must re-derive the balance group from live data right before
/// invoking - a stale group risks double-processing (harmless per item, but
/// the invoice would be wrong).
pub struct CashOutEngine {
    in_flight: AtomicBool,
}

impl CashOutEngine {
    pub fn new() -> Self {
        CashOutEngine {
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_processing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Archive every item in the group as cashed_out, 250 ids per batch,
    /// each batch awaited before the next starts.
    pub fn cash_out(
        &self,
        store: &dyn ItemStore,
        role: Role,
        group: &SellerBalance,
    ) -> Result<CashOutOutcome, CashOutError> {
        if role != Role::Admin {
            return Err(CashOutError::NotAuthorized);
        }
        if group.items.is_empty() {
            return Err(CashOutError::NothingToProcess);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CashOutError::AlreadyInFlight);
        }

        let outcome = run_chunks(store, group);

        self.in_flight.store(false, Ordering::SeqCst);
        Ok(outcome)
    }
}

impl Default for CashOutEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn run_chunks(store: &dyn ItemStore, group: &SellerBalance) -> CashOutOutcome {
    let ids = group.item_ids();
    let chunks_total = ids.len().div_ceil(CASH_OUT_CHUNK_SIZE);

    for (chunk_index, chunk) in ids.chunks(CASH_OUT_CHUNK_SIZE).enumerate() {
        let ops: Vec<BatchOp> = chunk
            .iter()
            .map(|id| BatchOp::Update {
                id: id.clone(),
                patch: ItemPatch::status_only(ItemStatus::CashedOut),
            })
            .collect();

        if let Err(err) = store.commit_batch(&ops) {
            let items_processed = chunk_index * CASH_OUT_CHUNK_SIZE;
            let unprocessed_ids: Vec<String> = ids[items_processed..].to_vec();

            return if chunk_index == 0 {
                CashOutOutcome::Failed {
                    seller: group.name.clone(),
                    unprocessed_ids,
                    error: err.to_string(),
                }
            } else {
                CashOutOutcome::Partial {
                    seller: group.name.clone(),
                    items_processed,
                    chunks_committed: chunk_index,
                    chunks_total,
                    unprocessed_ids,
                    error: err.to_string(),
                }
            };
        }
    }

    CashOutOutcome::Completed {
        seller: group.name.clone(),
        items_processed: ids.len(),
        chunks_committed: chunks_total,
    }
}

// ============================================================================
// TESTS
// ============================================================================
