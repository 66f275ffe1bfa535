// ⚖️ Balance Aggregator - who is owed what
//
// Groups claimed items by seller and sums price + transfer fee for every
// item the buyer has not already paid outside the system. Recomputed from
// the full snapshot on every change; the totals must always equal the sum
// of the lenient-parsed member amounts.

use serde::Serialize;
use std::collections::HashMap;

use crate::items::{DropItem, ItemStatus};
use crate::session::Role;

/// Page size for the cash-out seller list
pub const BALANCE_PAGE_SIZE: usize = 10;

/// Seller name used when an item somehow has none
const UNKNOWN_SELLER: &str = "Unknown";

// ============================================================================
// SELLER BALANCE GROUP
// ============================================================================

/// Derived, never persisted: one seller's claimed items and payable total.
///
/// Externally-paid items stay in `items` (the invoice shows them struck
/// through) but contribute nothing to `total`.
#[derive(Debug, Clone, Serialize)]
pub struct SellerBalance {
    pub name: String,
    pub items: Vec<DropItem>,
    pub total: f64,
}

impl SellerBalance {
    /// Item ids in this group, in invoice order
    pub fn item_ids(&self) -> Vec<String> {
        self.items.iter().map(|i| i.id.clone()).collect()
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Group claimed items by seller with payable totals.
///
/// Admin-only: any other role gets an empty result. That is an authorization
/// rule, not an optimization - balances are nobody else's business.
pub fn compute_balances(items: &[DropItem], role: Role) -> Vec<SellerBalance> {
    if role != Role::Admin {
        return Vec::new();
    }

    let mut groups: HashMap<String, SellerBalance> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for item in items {
        if item.status != ItemStatus::Claimed {
            continue;
        }

        let seller = if item.seller_name.trim().is_empty() {
            UNKNOWN_SELLER.to_string()
        } else {
            item.seller_name.clone()
        };

        let group = groups.entry(seller.clone()).or_insert_with(|| {
            order.push(seller.clone());
            SellerBalance {
                name: seller.clone(),
                items: Vec::new(),
                total: 0.0,
            }
        });

        group.items.push(item.clone());
        if !item.is_paid_externally {
            group.total += item.amount();
        }
    }

    let mut balances: Vec<SellerBalance> = order
        .into_iter()
        .filter_map(|name| groups.remove(&name))
        .collect();
    balances.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    balances
}

// ============================================================================
// BALANCE BROWSER (search + pagination over the groups)
// ============================================================================

/// One page of the seller balance list
#[derive(Debug, Clone, Serialize)]
pub struct BalancePage {
    pub sellers: Vec<SellerBalance>,
    pub total_count: usize,
    pub total_pages: usize,
}

/// Search and pagination state for the cash-out picker.
///
/// The page snaps back to 1 whenever the search term changes or the picker
/// is (re)opened, matching how the operator expects the list to behave.
#[derive(Debug, Clone)]
pub struct BalanceBrowser {
    pub search: String,
    /// 1-based
    pub page: usize,
}

impl Default for BalanceBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl BalanceBrowser {
    pub fn new() -> Self {
        BalanceBrowser {
            search: String::new(),
            page: 1,
        }
    }

    /// Call when the picker is (re)opened
    pub fn open(&mut self) {
        self.page = 1;
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
        self.page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// Case-insensitive seller-name search plus fixed-size pagination
    pub fn page_view(&self, balances: &[SellerBalance]) -> BalancePage {
        let term = self.search.trim().to_lowercase();

        let filtered: Vec<&SellerBalance> = balances
            .iter()
            .filter(|group| term.is_empty() || group.name.to_lowercase().contains(&term))
            .collect();

        let total_count = filtered.len();
        let total_pages = total_count.div_ceil(BALANCE_PAGE_SIZE).max(1);

        let start = (self.page.max(1) - 1) * BALANCE_PAGE_SIZE;
        let sellers: Vec<SellerBalance> = filtered
            .into_iter()
            .skip(start)
            .take(BALANCE_PAGE_SIZE)
            .cloned()
            .collect();

        BalancePage {
            sellers,
            total_count,
            total_pages,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::parse_lenient_decimal;
    use chrono::Utc;

    fn claimed(seller: &str, price: &str, fee: &str, paid_externally: bool) -> DropItem {
        DropItem {
            id: uuid::Uuid::new_v4().to_string(),
            item_name: "Item".to_string(),
            buyer_name: "Buyer".to_string(),
            seller_name: seller.to_string(),
            location: "SFC".to_string(),
            price: price.to_string(),
            transfer_fee: fee.to_string(),
            status: ItemStatus::Claimed,
            is_paid_externally: paid_externally,
            created_at: Utc::now(),
            claimed_at: Some(Utc::now()),
        }
    }

    fn with_status(mut item: DropItem, status: ItemStatus) -> DropItem {
        item.status = status;
        item
    }

    #[test]
    fn test_only_admin_gets_balances() {
        let items = vec![claimed("Shop A", "100", "0", false)];
        assert_eq!(compute_balances(&items, Role::Seller).len(), 0);
        assert_eq!(compute_balances(&items, Role::Buyer).len(), 0);
        assert_eq!(compute_balances(&items, Role::Admin).len(), 1);
    }

    #[test]
    fn test_total_equals_lenient_sum() {
        let items = vec![
            claimed("Shop A", "₱1,000.50", "10", false),
            claimed("Shop A", "250", "5.5", false),
        ];
        let balances = compute_balances(&items, Role::Admin);
        assert_eq!(balances.len(), 1);

        let expected: f64 = items
            .iter()
            .map(|i| parse_lenient_decimal(&i.price) + parse_lenient_decimal(&i.transfer_fee))
            .sum();
        assert_eq!(balances[0].total, expected);
        assert_eq!(balances[0].items.len(), 2);
    }

    #[test]
    fn test_externally_paid_stays_listed_but_adds_zero() {
        let items = vec![
            claimed("Shop A", "100", "0", false),
            claimed("Shop A", "999", "1", true),
        ];
        let balances = compute_balances(&items, Role::Admin);
        assert_eq!(balances[0].items.len(), 2);
        assert_eq!(balances[0].total, 100.0);
    }

    #[test]
    fn test_non_claimed_items_never_grouped() {
        let items = vec![
            with_status(claimed("Shop A", "100", "0", false), ItemStatus::Dropped),
            with_status(claimed("Shop A", "100", "0", false), ItemStatus::CashedOut),
            with_status(claimed("Shop A", "100", "0", false), ItemStatus::PulledOut),
            with_status(claimed("Shop A", "100", "0", false), ItemStatus::Cancelled),
        ];
        assert!(compute_balances(&items, Role::Admin).is_empty());
    }

    #[test]
    fn test_groups_sorted_by_name_and_disjoint() {
        let items = vec![
            claimed("zeta shop", "10", "0", false),
            claimed("Alpha Shop", "20", "0", false),
            claimed("Mango Shop", "30", "0", false),
        ];
        let balances = compute_balances(&items, Role::Admin);
        let names: Vec<&str> = balances.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha Shop", "Mango Shop", "zeta shop"]);

        // No item appears in more than one group
        let total_items: usize = balances.iter().map(|b| b.items.len()).sum();
        assert_eq!(total_items, items.len());
    }

    #[test]
    fn test_blank_seller_grouped_as_unknown() {
        let items = vec![claimed("", "50", "0", false)];
        let balances = compute_balances(&items, Role::Admin);
        assert_eq!(balances[0].name, "Unknown");
        assert_eq!(balances[0].total, 50.0);
    }

    #[test]
    fn test_browser_search_and_pagination() {
        let items: Vec<DropItem> = (0..25)
            .map(|n| claimed(&format!("Shop {:02}", n), "10", "0", false))
            .collect();
        let balances = compute_balances(&items, Role::Admin);

        let mut browser = BalanceBrowser::new();
        let page = browser.page_view(&balances);
        assert_eq!(page.total_count, 25);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.sellers.len(), BALANCE_PAGE_SIZE);

        browser.set_page(3);
        assert_eq!(browser.page_view(&balances).sellers.len(), 5);

        // Changing the search resets to page 1
        browser.set_search("shop 1");
        assert_eq!(browser.page, 1);
        let filtered = browser.page_view(&balances);
        assert_eq!(filtered.total_count, 10); // Shop 10..19
        assert_eq!(filtered.total_pages, 1);

        browser.set_page(2);
        browser.open();
        assert_eq!(browser.page, 1);
    }
}
