// 🔍 Item View Engine - filtering, sorting, pagination
//
// Pure derivation over the latest snapshot: same inputs, same output.
// The engine is re-run on every store notification; no incremental state.

use serde::{Deserialize, Serialize};

use crate::items::{parse_lenient_decimal, DropItem, ItemStatus};
use crate::session::Role;

/// Page size choices exposed by the list view
pub const PAGE_SIZE_OPTIONS: [usize; 4] = [5, 10, 20, 50];

/// Default page size
pub const DEFAULT_PAGE_SIZE: usize = 10;

// ============================================================================
// FILTER PARAMETERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// created_at
    Date,
    /// item_name, case-insensitive
    Name,
    /// location, case-insensitive, missing sorts as empty string
    Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Status filter for the main list.
///
/// `All` means "all active": archived statuses (cashed_out, pulled_out) are
/// hidden. Filtering on CashedOut shows the whole archive, pulled-out items
/// included. Every other explicit status matches exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Status(ItemStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: ItemStatus) -> bool {
        match self {
            StatusFilter::All => !status.is_archived(),
            StatusFilter::Status(ItemStatus::CashedOut) => status.is_archived(),
            StatusFilter::Status(wanted) => status == *wanted,
        }
    }
}

/// UI filter state for the main item list.
///
/// Use the setters: any change to search, status, sort, or page size resets
/// the current page to 1 so the user never lands on a stale page.
#[derive(Debug, Clone)]
pub struct ViewFilters {
    pub search: String,
    pub status: StatusFilter,
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
    /// 1-based
    pub page: usize,
    pub page_size: usize,
}

impl Default for ViewFilters {
    fn default() -> Self {
        ViewFilters {
            search: String::new(),
            status: StatusFilter::All,
            sort_by: SortKey::Date,
            sort_order: SortOrder::Desc,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ViewFilters {
    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
        self.page = 1;
    }

    pub fn set_status(&mut self, status: StatusFilter) {
        self.status = status;
        self.page = 1;
    }

    pub fn set_sort(&mut self, key: SortKey, order: SortOrder) {
        self.sort_by = key;
        self.sort_order = order;
        self.page = 1;
    }

    /// Ignores sizes outside PAGE_SIZE_OPTIONS
    pub fn set_page_size(&mut self, size: usize) {
        if PAGE_SIZE_OPTIONS.contains(&size) {
            self.page_size = size;
            self.page = 1;
        }
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }
}

// ============================================================================
// VIEW OUTPUT
// ============================================================================

#[derive(Debug, Clone)]
pub struct ItemView {
    /// The requested page of the filtered, sorted list
    pub page_items: Vec<DropItem>,
    /// Count after filtering, before pagination
    pub total_count: usize,
    /// ceil(total_count / page_size), never below 1
    pub total_pages: usize,
}

// ============================================================================
// VIEW COMPUTATION
// ============================================================================

/// Role-scoped, filtered, sorted, paginated view of the item collection.
///
/// Pure function of its inputs. `identity` is the session display name:
/// sellers only see their own drops; buyers see nothing at all until they
/// type a search term (privacy rule, not an optimization).
pub fn compute_view(
    items: &[DropItem],
    role: Role,
    identity: &str,
    filters: &ViewFilters,
) -> ItemView {
    if role == Role::Buyer && filters.search.trim().is_empty() {
        return ItemView {
            page_items: Vec::new(),
            total_count: 0,
            total_pages: 1,
        };
    }

    let search_lower = filters.search.to_lowercase();

    let mut filtered: Vec<&DropItem> = items
        .iter()
        .filter(|item| {
            if role == Role::Seller && item.seller_name != identity {
                return false;
            }

            let matches_search = match role {
                Role::Buyer => {
                    item.buyer_name.to_lowercase().contains(&search_lower)
                        || item.location.to_lowercase().contains(&search_lower)
                }
                _ => {
                    item.item_name.to_lowercase().contains(&search_lower)
                        || item.buyer_name.to_lowercase().contains(&search_lower)
                        || item.seller_name.to_lowercase().contains(&search_lower)
                        || item.location.to_lowercase().contains(&search_lower)
                }
            };

            matches_search && filters.status.matches(item.status)
        })
        .collect();

    // Stable sort: ties keep their original snapshot order
    filtered.sort_by(|a, b| {
        let ordering = match filters.sort_by {
            SortKey::Date => a.created_at.cmp(&b.created_at),
            SortKey::Name => a
                .item_name
                .to_lowercase()
                .cmp(&b.item_name.to_lowercase()),
            SortKey::Location => a.location.to_lowercase().cmp(&b.location.to_lowercase()),
        };
        match filters.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });

    let total_count = filtered.len();
    let total_pages = total_count.div_ceil(filters.page_size).max(1);

    let start = (filters.page.max(1) - 1) * filters.page_size;
    let page_items: Vec<DropItem> = filtered
        .into_iter()
        .skip(start)
        .take(filters.page_size)
        .cloned()
        .collect();

    ItemView {
        page_items,
        total_count,
        total_pages,
    }
}

// ============================================================================
// STATS
// ============================================================================

/// Dashboard counters plus the seller's payable balance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub dropped: usize,
    pub claimed: usize,
    /// cashed_out + pulled_out
    pub archived: usize,
    /// Claimed, not externally paid, price + fee (sellers only; 0 otherwise)
    pub balance: f64,
}

pub fn compute_stats(items: &[DropItem], role: Role, identity: &str) -> Stats {
    let viewable: Vec<&DropItem> = match role {
        Role::Seller => items.iter().filter(|i| i.seller_name == identity).collect(),
        Role::Buyer => Vec::new(),
        Role::Admin => items.iter().collect(),
    };

    let balance = if role == Role::Seller {
        viewable
            .iter()
            .filter(|i| i.status == ItemStatus::Claimed && !i.is_paid_externally)
            .map(|i| {
                parse_lenient_decimal(&i.price) + parse_lenient_decimal(&i.transfer_fee)
            })
            .sum()
    } else {
        0.0
    };

    Stats {
        total: viewable.len(),
        dropped: viewable
            .iter()
            .filter(|i| i.status == ItemStatus::Dropped)
            .count(),
        claimed: viewable
            .iter()
            .filter(|i| i.status == ItemStatus::Claimed)
            .count(),
        archived: viewable.iter().filter(|i| i.status.is_archived()).count(),
        balance,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn item(name: &str, buyer: &str, seller: &str, status: ItemStatus, age_mins: i64) -> DropItem {
        DropItem {
            id: format!("id-{}-{}", name, age_mins),
            item_name: name.to_string(),
            buyer_name: buyer.to_string(),
            seller_name: seller.to_string(),
            location: "SFC".to_string(),
            price: "100".to_string(),
            transfer_fee: "0".to_string(),
            status,
            is_paid_externally: false,
            created_at: Utc::now() - Duration::minutes(age_mins),
            claimed_at: None,
        }
    }

    fn sample_items() -> Vec<DropItem> {
        vec![
            item("Zeta", "Maria", "Shop A", ItemStatus::Dropped, 30),
            item("alpha", "Ana", "Shop B", ItemStatus::Dropped, 20),
            item("Mango", "Liza", "Shop A", ItemStatus::Claimed, 10),
            item("Old Coat", "Maria", "Shop B", ItemStatus::CashedOut, 5),
            item("Hat", "Ana", "Shop A", ItemStatus::PulledOut, 1),
        ]
    }

    #[test]
    fn test_view_is_deterministic() {
        let items = sample_items();
        let filters = ViewFilters::default();
        let first = compute_view(&items, Role::Admin, "Administrator", &filters);
        let second = compute_view(&items, Role::Admin, "Administrator", &filters);
        let first_ids: Vec<&str> = first.page_items.iter().map(|i| i.id.as_str()).collect();
        let second_ids: Vec<&str> = second.page_items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(first_ids, second_ids);
        assert_eq!(first.total_count, second.total_count);
    }

    #[test]
    fn test_buyer_without_search_sees_nothing() {
        let items = sample_items();
        let filters = ViewFilters::default();
        let view = compute_view(&items, Role::Buyer, "Maria", &filters);
        assert!(view.page_items.is_empty());
        assert_eq!(view.total_count, 0);
        assert_eq!(view.total_pages, 1);
    }

    #[test]
    fn test_buyer_search_matches_buyer_name_or_location() {
        let items = sample_items();
        let mut filters = ViewFilters::default();

        filters.set_search("maria");
        let view = compute_view(&items, Role::Buyer, "Maria", &filters);
        // "Old Coat" is archived and excluded by the All filter
        assert_eq!(view.total_count, 1);
        assert_eq!(view.page_items[0].item_name, "Zeta");

        // Buyers never match on item name
        filters.set_search("zeta");
        let view = compute_view(&items, Role::Buyer, "Maria", &filters);
        assert_eq!(view.total_count, 0);

        // Location matches work for buyers
        filters.set_search("sfc");
        let view = compute_view(&items, Role::Buyer, "Maria", &filters);
        assert_eq!(view.total_count, 3);
    }

    #[test]
    fn test_seller_sees_only_own_items() {
        let items = sample_items();
        let filters = ViewFilters::default();
        let view = compute_view(&items, Role::Seller, "Shop A", &filters);
        assert_eq!(view.total_count, 2); // Zeta + Mango; Hat is archived
        assert!(view.page_items.iter().all(|i| i.seller_name == "Shop A"));
    }

    #[test]
    fn test_all_filter_hides_archive() {
        let items = sample_items();
        let filters = ViewFilters::default();
        let view = compute_view(&items, Role::Admin, "Administrator", &filters);
        assert!(view
            .page_items
            .iter()
            .all(|i| !i.status.is_archived()));
    }

    #[test]
    fn test_cashed_out_filter_includes_pulled_out() {
        let items = sample_items();
        let mut filters = ViewFilters::default();
        filters.set_status(StatusFilter::Status(ItemStatus::CashedOut));
        let view = compute_view(&items, Role::Admin, "Administrator", &filters);
        assert_eq!(view.total_count, 2);
        let names: Vec<&str> = view.page_items.iter().map(|i| i.item_name.as_str()).collect();
        assert!(names.contains(&"Old Coat"));
        assert!(names.contains(&"Hat"));
    }

    #[test]
    fn test_exact_status_filter() {
        let items = sample_items();
        let mut filters = ViewFilters::default();
        filters.set_status(StatusFilter::Status(ItemStatus::Claimed));
        let view = compute_view(&items, Role::Admin, "Administrator", &filters);
        assert_eq!(view.total_count, 1);
        assert_eq!(view.page_items[0].item_name, "Mango");
    }

    #[test]
    fn test_sort_by_name_is_case_insensitive() {
        let items = sample_items();
        let mut filters = ViewFilters::default();
        filters.set_sort(SortKey::Name, SortOrder::Asc);
        filters.set_status(StatusFilter::Status(ItemStatus::Dropped));

        let mut all = items.clone();
        // Add a claimed one so only name ordering matters among dropped
        all.retain(|i| i.status == ItemStatus::Dropped);
        all.push(item("Mango", "Liza", "Shop A", ItemStatus::Dropped, 10));

        let view = compute_view(&all, Role::Admin, "Administrator", &filters);
        let names: Vec<&str> = view.page_items.iter().map(|i| i.item_name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "Mango", "Zeta"]);
    }

    #[test]
    fn test_pagination_and_page_count() {
        let items: Vec<DropItem> = (0..12)
            .map(|n| item(&format!("Item{:02}", n), "B", "S", ItemStatus::Dropped, n))
            .collect();

        let mut filters = ViewFilters::default();
        filters.set_page_size(5);

        let page1 = compute_view(&items, Role::Admin, "Administrator", &filters);
        assert_eq!(page1.total_count, 12);
        assert_eq!(page1.total_pages, 3);
        assert_eq!(page1.page_items.len(), 5);

        filters.set_page(3);
        let page3 = compute_view(&items, Role::Admin, "Administrator", &filters);
        assert_eq!(page3.page_items.len(), 2);

        // Out-of-range page yields an empty slice, not a panic
        filters.set_page(9);
        let beyond = compute_view(&items, Role::Admin, "Administrator", &filters);
        assert!(beyond.page_items.is_empty());
        assert_eq!(beyond.total_pages, 3);
    }

    #[test]
    fn test_filter_changes_reset_page() {
        let mut filters = ViewFilters::default();
        filters.set_page(4);
        filters.set_search("dress");
        assert_eq!(filters.page, 1);

        filters.set_page(4);
        filters.set_status(StatusFilter::Status(ItemStatus::Claimed));
        assert_eq!(filters.page, 1);

        filters.set_page(4);
        filters.set_sort(SortKey::Location, SortOrder::Asc);
        assert_eq!(filters.page, 1);

        filters.set_page(4);
        filters.set_page_size(50);
        assert_eq!(filters.page, 1);

        // Unrecognized page size is ignored entirely
        filters.set_page(4);
        filters.set_page_size(33);
        assert_eq!(filters.page_size, 50);
        assert_eq!(filters.page, 4);
    }

    #[test]
    fn test_stats_for_seller_includes_balance() {
        let mut items = sample_items();
        items[2].price = "₱1,000".to_string();
        items[2].transfer_fee = "50".to_string(); // Mango, claimed, Shop A

        let stats = compute_stats(&items, Role::Seller, "Shop A");
        assert_eq!(stats.total, 3);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.claimed, 1);
        assert_eq!(stats.archived, 1);
        assert_eq!(stats.balance, 1050.0);

        // Externally paid claimed items drop out of the balance
        items[2].is_paid_externally = true;
        let stats = compute_stats(&items, Role::Seller, "Shop A");
        assert_eq!(stats.balance, 0.0);
    }

    #[test]
    fn test_stats_for_buyer_are_empty() {
        let stats = compute_stats(&sample_items(), Role::Buyer, "Maria");
        assert_eq!(stats.total, 0);
        assert_eq!(stats.balance, 0.0);
    }
}
