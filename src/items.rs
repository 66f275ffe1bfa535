// 📦 Drop Item Model - Records for merchandise in transit
//
// A "drop" is one piece of merchandise a seller left at the pickup point.
// Prices are kept as the free-form strings the operator typed; all money
// math goes through parse_lenient_decimal, which mirrors what the pickup
// point has always done (strip junk characters, take the leading number).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Admin access PIN. Doubles as the confirmation gate for destructive
/// mass actions (see export::mass_delete).
pub const ADMIN_PIN: &str = "041412";

/// Application display name (used in invoices and export filenames)
pub const APP_NAME: &str = "KishDBSoria Dropping Area";

/// La Union towns served by the pickup point
pub const PICKUP_TOWNS: [&str; 16] = [
    "SFC",
    "Bacnotan",
    "Bangar",
    "Bauang",
    "Agoo",
    "Caba",
    "Aringay",
    "Rosario",
    "San Juan",
    "Balaoan",
    "Luna",
    "San Gabriel",
    "Naguillian",
    "Damortis / Sto Tomas",
    "Tubao",
    "Pugo",
];

/// Default town for new drops
pub const DEFAULT_TOWN: &str = "SFC";

// ============================================================================
// ITEM STATUS
// ============================================================================

/// Lifecycle status of a drop item
///
/// Main path: dropped → claimed → cashed_out
/// Side branches: dropped → pulled_out, dropped → cancelled
/// Undo: claimed → dropped (clears claimed_at), pulled_out → dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Waiting at the pickup point for the buyer
    Dropped,

    /// Buyer has retrieved the item; payable to seller unless paid externally
    Claimed,

    /// Admin paid out the seller; archived
    CashedOut,

    /// Admin removed the item without a claim (archived, distinct from cancelled)
    PulledOut,

    /// Drop cancelled before pickup
    Cancelled,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Dropped => "dropped",
            ItemStatus::Claimed => "claimed",
            ItemStatus::CashedOut => "cashed_out",
            ItemStatus::PulledOut => "pulled_out",
            ItemStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<ItemStatus> {
        match s {
            "dropped" => Some(ItemStatus::Dropped),
            "claimed" => Some(ItemStatus::Claimed),
            "cashed_out" => Some(ItemStatus::CashedOut),
            "pulled_out" => Some(ItemStatus::PulledOut),
            "cancelled" => Some(ItemStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether a single-item admin action may move this status to `next`.
    ///
    /// Same-status overwrites are allowed (idempotent retries). Batch writes
    /// bypass this check on purpose - the cash-out workflow re-derives its
    /// input from live data instead.
    pub fn can_transition_to(&self, next: ItemStatus) -> bool {
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (ItemStatus::Dropped, ItemStatus::Claimed)
                | (ItemStatus::Dropped, ItemStatus::PulledOut)
                | (ItemStatus::Dropped, ItemStatus::Cancelled)
                | (ItemStatus::Claimed, ItemStatus::Dropped)
                | (ItemStatus::Claimed, ItemStatus::CashedOut)
                | (ItemStatus::PulledOut, ItemStatus::Dropped)
        )
    }

    /// Archived statuses are hidden from the default ("All Active") view
    pub fn is_archived(&self) -> bool {
        matches!(self, ItemStatus::CashedOut | ItemStatus::PulledOut)
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// LENIENT DECIMAL PARSING
// ============================================================================

/// Parse a free-form money string the way the pickup point always has:
/// strip everything but digits and dots, then take the longest leading
/// number (at most one dot). Anything unparseable is 0.
///
/// "₱1,250.50" → 1250.5, "12.5.3" → 12.5, "" → 0.0, "---" → 0.0
///
/// This leniency is load-bearing: prices are entered by hand with currency
/// signs, commas, and typos, and balances must still add up.
pub fn parse_lenient_decimal(raw: &str) -> f64 {
    let mut number = String::new();
    let mut seen_dot = false;

    for c in raw.chars() {
        if c.is_ascii_digit() {
            number.push(c);
        } else if c == '.' {
            if seen_dot {
                // Second dot ends the number ("12.5.3" → "12.5")
                break;
            }
            seen_dot = true;
            number.push('.');
        }
        // Any other character is stripped and parsing continues
    }

    number.parse::<f64>().unwrap_or(0.0)
}

// ============================================================================
// DROP ITEM
// ============================================================================

/// One piece of merchandise in transit through the pickup point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropItem {
    /// Opaque unique id, assigned by the store on creation
    pub id: String,

    pub item_name: String,
    pub buyer_name: String,
    pub seller_name: String,

    /// One of PICKUP_TOWNS
    pub location: String,

    /// Free-form price string as entered ("500", "₱1,250.50", ...)
    pub price: String,

    /// Free-form transfer fee string; "0" when absent
    pub transfer_fee: String,

    pub status: ItemStatus,

    /// Buyer settled payment outside the system; excluded from payout totals
    pub is_paid_externally: bool,

    /// Server-assigned at creation, immutable
    pub created_at: DateTime<Utc>,

    /// Set when transitioning into Claimed, cleared on revert to Dropped
    pub claimed_at: Option<DateTime<Utc>>,
}

impl DropItem {
    /// Payable amount for this item: price + transfer fee, lenient-parsed
    pub fn amount(&self) -> f64 {
        parse_lenient_decimal(&self.price) + parse_lenient_decimal(&self.transfer_fee)
    }
}

// ============================================================================
// NEW ITEM (creation input)
// ============================================================================

/// Input for creating a drop. The store assigns id, timestamp, and the
/// initial Dropped status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
    pub item_name: String,
    pub buyer_name: String,
    pub seller_name: String,
    pub location: String,
    pub price: String,
    pub transfer_fee: String,
}

impl NewItem {
    pub fn new(item_name: &str, buyer_name: &str, seller_name: &str) -> Self {
        NewItem {
            item_name: item_name.to_string(),
            buyer_name: buyer_name.to_string(),
            seller_name: seller_name.to_string(),
            location: DEFAULT_TOWN.to_string(),
            price: "0".to_string(),
            transfer_fee: "0".to_string(),
        }
    }

    /// Validate required fields before any write is attempted.
    /// Empty price/fee are normalized to "0" by `normalized`, not rejected.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.item_name.trim().is_empty() {
            errors.push(FieldError {
                field: "item_name".to_string(),
                message: "Required field is empty".to_string(),
            });
        }
        if self.buyer_name.trim().is_empty() {
            errors.push(FieldError {
                field: "buyer_name".to_string(),
                message: "Required field is empty".to_string(),
            });
        }
        if self.seller_name.trim().is_empty() {
            errors.push(FieldError {
                field: "seller_name".to_string(),
                message: "Please select a seller".to_string(),
            });
        }
        if !PICKUP_TOWNS.contains(&self.location.as_str()) {
            errors.push(FieldError {
                field: "location".to_string(),
                message: format!("Unknown town: {}", self.location),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Apply input defaults: blank price/fee become "0"
    pub fn normalized(mut self) -> Self {
        if self.price.trim().is_empty() {
            self.price = "0".to_string();
        }
        if self.transfer_fee.trim().is_empty() {
            self.transfer_fee = "0".to_string();
        }
        self
    }
}

/// A single rejected field in a validation failure
#[derive(Debug, Clone)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for FieldError {}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_parse_strips_currency_and_commas() {
        assert_eq!(parse_lenient_decimal("₱1,250.50"), 1250.50);
        assert_eq!(parse_lenient_decimal("500"), 500.0);
        assert_eq!(parse_lenient_decimal(" 10 pesos "), 10.0);
    }

    #[test]
    fn test_lenient_parse_defaults_to_zero() {
        assert_eq!(parse_lenient_decimal(""), 0.0);
        assert_eq!(parse_lenient_decimal("---"), 0.0);
        assert_eq!(parse_lenient_decimal("."), 0.0);
    }

    #[test]
    fn test_lenient_parse_takes_leading_number() {
        // Second dot ends the number, like JS parseFloat
        assert_eq!(parse_lenient_decimal("12.5.3"), 12.5);
        assert_eq!(parse_lenient_decimal("12..5"), 12.0);
        assert_eq!(parse_lenient_decimal(".5"), 0.5);
        assert_eq!(parse_lenient_decimal("5."), 5.0);
    }

    #[test]
    fn test_status_transitions_main_path() {
        assert!(ItemStatus::Dropped.can_transition_to(ItemStatus::Claimed));
        assert!(ItemStatus::Claimed.can_transition_to(ItemStatus::CashedOut));
        assert!(ItemStatus::Claimed.can_transition_to(ItemStatus::Dropped));
        assert!(ItemStatus::Dropped.can_transition_to(ItemStatus::PulledOut));
        assert!(ItemStatus::Dropped.can_transition_to(ItemStatus::Cancelled));
        assert!(ItemStatus::PulledOut.can_transition_to(ItemStatus::Dropped));
    }

    #[test]
    fn test_status_transitions_rejected() {
        assert!(!ItemStatus::Dropped.can_transition_to(ItemStatus::CashedOut));
        assert!(!ItemStatus::CashedOut.can_transition_to(ItemStatus::Claimed));
        assert!(!ItemStatus::Cancelled.can_transition_to(ItemStatus::Dropped));
        // Idempotent overwrite is always allowed
        assert!(ItemStatus::CashedOut.can_transition_to(ItemStatus::CashedOut));
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            ItemStatus::Dropped,
            ItemStatus::Claimed,
            ItemStatus::CashedOut,
            ItemStatus::PulledOut,
            ItemStatus::Cancelled,
        ] {
            assert_eq!(ItemStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ItemStatus::parse("unknown"), None);
    }

    #[test]
    fn test_new_item_validation() {
        let ok = NewItem::new("White Dress", "Maria Cruz", "Kath Shop");
        assert!(ok.validate().is_ok());

        let missing = NewItem::new("", "Maria Cruz", "");
        let errors = missing.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "item_name");
        assert_eq!(errors[1].field, "seller_name");
    }

    #[test]
    fn test_new_item_normalized_defaults() {
        let mut item = NewItem::new("Bag", "Ana", "Shop");
        item.price = "".to_string();
        item.transfer_fee = "  ".to_string();
        let item = item.normalized();
        assert_eq!(item.price, "0");
        assert_eq!(item.transfer_fee, "0");
    }

    #[test]
    fn test_amount_sums_price_and_fee() {
        let item = DropItem {
            id: "x".to_string(),
            item_name: "Dress".to_string(),
            buyer_name: "Maria".to_string(),
            seller_name: "Kath".to_string(),
            location: "SFC".to_string(),
            price: "₱500".to_string(),
            transfer_fee: "10".to_string(),
            status: ItemStatus::Claimed,
            is_paid_externally: false,
            created_at: Utc::now(),
            claimed_at: None,
        };
        assert_eq!(item.amount(), 510.0);
    }
}
