use core::str::FromStr;

use serde::{Deserialize, Serialize};

use tradepost_core::{AccountId, LedgerError, ProductId};

/// Fixed set of product categories.
///
/// The boundary receives the label as text; parsing is exact-match and
/// case-sensitive, mirroring the wire format the original listing surface
/// sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Electronics,
    Clothing,
    Books,
    Home,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Electronics,
        Category::Clothing,
        Category::Books,
        Category::Home,
        Category::Other,
    ];

    /// Canonical label, as accepted by the [`FromStr`] impl.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Electronics => "Electronics",
            Category::Clothing => "Clothing",
            Category::Books => "Books",
            Category::Home => "Home",
            Category::Other => "Other",
        }
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .find(|c| c.label() == s)
            .copied()
            .ok_or_else(|| LedgerError::invalid_category(s))
    }
}

/// A listed product.
///
/// `id`, `price`, and `category` are immutable after creation; only
/// `owner`/`purchased`/`seller` change, and only through trade events.
/// Products are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Price in the smallest currency unit.
    pub price: u64,
    pub category: Category,
    pub owner: AccountId,
    pub purchased: bool,
    /// Previous owner, recorded while a buyer holds the product; the refund
    /// counterparty. `None` whenever the product is available for sale.
    pub seller: Option<AccountId>,
}
