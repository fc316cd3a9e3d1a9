//! Shopping cart contents and their transitions.
//!
//! Every mutation is a pure function from the previous contents to the next,
//! so the aggregate can apply one as a single swap.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product record as supplied by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// One row of the cart.
///
/// Price and display attributes are copied from the product when it is
/// first added and never refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub product_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl CartLineItem {
    /// Snapshot a product into a new line item with quantity 1.
    ///
    /// A negative catalog price is recorded as zero.
    pub fn from_product(product: &Product) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            image_url: product.image_url.clone(),
            category: product.category.clone(),
            unit_price: product.price.max(Decimal::ZERO),
            quantity: 1,
        }
    }

    /// Whether the unit price is usable (zero or more).
    pub fn has_valid_price(&self) -> bool {
        self.unit_price >= Decimal::ZERO
    }

    /// `unit_price * quantity`.
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A cart mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Add one unit of a product
    Add(Product),
    /// Remove a product's line entirely
    Remove(String),
    /// Shift a product's quantity by `delta`, never below 1
    UpdateQuantity { product_id: String, delta: i64 },
    /// Empty the cart
    Clear,
}

/// Ordered line items, at most one per product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartContents(Vec<CartLineItem>);

impl CartContents {
    /// An empty cart.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build contents from stored line items.
    ///
    /// Lines with a negative unit price are dropped, duplicate product ids
    /// are merged into the first occurrence and zero quantities are raised
    /// to 1, so contents loaded from storage hold the same invariants as
    /// contents built through `apply`.
    pub fn from_items(items: Vec<CartLineItem>) -> Self {
        let mut merged: Vec<CartLineItem> = Vec::with_capacity(items.len());
        for mut item in items.into_iter().filter(CartLineItem::has_valid_price) {
            item.quantity = item.quantity.max(1);
            match merged.iter_mut().find(|m| m.product_id == item.product_id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(item.quantity);
                }
                None => merged.push(item),
            }
        }
        Self(merged)
    }

    /// Produce the contents that result from applying `action`.
    pub fn apply(&self, action: &CartAction) -> Self {
        match action {
            CartAction::Add(product) => self.with_added(product),
            CartAction::Remove(product_id) => Self(
                self.0
                    .iter()
                    .filter(|item| item.product_id != *product_id)
                    .cloned()
                    .collect(),
            ),
            CartAction::UpdateQuantity { product_id, delta } => Self(
                self.0
                    .iter()
                    .map(|item| {
                        if item.product_id == *product_id {
                            CartLineItem {
                                quantity: shifted_quantity(item.quantity, *delta),
                                ..item.clone()
                            }
                        } else {
                            item.clone()
                        }
                    })
                    .collect(),
            ),
            CartAction::Clear => Self::new(),
        }
    }

    fn with_added(&self, product: &Product) -> Self {
        let mut items = self.0.clone();
        match items.iter_mut().find(|item| item.product_id == product.id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(1),
            None => items.push(CartLineItem::from_product(product)),
        }
        Self(items)
    }

    /// Sum of `unit_price * quantity` over all items.
    pub fn total(&self) -> Decimal {
        self.0.iter().map(CartLineItem::subtotal).sum()
    }

    /// Sum of quantities over all items.
    pub fn item_count(&self) -> u64 {
        self.0.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Look up a line item by product id.
    pub fn get(&self, product_id: &str) -> Option<&CartLineItem> {
        self.0.iter().find(|item| item.product_id == product_id)
    }

    /// The line items in insertion order.
    pub fn items(&self) -> &[CartLineItem] {
        &self.0
    }

    /// Number of distinct products.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the cart has no items.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn shifted_quantity(quantity: u32, delta: i64) -> u32 {
    let shifted = i64::from(quantity).saturating_add(delta).max(1);
    u32::try_from(shifted).unwrap_or(u32::MAX)
}
