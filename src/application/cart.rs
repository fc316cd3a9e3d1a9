//! The shopping cart aggregate.
//!
//! Holds the authoritative cart for one browsing session, mirrors it into a
//! durable key-value store after every mutation, and reports additions
//! through the notification port.

use crate::application::ports::{KeyValueStore, Notifier, Placement, ProductCatalog, StoreError};
use crate::domain::cart::{CartAction, CartContents, CartLineItem, Product};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Storage key the cart is persisted under.
pub const CART_STORAGE_KEY: &str = "cart";

/// Placement of the "added to cart" notification.
pub const ADDED_PLACEMENT: Placement = Placement::BottomRight;

/// Error returned when a catalog product cannot be added.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// No product with this id
    #[error("product {0:?} not found")]
    UnknownProduct(String),
    /// The product is not for sale
    #[error("product {0:?} is not available")]
    Inactive(String),
    /// The product has no stock left
    #[error("product {0:?} is out of stock")]
    OutOfStock(String),
    /// The catalog lists the product below zero
    #[error("product {0:?} has a negative price")]
    NegativePrice(String),
}

#[derive(Debug, Default)]
struct CartState {
    contents: CartContents,
    is_open: bool,
    revision: u64,
}

/// Shopping cart for one browsing session.
///
/// Each mutation runs under the state lock: the next contents are computed
/// from the previous ones and swapped in with a new revision. The store
/// write happens afterwards under a separate lock, so readers never wait on
/// storage I/O. Writes are serialized and a snapshot older than the last
/// one written is skipped, so the store never moves backwards.
///
/// Persistence is best-effort; a failed write is logged and the in-memory
/// cart stays as mutated.
#[derive(Debug)]
pub struct ShoppingCart {
    state: Mutex<CartState>,
    // Revision of the last snapshot written to the store.
    persisted: Mutex<u64>,
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    storage_key: String,
}

impl ShoppingCart {
    /// Create a cart seeded from the store under [`CART_STORAGE_KEY`].
    pub fn hydrate(store: Arc<dyn KeyValueStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self::hydrate_with_key(store, notifier, CART_STORAGE_KEY)
    }

    /// Create a cart seeded from the store under a custom key.
    ///
    /// A missing, unreadable or unparseable value yields an empty cart.
    pub fn hydrate_with_key(
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        storage_key: impl Into<String>,
    ) -> Self {
        let storage_key = storage_key.into();
        let contents = load_contents(store.as_ref(), &storage_key);

        Self {
            state: Mutex::new(CartState {
                contents,
                is_open: false,
                revision: 0,
            }),
            persisted: Mutex::new(0),
            store,
            notifier,
            storage_key,
        }
    }

    /// Add one unit of `product`.
    ///
    /// Increments the existing line or appends a new one, opens the cart
    /// and notifies the user. Availability is checked by the caller; see
    /// [`ShoppingCart::add_from_catalog`].
    pub fn add_item(&self, product: Product) {
        let name = product.name.clone();
        self.mutate(&CartAction::Add(product), true);
        self.notifier
            .notify(&format!("{name} added to cart"), ADDED_PLACEMENT);
    }

    /// Look a product up and add it if it can be sold.
    ///
    /// # Errors
    /// Returns `CartError` if the product is unknown, inactive, out of
    /// stock or priced below zero. The cart is unchanged in that case.
    pub fn add_from_catalog(
        &self,
        catalog: &dyn ProductCatalog,
        product_id: &str,
    ) -> Result<(), CartError> {
        let product = catalog
            .product(product_id)
            .ok_or_else(|| CartError::UnknownProduct(product_id.to_string()))?;

        if !product.active {
            return Err(CartError::Inactive(product.id));
        }
        if product.stock == 0 {
            return Err(CartError::OutOfStock(product.id));
        }
        if product.price < Decimal::ZERO {
            return Err(CartError::NegativePrice(product.id));
        }

        self.add_item(product);
        Ok(())
    }

    /// Remove a product's line. No-op if it is not in the cart.
    pub fn remove_item(&self, product_id: &str) {
        self.mutate(&CartAction::Remove(product_id.to_string()), false);
    }

    /// Shift a product's quantity by `delta`, never below 1.
    /// No-op if it is not in the cart.
    pub fn update_quantity(&self, product_id: &str, delta: i64) {
        let action = CartAction::UpdateQuantity {
            product_id: product_id.to_string(),
            delta,
        };
        self.mutate(&action, false);
    }

    /// Empty the cart.
    pub fn clear(&self) {
        self.mutate(&CartAction::Clear, false);
    }

    /// Copy of the line items in insertion order.
    pub fn items(&self) -> Vec<CartLineItem> {
        self.lock().contents.items().to_vec()
    }

    /// Copy of the current contents.
    pub fn contents(&self) -> CartContents {
        self.lock().contents.clone()
    }

    /// Sum of `unit_price * quantity`, recomputed on every call.
    pub fn total(&self) -> Decimal {
        self.lock().contents.total()
    }

    /// Sum of quantities.
    pub fn item_count(&self) -> u64 {
        self.lock().contents.item_count()
    }

    /// Check if the cart has no items.
    pub fn is_empty(&self) -> bool {
        self.lock().contents.is_empty()
    }

    /// Whether the cart panel is shown.
    pub fn is_open(&self) -> bool {
        self.lock().is_open
    }

    /// Show the cart panel.
    pub fn open(&self) {
        self.lock().is_open = true;
    }

    /// Hide the cart panel.
    pub fn close(&self) {
        self.lock().is_open = false;
    }

    /// Flip the cart panel's visibility.
    pub fn toggle(&self) {
        let mut state = self.lock();
        state.is_open = !state.is_open;
    }

    /// Key this cart is persisted under.
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    fn mutate(&self, action: &CartAction, open: bool) {
        let (snapshot, revision) = {
            let mut state = self.lock();
            state.contents = state.contents.apply(action);
            state.revision += 1;
            if open {
                state.is_open = true;
            }
            (state.contents.clone(), state.revision)
        };
        self.persist(&snapshot, revision);
    }

    fn persist(&self, contents: &CartContents, revision: u64) {
        let mut persisted = self.persisted.lock().unwrap_or_else(PoisonError::into_inner);
        if revision <= *persisted {
            return;
        }

        match save_contents(self.store.as_ref(), &self.storage_key, contents) {
            Ok(()) => *persisted = revision,
            Err(error) => tracing::warn!(
                key = %self.storage_key,
                %error,
                "failed to persist cart, keeping in-memory state"
            ),
        }
    }

    // Every mutation swaps in a fully built collection, so the state behind
    // a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, CartState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn load_contents(store: &dyn KeyValueStore, key: &str) -> CartContents {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return CartContents::new(),
        Err(error) => {
            tracing::warn!(key, %error, "failed to read saved cart, starting empty");
            return CartContents::new();
        }
    };

    match serde_json::from_str::<Vec<CartLineItem>>(&raw) {
        Ok(items) => {
            let rejected = items.iter().filter(|item| !item.has_valid_price()).count();
            if rejected > 0 {
                tracing::warn!(key, rejected, "dropped saved cart lines with a negative price");
            }
            let contents = CartContents::from_items(items);
            tracing::debug!(key, items = contents.len(), "restored saved cart");
            contents
        }
        Err(error) => {
            tracing::warn!(key, %error, "saved cart is malformed, starting empty");
            CartContents::new()
        }
    }
}

fn save_contents(
    store: &dyn KeyValueStore,
    key: &str,
    contents: &CartContents,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(contents)?;
    store.set(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::local_store::MemoryStore;
    use crate::infrastructure::mocks::{MockNotifier, MockStore};
    use std::str::FromStr;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    /// Store whose writes block until the test releases them.
    #[derive(Debug)]
    struct GatedStore {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl KeyValueStore for GatedStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
            Ok(())
        }
    }

    fn product(id: &str, price: &str) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Item {id}"),
            description: None,
            price: Decimal::from_str(price).unwrap(),
            image_url: Some(format!("/images/{id}.png")),
            category: None,
            stock: 3,
            active: true,
        }
    }

    fn cart() -> (ShoppingCart, Arc<MemoryStore>, MockNotifier) {
        let store = Arc::new(MemoryStore::new());
        let notifier = MockNotifier::new();
        let cart = ShoppingCart::hydrate(store.clone(), Arc::new(notifier.clone()));
        (cart, store, notifier)
    }

    #[test]
    fn test_add_opens_and_notifies() {
        let (cart, _, notifier) = cart();

        cart.add_item(product("d20", "4.50"));

        assert!(cart.is_open());
        let notes = notifier.notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message, "Item d20 added to cart");
        assert_eq!(notes[0].placement, Placement::BottomRight);
    }

    #[test]
    fn test_every_mutation_persists() {
        let (cart, store, _) = cart();

        cart.add_item(product("d20", "4.50"));
        let saved = store.get(CART_STORAGE_KEY).unwrap().unwrap();
        assert!(saved.contains("\"productId\":\"d20\""));

        cart.clear();
        assert_eq!(store.get(CART_STORAGE_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_open_flag_not_persisted() {
        let (cart, store, _) = cart();
        cart.add_item(product("d20", "1"));

        let saved = store.get(CART_STORAGE_KEY).unwrap().unwrap();
        assert!(!saved.contains("isOpen"));
    }

    #[test]
    fn test_toggle() {
        let (cart, _, _) = cart();
        assert!(!cart.is_open());
        cart.toggle();
        assert!(cart.is_open());
        cart.close();
        assert!(!cart.is_open());
        cart.open();
        assert!(cart.is_open());
    }

    #[test]
    fn test_failed_write_keeps_mutation() {
        let store = MockStore::new();
        store.fail_writes(true);
        let cart = ShoppingCart::hydrate(Arc::new(store.clone()), Arc::new(MockNotifier::new()));

        cart.add_item(product("d20", "2.00"));

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total(), Decimal::from(2));
        assert_eq!(store.write_attempts(), 1);
    }

    #[test]
    fn test_failed_read_starts_empty() {
        let store = MockStore::new();
        store.fail_reads(true);

        let cart = ShoppingCart::hydrate(Arc::new(store), Arc::new(MockNotifier::new()));

        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_from_catalog_rejections() {
        let (cart, _, notifier) = cart();
        let mut inactive = product("retired", "1");
        inactive.active = false;
        let mut sold_out = product("sold-out", "1");
        sold_out.stock = 0;
        let catalog = crate::infrastructure::catalog::InMemoryCatalog::from_products(vec![
            product("d20", "4.50"),
            inactive,
            sold_out,
        ]);

        assert_eq!(
            cart.add_from_catalog(&catalog, "missing"),
            Err(CartError::UnknownProduct("missing".to_string()))
        );
        assert_eq!(
            cart.add_from_catalog(&catalog, "retired"),
            Err(CartError::Inactive("retired".to_string()))
        );
        assert_eq!(
            cart.add_from_catalog(&catalog, "sold-out"),
            Err(CartError::OutOfStock("sold-out".to_string()))
        );
        assert!(cart.is_empty());
        assert_eq!(notifier.count(), 0);

        cart.add_from_catalog(&catalog, "d20").unwrap();
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_custom_storage_key() {
        let store = Arc::new(MemoryStore::new());
        let cart = ShoppingCart::hydrate_with_key(
            store.clone(),
            Arc::new(MockNotifier::new()),
            "guest-cart",
        );

        cart.add_item(product("d6", "1"));

        assert_eq!(cart.storage_key(), "guest-cart");
        assert!(store.get("guest-cart").unwrap().is_some());
        assert!(store.get(CART_STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_add_from_catalog_rejects_negative_price() {
        let (cart, _, notifier) = cart();
        let catalog = crate::infrastructure::catalog::InMemoryCatalog::from_products(vec![
            product("cursed", "-10"),
        ]);

        assert_eq!(
            cart.add_from_catalog(&catalog, "cursed"),
            Err(CartError::NegativePrice("cursed".to_string()))
        );
        assert!(cart.is_empty());
        assert_eq!(notifier.count(), 0);
    }

    #[test]
    fn test_reads_do_not_wait_for_store_write() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let store = GatedStore {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        };
        let cart = Arc::new(ShoppingCart::hydrate(
            Arc::new(store),
            Arc::new(MockNotifier::new()),
        ));

        let writer = {
            let cart = Arc::clone(&cart);
            thread::spawn(move || cart.add_item(product("d20", "4.50")))
        };
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // The write is in flight; the state lock must be free.
        assert!(cart.state.try_lock().is_ok());
        assert_eq!(cart.item_count(), 1);
        assert!(cart.is_open());

        release_tx.send(()).unwrap();
        writer.join().unwrap();
    }

    #[test]
    fn test_concurrent_mutations_persist_latest_state() {
        let (cart, store, _) = cart();
        let cart = Arc::new(cart);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cart = Arc::clone(&cart);
                thread::spawn(move || {
                    for _ in 0..10 {
                        cart.add_item(product("d20", "1"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let saved = store.get(CART_STORAGE_KEY).unwrap().unwrap();
        let items: Vec<CartLineItem> = serde_json::from_str(&saved).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 80);
    }
}
