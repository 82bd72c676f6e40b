//! In-memory store, optionally mirrored to flat JSON files.
//!
//! One [`MemoryStore`] implements every store trait. Opened with
//! [`MemoryStore::open`], each table lives in its own file under the data
//! directory (`users.json`, `products.json`, `carts.json`) and is rewritten
//! after every mutation that touches it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use trinity_core::{CartId, CartItemId, ProductId, Quantity};

use super::{CartStore, CatalogLookup, IdentityLookup, ProductStore, RepositoryError, UserStore};
use crate::models::{Cart, CartItem, NewProduct, NewUser, Product, ProductUpdate, User, UserUpdate};

const USERS_FILE: &str = "users.json";
const PRODUCTS_FILE: &str = "products.json";
const CARTS_FILE: &str = "carts.json";

/// On-disk record of a cart. Lines reference products by ID only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCart {
    id: CartId,
    owner_username: String,
    items: Vec<StoredItem>,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredItem {
    id: CartItemId,
    product_id: ProductId,
    quantity: Quantity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Table {
    Users,
    Products,
    Carts,
}

#[derive(Debug, Clone)]
struct Tables {
    users: Vec<User>,
    products: Vec<Product>,
    carts: Vec<StoredCart>,
    next_product_id: ProductId,
    next_cart_id: CartId,
    next_item_id: CartItemId,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            products: Vec::new(),
            carts: Vec::new(),
            next_product_id: ProductId::new(1),
            next_cart_id: CartId::new(1),
            next_item_id: CartItemId::new(1),
        }
    }
}

impl Tables {
    fn product_name(&self, id: ProductId) -> Option<&str> {
        self.products
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.as_str())
    }

    fn resolve_item(&self, cart_id: CartId, item: &StoredItem) -> Option<CartItem> {
        self.product_name(item.product_id).map(|name| CartItem {
            id: item.id,
            cart_id,
            product_id: item.product_id,
            product_name: name.to_owned(),
            quantity: item.quantity,
        })
    }

    fn resolve_cart(&self, cart: &StoredCart) -> Cart {
        Cart {
            id: cart.id,
            owner_username: cart.owner_username.clone(),
            items: cart
                .items
                .iter()
                .filter_map(|item| self.resolve_item(cart.id, item))
                .collect(),
            created_at: cart.created_at,
            updated_at: cart.updated_at,
        }
    }

    fn cart_mut(&mut self, id: CartId) -> Result<&mut StoredCart, RepositoryError> {
        self.carts
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RepositoryError::NotFound)
    }

    fn allocate_product_id(&mut self) -> ProductId {
        let id = self.next_product_id;
        self.next_product_id = id.next();
        id
    }

    fn allocate_cart_id(&mut self) -> CartId {
        let id = self.next_cart_id;
        self.next_cart_id = id.next();
        id
    }

    fn allocate_item_id(&mut self) -> CartItemId {
        let id = self.next_item_id;
        self.next_item_id = id.next();
        id
    }
}

/// Store holding every table in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    data_dir: Option<PathBuf>,
}

impl MemoryStore {
    /// Create an empty store that is never written to disk.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the JSON files under `data_dir`, creating the directory if needed.
    ///
    /// Missing files are treated as empty tables.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Io` if the directory cannot be read or created
    /// and `RepositoryError::Serialization` if a file is malformed.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&data_dir).await?;

        let users: Vec<User> = read_table(&data_dir.join(USERS_FILE)).await?;
        let products: Vec<Product> = read_table(&data_dir.join(PRODUCTS_FILE)).await?;
        let carts: Vec<StoredCart> = read_table(&data_dir.join(CARTS_FILE)).await?;

        let next_product_id = products
            .iter()
            .map(|p| p.id)
            .max()
            .map_or(ProductId::new(1), |id| id.next());
        let next_cart_id = carts
            .iter()
            .map(|c| c.id)
            .max()
            .map_or(CartId::new(1), |id| id.next());
        let next_item_id = carts
            .iter()
            .flat_map(|c| c.items.iter().map(|i| i.id))
            .max()
            .map_or(CartItemId::new(1), |id| id.next());

        debug!(
            dir = %data_dir.display(),
            users = users.len(),
            products = products.len(),
            carts = carts.len(),
            "loaded JSON data files"
        );

        Ok(Self {
            tables: RwLock::new(Tables {
                users,
                products,
                carts,
                next_product_id,
                next_cart_id,
                next_item_id,
            }),
            data_dir: Some(data_dir),
        })
    }

    /// Apply `mutate` and write the touched tables to disk.
    ///
    /// With a data directory the change is staged on a copy and only becomes
    /// visible once every file is written, so a failed write leaves no trace.
    async fn commit<T>(
        &self,
        which: &[Table],
        mutate: impl FnOnce(&mut Tables) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut tables = self.tables.write().await;
        let Some(dir) = &self.data_dir else {
            return mutate(&mut *tables);
        };

        let mut staged = tables.clone();
        let out = mutate(&mut staged)?;
        for table in which {
            match table {
                Table::Users => write_table(&dir.join(USERS_FILE), &staged.users).await?,
                Table::Products => write_table(&dir.join(PRODUCTS_FILE), &staged.products).await?,
                Table::Carts => write_table(&dir.join(CARTS_FILE), &staged.carts).await?,
            }
        }
        *tables = staged;
        Ok(out)
    }
}

async fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, RepositoryError> {
    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Write a table atomically: to a sibling temp file, then rename over.
async fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), RepositoryError> {
    let bytes = serde_json::to_vec_pretty(rows)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

// =============================================================================
// Users
// =============================================================================

#[async_trait]
impl IdentityLookup for MemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut users = tables.users.clone();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        self.commit(&[Table::Users], |tables| {
            if tables.users.iter().any(|u| u.username == user.username) {
                return Err(RepositoryError::Conflict("username already exists".to_owned()));
            }

            let user = User {
                username: user.username,
                name: user.name,
                email: user.email,
                role: user.role,
                created_at: Utc::now(),
            };
            tables.users.push(user.clone());
            Ok(user)
        })
        .await
    }

    #[instrument(skip(self, update))]
    async fn update_user(
        &self,
        username: &str,
        update: UserUpdate,
    ) -> Result<User, RepositoryError> {
        let tables_touched = if update.username.as_deref().is_some_and(|new| new != username) {
            &[Table::Users, Table::Products, Table::Carts][..]
        } else {
            &[Table::Users][..]
        };

        self.commit(tables_touched, |tables| {
            let renamed_to = update.username.filter(|new| new.as_str() != username);
            if let Some(new) = &renamed_to
                && tables.users.iter().any(|u| &u.username == new)
            {
                return Err(RepositoryError::Conflict("username already exists".to_owned()));
            }

            let user = tables
                .users
                .iter_mut()
                .find(|u| u.username == username)
                .ok_or(RepositoryError::NotFound)?;

            if let Some(name) = update.name {
                user.name = name;
            }
            if let Some(email) = update.email {
                user.email = email;
            }
            if let Some(role) = update.role {
                user.role = role;
            }

            let Some(new) = renamed_to else {
                return Ok(user.clone());
            };

            user.username.clone_from(&new);
            let user = user.clone();

            for product in tables.products.iter_mut().filter(|p| p.owner_username == username) {
                product.owner_username.clone_from(&new);
            }
            for cart in tables.carts.iter_mut().filter(|c| c.owner_username == username) {
                cart.owner_username.clone_from(&new);
            }
            Ok(user)
        })
        .await
    }
}

// =============================================================================
// Products
// =============================================================================

#[async_trait]
impl CatalogLookup for MemoryStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.products.iter().find(|p| p.name == name).cloned())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.tables.read().await.products.clone())
    }

    #[instrument(skip(self, product), fields(name = %product.name))]
    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        self.commit(&[Table::Products], |tables| {
            if tables.products.iter().any(|p| p.name == product.name) {
                return Err(RepositoryError::Conflict(
                    "product name already exists".to_owned(),
                ));
            }
            if !tables
                .users
                .iter()
                .any(|u| u.username == product.owner_username)
            {
                return Err(RepositoryError::NotFound);
            }

            let product = Product {
                id: tables.allocate_product_id(),
                name: product.name,
                category: product.category,
                price: product.price,
                owner_username: product.owner_username,
                created_at: Utc::now(),
            };
            tables.products.push(product.clone());
            Ok(product)
        })
        .await
    }

    #[instrument(skip(self, update))]
    async fn update_product(
        &self,
        name: &str,
        update: ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        self.commit(&[Table::Products], |tables| {
            if let Some(new) = update.name.as_deref()
                && new != name
                && tables.products.iter().any(|p| p.name == new)
            {
                return Err(RepositoryError::Conflict(
                    "product name already exists".to_owned(),
                ));
            }

            let product = tables
                .products
                .iter_mut()
                .find(|p| p.name == name)
                .ok_or(RepositoryError::NotFound)?;

            if let Some(new) = update.name {
                product.name = new;
            }
            if let Some(category) = update.category {
                product.category = category;
            }
            if let Some(price) = update.price {
                product.price = price;
            }
            Ok(product.clone())
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete_product(&self, name: &str) -> Result<Product, RepositoryError> {
        self.commit(&[Table::Products, Table::Carts], |tables| {
            let index = tables
                .products
                .iter()
                .position(|p| p.name == name)
                .ok_or(RepositoryError::NotFound)?;
            let product = tables.products.remove(index);

            let now = Utc::now();
            for cart in &mut tables.carts {
                let before = cart.items.len();
                cart.items.retain(|item| item.product_id != product.id);
                if cart.items.len() != before {
                    cart.updated_at = now;
                }
            }
            Ok(product)
        })
        .await
    }
}

// =============================================================================
// Carts
// =============================================================================

#[async_trait]
impl CartStore for MemoryStore {
    async fn find_by_owner(&self, username: &str) -> Result<Option<Cart>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .carts
            .iter()
            .find(|c| c.owner_username == username)
            .map(|c| tables.resolve_cart(c)))
    }

    #[instrument(skip(self))]
    async fn create(&self, username: &str) -> Result<Cart, RepositoryError> {
        {
            let tables = self.tables.read().await;
            if let Some(existing) = tables.carts.iter().find(|c| c.owner_username == username) {
                return Ok(tables.resolve_cart(existing));
            }
        }

        self.commit(&[Table::Carts], |tables| {
            if let Some(existing) = tables.carts.iter().find(|c| c.owner_username == username) {
                return Ok(tables.resolve_cart(existing));
            }
            if !tables.users.iter().any(|u| u.username == username) {
                return Err(RepositoryError::NotFound);
            }

            let now = Utc::now();
            let cart = StoredCart {
                id: tables.allocate_cart_id(),
                owner_username: username.to_owned(),
                items: Vec::new(),
                created_at: now,
                updated_at: now,
            };
            let resolved = tables.resolve_cart(&cart);
            tables.carts.push(cart);
            Ok(resolved)
        })
        .await
    }

    async fn find_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .carts
            .iter()
            .find(|c| c.id == cart_id)
            .and_then(|c| c.items.iter().find(|i| i.product_id == product_id))
            .and_then(|item| tables.resolve_item(cart_id, item)))
    }

    #[instrument(skip(self))]
    async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        self.commit(&[Table::Carts], |tables| {
            if tables.product_name(product_id).is_none() {
                return Err(RepositoryError::NotFound);
            }

            let position = tables
                .cart_mut(cart_id)?
                .items
                .iter()
                .position(|i| i.product_id == product_id);

            let stored = match position {
                Some(index) => {
                    let existing = tables
                        .cart_mut(cart_id)?
                        .items
                        .get_mut(index)
                        .ok_or(RepositoryError::NotFound)?;
                    existing.quantity = existing.quantity.checked_add(quantity)?;
                    existing.clone()
                }
                None => {
                    let item = StoredItem {
                        id: tables.allocate_item_id(),
                        product_id,
                        quantity,
                    };
                    tables.cart_mut(cart_id)?.items.push(item.clone());
                    item
                }
            };
            tables.cart_mut(cart_id)?.updated_at = Utc::now();

            tables
                .resolve_item(cart_id, &stored)
                .ok_or(RepositoryError::NotFound)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn set_item_quantity(
        &self,
        item_id: CartItemId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        self.commit(&[Table::Carts], |tables| {
            let (cart_id, stored) = tables
                .carts
                .iter_mut()
                .find_map(|cart| {
                    let cart_id = cart.id;
                    let item = cart.items.iter_mut().find(|i| i.id == item_id)?;
                    item.quantity = quantity;
                    let stored = item.clone();
                    cart.updated_at = Utc::now();
                    Some((cart_id, stored))
                })
                .ok_or(RepositoryError::NotFound)?;

            tables
                .resolve_item(cart_id, &stored)
                .ok_or(RepositoryError::NotFound)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn remove_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<u64, RepositoryError> {
        self.commit(&[Table::Carts], |tables| {
            let cart = tables.cart_mut(cart_id)?;

            let before = cart.items.len();
            cart.items.retain(|item| item.product_id != product_id);
            let removed = before - cart.items.len();
            if removed > 0 {
                cart.updated_at = Utc::now();
            }
            Ok(removed as u64)
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use trinity_core::{Email, Price, QuantityError, Role};

    use super::*;

    fn new_user(username: &str, role: Role) -> NewUser {
        NewUser {
            username: username.to_owned(),
            name: username.to_uppercase(),
            email: Email::parse(&format!("{username}@example.com")).unwrap(),
            role,
        }
    }

    fn new_product(name: &str, owner: &str) -> NewProduct {
        NewProduct {
            name: name.to_owned(),
            category: "Pet Food".to_owned(),
            price: Price::new(Decimal::new(1999, 2)).unwrap(),
            owner_username: owner.to_owned(),
        }
    }

    async fn seeded(store: &MemoryStore) -> (Product, Product) {
        store.create_user(new_user("alice", Role::Buyer)).await.unwrap();
        store.create_user(new_user("sam", Role::Seller)).await.unwrap();
        let p1 = store.create_product(new_product("Pedigree", "sam")).await.unwrap();
        let p2 = store.create_product(new_product("Whiskas", "sam")).await.unwrap();
        (p1, p2)
    }

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("alice", Role::Buyer)).await.unwrap();
        let err = store
            .create_user(new_user("alice", Role::Seller))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_cart_is_idempotent() {
        let store = MemoryStore::new();
        seeded(&store).await;

        let first = store.create("alice").await.unwrap();
        let second = store.create("alice").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.tables.read().await.carts.len(), 1);
    }

    #[tokio::test]
    async fn test_add_item_merges_existing_line() {
        let store = MemoryStore::new();
        let (pedigree, _) = seeded(&store).await;
        let cart = store.create("alice").await.unwrap();

        store.add_item(cart.id, pedigree.id, qty(2)).await.unwrap();
        let item = store.add_item(cart.id, pedigree.id, qty(3)).await.unwrap();
        assert_eq!(item.quantity.get(), 5);

        let cart = store.find_by_owner("alice").await.unwrap().unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].product_name, "Pedigree");
    }

    #[tokio::test]
    async fn test_items_keep_insertion_order() {
        let store = MemoryStore::new();
        let (pedigree, whiskas) = seeded(&store).await;
        let cart = store.create("alice").await.unwrap();

        store.add_item(cart.id, whiskas.id, qty(1)).await.unwrap();
        store.add_item(cart.id, pedigree.id, qty(1)).await.unwrap();

        let cart = store.find_by_owner("alice").await.unwrap().unwrap();
        let names: Vec<_> = cart.items.iter().map(|i| i.product_name.as_str()).collect();
        assert_eq!(names, ["Whiskas", "Pedigree"]);
    }

    #[tokio::test]
    async fn test_set_quantity_and_remove() {
        let store = MemoryStore::new();
        let (pedigree, whiskas) = seeded(&store).await;
        let cart = store.create("alice").await.unwrap();
        let item = store.add_item(cart.id, pedigree.id, qty(2)).await.unwrap();

        let updated = store.set_item_quantity(item.id, qty(9)).await.unwrap();
        assert_eq!(updated.quantity.get(), 9);

        assert_eq!(store.remove_item(cart.id, whiskas.id).await.unwrap(), 0);
        assert_eq!(store.remove_item(cart.id, pedigree.id).await.unwrap(), 1);
        assert!(store.find_item(cart.id, pedigree.id).await.unwrap().is_none());

        let missing = store.set_item_quantity(item.id, qty(1)).await.unwrap_err();
        assert!(matches!(missing, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_product_rename_shows_in_cart() {
        let store = MemoryStore::new();
        let (pedigree, _) = seeded(&store).await;
        let cart = store.create("alice").await.unwrap();
        store.add_item(cart.id, pedigree.id, qty(1)).await.unwrap();

        let update = ProductUpdate {
            name: Some("Pedigree Adult".to_owned()),
            ..ProductUpdate::default()
        };
        store.update_product("Pedigree", update).await.unwrap();

        let cart = store.find_by_owner("alice").await.unwrap().unwrap();
        assert_eq!(cart.items[0].product_name, "Pedigree Adult");
    }

    #[tokio::test]
    async fn test_delete_product_strips_cart_lines() {
        let store = MemoryStore::new();
        let (pedigree, whiskas) = seeded(&store).await;
        let cart = store.create("alice").await.unwrap();
        store.add_item(cart.id, pedigree.id, qty(1)).await.unwrap();
        store.add_item(cart.id, whiskas.id, qty(1)).await.unwrap();

        store.delete_product("Pedigree").await.unwrap();

        let cart = store.find_by_owner("alice").await.unwrap().unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].product_id, whiskas.id);
        assert!(matches!(
            store.delete_product("Pedigree").await.unwrap_err(),
            RepositoryError::NotFound
        ));
    }

    #[tokio::test]
    async fn test_rename_user_cascades() {
        let store = MemoryStore::new();
        seeded(&store).await;
        store.create("alice").await.unwrap();

        let update = UserUpdate {
            username: Some("alicia".to_owned()),
            ..UserUpdate::default()
        };
        store.update_user("alice", update).await.unwrap();
        assert!(store.find_by_owner("alice").await.unwrap().is_none());
        assert!(store.find_by_owner("alicia").await.unwrap().is_some());

        let update = UserUpdate {
            username: Some("samuel".to_owned()),
            ..UserUpdate::default()
        };
        store.update_user("sam", update).await.unwrap();
        let product = store.find_by_name("Pedigree").await.unwrap().unwrap();
        assert_eq!(product.owner_username, "samuel");
    }

    #[tokio::test]
    async fn test_rename_user_into_existing_conflicts() {
        let store = MemoryStore::new();
        seeded(&store).await;

        let update = UserUpdate {
            username: Some("sam".to_owned()),
            ..UserUpdate::default()
        };
        let err = store.update_user("alice", update).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_json_files_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = MemoryStore::open(dir.path()).await.unwrap();
            let (pedigree, _) = seeded(&store).await;
            let cart = store.create("alice").await.unwrap();
            store.add_item(cart.id, pedigree.id, qty(4)).await.unwrap();
        }

        assert!(dir.path().join(USERS_FILE).exists());
        assert!(dir.path().join(PRODUCTS_FILE).exists());
        assert!(dir.path().join(CARTS_FILE).exists());

        let store = MemoryStore::open(dir.path()).await.unwrap();
        let cart = store.find_by_owner("alice").await.unwrap().unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity.get(), 4);

        // IDs keep counting past what was loaded.
        let p3 = store.create_product(new_product("Felix", "sam")).await.unwrap();
        assert_eq!(p3.id, ProductId::new(3));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_trace() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let store = MemoryStore::open(&data_dir).await.unwrap();
        let (pedigree, _) = seeded(&store).await;
        let cart = store.create("alice").await.unwrap();
        store.add_item(cart.id, pedigree.id, qty(2)).await.unwrap();

        tokio::fs::remove_dir_all(&data_dir).await.unwrap();

        let err = store.create_user(new_user("bob", Role::Buyer)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Io(_)));
        assert!(store.find_by_username("bob").await.unwrap().is_none());

        assert!(store.add_item(cart.id, pedigree.id, qty(3)).await.is_err());
        assert!(store.delete_product("Pedigree").await.is_err());
        assert!(store.create_product(new_product("Felix", "sam")).await.is_err());

        let cart = store.find_by_owner("alice").await.unwrap().unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity.get(), 2);
        assert!(store.find_by_name("Pedigree").await.unwrap().is_some());

        // Once writable again, nothing from the failed calls resurfaces.
        tokio::fs::create_dir_all(&data_dir).await.unwrap();
        store.create_user(new_user("carol", Role::Buyer)).await.unwrap();
        let felix = store.create_product(new_product("Felix", "sam")).await.unwrap();
        assert_eq!(felix.id, ProductId::new(3));

        let reopened = MemoryStore::open(&data_dir).await.unwrap();
        assert!(reopened.find_by_username("bob").await.unwrap().is_none());
        assert!(reopened.find_by_username("carol").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_merge_overflow_is_quantity_error() {
        let store = MemoryStore::new();
        let (pedigree, _) = seeded(&store).await;
        let cart = store.create("alice").await.unwrap();
        store
            .add_item(cart.id, pedigree.id, qty(i64::from(Quantity::MAX)))
            .await
            .unwrap();

        let err = store.add_item(cart.id, pedigree.id, qty(1)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Quantity(QuantityError::Overflow)));

        let cart = store.find_by_owner("alice").await.unwrap().unwrap();
        assert_eq!(cart.items[0].quantity.get(), Quantity::MAX);
    }

    #[tokio::test]
    async fn test_open_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::open(dir.path().join("fresh")).await.unwrap();
        assert!(store.list_users().await.unwrap().is_empty());
        assert!(store.list_products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(USERS_FILE), b"{ not json")
            .await
            .unwrap();
        let err = MemoryStore::open(dir.path()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Serialization(_)));
    }
}
