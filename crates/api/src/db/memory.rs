//! In-memory storage backend.
//!
//! Implements every repository trait over a single `RwLock`ed state. Each
//! operation takes the lock once, so cart changes are as atomic here as the
//! single-statement updates in `PostgreSQL`. Data lives only as long as the
//! process.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use storekeep_core::{AccountId, Email, OperatorId, ProductId, Role};

use super::{
    AccountRepository, CartPush, OperatorRepository, ProductRepository, PrunedCart,
    RepositoryError,
};
use crate::models::{
    Account, AccountChanges, NewAccount, NewProduct, Operator, Product, ProductChanges,
    RetailerProfile, WriteScope,
};

/// Process-local store shared by clones.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<AccountId, StoredAccount>,
    emails: HashMap<Email, AccountId>,
    profiles: HashMap<AccountId, RetailerProfile>,
    /// Insertion order doubles as listing order.
    products: Vec<Product>,
    operators: HashMap<String, (Operator, String)>,
}

struct StoredAccount {
    account: Account,
    password_hash: String,
}

impl Inner {
    fn insert_account(&mut self, new: NewAccount) -> Result<Account, RepositoryError> {
        if self.emails.contains_key(&new.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let now = Utc::now();
        let account = Account {
            id: AccountId::generate(),
            name: new.name,
            email: new.email,
            role: new.role,
            cart: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.emails.insert(account.email.clone(), account.id);
        self.accounts.insert(
            account.id,
            StoredAccount {
                account: account.clone(),
                password_hash: new.password_hash,
            },
        );
        Ok(account)
    }

    fn account_mut(&mut self, id: AccountId) -> Result<&mut Account, RepositoryError> {
        self.accounts
            .get_mut(&id)
            .map(|stored| &mut stored.account)
            .ok_or(RepositoryError::NotFound)
    }

    fn product_exists(&self, id: ProductId) -> bool {
        self.products.iter().any(|p| p.id == id)
    }

    fn product_position(&self, id: ProductId, scope: WriteScope) -> Option<usize> {
        self.products
            .iter()
            .position(|p| p.id == id && scope.permits(p.owner_id))
    }
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn create(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        self.inner.write().await.insert_account(account)
    }

    async fn create_retailer(
        &self,
        account: NewAccount,
        store_name: &str,
    ) -> Result<(Account, RetailerProfile), RepositoryError> {
        let mut inner = self.inner.write().await;
        let account = inner.insert_account(NewAccount {
            role: Role::Retailer,
            ..account
        })?;
        let profile = RetailerProfile {
            account_id: account.id,
            store_name: store_name.to_owned(),
            created_at: account.created_at,
        };
        inner.profiles.insert(account.id, profile.clone());
        Ok((account, profile))
    }

    async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner.accounts.get(&id).map(|stored| stored.account.clone()))
    }

    async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(Account, String)>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .emails
            .get(email)
            .and_then(|id| inner.accounts.get(id))
            .map(|stored| (stored.account.clone(), stored.password_hash.clone())))
    }

    async fn update_password_hash(
        &self,
        id: AccountId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .accounts
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        password_hash.clone_into(&mut stored.password_hash);
        stored.account.updated_at = Utc::now();
        Ok(())
    }

    async fn update(
        &self,
        id: AccountId,
        changes: &AccountChanges,
    ) -> Result<Account, RepositoryError> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let stored = inner
            .accounts
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;

        if let Some(email) = &changes.email
            && *email != stored.account.email
        {
            if inner.emails.contains_key(email) {
                return Err(RepositoryError::Conflict("email already exists".to_owned()));
            }
            inner.emails.remove(&stored.account.email);
            inner.emails.insert(email.clone(), id);
            stored.account.email = email.clone();
        }
        if let Some(name) = &changes.name {
            stored.account.name.clone_from(name);
        }
        if let Some(password_hash) = &changes.password_hash {
            stored.password_hash.clone_from(password_hash);
        }
        stored.account.updated_at = Utc::now();
        Ok(stored.account.clone())
    }

    async fn delete(&self, id: AccountId) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        let stored = inner.accounts.remove(&id).ok_or(RepositoryError::NotFound)?;
        inner.emails.remove(&stored.account.email);
        inner.profiles.remove(&id);
        for product in &mut inner.products {
            if product.owner_id == Some(id) {
                product.owner_id = None;
            }
        }
        Ok(())
    }

    async fn push_cart_item(
        &self,
        id: AccountId,
        product: ProductId,
    ) -> Result<CartPush, RepositoryError> {
        let mut inner = self.inner.write().await;
        let exists = inner.product_exists(product);
        let account = inner.account_mut(id)?;
        if !exists {
            return Ok(CartPush::ProductMissing);
        }
        account.cart.push(product);
        account.updated_at = Utc::now();
        Ok(CartPush::Pushed(account.cart.clone()))
    }

    async fn remove_cart_item(
        &self,
        id: AccountId,
        product: ProductId,
    ) -> Result<Vec<ProductId>, RepositoryError> {
        let mut inner = self.inner.write().await;
        let account = inner.account_mut(id)?;
        if let Some(index) = account.cart.iter().position(|p| *p == product) {
            account.cart.remove(index);
        }
        account.updated_at = Utc::now();
        Ok(account.cart.clone())
    }

    async fn prune_cart(&self, id: AccountId) -> Result<PrunedCart, RepositoryError> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let stored = inner
            .accounts
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;

        let cart = &mut stored.account.cart;
        let before = cart.len();
        cart.retain(|item| inner.products.iter().any(|p| p.id == *item));
        stored.account.updated_at = Utc::now();

        Ok(PrunedCart {
            removed: before - stored.account.cart.len(),
            cart: stored.account.cart.clone(),
        })
    }

    async fn get_retailer_profile(
        &self,
        id: AccountId,
    ) -> Result<Option<RetailerProfile>, RepositoryError> {
        Ok(self.inner.read().await.profiles.get(&id).cloned())
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.inner.read().await.products.clone())
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner.products.iter().find(|p| p.id == id).cloned())
    }

    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn list_by_owner(&self, owner: AccountId) -> Result<Vec<Product>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .products
            .iter()
            .filter(|p| p.owner_id == Some(owner))
            .cloned()
            .collect())
    }

    async fn create(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let mut inner = self.inner.write().await;
        if let Some(owner) = product.owner_id
            && !inner.accounts.contains_key(&owner)
        {
            return Err(RepositoryError::Conflict(
                "owner account no longer exists".to_owned(),
            ));
        }

        let now = Utc::now();
        let product = Product {
            id: ProductId::generate(),
            name: product.name,
            price: product.price,
            description: product.description,
            owner_id: product.owner_id,
            created_at: now,
            updated_at: now,
        };
        inner.products.push(product.clone());
        Ok(product)
    }

    async fn update(
        &self,
        id: ProductId,
        changes: &ProductChanges,
        scope: WriteScope,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut inner = self.inner.write().await;
        let Some(index) = inner.product_position(id, scope) else {
            return Ok(None);
        };
        let Some(product) = inner.products.get_mut(index) else {
            return Ok(None);
        };

        if let Some(name) = &changes.name {
            product.name.clone_from(name);
        }
        if let Some(price) = changes.price {
            product.price = price;
        }
        if let Some(description) = &changes.description {
            product.description.clone_from(description);
        }
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn delete(&self, id: ProductId, scope: WriteScope) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.write().await;
        match inner.product_position(id, scope) {
            Some(index) => {
                inner.products.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl OperatorRepository for MemoryStore {
    async fn get_with_password_hash(
        &self,
        username: &str,
    ) -> Result<Option<(Operator, String)>, RepositoryError> {
        Ok(self.inner.read().await.operators.get(username).cloned())
    }

    async fn upsert(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Operator, RepositoryError> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .operators
            .entry(username.to_owned())
            .or_insert_with(|| {
                (
                    Operator {
                        id: OperatorId::generate(),
                        username: username.to_owned(),
                        created_at: Utc::now(),
                    },
                    String::new(),
                )
            });
        password_hash.clone_into(&mut entry.1);
        Ok(entry.0.clone())
    }

    async fn delete(&self, username: &str) -> Result<bool, RepositoryError> {
        Ok(self.inner.write().await.operators.remove(username).is_some())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use storekeep_core::Price;

    use super::*;

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            name: "Test".to_string(),
            email: Email::parse(email).unwrap(),
            role: Role::Customer,
            password_hash: "hash".to_string(),
        }
    }

    async fn add_product(store: &MemoryStore, name: &str) -> Product {
        ProductRepository::create(
            store,
            NewProduct {
                name: name.to_string(),
                price: Price::ZERO,
                description: None,
                owner_id: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        AccountRepository::create(&store, new_account("a@x.io"))
            .await
            .unwrap();
        let err = AccountRepository::create(&store, new_account("A@X.io"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_cart_push_and_remove_first_occurrence() {
        let store = MemoryStore::new();
        let account = AccountRepository::create(&store, new_account("a@x.io"))
            .await
            .unwrap();
        let p = add_product(&store, "P").await;
        let q = add_product(&store, "Q").await;

        for id in [p.id, q.id, p.id] {
            store.push_cart_item(account.id, id).await.unwrap();
        }
        let cart = store.remove_cart_item(account.id, p.id).await.unwrap();
        assert_eq!(cart, vec![q.id, p.id]);

        let unchanged = store
            .remove_cart_item(account.id, ProductId::generate())
            .await
            .unwrap();
        assert_eq!(unchanged, vec![q.id, p.id]);
    }

    #[tokio::test]
    async fn test_push_missing_product_writes_nothing() {
        let store = MemoryStore::new();
        let account = AccountRepository::create(&store, new_account("a@x.io"))
            .await
            .unwrap();

        let outcome = store
            .push_cart_item(account.id, ProductId::generate())
            .await
            .unwrap();
        assert_eq!(outcome, CartPush::ProductMissing);

        let reloaded = store.get_by_id(account.id).await.unwrap().unwrap();
        assert!(reloaded.cart.is_empty());
    }

    #[tokio::test]
    async fn test_cart_ops_on_missing_account() {
        let store = MemoryStore::new();
        let p = add_product(&store, "P").await;
        let ghost = AccountId::generate();

        assert!(matches!(
            store.push_cart_item(ghost, p.id).await,
            Err(RepositoryError::NotFound)
        ));
        assert!(matches!(
            store.remove_cart_item(ghost, p.id).await,
            Err(RepositoryError::NotFound)
        ));
        assert!(matches!(
            store.prune_cart(ghost).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_prune_keeps_order_of_live_entries() {
        let store = MemoryStore::new();
        let account = AccountRepository::create(&store, new_account("a@x.io"))
            .await
            .unwrap();
        let p = add_product(&store, "P").await;
        let q = add_product(&store, "Q").await;
        for id in [q.id, p.id, q.id] {
            store.push_cart_item(account.id, id).await.unwrap();
        }
        ProductRepository::delete(&store, p.id, WriteScope::Any)
            .await
            .unwrap();

        let pruned = store.prune_cart(account.id).await.unwrap();
        assert_eq!(pruned.removed, 1);
        assert_eq!(pruned.cart, vec![q.id, q.id]);
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_not_lost() {
        let store = MemoryStore::new();
        let account = AccountRepository::create(&store, new_account("a@x.io"))
            .await
            .unwrap();
        let p = add_product(&store, "P").await;

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.push_cart_item(account.id, p.id).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let reloaded = store.get_by_id(account.id).await.unwrap().unwrap();
        assert_eq!(reloaded.cart.len(), 32);
    }

    #[tokio::test]
    async fn test_scoped_product_writes() {
        let store = MemoryStore::new();
        let owner = AccountRepository::create(&store, new_account("r@x.io"))
            .await
            .unwrap();
        let product = ProductRepository::create(
            &store,
            NewProduct {
                name: "Mine".to_string(),
                price: Price::ZERO,
                description: None,
                owner_id: Some(owner.id),
            },
        )
        .await
        .unwrap();

        let stranger = WriteScope::OwnedBy(AccountId::generate());
        assert!(
            !ProductRepository::delete(&store, product.id, stranger)
                .await
                .unwrap()
        );
        assert!(
            ProductRepository::delete(&store, product.id, WriteScope::OwnedBy(owner.id))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_deleting_owner_orphans_products() {
        let store = MemoryStore::new();
        let owner = AccountRepository::create(&store, new_account("r@x.io"))
            .await
            .unwrap();
        let product = ProductRepository::create(
            &store,
            NewProduct {
                name: "Orphan".to_string(),
                price: Price::ZERO,
                description: None,
                owner_id: Some(owner.id),
            },
        )
        .await
        .unwrap();

        AccountRepository::delete(&store, owner.id).await.unwrap();

        let reloaded = ProductRepository::get(&store, product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.owner_id, None);
    }
}
