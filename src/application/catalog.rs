use crate::domain::ids::ProductId;
use crate::domain::product::{NewProduct, Product, ProductPatch};
use crate::infrastructure::in_memory::InMemoryStore;
use tracing::info;

/// Product CRUD over the shared store.
///
/// Missing products are reported as `None`/`false`, never as errors.
#[derive(Clone)]
pub struct Catalog {
    store: InMemoryStore,
}

impl Catalog {
    pub fn new(store: InMemoryStore) -> Self {
        Self { store }
    }

    pub async fn create(&self, new_product: NewProduct) -> Product {
        let mut state = self.store.write().await;
        let id = state.allocate_product_id();
        let product = new_product.into_product(id);
        state.products.insert(id, product.clone());
        info!(product_id = %id, name = %product.name, "product created");
        product
    }

    pub async fn get(&self, id: ProductId) -> Option<Product> {
        self.store.read().await.products.get(&id).cloned()
    }

    /// All products, ordered by id.
    pub async fn list(&self) -> Vec<Product> {
        self.store.read().await.products.values().cloned().collect()
    }

    pub async fn update(&self, id: ProductId, patch: ProductPatch) -> bool {
        let mut state = self.store.write().await;
        match state.products.get_mut(&id) {
            Some(product) => {
                patch.apply(product);
                info!(product_id = %id, "product updated");
                true
            }
            None => false,
        }
    }

    pub async fn delete(&self, id: ProductId) -> bool {
        let removed = self.store.write().await.products.remove(&id).is_some();
        if removed {
            info!(product_id = %id, "product deleted");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Money;
    use rust_decimal_macros::dec;

    fn mug() -> NewProduct {
        NewProduct {
            name: "Mug".into(),
            description: "Ceramic".into(),
            price: Money::new(dec!(10.00)).unwrap(),
            stock: 5,
            image_url: "https://img/mug.png".into(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_fresh_ids() {
        let catalog = Catalog::new(InMemoryStore::new());
        let first = catalog.create(mug()).await;
        let second = catalog.create(mug()).await;
        assert_eq!(first.id, ProductId(1));
        assert_eq!(second.id, ProductId(2));
        assert_eq!(catalog.list().await.len(), 2);
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let catalog = Catalog::new(InMemoryStore::new());
        let first = catalog.create(mug()).await;
        assert!(catalog.delete(first.id).await);
        let second = catalog.create(mug()).await;
        assert_eq!(second.id, ProductId(2));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let catalog = Catalog::new(InMemoryStore::new());
        assert!(!catalog.update(ProductId(9), ProductPatch::default()).await);
        assert!(!catalog.delete(ProductId(9)).await);
        assert!(catalog.get(ProductId(9)).await.is_none());
    }

    #[tokio::test]
    async fn test_update_applies_patch() {
        let catalog = Catalog::new(InMemoryStore::new());
        let product = catalog.create(mug()).await;
        let patch = ProductPatch {
            price: Some(Money::new(dec!(12.00)).unwrap()),
            ..Default::default()
        };
        assert!(catalog.update(product.id, patch).await);

        let updated = catalog.get(product.id).await.unwrap();
        assert_eq!(updated.price, Money::new(dec!(12.00)).unwrap());
        assert_eq!(updated.stock, 5);
    }
}
