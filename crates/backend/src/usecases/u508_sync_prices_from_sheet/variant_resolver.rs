//! Поиск варианта товара по SKU.
//!
//! `Scoped`: берем до `scoped_cap` вариантов указанного товара и ищем точное
//! совпадение SKU (после trim). Варианты за пределами лимита не видны: если
//! совпадения нет среди первых `scoped_cap`, вариант считается не найденным.
//!
//! `Global`: поиск по SKU во всем каталоге, побеждает первое точное совпадение
//! в порядке выдачи платформы. При дублях SKU в разных товарах может выбрать
//! не тот товар.

use contracts::usecases::u508_sync_prices_from_sheet::ResolutionMode;

use super::error::CatalogError;
use super::shopify_api_client::{CatalogApi, VariantRef};
use super::validation::ValidatedRow;

/// Candidates requested from the store-wide SKU search
const GLOBAL_SEARCH_WINDOW: u32 = 10;

pub struct VariantResolver<'a> {
    catalog: &'a dyn CatalogApi,
    mode: ResolutionMode,
    scoped_cap: u32,
}

impl<'a> VariantResolver<'a> {
    pub fn new(catalog: &'a dyn CatalogApi, mode: ResolutionMode, scoped_cap: u32) -> Self {
        Self {
            catalog,
            mode,
            scoped_cap,
        }
    }

    pub async fn resolve(&self, row: &ValidatedRow) -> Result<Option<VariantRef>, CatalogError> {
        match self.mode {
            ResolutionMode::Scoped => {
                let Some(product_id) = row.product_id.as_deref() else {
                    return Ok(None);
                };
                self.resolve_scoped(product_id, &row.sku).await
            }
            ResolutionMode::Global => self.resolve_global(&row.sku).await,
        }
    }

    async fn resolve_scoped(
        &self,
        product_id: &str,
        sku: &str,
    ) -> Result<Option<VariantRef>, CatalogError> {
        let product_gid = product_gid(product_id);
        let variants = self
            .catalog
            .product_variants(&product_gid, self.scoped_cap)
            .await?;

        let Some(variants) = variants else {
            tracing::debug!("Product {} not found", product_gid);
            return Ok(None);
        };

        Ok(first_exact_match(variants, sku))
    }

    async fn resolve_global(&self, sku: &str) -> Result<Option<VariantRef>, CatalogError> {
        let candidates = self
            .catalog
            .search_variants_by_sku(sku, GLOBAL_SEARCH_WINDOW)
            .await?;
        Ok(first_exact_match(candidates, sku))
    }
}

fn first_exact_match(variants: Vec<VariantRef>, sku: &str) -> Option<VariantRef> {
    variants.into_iter().find(|v| v.sku.trim() == sku)
}

/// `111` -> `gid://shopify/Product/111`; a gid is passed through.
pub fn product_gid(product_id: &str) -> String {
    let product_id = product_id.trim();
    if product_id.starts_with("gid://") {
        product_id.to_string()
    } else {
        format!("gid://shopify/Product/{}", product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::u508_sync_prices_from_sheet::price::Price;
    use crate::usecases::u508_sync_prices_from_sheet::shopify_api_client::MutationOutcome;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeCatalog {
        products: HashMap<String, Vec<VariantRef>>,
        search: Vec<VariantRef>,
        requested_caps: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl CatalogApi for FakeCatalog {
        async fn shop_name(&self) -> Result<String, CatalogError> {
            Ok("fake".into())
        }

        async fn product_variants(
            &self,
            product_gid: &str,
            first: u32,
        ) -> Result<Option<Vec<VariantRef>>, CatalogError> {
            self.requested_caps.lock().unwrap().push(first);
            Ok(self
                .products
                .get(product_gid)
                .map(|v| v.iter().take(first as usize).cloned().collect()))
        }

        async fn search_variants_by_sku(
            &self,
            _sku: &str,
            _first: u32,
        ) -> Result<Vec<VariantRef>, CatalogError> {
            Ok(self.search.clone())
        }

        async fn update_price(
            &self,
            _variant: &VariantRef,
            _price: &Price,
        ) -> Result<MutationOutcome, CatalogError> {
            Ok(MutationOutcome::default())
        }
    }

    fn variant(id: &str, sku: &str, product: &str) -> VariantRef {
        VariantRef {
            id: id.into(),
            sku: sku.into(),
            current_price: "1.00".into(),
            product_id: product.into(),
        }
    }

    fn validated(sku: &str, product_id: Option<&str>) -> ValidatedRow {
        ValidatedRow {
            line: 2,
            sku: sku.into(),
            price: Price::parse("9.99").unwrap(),
            product_id: product_id.map(Into::into),
        }
    }

    #[test]
    fn test_product_gid() {
        assert_eq!(product_gid("111"), "gid://shopify/Product/111");
        assert_eq!(product_gid(" 111 "), "gid://shopify/Product/111");
        assert_eq!(
            product_gid("gid://shopify/Product/5"),
            "gid://shopify/Product/5"
        );
    }

    #[tokio::test]
    async fn test_scoped_first_trimmed_match() {
        let pid = "gid://shopify/Product/111";
        let mut catalog = FakeCatalog::default();
        catalog.products.insert(
            pid.into(),
            vec![
                variant("v1", "SKU10", pid),
                variant("v2", " SKU1 ", pid),
                variant("v3", "SKU1", pid),
            ],
        );

        let resolver = VariantResolver::new(&catalog, ResolutionMode::Scoped, 100);
        let found = resolver
            .resolve(&validated("SKU1", Some("111")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "v2");
        assert_eq!(*catalog.requested_caps.lock().unwrap(), vec![100]);
    }

    #[tokio::test]
    async fn test_scoped_not_found_cases() {
        let pid = "gid://shopify/Product/111";
        let mut catalog = FakeCatalog::default();
        catalog
            .products
            .insert(pid.into(), vec![variant("v1", "OTHER", pid)]);
        let resolver = VariantResolver::new(&catalog, ResolutionMode::Scoped, 100);

        // Scenario B: no variant with this sku under product 111
        assert!(resolver
            .resolve(&validated("SKU1", Some("111")))
            .await
            .unwrap()
            .is_none());
        // unknown product
        assert!(resolver
            .resolve(&validated("SKU1", Some("999")))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_scoped_cap_hides_later_variants() {
        let pid = "gid://shopify/Product/1";
        let mut catalog = FakeCatalog::default();
        let mut variants: Vec<_> = (0..3)
            .map(|i| variant(&format!("v{}", i), &format!("S{}", i), pid))
            .collect();
        variants.push(variant("late", "TARGET", pid));
        catalog.products.insert(pid.into(), variants);

        let resolver = VariantResolver::new(&catalog, ResolutionMode::Scoped, 3);
        assert!(resolver
            .resolve(&validated("TARGET", Some("1")))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_global_first_exact_match() {
        let catalog = FakeCatalog {
            search: vec![
                variant("a", "SKU1-XL", "p1"),
                variant("b", "SKU1", "p2"),
                variant("c", "SKU1", "p3"),
            ],
            ..FakeCatalog::default()
        };
        let resolver = VariantResolver::new(&catalog, ResolutionMode::Global, 100);

        let found = resolver
            .resolve(&validated("SKU1", None))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "b");
        assert_eq!(found.product_id, "p2");
        assert!(catalog.requested_caps.lock().unwrap().is_empty());
    }
}
