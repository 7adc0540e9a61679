use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::error::CatalogError;
use super::price::Price;
use super::session::Session;
use crate::shared::config::ShopifyConfig;

/// Снимок варианта товара в каталоге на момент запроса. Не кэшируется.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRef {
    pub id: String,
    pub sku: String,
    pub current_price: String,
    pub product_id: String,
}

/// Результат мутации: прикладные ошибки (`userErrors`) при успешном HTTP-ответе
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationOutcome {
    pub user_errors: Vec<String>,
}

/// Операции каталога, которые нужны синхронизации
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn shop_name(&self) -> Result<String, CatalogError>;

    /// Up to `first` variants of a product; `None` if the product does not exist.
    async fn product_variants(
        &self,
        product_gid: &str,
        first: u32,
    ) -> Result<Option<Vec<VariantRef>>, CatalogError>;

    /// Store-wide SKU search, platform order.
    async fn search_variants_by_sku(
        &self,
        sku: &str,
        first: u32,
    ) -> Result<Vec<VariantRef>, CatalogError>;

    async fn update_price(
        &self,
        variant: &VariantRef,
        price: &Price,
    ) -> Result<MutationOutcome, CatalogError>;
}

/// Создает клиент каталога из сессии текущего запуска
pub trait CatalogFactory: Send + Sync {
    fn create(&self, session: &Session) -> Result<Arc<dyn CatalogApi>, CatalogError>;
}

pub struct ShopifyCatalogFactory {
    config: ShopifyConfig,
}

impl ShopifyCatalogFactory {
    pub fn new(config: ShopifyConfig) -> Self {
        Self { config }
    }
}

impl CatalogFactory for ShopifyCatalogFactory {
    fn create(&self, session: &Session) -> Result<Arc<dyn CatalogApi>, CatalogError> {
        let client = ShopifyApiClient::new(session, &self.config)?;
        tracing::debug!("Shopify Admin API endpoint: {}", client.endpoint());
        Ok(Arc::new(client))
    }
}

const SHOP_NAME_QUERY: &str = "query ShopName { shop { name } }";

const PRODUCT_VARIANTS_QUERY: &str = r#"
query ProductVariants($id: ID!, $first: Int!) {
  product(id: $id) {
    id
    variants(first: $first) {
      edges { node { id sku price } }
    }
  }
}"#;

const VARIANTS_BY_SKU_QUERY: &str = r#"
query VariantsBySku($query: String!, $first: Int!) {
  productVariants(first: $first, query: $query) {
    edges { node { id sku price product { id } } }
  }
}"#;

const UPDATE_PRICE_MUTATION: &str = r#"
mutation UpdateVariantPrice($productId: ID!, $variants: [ProductVariantsBulkInput!]!) {
  productVariantsBulkUpdate(productId: $productId, variants: $variants) {
    productVariants { id price }
    userErrors { field message }
  }
}"#;

/// HTTP-клиент Shopify Admin GraphQL API
pub struct ShopifyApiClient {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl ShopifyApiClient {
    pub fn new(session: &Session, config: &ShopifyConfig) -> Result<Self, CatalogError> {
        let base_url = config
            .api_base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}", session.shop));
        let endpoint = format!(
            "{}/admin/api/{}/graphql.json",
            base_url.trim_end_matches('/'),
            config.api_version
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            access_token: session.access_token.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, CatalogError> {
        tracing::debug!("Shopify GraphQL request: {}", operation_name(query));

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Shopify-Access-Token", &self.access_token)
            .header("Accept", "application/json")
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                "Shopify API request failed with status {}: {}",
                status,
                preview(&body)
            );
            return Err(CatalogError::Api {
                status: status.as_u16(),
                errors: extract_errors(&body),
            });
        }

        let parsed: GraphQlResponse<T> = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Shopify response: {}", e);
            CatalogError::Decode(format!("{}. Response: {}", e, preview(&body)))
        })?;

        if !parsed.errors.is_empty() {
            return Err(CatalogError::Api {
                status: status.as_u16(),
                errors: parsed.errors.into_iter().map(|e| e.message).collect(),
            });
        }

        parsed
            .data
            .ok_or_else(|| CatalogError::Decode("response has no data".to_string()))
    }
}

#[async_trait]
impl CatalogApi for ShopifyApiClient {
    async fn shop_name(&self) -> Result<String, CatalogError> {
        let data: ShopData = self.graphql(SHOP_NAME_QUERY, json!({})).await?;
        Ok(data.shop.name)
    }

    async fn product_variants(
        &self,
        product_gid: &str,
        first: u32,
    ) -> Result<Option<Vec<VariantRef>>, CatalogError> {
        let data: ProductData = self
            .graphql(
                PRODUCT_VARIANTS_QUERY,
                json!({ "id": product_gid, "first": first }),
            )
            .await?;

        Ok(data.product.map(|product| {
            product
                .variants
                .edges
                .into_iter()
                .map(|edge| VariantRef {
                    id: edge.node.id,
                    sku: edge.node.sku.unwrap_or_default(),
                    current_price: edge.node.price,
                    product_id: product.id.clone(),
                })
                .collect()
        }))
    }

    async fn search_variants_by_sku(
        &self,
        sku: &str,
        first: u32,
    ) -> Result<Vec<VariantRef>, CatalogError> {
        let data: ProductVariantsData = self
            .graphql(
                VARIANTS_BY_SKU_QUERY,
                json!({ "query": sku_search_query(sku), "first": first }),
            )
            .await?;

        Ok(data
            .product_variants
            .edges
            .into_iter()
            .map(|edge| VariantRef {
                id: edge.node.id,
                sku: edge.node.sku.unwrap_or_default(),
                current_price: edge.node.price,
                product_id: edge.node.product.id,
            })
            .collect())
    }

    async fn update_price(
        &self,
        variant: &VariantRef,
        price: &Price,
    ) -> Result<MutationOutcome, CatalogError> {
        let data: BulkUpdateData = self
            .graphql(
                UPDATE_PRICE_MUTATION,
                json!({
                    "productId": variant.product_id,
                    "variants": [{ "id": variant.id, "price": price.as_str() }],
                }),
            )
            .await?;

        let payload = data.product_variants_bulk_update.ok_or_else(|| {
            CatalogError::Decode("productVariantsBulkUpdate payload is missing".to_string())
        })?;

        Ok(MutationOutcome {
            user_errors: payload.user_errors.into_iter().map(|e| e.message).collect(),
        })
    }
}

/// `sku:"..."` search term with quotes escaped
fn sku_search_query(sku: &str) -> String {
    let escaped = sku.replace('\\', "\\\\").replace('"', "\\\"");
    format!("sku:\"{}\"", escaped)
}

fn operation_name(query: &str) -> &str {
    query
        .split_whitespace()
        .nth(1)
        .and_then(|name| name.split('(').next())
        .unwrap_or("anonymous")
}

fn preview(body: &str) -> String {
    let preview: String = body.chars().take(500).collect();
    if preview.len() < body.len() {
        format!("{}...", preview)
    } else {
        preview
    }
}

/// Shopify returns `{"errors": "..."}` or `{"errors": [{"message": ...}]}`.
fn extract_errors(body: &str) -> Vec<String> {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return vec![preview(body)],
    };

    match value.get("errors") {
        Some(serde_json::Value::String(s)) => vec![s.clone()],
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| match item.get("message").and_then(|m| m.as_str()) {
                Some(m) => m.to_string(),
                None => item.to_string(),
            })
            .collect(),
        Some(other) => vec![other.to_string()],
        None => vec![preview(body)],
    }
}

// ============================================================================
// Response structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ShopData {
    shop: Shop,
}

#[derive(Debug, Deserialize)]
struct Shop {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ProductData {
    product: Option<ProductNode>,
}

#[derive(Debug, Deserialize)]
struct ProductNode {
    id: String,
    variants: Connection<VariantNode>,
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
struct VariantNode {
    id: String,
    sku: Option<String>,
    price: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductVariantsData {
    product_variants: Connection<VariantWithProductNode>,
}

#[derive(Debug, Deserialize)]
struct VariantWithProductNode {
    id: String,
    sku: Option<String>,
    price: String,
    product: ProductIdNode,
}

#[derive(Debug, Deserialize)]
struct ProductIdNode {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkUpdateData {
    product_variants_bulk_update: Option<BulkUpdatePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkUpdatePayload {
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
struct UserError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GRAPHQL_PATH: &str = "/admin/api/2024-10/graphql.json";

    fn client_for(server: &MockServer) -> ShopifyApiClient {
        let session = Session {
            shop: "demo.myshopify.com".into(),
            access_token: "shpat_test".into(),
        };
        let config = ShopifyConfig {
            api_base_url: Some(server.uri()),
            ..ShopifyConfig::default()
        };
        ShopifyApiClient::new(&session, &config).unwrap()
    }

    async fn mount(server: &MockServer, needle: &str, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(GRAPHQL_PATH))
            .and(header("X-Shopify-Access-Token", "shpat_test"))
            .and(body_string_contains(needle))
            .respond_with(response)
            .mount(server)
            .await;
    }

    #[test]
    fn test_endpoint_from_session_shop() {
        let session = Session {
            shop: "demo.myshopify.com".into(),
            access_token: "t".into(),
        };
        let client = ShopifyApiClient::new(&session, &ShopifyConfig::default()).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://demo.myshopify.com/admin/api/2024-10/graphql.json"
        );
    }

    #[test]
    fn test_sku_search_query_escapes_quotes() {
        assert_eq!(sku_search_query("SKU1"), "sku:\"SKU1\"");
        assert_eq!(sku_search_query("A\"B"), "sku:\"A\\\"B\"");
    }

    #[test]
    fn test_extract_errors() {
        assert_eq!(
            extract_errors(r#"{"errors":"[API] Invalid API key or access token"}"#),
            vec!["[API] Invalid API key or access token".to_string()]
        );
        assert_eq!(
            extract_errors(r#"{"errors":[{"message":"Throttled"}]}"#),
            vec!["Throttled".to_string()]
        );
        assert_eq!(extract_errors("gateway timeout"), vec!["gateway timeout".to_string()]);
    }

    #[tokio::test]
    async fn test_shop_name() {
        let server = MockServer::start().await;
        mount(
            &server,
            "ShopName",
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "shop": { "name": "Demo Store" } } })),
        )
        .await;

        assert_eq!(client_for(&server).shop_name().await.unwrap(), "Demo Store");
    }

    #[tokio::test]
    async fn test_product_variants() {
        let server = MockServer::start().await;
        mount(
            &server,
            "gid://shopify/Product/111",
            ResponseTemplate::new(200).set_body_json(json!({
                "data": { "product": {
                    "id": "gid://shopify/Product/111",
                    "variants": { "edges": [
                        { "node": { "id": "gid://shopify/ProductVariant/1", "sku": "SKU1", "price": "9.00" } },
                        { "node": { "id": "gid://shopify/ProductVariant/2", "sku": null, "price": "5.00" } }
                    ] }
                } }
            })),
        )
        .await;
        mount(
            &server,
            "gid://shopify/Product/404",
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "product": null } })),
        )
        .await;

        let client = client_for(&server);
        let variants = client
            .product_variants("gid://shopify/Product/111", 100)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].sku, "SKU1");
        assert_eq!(variants[0].current_price, "9.00");
        assert_eq!(variants[0].product_id, "gid://shopify/Product/111");
        assert_eq!(variants[1].sku, "");

        let missing = client
            .product_variants("gid://shopify/Product/404", 100)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_search_variants_by_sku() {
        let server = MockServer::start().await;
        mount(
            &server,
            "VariantsBySku",
            ResponseTemplate::new(200).set_body_json(json!({
                "data": { "productVariants": { "edges": [
                    { "node": {
                        "id": "gid://shopify/ProductVariant/7",
                        "sku": "SKU7",
                        "price": "12.50",
                        "product": { "id": "gid://shopify/Product/70" }
                    } }
                ] } }
            })),
        )
        .await;

        let found = client_for(&server)
            .search_variants_by_sku("SKU7", 10)
            .await
            .unwrap();
        assert_eq!(
            found,
            vec![VariantRef {
                id: "gid://shopify/ProductVariant/7".into(),
                sku: "SKU7".into(),
                current_price: "12.50".into(),
                product_id: "gid://shopify/Product/70".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_update_price_user_errors() {
        let server = MockServer::start().await;
        mount(
            &server,
            "productVariantsBulkUpdate",
            ResponseTemplate::new(200).set_body_json(json!({
                "data": { "productVariantsBulkUpdate": {
                    "productVariants": null,
                    "userErrors": [
                        { "field": ["variants", "0", "price"], "message": "Price can't be negative" }
                    ]
                } }
            })),
        )
        .await;

        let variant = VariantRef {
            id: "gid://shopify/ProductVariant/3".into(),
            sku: "SKU3".into(),
            current_price: "1.00".into(),
            product_id: "gid://shopify/Product/30".into(),
        };
        let outcome = client_for(&server)
            .update_price(&variant, &Price::parse("-1").unwrap())
            .await
            .unwrap();
        assert_eq!(outcome.user_errors, vec!["Price can't be negative".to_string()]);
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        mount(
            &server,
            "ShopName",
            ResponseTemplate::new(401)
                .set_body_json(json!({ "errors": "[API] Invalid API key or access token" })),
        )
        .await;

        let err = client_for(&server).shop_name().await.unwrap_err();
        assert_eq!(
            err,
            CatalogError::Api {
                status: 401,
                errors: vec!["[API] Invalid API key or access token".into()],
            }
        );
    }

    #[tokio::test]
    async fn test_graphql_errors_on_success_status() {
        let server = MockServer::start().await;
        mount(
            &server,
            "ShopName",
            ResponseTemplate::new(200)
                .set_body_json(json!({ "errors": [{ "message": "Throttled" }] })),
        )
        .await;

        let err = client_for(&server).shop_name().await.unwrap_err();
        assert!(matches!(err, CatalogError::Api { status: 200, ref errors } if errors == &vec!["Throttled".to_string()]));
    }
}
