use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};

use super::error::SyncError;
use crate::shared::config::ShopifyConfig;

/// Учетные данные для Admin API. Читаются один раз на запуск и дальше только
/// передаются по ссылке.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Домен магазина, например `my-shop.myshopify.com`
    pub shop: String,
    pub access_token: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("shop", &self.shop)
            .field("access_token", &"****")
            .finish()
    }
}

/// Источник сессии. Отсутствие сессии (приложение не установлено или
/// не авторизовано) прерывает запуск.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn get_session(&self) -> Result<Session, SyncError>;
}

/// Session from `[shopify]` config section (token may come from env)
pub struct ConfigSessionProvider {
    shop: String,
    access_token: String,
}

impl ConfigSessionProvider {
    pub fn new(config: &ShopifyConfig) -> Self {
        Self {
            shop: config.shop.trim().to_string(),
            access_token: config.access_token.trim().to_string(),
        }
    }
}

#[async_trait]
impl SessionProvider for ConfigSessionProvider {
    async fn get_session(&self) -> Result<Session, SyncError> {
        if self.shop.is_empty() || self.access_token.is_empty() {
            return Err(SyncError::NoSessionFound);
        }
        Ok(Session {
            shop: self.shop.clone(),
            access_token: self.access_token.clone(),
        })
    }
}

/// Первая offline-сессия из таблицы `session`
pub struct DbSessionProvider {
    db: DatabaseConnection,
}

impl DbSessionProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionProvider for DbSessionProvider {
    async fn get_session(&self) -> Result<Session, SyncError> {
        let sql = r#"
            SELECT shop, access_token FROM session
            WHERE is_online = 0
              AND access_token IS NOT NULL
              AND access_token <> ''
            ORDER BY created_at DESC, id
            LIMIT 1
        "#;
        let row = self
            .db
            .query_one(Statement::from_string(
                DatabaseBackend::Sqlite,
                sql.to_string(),
            ))
            .await?;

        let Some(row) = row else {
            return Err(SyncError::NoSessionFound);
        };

        let shop: String = row.try_get("", "shop")?;
        let access_token: String = row.try_get("", "access_token")?;
        Ok(Session { shop, access_token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db;

    #[tokio::test]
    async fn test_config_session() {
        let config = ShopifyConfig {
            shop: "demo.myshopify.com".into(),
            access_token: " shpat_123 ".into(),
            ..ShopifyConfig::default()
        };
        let session = ConfigSessionProvider::new(&config)
            .get_session()
            .await
            .unwrap();
        assert_eq!(session.shop, "demo.myshopify.com");
        assert_eq!(session.access_token, "shpat_123");
        assert!(!format!("{:?}", session).contains("shpat_123"));

        let empty = ConfigSessionProvider::new(&ShopifyConfig::default());
        assert!(matches!(
            empty.get_session().await,
            Err(SyncError::NoSessionFound)
        ));
    }

    #[tokio::test]
    async fn test_db_session_offline_only() {
        let dir = tempfile::tempdir().unwrap();
        let conn = db::connect(&dir.path().join("app.db")).await.unwrap();
        let provider = DbSessionProvider::new(conn.clone());

        assert!(matches!(
            provider.get_session().await,
            Err(SyncError::NoSessionFound)
        ));

        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            "INSERT INTO session (id, shop, access_token, is_online, created_at) VALUES \
             ('online_1', 'demo.myshopify.com', 'online-token', 1, '2026-01-02'), \
             ('offline_demo.myshopify.com', 'demo.myshopify.com', 'offline-token', 0, '2026-01-01')"
                .to_string(),
        ))
        .await
        .unwrap();

        let session = provider.get_session().await.unwrap();
        assert_eq!(session.shop, "demo.myshopify.com");
        assert_eq!(session.access_token, "offline-token");
    }
}
