use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::security::{EncryptionKey, TokenSigner};

/// Process-wide immutable state, built once at startup and injected into the
/// request handlers. Nothing here is mutated after construction, so no
/// locking is needed.
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    /// At-rest encryption key decoded from configuration.
    pub cipher_key: EncryptionKey,

    /// Session token issuer/verifier bound to the signing secret.
    pub signer: TokenSigner,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;

        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let cipher_key = EncryptionKey::from_base64(&config.security.encryption_key)
            .map_err(|e| anyhow::anyhow!("Invalid encryption key: {e}"))?;

        let signer = TokenSigner::new(
            &config.security.jwt_secret,
            config.security.token_ttl_hours,
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            cipher_key,
            signer,
        })
    }
}
