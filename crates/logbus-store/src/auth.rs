use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::error::Result;
use crate::types::Principal;

/// Resolves the identity behind a newly established connection.
///
/// Returning `Ok(None)` means "not logged in": the caller owes the client
/// an error frame and a close, nothing else.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn resolve_principal(&self, token: Option<&str>) -> Result<Option<Principal>>;
}

/// Token authenticator backed by the `api_tokens` table.
///
/// A token row joins to its user; expired rows do not resolve. Tokens are
/// random opaque strings minted elsewhere; no local hashing or signature
/// checking happens here.
pub struct PgTokenAuthenticator {
    pool: PgPool,
}

impl PgTokenAuthenticator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Authenticator for PgTokenAuthenticator {
    async fn resolve_principal(&self, token: Option<&str>) -> Result<Option<Principal>> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Ok(None);
        };

        let row: Option<(String, bool)> = sqlx::query_as(
            "SELECT u.uuid, u.is_admin
             FROM api_tokens t
             JOIN users u ON u.uuid = t.user_uuid
             WHERE t.token = $1
               AND (t.expires_at IS NULL OR t.expires_at > now())",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((uuid, is_admin)) => {
                debug!(user = %uuid, "token resolved");
                Ok(Some(Principal { uuid, is_admin }))
            }
            None => Ok(None),
        }
    }
}
