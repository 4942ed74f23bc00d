use chrono::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::{SigningKey, Token, TokenError, TokenResult};

/// What a session token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived token accepted by admin endpoints
    Access,
    /// Long-lived token accepted only by the refresh endpoint
    Refresh,
}

/// Payload signed into session cookies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: i64,
    pub kind: TokenKind,
}

impl SessionClaims {
    pub fn access(user_id: i64) -> Self {
        Self {
            sub: user_id,
            kind: TokenKind::Access,
        }
    }

    pub fn refresh(user_id: i64) -> Self {
        Self {
            sub: user_id,
            kind: TokenKind::Refresh,
        }
    }

    pub fn issue(&self, key: &SigningKey, ttl: Duration) -> TokenResult<Token> {
        Token::builder(self).expires_in(ttl).sign(key.as_ref())
    }

    /// Verify a token and require it to have been issued for `expected`
    pub fn verify(token: &Token, key: &SigningKey, expected: TokenKind) -> TokenResult<Self> {
        let claims: SessionClaims = token.verify(key.as_ref())?;
        if claims.kind != expected {
            return Err(TokenError::WrongKind);
        }
        Ok(claims)
    }
}
