use std::str::FromStr;

use hmac::Mac;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use chrono::{DateTime, Duration, TimeZone, Utc};

use base64::{
    alphabet,
    engine::{self, general_purpose},
    Engine as _,
};

lazy_static::lazy_static! {
    // Tokens travel in cookies and headers, so use the URL-safe alphabet without padding
    static ref BASE64_ENGINE: engine::GeneralPurpose =
        engine::GeneralPurpose::new(&alphabet::URL_SAFE, general_purpose::NO_PAD);
}

/// Errors raised while issuing or checking tokens
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token signature does not match")]
    SignatureMismatch,
    #[error("Token is expired")]
    Expired,
    #[error("Token was issued for a different purpose")]
    WrongKind,
    #[error("Failed to decode or encode token")]
    DecodeEncodeError,
}

impl From<std::str::Utf8Error> for TokenError {
    fn from(_e: std::str::Utf8Error) -> Self {
        Self::DecodeEncodeError
    }
}

impl From<serde_json::Error> for TokenError {
    fn from(_e: serde_json::Error) -> Self {
        Self::DecodeEncodeError
    }
}

impl From<base64::DecodeError> for TokenError {
    fn from(_e: base64::DecodeError) -> Self {
        Self::DecodeEncodeError
    }
}

/// Result of any token operation
pub type TokenResult<T> = Result<T, TokenError>;

/// A signed `<payload>.<signature>` string, both halves base64url encoded
#[derive(Debug, Clone, PartialEq)]
pub struct Token(String);

impl Token {
    /// Start building a token around `payload`
    pub fn builder<T: Serialize>(payload: T) -> TokenBuilder<T> {
        TokenBuilder::new(payload)
    }

    /// Check the signature and expiry, then decode the payload
    pub fn verify<T, K>(&self, key: &K) -> TokenResult<T>
    where
        T: DeserializeOwned,
        K: Mac + Clone,
    {
        // Separate the encoded message from its signature
        let (msg, sig) = self.split().ok_or(TokenError::DecodeEncodeError)?;
        // Both halves are base64url without padding
        let msg = BASE64_ENGINE.decode(msg)?;
        let sig = BASE64_ENGINE.decode(sig)?;
        // Authenticate, then check expiry and decode the payload
        TokenMessage::verify_from_bytes(key, &msg, &sig)
    }

    fn split(&self) -> Option<(&str, &str)> {
        self.0.split_once('.')
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Token {
    type Err = TokenError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        // Only the shape is checked here; the signature is checked by `verify`
        let token = token.trim();
        if token.is_empty() || !token.contains('.') {
            return Err(TokenError::DecodeEncodeError);
        }
        Ok(Self(token.to_string()))
    }
}

/// Builder that attaches an optional expiry before signing
#[derive(Debug)]
pub struct TokenBuilder<T> {
    expiration: Option<DateTime<Utc>>,
    payload: T,
}

impl<T: Serialize> TokenBuilder<T> {
    /// A builder for a token that never expires, until told otherwise
    pub fn new(payload: T) -> Self {
        Self {
            expiration: None,
            payload,
        }
    }

    /// Expire the token `duration` from now
    pub fn expires_in(mut self, duration: Duration) -> Self {
        self.expiration = Some(Utc::now() + duration);
        self
    }

    /// Expire the token at a fixed point in time
    pub fn expires_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.expiration = Some(timestamp);
        self
    }

    /// Sign the token with `key`
    pub fn sign<K>(self, key: &K) -> TokenResult<Token>
    where
        K: Mac + Clone,
    {
        // Wrap the payload with its expiry and serialize it
        let msg: TokenMessage<T> = self.into();
        let msg = serde_json::to_string(&msg)?;
        // Sign the serialized form, exactly as it will be verified
        let sig = sign_message(key, msg.as_bytes());
        // Encode both halves and join them with a dot
        Ok(Token(format!(
            "{}.{}",
            BASE64_ENGINE.encode(msg),
            BASE64_ENGINE.encode(sig)
        )))
    }
}

/// Signed body of a token: optional unix expiry plus the payload
#[derive(Debug, Serialize, Deserialize)]
struct TokenMessage<T> {
    exp: Option<i64>,
    data: T,
}

impl<T: DeserializeOwned> TokenMessage<T> {
    fn verify_from_bytes<K>(key: &K, msg: &[u8], signature: &[u8]) -> TokenResult<T>
    where
        K: Mac + Clone,
    {
        // Never deserialize unauthenticated bytes
        key.clone()
            .chain_update(msg)
            .verify_slice(signature)
            .map_err(|_| TokenError::SignatureMismatch)?;

        let msg = std::str::from_utf8(msg)?;
        let msg: TokenMessage<T> = serde_json::from_str(msg)?;

        if msg.is_expired() {
            Err(TokenError::Expired)
        } else {
            Ok(msg.data)
        }
    }

    fn is_expired(&self) -> bool {
        match self.exp {
            None => false,
            // An unrepresentable timestamp is treated as already expired
            Some(exp) => Utc
                .timestamp_opt(exp, 0u32)
                .earliest()
                .map_or(true, |exp| Utc::now() >= exp),
        }
    }
}

impl<T> From<TokenBuilder<T>> for TokenMessage<T> {
    fn from(value: TokenBuilder<T>) -> Self {
        Self {
            exp: value.expiration.map(|date| date.timestamp()),
            data: value.payload,
        }
    }
}

/// HMAC of `msg` under `key`
fn sign_message<K>(key: &K, msg: &[u8]) -> Vec<u8>
where
    K: Mac + Clone,
{
    key.clone().chain_update(msg).finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use claims::{assert_err, assert_matches, assert_ok};
    use hmac::Hmac;
    use sha2::Sha256;

    use super::*;

    type Key = Hmac<Sha256>;

    fn key() -> Key {
        Key::new_from_slice(b"test_key").unwrap()
    }

    #[test]
    fn can_sign_token() {
        let id = 8080i64;
        let token = Token::builder(id)
            .expires_in(Duration::minutes(5))
            .sign(&key())
            .expect("Failed to sign token");

        let token_value: i64 = assert_ok!(token.verify(&key()));
        assert_eq!(token_value, id);
    }

    #[test]
    fn non_expiry_tokens() {
        let token = Token::builder(8080i64)
            .sign(&key())
            .expect("Failed to sign token");
        assert_ok!(token.verify::<i64, Key>(&key()));
    }

    #[test]
    fn expired_tokens_report_expiry() {
        let token = Token::builder(8080i64)
            .expires_at(Utc::now() - Duration::seconds(5))
            .sign(&key())
            .expect("Failed to sign token");

        assert_matches!(token.verify::<i64, Key>(&key()), Err(TokenError::Expired));
    }

    #[test]
    fn fail_on_wrong_key() {
        let token = Token::builder(8080i64)
            .sign(&key())
            .expect("Failed to sign token");
        let other = Key::new_from_slice(b"other_key").unwrap();

        assert_matches!(
            token.verify::<i64, Key>(&other),
            Err(TokenError::SignatureMismatch)
        );
    }

    #[test]
    fn fail_on_tampered_payload() {
        let token = Token::builder(8080i64)
            .sign(&key())
            .expect("Failed to sign token");
        let (_, sig) = token.split().unwrap();
        let forged = format!(
            "{}.{}",
            BASE64_ENGINE.encode(r#"{"exp":null,"data":1}"#),
            sig
        );
        let forged: Token = forged.parse().unwrap();

        assert_matches!(
            forged.verify::<i64, Key>(&key()),
            Err(TokenError::SignatureMismatch)
        );
    }

    #[test]
    fn fail_on_wrong_type() {
        let token = Token::builder(8080i64)
            .expires_in(Duration::minutes(5))
            .sign(&key())
            .expect("Failed to sign token");

        assert_err!(token.verify::<String, Key>(&key()));
    }

    #[test]
    fn garbage_is_not_a_token() {
        assert_err!("".parse::<Token>());
        assert_err!("no-separator".parse::<Token>());
    }
}
