mod session;
mod signing_key;
mod token;

pub use session::{SessionClaims, TokenKind};
pub use signing_key::SigningKey;
pub use token::{Token, TokenBuilder, TokenError, TokenResult};
