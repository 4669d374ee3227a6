//! Signed bearer tokens.

pub mod claims;
pub mod codec;

pub use claims::{Claims, TokenKind};
pub use codec::{IssuedToken, TokenCodec};
