//! Authentication for the relay API.
//!
//! Two credential shapes are accepted on the same `Authorization: Bearer`
//! header:
//!
//! - **API keys** (`ms_` prefix): long-lived, created per account, stored only
//!   as SHA-256 hashes. Resolution stamps `last_used_at`.
//! - **Session tokens**: HS256 JWTs minted at login, carrying the account id,
//!   email, and username as claims.
//!
//! Classification happens by shape in [`resolver::BearerCredential`], so the
//! two schemes never shadow each other. All credential failures surface as
//! the same bare 401.
//!
//! # Modules
//!
//! - [`password`]: Argon2id password hashing and verification
//! - [`resolver`]: The [`resolver::CurrentAccount`] extractor for handlers
//! - [`token`]: JWT session token creation and verification

pub mod password;
pub mod resolver;
pub mod token;
