//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports from the [`secrecy`] crate. Use these for every sensitive
//! value the backend touches: the Supabase service-role key, bearer tokens,
//! and anything else that must never appear in logs.
//!
//! `SecretString` implements `Debug` with redaction, so a struct that
//! derives `Debug` and holds a `SecretString` field cannot leak the value
//! through `{:?}` formatting or tracing. Reading the value requires an
//! explicit [`ExposeSecret::expose_secret`] call, and secrets are zeroized
//! on drop.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct Outbound {
//!     endpoint: String,
//!     api_key: SecretString, // Debug shows "[REDACTED ...]"
//! }
//!
//! let out = Outbound {
//!     endpoint: "https://example.supabase.co".to_string(),
//!     api_key: SecretString::from("service-role-key"),
//! };
//!
//! let key: &str = out.api_key.expose_secret();
//! # let _ = key;
//! ```

// Re-export the main types from secrecy
pub use secrecy::{ExposeSecret, SecretBox, SecretString};
