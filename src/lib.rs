//! Authenticated, encrypted key-value session state carried in HTTP cookies.
//!
//! A [`CookieManager`] encodes a small string map into an opaque token bound to one cookie name,
//! writes it as `Set-Cookie`, and later recovers it from the request's `Cookie` header. Tokens
//! are sealed with AES-GCM and authenticated with HMAC-SHA256 over the cookie name, an issue
//! timestamp and a max age, so tampered, expired or foreign tokens are rejected. No session state
//! is kept on the server.
//!
//! [`SecureCookieLayer`] wraps the manager as `tower` middleware and exposes the payload to
//! handlers as a [`Session`] request extension.
//!
//! # Security
//! [`CookieConfig::default`] leaves `HttpOnly` and `Secure` **off** so cookies work over plain HTTP
//! while developing. Enable both with [`CookieConfig::with_http_only`] and
//! [`CookieConfig::with_secure`] in production.
//!
//! Payloads are encrypted, but keys are generated per process unless you pass your own
//! [`KeyMaterial`]: cookies issued before a restart stop decoding after it.

mod codec;
mod config;
mod controller;
mod error;
mod key;
pub mod layer;
mod manager;
mod session;

use std::collections::BTreeMap;

pub use tower_cookies::cookie::SameSite;

pub use crate::codec::{Codec, DEFAULT_MAX_AGE_LIMIT, DEFAULT_MAX_LENGTH, SecureCookie};
pub use crate::config::{CookieConfig, DEFAULT_MAX_AGE};
pub use crate::controller::CookieController;
pub use crate::error::{Error, Result};
pub use crate::key::{BLOCK_KEY_LEN, HASH_KEY_LEN, KeyMaterial};
pub use crate::layer::SecureCookieLayer;
pub use crate::manager::CookieManager;
pub use crate::session::Session;

/// The application-visible cookie contents.
pub type Payload = BTreeMap<String, String>;
