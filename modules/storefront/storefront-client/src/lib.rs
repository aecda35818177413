//! Storefront shop API client
//!
//! Sends GraphQL operations to a Vendure shop API on behalf of a storefront
//! request, and carries the caller's auth token across requests through an
//! injected session store:
//!
//! - the token stored in the caller's session is sent as a bearer credential
//! - a token issued by the API (`vendure-auth-token` response header) is
//!   stored back, and the committed session cookie is handed to the caller
//!   to relay in its own HTTP response
//! - an `errors` list in the response fails the call with the first message
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use storefront_client::{
//!     CallerContext, MemorySessionStorage, StorefrontClient, StorefrontClientConfig,
//!     StorefrontSdk,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StorefrontClientConfig::from_env()?;
//! let client = StorefrontClient::new(config, Arc::new(MemorySessionStorage::new()))?;
//! let sdk = StorefrontSdk::new(Arc::new(client));
//!
//! let caller = CallerContext::with_cookie("__session=4b1c0b9e-7c43-4a55-9a39-0d4f1b2b7b61");
//! let collections = sdk.collections(None, Some(&caller)).await?;
//! for collection in &collections.value.items {
//!     println!("{} -> {}", collection.name, collection.href());
//! }
//! if let Some(cookie) = collections.set_cookie() {
//!     println!("relay Set-Cookie: {cookie}");
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod document;
mod error;
mod request;
mod response;
pub mod sdk;
pub mod session;
mod transport;

// Re-export public API
pub use client::StorefrontClient;
pub use config::{DEFAULT_AUTH_TOKEN_HEADER, DEMO_API_URL, StorefrontClientConfig};
pub use document::{Document, Operation};
pub use error::ClientError;
pub use request::{CallerContext, GraphqlRequest};
pub use response::{
    Envelope, ErrorException, ErrorExtensions, GraphqlErrorDetail, SourceLocation, WithHeaders,
};
pub use sdk::StorefrontSdk;
pub use session::{
    AUTH_TOKEN_SESSION_KEY, CookieOptions, MemorySessionStorage, SameSite, Session, SessionError,
    SessionStorage,
};

// Re-export commonly used types from dependencies
pub use http::{HeaderMap, StatusCode};
