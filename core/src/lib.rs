//! Typed async client for the StoredSafe vault REST API.
//!
//! # Overview
//! `StoredSafeClient` authenticates, keeps the session token and exposes one
//! method per API endpoint (auth, vaults, objects, templates, users, utils).
//! Every call returns an `ApiResponse` classifying the reply as success,
//! application error, unauthorized, unparseable or transport failure.
//!
//! # Design
//! - HTTP is pluggable: the client depends only on the `RequestDriver`
//!   trait. `FetchDriver` (reqwest, the browser `fetch` on wasm) and
//!   `StreamDriver` (hyper over rustls) are provided; `DefaultDriver` picks
//!   one per target.
//! - Driver configuration merges in three layers: driver base options, then
//!   per-call options, then explicit request headers.
//! - Only local precondition faults are `Err`. Wire outcomes, transport
//!   faults included, are data.
//!
//! ```no_run
//! use storedsafe_core::{ClientConfig, StoredSafeClient};
//!
//! # async fn run() -> Result<(), storedsafe_core::ApiError> {
//! let mut client = StoredSafeClient::new(ClientConfig::new("safe.example.com").apikey("A1B2C3D4"))?;
//! let login = client.login_totp("jdoe", "p4ssw0rd", "978675", None).await?;
//! if login.success {
//!     let vaults = client.list_vaults(None).await?;
//!     println!("{:?}", vaults.data());
//! }
//! client.logout(None).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod driver;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod response;
pub mod types;

pub use client::{RequestParams, Session, StoredSafeClient};
pub use config::{ClientConfig, Scheme};
pub use driver::fetch::{FetchDriver, FetchHandle, FetchOptions};
pub use driver::replay::ReplayDriver;
#[cfg(not(target_arch = "wasm32"))]
pub use driver::stream::{StreamDriver, StreamOptions};
pub use driver::{DefaultDriver, RequestDriver};
pub use endpoints::Reply;
pub use error::{ApiError, TransportError};
pub use http::{DriverRequest, DriverResponse, Headers, HttpMethod, QueryParams, TOKEN_HEADER};
pub use response::{ApiResponse, Outcome};
