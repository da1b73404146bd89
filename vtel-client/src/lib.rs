//! vtel-client - API client for the VTEL dashboard backend
//!
//! Request pipeline shared by every dashboard view:
//!
//! ```text
//! caller ──> ApiDispatcher ──GET──> Debouncer ──> Transport ──> backend
//!                  └────other verbs────────────────┘
//! ```
//!
//! - [`dispatcher`]: builds requests, routes GETs through the debouncer,
//!   returns the decoded payload
//! - [`debounce`]: per-key trailing-edge debouncing
//! - [`transport`]: transport trait and the reqwest implementation
//!
//! # Example
//!
//! ```rust,no_run
//! use vtel_client::{ApiDispatcher, ReqwestTransport};
//! use vtel_common::{config::TokenSource, endpoints};
//! # async fn run() -> Result<(), vtel_common::api::ApiError> {
//! let transport = ReqwestTransport::new(std::time::Duration::from_secs(30))?;
//! let api = ApiDispatcher::new(transport, "http://localhost:5000/api", TokenSource::fixed("t"));
//!
//! let contacts = api.get(endpoints::CONTACTS).await?;
//! let invoice = api.get(&endpoints::invoice_by_id(42)).await?;
//! # let _ = (contacts, invoice);
//! # Ok(())
//! # }
//! ```

pub mod debounce;
pub mod dispatcher;
pub mod transport;

pub use debounce::{DebounceError, Debouncer, DEFAULT_DEBOUNCE_DELAY};
pub use dispatcher::{ApiDispatcher, RequestOptions};
pub use transport::{HttpRequest, ReqwestTransport, ResponseType, Transport, TransportResponse};
