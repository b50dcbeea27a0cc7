//! cis-client
//!
//! Client for the CIS vending backend: signed SOAP/XML requests, response
//! unwrapping and per-operation normalization, plus the daily reconciliation
//! upload-then-notify pipeline.
//!
//! Layering (leaves first): `codec` -> `signer`/`ids` -> `envelope` ->
//! `transport` -> `requester` -> `response`/`normalize` -> `api` -> `client`.
//! Callers normally only touch [`CisClient`] and the request models.

pub mod api;
pub mod client;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod models;
pub mod normalize;
pub mod reconcile;
pub mod requester;
pub mod response;
pub mod signer;
pub mod transport;

pub use api::{MiscApi, PowerApi, ReconcilerApi, UploadReceipt};
pub use client::CisClient;
pub use codec::{OneOrMany, Record};
pub use error::{CisError, DomainError};
pub use models::*;
pub use normalize::{normalize, Normalized, ResponseKind};
pub use requester::{Requester, RequesterSettings};
pub use transport::{
    FileTransport, FtpTransport, HttpMethod, HttpOptions, HttpRequest, HttpTransport,
    LocalDirTransport, RawResponse, ReqwestTransport, TransferSession, TransportError,
};
