//! Domain layer for the report assistant backend: session tokens and the
//! provider login flow.
//!
//! Provider abstractions are re-exported from the `messenger-auth` crate so
//! that consumers of the `domain` crate do not need to depend on
//! `messenger-auth` directly.

pub use messenger_auth::oauth::{
    AuthorizationRequest, Identity, Provider, ProviderKind, StateManager,
};

pub mod error;
pub mod login;
pub mod session;

pub mod gateway;
