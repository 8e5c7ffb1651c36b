//! Business services layer.
//!
//! This module contains the core services that orchestrate business logic,
//! coordinating between the provider seam, storage, and domain types.
//!
//! # Architecture
//!
//! ```text
//! UI layer (extension popup, host binary)
//!          |
//!          v
//!    Services layer  <-- You are here
//!          |
//!          v
//! Infrastructure (provider, keychain, list store)
//! ```
//!
//! # Services Overview
//!
//! - [`Authenticator`]: resolves and caches the session [`crate::domain::AuthContext`]
//! - [`Detector`]: the "already sent today" scan
//! - [`compose_to_list`] / [`compose_reply`]: outbound message composition
//! - [`Dispatcher`]: wires detection, composition, and delivery per request

mod auth_service;
mod compose_service;
mod detection_service;
mod dispatch_service;

pub use auth_service::{AuthError, AuthResult, Authenticator, IssuedToken, TokenBroker};
pub use compose_service::{compose_reply, compose_to_list, ComposeError};
pub use detection_service::{Detection, DetectionError, Detector, SentMessage};
pub use dispatch_service::{DispatchError, DispatchOutcome, Dispatcher, Request, Response};
