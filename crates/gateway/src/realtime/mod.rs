//! Realtime provider integration: webhook authenticity and call control.

pub mod client;
pub mod signature;

pub use client::{AcceptError, AcceptPayload, CallControl, CallStream, RealtimeClient};
pub use signature::{AuthenticationError, WebhookVerifier};
