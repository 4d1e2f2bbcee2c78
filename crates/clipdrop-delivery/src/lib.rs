//! Webhook delivery for finished clips.
//!
//! Uploads an accepted clip to each enabled webhook endpoint as a
//! multipart POST, independently per target, and reports one
//! [`clipdrop_models::DeliveryOutcome`] per target.

pub mod dispatcher;
pub mod error;
pub mod targets;

pub use dispatcher::WebhookDispatcher;
pub use error::{DeliveryError, DeliveryResult};
pub use targets::load_targets;
