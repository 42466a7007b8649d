//! Remote vision service transport.
//!
//! This module provides the Cloud Vision REST client and the service-account
//! token exchange it authenticates with. All calls are blocking `ureq`
//! requests with the agent's default timeouts.

pub mod auth;
pub mod vision;

pub use auth::{AssertionClaims, ServiceAccountAuth, ServiceAccountKey, VISION_SCOPE};
pub use vision::VisionClient;
