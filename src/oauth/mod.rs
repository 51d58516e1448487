//! OAuth flow engines and provider plumbing.
//!
//! [`authorization`] drives the browser redirect dance, [`device`] the
//! non-interactive polling flow. Both normalize provider profiles through
//! [`providers`] so the two login paths yield identical identities.

pub mod authorization;
pub mod device;
pub mod providers;
pub mod types;

pub use authorization::{AuthorizationFlow, SignInRedirect};
pub use device::DeviceFlow;
pub use providers::{ProviderConfig, ProviderRegistry, fetch_identity};
pub use types::{
    DeviceAuthorization, Identity, PollOutcome, Provider, ProviderTokenResponse, Session,
};
