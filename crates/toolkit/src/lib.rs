//! Concierge toolkit: the domain tools exposed to the remote agent.
//!
//! - [`weather`]: city weather lookups over a fixed table.
//! - [`real_estate`]: property search, market trends, mortgages,
//!   neighbourhood profiles and comparisons over simulated data.
//! - [`Profile`]: which of those an agent gets, with its instructions.

mod format;
mod profile;
pub mod real_estate;
pub mod weather;

pub use format::{grouped, money};
pub use profile::Profile;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("unknown agent profile '{0}' (expected weather, real-estate or all)")]
    UnknownProfile(String),
}
