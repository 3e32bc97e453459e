//! Founder profiles and their storage.

pub mod model;
pub mod store;

pub use model::{
    OnboardingError, OnboardingFlow, ProfileRecord, Stage, Transition, NOT_SPECIFIED,
};
pub use store::{InMemoryProfileStore, ProfileLease, ProfileStore};
