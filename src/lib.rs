//! Conversational SaaS growth advisor.
//!
//! Onboards founders with a short question flow, keeps a per-session
//! profile, decides per query whether live web search should back the
//! answer, and streams generated advice back in word-aligned chunks.
//!
//! See `DESIGN.md` for architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod logging;

pub mod providers;
pub mod search;

pub mod messaging;
pub mod profile;

pub mod agent;

pub mod adapters;
