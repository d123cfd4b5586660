//! The incremental update pipeline.
//!
//! One edit flows extract → diff ([`diff`]) → graph patch → two-pass edge
//! resolution ([`resolve`]) → bounded propagation ([`propagate`]) →
//! checkpoint, orchestrated by [`bridge::Engine::process_change`]. The
//! cold-start project walk lives in [`scan`].

pub mod bridge;
pub mod diff;
pub mod propagate;
pub mod resolve;
pub mod scan;
