//! Core types and storage for the cartograph code graph.
//!
//! Provides the entity model and content hashing ([`entity`]), the typed
//! directed multigraph with its indices ([`graph`]), JSON snapshot
//! persistence ([`snapshot`]), and configuration ([`config`]).

pub mod config;
pub mod entity;
pub mod graph;
pub mod snapshot;
