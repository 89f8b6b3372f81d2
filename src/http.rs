//! HTTP helpers for upstream JWKS retrieval.

pub mod client;
