//! Published key set cache and the refresh cycles that feed it.

pub mod manager;
pub mod state;
pub mod store;
