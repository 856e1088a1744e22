//! Service layer for the pipeline manager

pub mod search_shim;
pub mod search_state;

pub use search_shim::{HttpSearchShim, SearchShim, ShimError};
pub use search_state::SearchStateService;
