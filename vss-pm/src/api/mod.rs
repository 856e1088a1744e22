//! HTTP API handlers for vss-pm

pub mod events;
pub mod health;
pub mod search;
pub mod tags;
pub mod videos;

pub use events::event_routes;
pub use health::health_routes;
pub use search::search_routes;
pub use tags::tag_routes;
pub use videos::video_routes;
