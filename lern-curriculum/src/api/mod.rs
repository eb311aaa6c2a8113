//! HTTP API handlers for lern-curriculum

pub mod auth;
pub mod curriculum;
pub mod health;
pub mod mastery;
pub mod settings;

pub use curriculum::curriculum_routes;
pub use health::health_routes;
pub use mastery::mastery_routes;
pub use settings::settings_routes;
