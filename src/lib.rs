pub mod artifact;
pub mod buckets;
pub mod context;
pub mod fatigue;
pub mod features;
pub mod loader;
pub mod model;
pub mod momentum;
pub mod personnel;
pub mod play_store;
pub mod playerperf;
pub mod schema;
pub mod situational;
pub mod split;
pub mod synthetic;
pub mod tendency;
