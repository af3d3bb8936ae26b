pub mod focus;
pub mod migration;
pub mod models;
pub mod points;
pub mod rollover;
pub mod stats;
pub mod timer;
