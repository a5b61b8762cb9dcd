//! Permit story: a scroll-driven terminal data story about building permits
//! and demolitions.
//!
//! Data flows one way: `data` loads and classifies records, `story` turns the
//! active narrative section into changes of the `surface`, and `renderer`
//! rasterizes the surface into terminal cells for the `player` or a file.

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod layout;
pub mod menubar;
pub mod player;
pub mod renderer;
pub mod story;
pub mod surface;
pub mod types;
