pub mod bot;
pub mod commands;
pub mod components;
pub mod config;
pub mod constant;
pub mod cooldown;
pub mod error;
pub mod events;
pub mod handler;
pub mod loader;
pub mod lua;
pub mod permissions;
pub mod router;
pub mod sync;
pub mod telemetry;
pub mod trigger;
pub mod util;
