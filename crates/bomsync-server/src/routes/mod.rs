pub mod changes;
pub mod config;
pub mod events;
pub mod state;
pub mod sync;
pub mod view;
