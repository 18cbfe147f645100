pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod session_layer;
pub mod state;
