pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod realtime;
pub mod runtime;
pub mod state;
