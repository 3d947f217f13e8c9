//! Gateway module - Backend resolution shared by the CLI and the HTTP API

pub mod dispatcher;

pub use dispatcher::Dispatcher;
