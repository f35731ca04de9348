pub mod app;
pub mod build_info;
pub mod collection;
pub mod commands;
pub mod error;
pub mod model;
pub mod output;
pub mod remote;
pub mod settings;
pub mod store;
pub mod worker;
