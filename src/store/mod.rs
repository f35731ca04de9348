pub mod files;
pub mod lock;
pub mod migration;
pub mod schema;
pub mod tracked;
pub mod workspace;
