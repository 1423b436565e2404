pub mod commands;
pub mod handlers;

pub use commands::Cli;
pub use handlers::execute;
