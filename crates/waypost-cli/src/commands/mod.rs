//! Command implementations for the CLI.

mod config;
mod history;
mod show;
mod track;

pub use config::cmd_config;
pub use history::cmd_history;
pub use show::cmd_show;
pub use track::cmd_track;
