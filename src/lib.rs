pub mod ops;

mod app;
pub mod change;
pub mod commands;
pub mod config;
pub mod manifest;
pub mod release_notes;
pub mod repo;
pub mod resolver;
pub mod version;
pub mod workspace;

// Re-export App and Config from modules
pub use app::App;
pub use config::Config;

// Disable colors for all tests to get clean output
#[cfg(test)]
#[ctor::ctor]
fn init_tests() {
    colored::control::set_override(false);
}
