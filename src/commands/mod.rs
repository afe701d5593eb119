pub mod add;
pub mod list;
pub mod remove;
pub mod show;
pub mod watch;

pub use crate::utils::tui::create_spinner;
