pub mod command;
pub mod settings;

pub use command::{Command, Outcome};
pub use settings::Settings;
