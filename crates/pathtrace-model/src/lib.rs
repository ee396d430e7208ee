pub mod choice;
pub mod config;
pub mod state;

pub use choice::{ChoiceGenerator, ChoiceValue, CgKind};
pub use config::Config;
pub use state::SystemState;
