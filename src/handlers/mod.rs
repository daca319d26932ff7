pub mod commands;
pub mod messages;
pub mod scheduler;
pub mod utils;

pub use commands::command_handler;
pub use messages::{location_handler, text_handler};
pub use scheduler::delivery_task;

use std::error::Error;

pub type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;
