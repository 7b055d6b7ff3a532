mod formatters;
mod terminal;

pub use formatters::*;
pub use terminal::*;
