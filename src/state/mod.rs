pub mod context;
mod tools;

pub use context::BoardContext;
pub use tools::ToolSettings;
