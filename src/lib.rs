#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod event;
pub mod history;
pub mod slider;
pub mod state;
pub mod stroke;
pub mod surface;
pub mod util;

pub use config::BoardConfig;
pub use error::{BoardError, BoardResult};
pub use event::{BoardEvent, EventBus, EventHandler};
pub use history::{EntryId, HistoryEntry, HistoryError, HistoryStore};
pub use slider::{Slider, SliderEvent};
pub use state::{BoardContext, ToolSettings};
pub use stroke::{Stroke, StrokeStyle, ToolKind};
pub use surface::{DrawingSurface, SurfaceError, SurfaceState};
