use thiserror::Error;

use crate::config::ConfigError;
use crate::history::HistoryError;
use crate::slider::SliderError;
use crate::surface::SurfaceError;

/// Anything a [`crate::BoardContext`] operation can fail with.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Slider(#[from] SliderError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type BoardResult<T> = Result<T, BoardError>;
