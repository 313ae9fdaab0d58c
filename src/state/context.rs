use std::path::{Path, PathBuf};
use std::sync::Arc;

use egui::{pos2, Color32, ColorImage};
use image::RgbaImage;

use super::ToolSettings;
use crate::config::BoardConfig;
use crate::error::BoardResult;
use crate::event::{BoardEvent, EventBus};
use crate::history::{EntryId, HistoryError, HistoryStore, PendingSave, SaveWriter};
use crate::slider::SliderEvent;
use crate::stroke::ToolKind;
use crate::surface::DrawingSurface;

/// The values the presentation layer is told about when they change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Signals {
    has_content: bool,
    can_undo: bool,
    can_redo: bool,
}

impl Signals {
    fn of(surface: &DrawingSurface) -> Self {
        Self {
            has_content: surface.has_content(),
            can_undo: surface.can_undo(),
            can_redo: surface.can_redo(),
        }
    }
}

/// The drawing board as seen by the presentation layer.
///
/// `BoardContext` is constructed by the host and owned by it; nothing in the
/// crate keeps global state. It translates boundary events into calls on the
/// [`DrawingSurface`], the [`ToolSettings`] and the [`HistoryStore`], and
/// reports back through its [`EventBus`]:
///
/// - pointer and size events drive the surface,
/// - tool, color and width events update the tool settings,
/// - save requests snapshot the canvas on the calling thread and hand the
///   copy to a background [`SaveWriter`]; results arrive via
///   [`BoardContext::poll_saves`].
///
/// After every change it emits `CanvasInvalidated` when a repaint is due,
/// and `ContentChanged` / `UndoAvailability` only when those values
/// actually change.
///
/// # Example
///
/// ```rust,no_run
/// use sketchboard::{BoardConfig, BoardContext};
///
/// let mut board = BoardContext::new(BoardConfig::default())?;
/// board.on_size_changed(1080, 1920)?;
/// board.on_pointer_down(10.0, 10.0)?;
/// board.on_pointer_move(20.0, 20.0);
/// board.on_pointer_up(20.0, 20.0)?;
/// board.request_save()?;
/// # Ok::<(), sketchboard::BoardError>(())
/// ```
#[derive(Debug)]
pub struct BoardContext {
    config: BoardConfig,
    surface: DrawingSurface,
    tools: ToolSettings,
    history: Arc<HistoryStore>,
    writer: SaveWriter,
    pending: Vec<PendingSave>,
    signals: Signals,
    /// The event bus for broadcasting board events
    pub event_bus: EventBus,
}

impl BoardContext {
    /// Opens the history store named in the config and starts its writer.
    pub fn new(config: BoardConfig) -> BoardResult<Self> {
        let history = Arc::new(HistoryStore::open(&config.storage)?);
        Self::with_history(config, history)
    }

    /// Uses an already opened history store, e.g. one shared with a gallery.
    pub fn with_history(config: BoardConfig, history: Arc<HistoryStore>) -> BoardResult<Self> {
        let tools = ToolSettings::from_config(&config.tools)?;
        let writer = SaveWriter::spawn(Arc::clone(&history)).map_err(HistoryError::from)?;

        Ok(Self {
            surface: DrawingSurface::new(config.surface),
            tools,
            history,
            writer,
            pending: Vec::new(),
            signals: Signals::default(),
            event_bus: EventBus::new(),
            config,
        })
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn surface(&self) -> &DrawingSurface {
        &self.surface
    }

    pub fn tools(&self) -> &ToolSettings {
        &self.tools
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    fn publish(&mut self) {
        if self.surface.take_redraw_request() {
            self.event_bus.emit(BoardEvent::CanvasInvalidated);
        }

        let now = Signals::of(&self.surface);
        if now.has_content != self.signals.has_content {
            self.event_bus.emit(BoardEvent::ContentChanged {
                has_content: now.has_content,
            });
        }
        if (now.can_undo, now.can_redo) != (self.signals.can_undo, self.signals.can_redo) {
            self.event_bus.emit(BoardEvent::UndoAvailability {
                can_undo: now.can_undo,
                can_redo: now.can_redo,
            });
        }
        self.signals = now;
    }

    // Surface events

    /// Returns `false` when the size was already in effect.
    pub fn on_size_changed(&mut self, width: u32, height: u32) -> BoardResult<bool> {
        let resized = self.surface.resize(width, height)?;
        self.publish();
        Ok(resized)
    }

    pub fn on_pointer_down(&mut self, x: f32, y: f32) -> BoardResult<()> {
        self.surface.begin_stroke(pos2(x, y), self.tools.style())?;
        self.publish();
        Ok(())
    }

    pub fn on_pointer_move(&mut self, x: f32, y: f32) {
        self.surface.extend_stroke(pos2(x, y));
        self.publish();
    }

    /// Commits the live stroke. The release position itself is not sampled,
    /// the last move already was.
    pub fn on_pointer_up(&mut self, _x: f32, _y: f32) -> BoardResult<()> {
        self.surface.end_stroke()?;
        self.publish();
        Ok(())
    }

    // Tool events

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tools.set_tool(tool);
    }

    pub fn set_color(&mut self, color: Color32) {
        self.tools.set_color(color);
    }

    /// Width for the current tool.
    pub fn set_width(&mut self, width: f32) -> BoardResult<()> {
        Ok(self.tools.set_width(width)?)
    }

    /// Forwards a touch on `tool`'s width slider. The returned events let
    /// the caller react to tracking start and stop, e.g. to hide the slider.
    pub fn slider_pointer_down(&mut self, tool: ToolKind, y: f32) -> Vec<SliderEvent> {
        let events = self.tools.slider_mut(tool).pointer_down(y);
        for event in &events {
            self.tools.apply_slider_event(tool, *event);
        }
        events
    }

    pub fn slider_pointer_move(&mut self, tool: ToolKind, y: f32) -> Option<SliderEvent> {
        let event = self.tools.slider_mut(tool).pointer_move(y)?;
        self.tools.apply_slider_event(tool, event);
        Some(event)
    }

    pub fn slider_pointer_up(&mut self, tool: ToolKind) -> Option<SliderEvent> {
        self.tools.slider_mut(tool).pointer_up()
    }

    // History of the current drawing

    pub fn request_undo(&mut self) -> BoardResult<bool> {
        let undone = self.surface.undo()?;
        self.publish();
        Ok(undone)
    }

    pub fn request_redo(&mut self) -> BoardResult<bool> {
        let redone = self.surface.redo()?;
        self.publish();
        Ok(redone)
    }

    pub fn request_clear(&mut self) -> BoardResult<()> {
        self.surface.clear()?;
        self.publish();
        Ok(())
    }

    // Output

    /// The composed canvas, live stroke included.
    pub fn snapshot(&self) -> BoardResult<RgbaImage> {
        Ok(self.surface.export_raster()?)
    }

    pub fn display_image(&self) -> BoardResult<ColorImage> {
        Ok(self.surface.display_image()?)
    }

    /// Writes the current drawing to a user-visible directory.
    pub fn request_export(&mut self, dir: &Path) -> BoardResult<PathBuf> {
        let exported = self
            .snapshot()
            .and_then(|image| Ok(self.history.export_image_to(&image, dir)?));
        match &exported {
            Ok(path) => self
                .event_bus
                .emit(BoardEvent::ExportCompleted { path: path.clone() }),
            Err(err) => self.event_bus.emit(BoardEvent::ExportFailed {
                reason: err.to_string(),
            }),
        }
        exported
    }

    /// Queues the current drawing for the history. Completion is reported by
    /// [`Self::poll_saves`] or [`Self::wait_for_saves`].
    pub fn request_save(&mut self) -> BoardResult<()> {
        let image = match self.snapshot() {
            Ok(image) => image,
            Err(err) => {
                self.event_bus.emit(BoardEvent::SaveFailed {
                    reason: err.to_string(),
                });
                return Err(err);
            }
        };
        self.pending.push(self.writer.submit(image));
        Ok(())
    }

    pub fn has_pending_saves(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Reports finished background saves without blocking. Returns how many
    /// finished.
    pub fn poll_saves(&mut self) -> usize {
        let mut finished = Vec::new();
        self.pending.retain_mut(|pending| match pending.try_take() {
            Some(result) => {
                finished.push(result);
                false
            }
            None => true,
        });

        let count = finished.len();
        for result in finished {
            let _ = self.report_save(result);
        }
        count
    }

    /// Blocks until every queued save has finished and reports them.
    pub fn wait_for_saves(&mut self) -> Vec<BoardResult<EntryId>> {
        std::mem::take(&mut self.pending)
            .into_iter()
            .map(|pending| {
                let result = pending.wait();
                self.report_save(result)
            })
            .collect()
    }

    fn report_save(&self, result: Result<EntryId, HistoryError>) -> BoardResult<EntryId> {
        match result {
            Ok(id) => {
                self.event_bus.emit(BoardEvent::SaveCompleted { id });
                Ok(id)
            }
            Err(err) => {
                self.event_bus.emit(BoardEvent::SaveFailed {
                    reason: err.to_string(),
                });
                Err(err.into())
            }
        }
    }

    // Gallery and detail screens

    pub fn saved_drawings(&self) -> Vec<EntryId> {
        self.history.list()
    }

    pub fn load_drawing(&self, id: EntryId) -> BoardResult<RgbaImage> {
        Ok(self.history.load(id)?)
    }

    /// Thumbnail sized for the gallery grid.
    pub fn drawing_thumbnail(&self, id: EntryId) -> BoardResult<RgbaImage> {
        let gallery = &self.config.gallery;
        Ok(self
            .history
            .thumbnail(id, gallery.thumbnail_width, gallery.thumbnail_height)?)
    }

    pub fn delete_drawing(&self, id: EntryId) -> bool {
        self.history.delete(id)
    }

    pub fn export_drawing(&self, id: EntryId, dir: &Path) -> BoardResult<PathBuf> {
        Ok(self.history.export_to(id, dir)?)
    }
}
