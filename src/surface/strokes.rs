use crate::stroke::Stroke;

/// Committed strokes plus the strokes taken back by undo.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrokeHistory {
    /// Strokes on the canvas, oldest first
    undo_stack: Vec<Stroke>,
    /// Strokes removed by undo, most recently undone last
    redo_stack: Vec<Stroke>,
}

impl StrokeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a freshly drawn stroke. Whatever could be redone is gone.
    pub fn commit(&mut self, stroke: Stroke) {
        self.undo_stack.push(stroke);
        self.redo_stack.clear();
    }

    /// Moves the newest committed stroke onto the redo stack.
    pub fn undo(&mut self) -> bool {
        match self.undo_stack.pop() {
            Some(stroke) => {
                self.redo_stack.push(stroke);
                true
            }
            None => false,
        }
    }

    /// Moves the most recently undone stroke back and returns it.
    pub fn redo(&mut self) -> Option<&Stroke> {
        let stroke = self.redo_stack.pop()?;
        self.undo_stack.push(stroke);
        self.undo_stack.last()
    }

    pub fn committed(&self) -> &[Stroke] {
        &self.undo_stack
    }

    pub fn redoable(&self) -> &[Stroke] {
        &self.redo_stack
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
