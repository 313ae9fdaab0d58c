use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::event::{BoardEvent, EventHandler};

/// Broadcasts board events to registered handlers.
///
/// Events are delivered in emission order. A handler may emit or subscribe
/// while it is being called: the nested event is queued and delivered once
/// the current one has reached every handler, and a new handler starts
/// receiving with the next event. Whichever caller is dispatching drains
/// the queue, so `emit` can also be called from other threads.
pub struct EventBus {
    handlers: Mutex<Vec<Box<dyn EventHandler>>>,
    joining: Mutex<Vec<Box<dyn EventHandler>>>,
    queue: Mutex<VecDeque<BoardEvent>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("queued", &self.queue.lock().len())
            .finish_non_exhaustive()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
            joining: Mutex::new(Vec::new()),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Subscribe a handler to receive events
    pub fn subscribe(&self, handler: Box<dyn EventHandler>) {
        match self.handlers.try_lock() {
            Some(mut handlers) => handlers.push(handler),
            None => self.joining.lock().push(handler),
        }
    }

    /// Emit an event to all registered handlers
    pub fn emit(&self, event: BoardEvent) {
        log::trace!("Emitting {event:?}");
        self.queue.lock().push_back(event);

        loop {
            // Someone up the stack, or on another thread, is dispatching and
            // will pick the event up.
            let Some(mut handlers) = self.handlers.try_lock() else {
                return;
            };
            loop {
                handlers.append(&mut *self.joining.lock());
                let Some(event) = self.queue.lock().pop_front() else {
                    break;
                };
                for handler in handlers.iter_mut() {
                    handler.handle_event(&event);
                }
            }
            drop(handlers);

            // An emit that raced the release above found the lock taken.
            if self.queue.lock().is_empty() {
                return;
            }
        }
    }
}
