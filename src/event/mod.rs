mod bus;
mod events;

pub use bus::EventBus;
pub use events::BoardEvent;

pub trait EventHandler: Send {
    fn handle_event(&mut self, event: &BoardEvent);
}

impl<F> EventHandler for F
where
    F: FnMut(&BoardEvent) + Send,
{
    fn handle_event(&mut self, event: &BoardEvent) {
        self(event)
    }
}
