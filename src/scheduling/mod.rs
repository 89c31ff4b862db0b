mod clock;
mod evaluator;

pub use clock::{ReminderClock, TickRunner};
pub use evaluator::due_reminders;
