//! Core log line types.

mod line;
mod queue_id;
mod status;

pub use line::{ClassifiedLine, LineEvent, LineKind};
pub use queue_id::{NOQUEUE, QueueId};
pub use status::DeliveryStatus;
