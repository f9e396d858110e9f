//! Message and MessageHandler
pub mod types;
pub use types::*;

pub mod handlers;
pub use handlers::HandleMsg;
pub use handlers::MessageHandlerEvent;

mod relay;
pub use relay::MessageRelay;

use crate::edge::Edge;

/// A message in transit: sender edge, destination edge, message and the
/// relay record of the route so far.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub from: Edge,
    pub to: Edge,
    pub message: Message,
    pub relay: MessageRelay,
}

impl Envelope {
    pub fn new(from: Edge, to: Edge, message: Message) -> Self {
        Self {
            from,
            to,
            message,
            relay: MessageRelay::new(),
        }
    }
}
