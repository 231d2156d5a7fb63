pub mod button;
pub mod config;
pub mod election;
pub mod leds;
pub mod node;
pub mod radio;

pub mod prelude {
    pub use crate::{button::*, config::*, election::*, leds::*, node::*, radio::*};
}

use election::NodeId;

#[derive(Clone, Debug)]
pub enum InternalMessage {
    /// The local button completed a debounced press
    ButtonPressed,
    /// A peer asked everyone to start a new election round
    ElectionCall { id: NodeId },
    /// A peer announced its ID
    Announce { id: NodeId },
    /// The collection window for the given round elapsed
    WindowExpired { round: u64 },
}

/// Messages that should be processed in the queue
#[derive(Clone, Debug)]
pub enum MessageKind {
    InternalMessage(InternalMessage),
}
