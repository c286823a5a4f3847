//! Render-side half of the simulation pipeline: the channel to the
//! simulation thread, the latest-snapshot store, and the session controller.

pub mod channel;
pub mod controller;
pub mod state_store;

pub use channel::{ChannelError, Command, Event, FrameChannel, ThreadChannel};
pub use controller::ConfigController;
pub use state_store::{StateStore, SubscriptionId};
