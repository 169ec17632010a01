//! Non-compliance alerting - formatting, recipient resolution and fan-out

pub mod dispatch;
pub mod format;
pub mod recipients;
pub mod sinks;

pub use dispatch::{AlertDispatcher, Channel};
pub use format::{render, AlertMessage};
pub use recipients::RecipientConfig;
pub use sinks::{ChannelSink, SinkError};
