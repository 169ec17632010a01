//! Data models

pub mod worker;
pub mod record;
pub mod alert;

pub use worker::*;
pub use record::*;
pub use alert::*;
