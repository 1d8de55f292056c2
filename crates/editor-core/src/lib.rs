mod bus;
pub mod commands;
mod config;
mod core;
mod edits;
mod error;
pub mod html;
mod node;
mod ops;
mod plugin;
pub mod plugins;
mod selection;
mod serde_value;
pub mod style;
mod toolbar;

pub use crate::bus::*;
pub use crate::config::*;
pub use crate::core::*;
pub use crate::error::*;
pub use crate::node::*;
pub use crate::ops::*;
pub use crate::plugin::*;
pub use crate::selection::{Point, Selection};
pub use crate::serde_value::*;
pub use crate::toolbar::*;
