//! Cosmetic resolution for overlay styling.
//!
//! Both resolvers are total: an unparseable position or color
//! degrades to a documented default instead of aborting a render.

pub mod color;
pub mod position;

pub use color::Rgb;
pub use position::Axis;
