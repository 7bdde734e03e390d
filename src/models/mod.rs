//! Model file formats.

pub mod md2;

pub use md2::{AnimationRange, Md2Error, Md2Model};
