//! The transform families behind each task. Every module exposes a `task`
//! constructor (or several) wiring a selector, a step chain and an output
//! directory together; the heavy lifting inside the steps is delegated to
//! the respective compiler or encoder.

pub mod assets;
pub mod images;
pub mod pages;
pub mod scripts;
pub mod sprite;
pub mod styles;
