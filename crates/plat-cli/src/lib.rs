//! CLI library components for the plat geometry editor.

pub mod logging;
