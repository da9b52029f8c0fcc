//! 展示层
//!
//! 订阅流水线状态并渲染，可整体替换而不影响流水线本身

pub mod console;

pub use console::{render_result, ConsoleRenderer};
