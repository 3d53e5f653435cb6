//! Input drivers sitting between interrupt lines and controller state.

pub mod button;
