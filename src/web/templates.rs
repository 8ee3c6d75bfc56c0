//! HTML templates for the board UI.
//!
//! Templates are embedded at compile time using `include_str!`.

/// The single-page board with draggable task cards.
pub const BOARD_TEMPLATE: &str = include_str!("templates/board.html");
