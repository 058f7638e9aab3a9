//! Key bindings (normal and vim-style) and mouse→cell mapping.

use crate::board::Coord;
use crate::ui::{MARGIN, TILE_H, TILE_W};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::Rect;

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    /// Act on the cell under the keyboard cursor, same as a mouse click.
    Select,
    Pause,
    Restart,
    Quit,
    None,
}

/// Map key event to game action. Arrows/Enter or hjkl/Space both work.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = key;
    if !modifiers.is_empty() && modifiers != KeyModifiers::SHIFT {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p') => Action::Pause,
        KeyCode::Char('r') => Action::Restart,
        KeyCode::Up | KeyCode::Char('k') => Action::MoveUp,
        KeyCode::Down | KeyCode::Char('j') => Action::MoveDown,
        KeyCode::Left | KeyCode::Char('h') => Action::MoveLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::MoveRight,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Select,
        _ => Action::None,
    }
}

/// Map a terminal mouse position to a grid cell. `board` is the board rect
/// inside the border; tiles sit on a margin grid (margin, tile, margin, …).
/// Positions on a margin, between tiles, or outside the grid map to `None` —
/// misclicks are routine and never an error.
pub fn cell_at(column: u16, row: u16, board: Rect, size: usize) -> Option<Coord> {
    if column < board.x + MARGIN || row < board.y + MARGIN {
        return None;
    }
    let rel_x = column - board.x - MARGIN;
    let rel_y = row - board.y - MARGIN;
    let stride_x = TILE_W + MARGIN;
    let stride_y = TILE_H + MARGIN;
    let c = (rel_x / stride_x) as usize;
    let r = (rel_y / stride_y) as usize;
    if r >= size || c >= size {
        return None;
    }
    // Landed on the margin strip past a tile's edge.
    if rel_x % stride_x >= TILE_W || rel_y % stride_y >= TILE_H {
        return None;
    }
    Some((r, c))
}
