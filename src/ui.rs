//! Layout and drawing: board, animated tiles, selection ring, overlays.
//!
//! The sequencer hands over the current board, the active phase payload and a
//! linear progress value; all pixel math, easing and composition happen here.

use crate::app::QuitOption;
use crate::board::Coord;
use crate::game::{GameState, Phase};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Tile footprint in terminal cells, and the margin strip between tiles.
/// The board is laid out margin-first: margin, tile, margin, tile, …
pub const TILE_W: u16 = 4;
pub const TILE_H: u16 = 2;
pub const MARGIN: u16 = 1;

/// Rows under the board for notice / key hints.
const BOTTOM_BAR_H: u16 = 2;

/// Board interior (tiles + margins, no border) in terminal cells.
pub fn board_pixel_size(n: usize) -> (u16, u16) {
    let n = n as u16;
    (n * (TILE_W + MARGIN) + MARGIN, n * (TILE_H + MARGIN) + MARGIN)
}

/// Centered board rect (inside the border). Input mapping and drawing share
/// this so clicks always land where tiles are drawn.
pub fn board_rect(area: Rect, n: usize) -> Rect {
    let (bw, bh) = board_pixel_size(n);
    let total_w = bw + 2;
    let total_h = bh + 2 + BOTTOM_BAR_H;
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(total_h) / 2;
    Rect {
        x: x + 1,
        y: y + 1,
        width: bw.min(area.width.saturating_sub(2)),
        height: bh.min(area.height.saturating_sub(2)),
    }
}

/// Top-left terminal cell of a tile.
fn tile_origin(board: Rect, cell: Coord) -> (u16, u16) {
    (
        board.x + MARGIN + cell.1 as u16 * (TILE_W + MARGIN),
        board.y + MARGIN + cell.0 as u16 * (TILE_H + MARGIN),
    )
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Original's swap/fall easing: fast start, soft landing.
fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

/// Draw the whole frame. `shrink_effect` lives across frames in the app and
/// is recreated on each Shrinking entry.
pub fn draw(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    cursor: Coord,
    paused: bool,
    quit_selected: Option<QuitOption>,
    now: Instant,
    shrink_effect: &mut Option<Effect>,
    shrink_effect_time: &mut Option<Instant>,
    shrink_ms: u64,
) {
    let area = frame.area();
    let n = state.board().size();
    let board = board_rect(area, n);

    Block::default()
        .style(Style::default().bg(theme.bg))
        .render(area, frame.buffer_mut());

    let outer = Rect {
        x: board.x.saturating_sub(1),
        y: board.y.saturating_sub(1),
        width: (board.width + 2).min(area.width),
        height: (board.height + 2).min(area.height),
    };
    let title = format!(" matchtui  Score: {} ", state.score);
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, Style::default().fg(theme.title).bold()))
        .render(outer, frame.buffer_mut());

    draw_static_tiles(frame.buffer_mut(), state, theme, board);
    draw_phase(frame.buffer_mut(), state, theme, board, now);

    if state.phase().is_idle() {
        if let Some(sel) = state.selection {
            draw_ring(frame.buffer_mut(), board, sel, theme.title);
        }
        draw_ring(frame.buffer_mut(), board, cursor, theme.main_fg);
    }

    draw_popups(frame.buffer_mut(), state, theme, board);
    draw_bottom_bar(frame.buffer_mut(), state, theme, outer, area);

    if let Phase::Shrinking(anim) = state.phase() {
        apply_shrink_effect(
            frame,
            theme,
            &anim.tiles,
            board,
            shrink_effect,
            shrink_effect_time,
            now,
            shrink_ms,
        );
    }

    if paused {
        draw_pause_overlay(frame, theme, area);
    }
    if let Some(opt) = quit_selected {
        draw_quit_menu(frame, theme, area, opt);
    }
}

/// Cells that the phase pass draws itself; the static pass skips them.
fn animating_cells(state: &GameState) -> HashSet<Coord> {
    match state.phase() {
        Phase::Idle => HashSet::new(),
        Phase::Swapping(anim) => [anim.a, anim.b].into_iter().collect(),
        Phase::Shrinking(anim) => anim.matched.clone(),
        Phase::Falling(anim) => anim
            .moves
            .iter()
            .filter(|m| m.from_row >= 0)
            .map(|m| (m.from_row as usize, m.col))
            .collect(),
    }
}

fn draw_static_tiles(buf: &mut Buffer, state: &GameState, theme: &Theme, board: Rect) {
    let n = state.board().size();
    let skip = animating_cells(state);
    for r in 0..n {
        for c in 0..n {
            if skip.contains(&(r, c)) {
                continue;
            }
            let Some(value) = state.board().get(r, c) else {
                continue;
            };
            let (x, y) = tile_origin(board, (r, c));
            draw_tile(buf, board, x as i32, y as i32, TILE_W, TILE_H, theme, value);
        }
    }
}

fn draw_phase(buf: &mut Buffer, state: &GameState, theme: &Theme, board: Rect, now: Instant) {
    let p = ease_out_cubic(state.progress(now));
    match state.phase() {
        Phase::Idle => {}
        Phase::Swapping(anim) => {
            let (ax, ay) = tile_origin(board, anim.a);
            let (bx, by) = tile_origin(board, anim.b);
            let (ax, ay, bx, by) = (ax as f32, ay as f32, bx as f32, by as f32);
            let (va, vb) = anim.values;
            draw_tile(
                buf,
                board,
                lerp(ax, bx, p).round() as i32,
                lerp(ay, by, p).round() as i32,
                TILE_W,
                TILE_H,
                theme,
                va,
            );
            draw_tile(
                buf,
                board,
                lerp(bx, ax, p).round() as i32,
                lerp(by, ay, p).round() as i32,
                TILE_W,
                TILE_H,
                theme,
                vb,
            );
        }
        Phase::Shrinking(anim) => {
            // Scale down around the tile centre; the fade effect finishes
            // the vanish once the block is down to a single cell.
            let w = ((f32::from(TILE_W) * (1.0 - p)).round() as u16).max(1);
            let h = ((f32::from(TILE_H) * (1.0 - p)).round() as u16).max(1);
            for &((r, c), value) in &anim.tiles {
                let (x, y) = tile_origin(board, (r, c));
                let ox = i32::from(x) + i32::from((TILE_W - w) / 2);
                let oy = i32::from(y) + i32::from((TILE_H - h) / 2);
                draw_tile(buf, board, ox, oy, w, h, theme, value);
            }
        }
        Phase::Falling(anim) => {
            let stride_y = f32::from(TILE_H + MARGIN);
            for m in &anim.moves {
                let x = board.x + MARGIN + m.col as u16 * (TILE_W + MARGIN);
                let from_y = f32::from(board.y + MARGIN) + m.from_row as f32 * stride_y;
                let to_y = f32::from(board.y + MARGIN) + m.to_row as f32 * stride_y;
                let y = lerp(from_y, to_y, p).round() as i32;
                draw_tile(buf, board, i32::from(x), y, TILE_W, TILE_H, theme, m.value);
            }
        }
    }
}

/// Paint a tile block, clipped to the board rect. `x`/`y` may be negative or
/// past the rect while a tile is in flight; only the visible slice is drawn.
fn draw_tile(
    buf: &mut Buffer,
    board: Rect,
    x: i32,
    y: i32,
    w: u16,
    h: u16,
    theme: &Theme,
    value: u8,
) {
    let color = theme.token_color(value);
    let glyph_x = x + i32::from(w / 2);
    let glyph_y = y + i32::from(h / 2).min(i32::from(h.saturating_sub(1)));
    for dy in 0..i32::from(h) {
        for dx in 0..i32::from(w) {
            let px = x + dx;
            let py = y + dy;
            if px < i32::from(board.x)
                || py < i32::from(board.y)
                || px >= i32::from(board.x + board.width)
                || py >= i32::from(board.y + board.height)
            {
                continue;
            }
            let cell = &mut buf[(px as u16, py as u16)];
            if px == glyph_x && py == glyph_y {
                cell.set_char(theme.token_glyph(value))
                    .set_style(Style::default().fg(theme.bg).bg(color));
            } else {
                cell.set_char(' ')
                    .set_style(Style::default().bg(color));
            }
        }
    }
}

/// One-cell ring in the margin strip around a tile.
fn draw_ring(buf: &mut Buffer, board: Rect, cell: Coord, color: Color) {
    let (tx, ty) = tile_origin(board, cell);
    let x0 = i32::from(tx) - 1;
    let y0 = i32::from(ty) - 1;
    for dy in 0..i32::from(TILE_H) + 2 {
        for dx in 0..i32::from(TILE_W) + 2 {
            let on_edge =
                dy == 0 || dy == i32::from(TILE_H) + 1 || dx == 0 || dx == i32::from(TILE_W) + 1;
            if !on_edge {
                continue;
            }
            let px = x0 + dx;
            let py = y0 + dy;
            if px < i32::from(board.x)
                || py < i32::from(board.y)
                || px >= i32::from(board.x + board.width)
                || py >= i32::from(board.y + board.height)
            {
                continue;
            }
            buf[(px as u16, py as u16)].set_style(Style::default().bg(color));
        }
    }
}

fn draw_popups(buf: &mut Buffer, state: &GameState, theme: &Theme, board: Rect) {
    for popup in &state.popups {
        let (x, y) = tile_origin(board, popup.cell);
        let label = format!("+{}", popup.amount);
        if x + label.len() as u16 <= board.x + board.width && y < board.y + board.height {
            buf.set_string(
                x,
                y,
                label,
                Style::default().fg(theme.title).bg(theme.bg).bold(),
            );
        }
    }
}

fn draw_bottom_bar(buf: &mut Buffer, state: &GameState, theme: &Theme, outer: Rect, area: Rect) {
    let bar_y = outer.y + outer.height;
    if bar_y + 1 >= area.y + area.height {
        return;
    }
    if let Some(notice) = &state.notice {
        buf.set_string(
            outer.x,
            bar_y,
            notice.text,
            Style::default().fg(Color::Rgb(255, 120, 120)).bold(),
        );
    }
    buf.set_string(
        outer.x,
        bar_y + 1,
        "click/Enter swap  P pause  Q quit",
        Style::default().fg(theme.div_line),
    );
}

/// Fade matched tiles toward the background while they shrink. The effect is
/// created lazily on phase entry and advanced by frame deltas.
fn apply_shrink_effect(
    frame: &mut Frame,
    theme: &Theme,
    tiles: &[(Coord, u8)],
    board: Rect,
    shrink_effect: &mut Option<Effect>,
    shrink_effect_time: &mut Option<Instant>,
    now: Instant,
    shrink_ms: u64,
) {
    let delta = shrink_effect_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    *shrink_effect_time = Some(now);

    if shrink_effect.is_none() {
        let mut fading = HashSet::new();
        for &(cell, _) in tiles {
            let (tx, ty) = tile_origin(board, cell);
            for dy in 0..TILE_H {
                for dx in 0..TILE_W {
                    fading.insert((tx + dx, ty + dy));
                }
            }
        }
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            fading.contains(&(pos.x, pos.y))
        }));
        let bg = theme.bg;
        let effect = fx::fade_to(bg, bg, (shrink_ms as u32, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board);
        *shrink_effect = Some(effect);
    }

    if let Some(effect) = shrink_effect {
        frame.render_effect(effect, board, tfx_delta);
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P — Resume    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_quit_menu(frame: &mut Frame, theme: &Theme, area: Rect, selected: QuitOption) {
    let popup = centered(area, 28, 7);
    let style_for = |opt: QuitOption| {
        if opt == selected {
            Style::default().fg(Color::Black).bg(theme.title).bold()
        } else {
            Style::default().fg(theme.main_fg)
        }
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(" Resume ", style_for(QuitOption::Resume))),
        Line::from(Span::styled(" Restart ", style_for(QuitOption::Restart))),
        Line::from(Span::styled(" Exit ", style_for(QuitOption::Exit))),
        Line::from(""),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(" Quit? ", Style::default().fg(theme.title))),
        )
        .render(popup, frame.buffer_mut());
}

fn centered(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_pixel_size_counts_margins() {
        // 6 tiles of 4 + 7 margins = 31 wide; 6 tiles of 2 + 7 margins = 19.
        assert_eq!(board_pixel_size(6), (31, 19));
    }

    #[test]
    fn board_rect_is_centered_inside_border() {
        let area = Rect::new(0, 0, 80, 30);
        let rect = board_rect(area, 6);
        assert_eq!(rect.width, 31);
        assert_eq!(rect.height, 19);
        // Border cell sits immediately around the rect.
        assert!(rect.x >= 1 && rect.y >= 1);
    }

    #[test]
    fn tile_origin_matches_input_mapping() {
        let board = Rect::new(3, 2, 31, 19);
        let (x, y) = tile_origin(board, (0, 0));
        assert_eq!((x, y), (4, 3));
        let (x, y) = tile_origin(board, (2, 3));
        assert_eq!((x, y), (3 + 1 + 3 * 5, 2 + 1 + 2 * 3));
    }

    #[test]
    fn easing_is_clamped_and_monotone() {
        assert!(ease_out_cubic(0.0).abs() < f32::EPSILON);
        assert!((ease_out_cubic(1.0) - 1.0).abs() < f32::EPSILON);
        assert!(ease_out_cubic(0.3) < ease_out_cubic(0.6));
    }
}
