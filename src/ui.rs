//! Layout and drawing: menu, board, preview strip, sidebar, popups, overlays.

use crate::Palette;
use crate::app::{MenuState, MenuTab, QuitOption, ScorePopup, Screen};
use crate::game::{self, BlockColor, COLS, ROWS, Snapshot};
use crate::settings::Settings;
use crate::theme::{self, Theme};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Board cells are drawn 2 terminal columns wide, 1 row tall.
const CELL_W: u16 = 2;
const SIDEBAR_WIDTH: u16 = 24;
/// Duration of the flash over freshly cleared cells (TachyonFX).
const CLEAR_FLASH_MS: u32 = 400;
/// Floating score labels drift one row up per this many ms.
const POPUP_RISE_MS: u64 = 300;

/// Outer board block size: border + preview strip + divider + grid.
fn board_pixel_size() -> (u16, u16) {
    (COLS as u16 * CELL_W + 2, ROWS as u16 + 4)
}

/// Board block and sidebar rects, centered together in `area`.
fn layout_rects(area: Rect) -> (Rect, Rect) {
    let (bw, bh) = board_pixel_size();
    let total_w = bw + SIDEBAR_WIDTH;
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(bh) / 2;
    let board = Rect {
        x,
        y,
        width: bw,
        height: bh,
    }
    .intersection(area);
    let sidebar = Rect {
        x: x + bw,
        y,
        width: SIDEBAR_WIDTH,
        height: bh,
    }
    .intersection(area);
    (board, sidebar)
}

/// Horizontal board offset while a shake is active: one cell either way,
/// alternating every 40 ms.
fn shake_dx(shake_started: Option<Instant>, now: Instant) -> i16 {
    let Some(start) = shake_started else { return 0 };
    let ms = now.saturating_duration_since(start).as_millis() as u64;
    if ms >= crate::app::SHAKE_MS {
        return 0;
    }
    if (ms / 40) % 2 == 0 { 1 } else { -1 }
}

/// Grid-only rect (inside the border, below the preview strip and divider),
/// including any active shake offset; matches draw_game's layout.
fn board_grid_rect(area: Rect, shake_started: Option<Instant>, now: Instant) -> Rect {
    let (bw, bh) = board_pixel_size();
    let total_w = bw + SIDEBAR_WIDTH;
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(bh) / 2;
    let dx = shake_dx(shake_started, now);
    Rect {
        x: (i32::from(x) + 1 + i32::from(dx)).max(0) as u16,
        y: y + 3,
        width: COLS as u16 * CELL_W,
        height: ROWS as u16,
    }
    .intersection(area)
}

/// Build the set of buffer (x, y) positions covered by the flashing cells.
fn flash_buffer_positions(grid: Rect, cells: &[(usize, usize)]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &(row, col) in cells {
        let x0 = grid.x + col as u16 * CELL_W;
        let y0 = grid.y + row as u16;
        if y0 >= grid.y + grid.height {
            continue;
        }
        for bx in x0..(x0 + CELL_W).min(grid.x + grid.width) {
            set.insert((bx, y0));
        }
    }
    set
}

/// Create or update the clear-flash effect and process it (TachyonFX: white
/// flash over just-cleared cells, fading back to the empty board).
fn apply_clear_flash(
    frame: &mut Frame,
    area: Rect,
    flash_cells: &[(usize, usize)],
    clear_flash: &mut Option<Effect>,
    clear_flash_process_time: &mut Option<Instant>,
    shake_started: Option<Instant>,
    now: Instant,
) {
    let grid = board_grid_rect(area, shake_started, now);
    let delta = clear_flash_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    *clear_flash_process_time = Some(now);

    if clear_flash.is_none() {
        let flash_set = flash_buffer_positions(grid, flash_cells);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            flash_set.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_from(
            Color::White,
            Color::White,
            (CLEAR_FLASH_MS, Interpolation::Linear),
        )
        .with_filter(filter)
        .with_area(grid);
        *clear_flash = Some(effect);
    }

    if let Some(effect) = clear_flash {
        frame.render_effect(effect, grid, tfx_delta);
    }
}

/// Blank a popup backdrop so the modal reads over the board.
fn clear_backdrop(frame: &mut Frame, popup: Rect, bg: Color) {
    let buf = frame.buffer_mut();
    for y in popup.y..popup.bottom() {
        for x in popup.x..popup.right() {
            buf[(x, y)].set_symbol(" ").set_style(Style::default().bg(bg));
        }
    }
}

/// Draw the current screen. Overlays (pause, quit menu, game-over modal) sit
/// on top of the frozen board; `clear_flash` / `clear_flash_process_time` are
/// updated in place while a flash is running.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    snap: &Snapshot,
    theme: &Theme,
    palette: Palette,
    menu_state: &MenuState,
    settings: Settings,
    cursor: (usize, usize),
    selected: Option<(usize, usize)>,
    popups: &[ScorePopup],
    high_score: u32,
    new_high_score: bool,
    quit_selected: Option<QuitOption>,
    shake_started: Option<Instant>,
    flash_cells: &[(usize, usize)],
    clear_flash: &mut Option<Effect>,
    clear_flash_process_time: &mut Option<Instant>,
    now: Instant,
    area: Rect,
) {
    match screen {
        Screen::Menu => draw_menu(frame, theme, menu_state, settings, high_score, now, area),
        Screen::Playing => {
            draw_game(
                frame,
                snap,
                theme,
                palette,
                cursor,
                selected,
                popups,
                high_score,
                shake_started,
                now,
                area,
            );
            if snap.paused {
                draw_pause_overlay(frame, theme, area);
            }
            if !flash_cells.is_empty() {
                apply_clear_flash(
                    frame,
                    area,
                    flash_cells,
                    clear_flash,
                    clear_flash_process_time,
                    shake_started,
                    now,
                );
            }
        }
        Screen::QuitMenu => {
            draw_game(
                frame,
                snap,
                theme,
                palette,
                cursor,
                selected,
                popups,
                high_score,
                shake_started,
                now,
                area,
            );
            if let Some(opt) = quit_selected {
                draw_quit_menu(frame, theme, opt);
            }
        }
        Screen::GameOver => {
            draw_game(
                frame,
                snap,
                theme,
                palette,
                cursor,
                selected,
                popups,
                high_score,
                shake_started,
                now,
                area,
            );
            draw_game_over(frame, snap, theme, high_score, new_high_score, area);
        }
    }
}

fn draw_menu(
    frame: &mut Frame,
    theme: &Theme,
    menu_state: &MenuState,
    settings: Settings,
    high_score: u32,
    now: Instant,
    area: Rect,
) {
    let popup_w = 44u16;
    let popup_h = 18u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };

    let title = Line::from(vec![
        Span::styled(" anxie ", Style::default().fg(theme.blocks[0]).bold()),
        Span::styled(" tui ", Style::default().fg(theme.main_fg).bold()),
    ]);

    let highlight_style = Style::default().fg(Color::Black).bg(theme.title).bold();
    let normal_style = Style::default().fg(theme.main_fg);

    fn tab_style(current: bool, highlight: Style, normal: Style) -> Style {
        if current { highlight } else { normal }
    }

    let level_line = Line::from(Span::styled(
        format!(" ◂  Level {}  ▸ ", menu_state.start_level),
        tab_style(
            menu_state.current_tab == MenuTab::StartLevel,
            highlight_style,
            normal_style,
        ),
    ));
    let sound_line = Line::from(Span::styled(
        format!(" SOUND {} ", if settings.sound { "ON " } else { "OFF" }),
        tab_style(
            menu_state.current_tab == MenuTab::Sound,
            highlight_style,
            normal_style,
        ),
    ));
    let shake_line = Line::from(Span::styled(
        format!(" SHAKE {} ", if settings.haptics { "ON " } else { "OFF" }),
        tab_style(
            menu_state.current_tab == MenuTab::Shake,
            highlight_style,
            normal_style,
        ),
    ));
    let start_line = Line::from(Span::styled(
        " [ START ] ",
        tab_style(
            menu_state.current_tab == MenuTab::Start,
            highlight_style,
            normal_style,
        ),
    ));

    let lines = vec![
        Line::from(""),
        title,
        Line::from(Span::styled(
            format!(" Best: {high_score} "),
            Style::default().fg(theme.title),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " ─ START LEVEL ─ ",
            Style::default().fg(theme.div_line),
        )),
        level_line,
        Line::from(""),
        Line::from(Span::styled(
            " ─ OPTIONS ─ ",
            Style::default().fg(theme.div_line),
        )),
        sound_line,
        shake_line,
        Line::from(""),
        start_line,
        Line::from(""),
        Line::from(vec![
            Span::styled(" ↕ ", Style::default().fg(theme.title)),
            Span::from("NAVIGATE   "),
            Span::styled(" ↔ ", Style::default().fg(theme.title)),
            Span::from("ADJUST   "),
            Span::styled(" ENTER ", Style::default().fg(theme.title)),
            Span::from("SELECT"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            " [Q] QUIT ",
            Style::default().fg(Color::Rgb(255, 80, 80)),
        )),
    ];

    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );

    // Slide in from the bottom on an ease-out cubic
    let elapsed = now.duration_since(menu_state.animation_start).as_millis() as u32;
    let anim_duration = 500u32;
    let t = (elapsed as f32 / anim_duration as f32).min(1.0);
    let offset_t = 1.0 - (1.0 - t).powi(3);
    let anim_y_offset = ((1.0 - offset_t) * 10.0) as u16;
    let mut anim_popup = popup;
    anim_popup.y += anim_y_offset;
    let anim_popup = anim_popup.intersection(area);

    p.render(anim_popup, frame.buffer_mut());
}

/// Draw game: board block (preview strip + grid) and sidebar, centered.
fn draw_game(
    frame: &mut Frame,
    snap: &Snapshot,
    theme: &Theme,
    palette: Palette,
    cursor: (usize, usize),
    selected: Option<(usize, usize)>,
    popups: &[ScorePopup],
    high_score: u32,
    shake_started: Option<Instant>,
    now: Instant,
    area: Rect,
) {
    let (board_outer, sidebar) = layout_rects(area);
    let dx = shake_dx(shake_started, now);
    let board_outer = Rect {
        x: (i32::from(board_outer.x) + i32::from(dx)).max(0) as u16,
        ..board_outer
    }
    .intersection(area);

    draw_board(frame, snap, theme, palette, cursor, selected, board_outer);
    draw_sidebar(frame, snap, theme, palette, high_score, sidebar);

    // Floating score labels drift up from where the match landed
    let grid = board_grid_rect(area, shake_started, now);
    let buf = frame.buffer_mut();
    for popup in popups {
        let age_ms = now.saturating_duration_since(popup.spawned).as_millis() as u64;
        let rise = (age_ms / POPUP_RISE_MS) as usize;
        let row = popup.row.saturating_sub(rise);
        let rx = grid.x + popup.col as u16 * CELL_W;
        let ry = grid.y + row as u16;
        if rx < grid.right() && ry < grid.bottom() {
            buf.set_string(
                rx,
                ry,
                &popup.label,
                Style::default().fg(theme.title).bg(theme.bg).bold(),
            );
        }
    }
}

/// Symbol and style for one board cell. Cursor and selection highlights show
/// through a shaded glyph; colorblind mode swaps the solid block for the
/// color's glyph.
fn cell_appearance(
    color: Option<BlockColor>,
    theme: &Theme,
    palette: Palette,
    is_cursor: bool,
    is_selected: bool,
) -> (String, Style) {
    let bg = if is_selected {
        theme.title
    } else if is_cursor {
        theme.inactive_fg
    } else {
        theme.bg
    };
    match color {
        Some(c) => {
            let fg = theme.block_color(c.index());
            if palette == Palette::Colorblind {
                (
                    format!("{} ", theme::colorblind_glyph(c.index())),
                    Style::default().fg(fg).bg(bg),
                )
            } else if is_cursor || is_selected {
                ("▓▓".to_string(), Style::default().fg(fg).bg(bg))
            } else {
                ("██".to_string(), Style::default().fg(fg).bg(bg))
            }
        }
        None => ("  ".to_string(), Style::default().bg(bg)),
    }
}

fn draw_board(
    frame: &mut Frame,
    snap: &Snapshot,
    theme: &Theme,
    palette: Palette,
    cursor: (usize, usize),
    selected: Option<(usize, usize)>,
    outer: Rect,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" anxietui ", theme.title));
    let inner = block.inner(outer);
    block.render(outer, frame.buffer_mut());
    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let warn = snap.preview_fill >= game::PREVIEW_WARN_FILL;
    let buf = frame.buffer_mut();

    // Preview strip: blocks queued to drop on the next full tick
    for col in 0..COLS {
        let rx = inner.x + col as u16 * CELL_W;
        if rx >= inner.right() {
            break;
        }
        let (sym, style) = match snap.preview[col] {
            Some(color) => {
                let fg = theme.block_color(color.index());
                if palette == Palette::Colorblind {
                    (
                        format!("{} ", theme::colorblind_glyph(color.index())),
                        Style::default().fg(fg).bg(theme.bg),
                    )
                } else {
                    ("▄▄".to_string(), Style::default().fg(fg).bg(theme.bg))
                }
            }
            None => {
                let fg = if warn { Color::Red } else { theme.inactive_fg };
                ("··".to_string(), Style::default().fg(fg).bg(theme.bg))
            }
        };
        buf.set_string(rx, inner.y, sym, style);
    }

    if inner.height > 1 {
        let divider = "─".repeat(inner.width as usize);
        let div_fg = if warn { Color::Red } else { theme.div_line };
        buf.set_string(
            inner.x,
            inner.y + 1,
            divider,
            Style::default().fg(div_fg).bg(theme.bg),
        );
    }

    for row in 0..ROWS {
        let ry = inner.y + 2 + row as u16;
        if ry >= inner.bottom() {
            break;
        }
        for col in 0..COLS {
            let rx = inner.x + col as u16 * CELL_W;
            if rx >= inner.right() {
                break;
            }
            let is_cursor = !snap.game_over && cursor == (row, col);
            let is_selected = selected == Some((row, col));
            let (sym, style) =
                cell_appearance(snap.board[row][col], theme, palette, is_cursor, is_selected);
            buf.set_string(rx, ry, sym, style);
        }
    }
}

fn draw_sidebar(
    frame: &mut Frame,
    snap: &Snapshot,
    theme: &Theme,
    palette: Palette,
    high_score: u32,
    area: Rect,
) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Stats (score, best, level, progress bar)
            Constraint::Length(1), // gap
            Constraint::Length(3), // Chain
            Constraint::Length(1), // gap
            Constraint::Length(3), // Colours
        ])
        .split(area);

    // --- Stats ---
    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled("Stats", title_style));
    let stats_inner = stats_block.inner(chunks[0]);
    stats_block.render(chunks[0], frame.buffer_mut());
    let stats_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(1)])
        .split(stats_inner);
    let stats_lines = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(snap.score.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Best: ", title_style),
            Span::styled(high_score.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Level: ", title_style),
            Span::styled(snap.level.to_string(), fg_style),
        ]),
    ];
    Paragraph::new(stats_lines).render(stats_rows[0], frame.buffer_mut());
    let ratio = if snap.level_threshold > 0 {
        (f64::from(snap.level_progress) / f64::from(snap.level_threshold)).min(1.0)
    } else {
        0.0
    };
    Gauge::default()
        .ratio(ratio)
        .label(format!("{}/{}", snap.level_progress, snap.level_threshold))
        .gauge_style(Style::default().fg(theme.title).bg(theme.bg))
        .render(stats_rows[1], frame.buffer_mut());

    // --- Chain ---
    let chain_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled("Chain", title_style));
    let chain_inner = chain_block.inner(chunks[2]);
    chain_block.render(chunks[2], frame.buffer_mut());
    let chain_line = if snap.combo_chain > 0 {
        Line::from(Span::styled(
            format!("x{}", snap.combo_chain),
            Style::default().fg(theme.title).bold(),
        ))
    } else {
        Line::from(Span::styled("-", Style::default().fg(theme.inactive_fg)))
    };
    Paragraph::new(chain_line).render(chain_inner, frame.buffer_mut());

    // --- Colours ---
    let colours_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled("Colours", title_style));
    let colours_inner = colours_block.inner(chunks[4]);
    colours_block.render(chunks[4], frame.buffer_mut());
    if colours_inner.height == 0 {
        return;
    }
    let buf = frame.buffer_mut();
    for i in 0..6u8 {
        let rx = colours_inner.x + u16::from(i) * 3;
        if rx >= colours_inner.right() {
            break;
        }
        let c = theme.block_color(i);
        let sym = if palette == Palette::Colorblind {
            format!("{} ", theme::colorblind_glyph(i))
        } else {
            "██".to_string()
        };
        buf.set_string(rx, colours_inner.y, sym, Style::default().fg(c).bg(theme.bg));
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup_w = 28u16;
    let popup_h = 5u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    }
    .intersection(area);
    clear_backdrop(frame, popup, theme.bg);
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
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_game_over(
    frame: &mut Frame,
    snap: &Snapshot,
    theme: &Theme,
    high_score: u32,
    new_high_score: bool,
    area: Rect,
) {
    let popup_w = 42u16;
    let popup_h = 11u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    }
    .intersection(area);
    clear_backdrop(frame, popup, theme.bg);

    let mut lines: Vec<Line> = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Score: {} ", snap.score),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Best: {high_score} "),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Level: {} ", snap.level),
            Style::default().fg(theme.main_fg),
        )),
    ];
    if new_high_score {
        lines.push(Line::from(Span::styled(
            " New record! ",
            Style::default().fg(Color::Yellow).bold(),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " R — Restart    M — Menu    Q — Quit ",
        Style::default().fg(theme.main_fg),
    )));
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .title(Span::styled(" anxietui ", theme.title)),
    );
    p.render(popup, frame.buffer_mut());
}

pub fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let area = frame.area();
    let qw = 24;
    let qh = 8;
    let quit_rect = Rect {
        x: area.x + area.width.saturating_sub(qw) / 2,
        y: area.y + area.height.saturating_sub(qh) / 2,
        width: qw,
        height: qh,
    }
    .intersection(area);

    clear_backdrop(frame, quit_rect, theme.bg);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");
    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::MainMenu, " Main Menu "),
        (QuitOption::Exit, " Exit "),
    ];

    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            Style::default().fg(theme.bg).bg(theme.title).bold()
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + (inner.width.saturating_sub(label.len() as u16)) / 2;
        let ry = inner.y + 1 + i as u16 * 2;
        if ry < inner.bottom() {
            frame.buffer_mut().set_string(rx, ry, label, style);
        }
    }
}
