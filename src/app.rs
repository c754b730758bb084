//! App: terminal init, main loop, tick and key handling.

use crate::game::{self, COLS, GameEvent, GameState, ROWS};
use crate::highscores;
use crate::input::{Action, key_to_action};
use crate::settings::Settings;
use crate::theme::Theme;
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// Target frame time for the render/input loop (~60 FPS).
const FRAME_MS: u64 = 16;
/// Lifetime of a floating score label.
const POPUP_TTL_MS: u64 = 900;
/// Board shake window after a match (when the shake setting is on).
pub(crate) const SHAKE_MS: u64 = 220;
/// Menu cap for the start-level selector; the tick interval bottoms out here.
const MAX_START_LEVEL: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    GameOver,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    MainMenu,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuTab {
    StartLevel,
    Sound,
    Shake,
    Start,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuState {
    pub current_tab: MenuTab,
    pub start_level: u32,
    pub animation_start: Instant,
}

impl Default for MenuState {
    fn default() -> Self {
        Self {
            current_tab: MenuTab::StartLevel,
            start_level: 1,
            animation_start: Instant::now(),
        }
    }
}

/// Floating score label anchored to a board cell, drifting upward until it
/// expires.
#[derive(Debug, Clone)]
pub struct ScorePopup {
    pub row: usize,
    pub col: usize,
    pub label: String,
    pub spawned: Instant,
}

pub struct App {
    args: Args,
    config: GameConfig,
    theme: Theme,
    settings: Settings,
    engine: GameState,
    screen: Screen,
    /// Board cursor (row, col).
    cursor: (usize, usize),
    /// Cell picked up by the first Select, if any.
    selected: Option<(usize, usize)>,
    last_tick: Instant,
    popups: Vec<ScorePopup>,
    /// Cells cleared by the latest match batch, for the flash effect.
    flash_cells: Vec<(usize, usize)>,
    /// TachyonFX flash over freshly cleared cells (created when a match lands).
    clear_flash: Option<Effect>,
    /// Last time we processed the flash effect (for delta).
    clear_flash_process_time: Option<Instant>,
    shake_started: Option<Instant>,
    menu_state: MenuState,
    quit_selected: QuitOption,
    /// Best score seen, including this run.
    high_score: u32,
    /// Value last written to disk; only overwritten when beaten.
    saved_high_score: u32,
    new_high_score: bool,
}

/// Seed for runs without an explicit --seed.
fn seed_from_clock() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() ^ d.as_secs() as u32)
        .unwrap_or(0)
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme, settings: Settings) -> Result<Self> {
        let seed = config.seed.unwrap_or_else(seed_from_clock);
        let mut engine = GameState::new(seed);
        let screen = if args.no_menu {
            engine.start(config.start_level);
            Screen::Playing
        } else {
            Screen::Menu
        };
        let high_score = highscores::load_high_score();
        let menu_state = MenuState {
            start_level: config.start_level.max(1),
            ..MenuState::default()
        };
        Ok(Self {
            args,
            config,
            theme,
            settings,
            engine,
            screen,
            cursor: (ROWS / 2, COLS / 2),
            selected: None,
            last_tick: Instant::now(),
            popups: Vec::new(),
            flash_cells: Vec::new(),
            clear_flash: None,
            clear_flash_process_time: None,
            shake_started: None,
            menu_state,
            quit_selected: QuitOption::Resume,
            high_score,
            saved_high_score: high_score,
            new_high_score: false,
        })
    }

    /// Fresh session: new engine (new seed unless one was pinned on the CLI),
    /// cursor back to centre, stale popups and effects dropped.
    fn start_game(&mut self) {
        let seed = self.config.seed.unwrap_or_else(seed_from_clock);
        self.engine = GameState::new(seed);
        self.engine.start(self.menu_state.start_level);
        self.screen = Screen::Playing;
        self.cursor = (ROWS / 2, COLS / 2);
        self.selected = None;
        self.popups.clear();
        self.flash_cells.clear();
        self.clear_flash = None;
        self.clear_flash_process_time = None;
        self.shake_started = None;
        self.new_high_score = false;
        self.last_tick = Instant::now();
    }

    /// First Select picks up an occupied cell, a second one issues the swap.
    /// Reselecting the held cell puts it back down.
    fn select_cell(&mut self) {
        let cell = self.cursor;
        match self.selected {
            None => {
                if self.engine.block_at(cell.0, cell.1).is_some() {
                    self.selected = Some(cell);
                }
            }
            Some(held) if held == cell => self.selected = None,
            Some(held) => {
                self.engine.swap(held, cell);
                self.selected = None;
            }
        }
    }

    fn note_score(&mut self) {
        let score = self.engine.score();
        if score > self.high_score {
            self.high_score = score;
            self.new_high_score = true;
        }
    }

    fn persist_high_score(&mut self) -> Result<()> {
        if self.high_score > self.saved_high_score {
            highscores::save_high_score(self.high_score)?;
            self.saved_high_score = self.high_score;
        }
        Ok(())
    }

    fn ring_bell(&self) {
        if !self.settings.sound {
            return;
        }
        use std::io::Write;
        let mut out = std::io::stdout();
        let _ = out.write_all(b"\x07");
        let _ = out.flush();
    }

    /// Turn engine events into popups, bell, shake, flash and screen changes.
    fn drain_events(&mut self) -> Result<()> {
        let mut cleared: Vec<(usize, usize)> = Vec::new();
        for event in self.engine.take_events() {
            match event {
                GameEvent::Match {
                    points,
                    chain,
                    cells,
                } => {
                    let (row, col) = cells.first().copied().unwrap_or((0, 0));
                    let label = if chain > 0 {
                        format!("+{points} (x{})", f64::from(chain) * 0.5 + 1.0)
                    } else {
                        format!("+{points}")
                    };
                    self.popups.push(ScorePopup {
                        row,
                        col,
                        label,
                        spawned: Instant::now(),
                    });
                    cleared.extend(cells);
                    self.ring_bell();
                    if self.settings.haptics {
                        self.shake_started = Some(Instant::now());
                    }
                }
                GameEvent::LevelUp { level } => {
                    self.popups.push(ScorePopup {
                        row: ROWS / 2,
                        col: COLS / 2 - 1,
                        label: format!("Level {level}"),
                        spawned: Instant::now(),
                    });
                    self.ring_bell();
                }
                GameEvent::GameOver => {
                    self.ring_bell();
                    self.screen = Screen::GameOver;
                    self.selected = None;
                    self.persist_high_score()?;
                }
            }
        }
        if !cleared.is_empty() {
            self.flash_cells = cleared;
            self.clear_flash = None;
            self.clear_flash_process_time = None;
        }
        Ok(())
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{
                KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
                PushKeyboardEnhancementFlags,
            },
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        // Attempt to enable enhanced keyboard so held keys report Repeat
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        self.persist_high_score()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            let snap = self.engine.snapshot();
            let quit_selected = (self.screen == Screen::QuitMenu).then_some(self.quit_selected);
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &snap,
                    &self.theme,
                    self.args.palette,
                    &self.menu_state,
                    self.settings,
                    self.cursor,
                    self.selected,
                    &self.popups,
                    self.high_score,
                    self.new_high_score,
                    quit_selected,
                    self.shake_started,
                    &self.flash_cells,
                    &mut self.clear_flash,
                    &mut self.clear_flash_process_time,
                    now,
                    f.area(),
                )
            })?;

            if self.clear_flash.as_ref().is_some_and(|e| e.done()) {
                self.clear_flash = None;
                self.clear_flash_process_time = None;
                self.flash_cells.clear();
            }
            self.popups
                .retain(|p| p.spawned.elapsed() < Duration::from_millis(POPUP_TTL_MS));
            if self
                .shake_started
                .is_some_and(|t| t.elapsed() >= Duration::from_millis(SHAKE_MS))
            {
                self.shake_started = None;
            }

            // Limit event polling so rendering stays at ~60 FPS
            let frame_duration = Duration::from_millis(FRAME_MS);
            let timeout = frame_duration.saturating_sub(now.elapsed());

            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind == KeyEventKind::Release {
                            continue;
                        }
                        let action = key_to_action(key);
                        // Held keys only repeat cursor movement
                        if key.kind == KeyEventKind::Repeat
                            && !matches!(
                                action,
                                Action::CursorLeft
                                    | Action::CursorRight
                                    | Action::CursorUp
                                    | Action::CursorDown
                            )
                        {
                            continue;
                        }

                        match self.screen {
                            Screen::Menu => match action {
                                Action::Quit => return Ok(()),
                                Action::CursorUp => {
                                    self.menu_state.current_tab = match self.menu_state.current_tab
                                    {
                                        MenuTab::StartLevel => MenuTab::Start,
                                        MenuTab::Sound => MenuTab::StartLevel,
                                        MenuTab::Shake => MenuTab::Sound,
                                        MenuTab::Start => MenuTab::Shake,
                                    };
                                }
                                Action::CursorDown => {
                                    self.menu_state.current_tab = match self.menu_state.current_tab
                                    {
                                        MenuTab::StartLevel => MenuTab::Sound,
                                        MenuTab::Sound => MenuTab::Shake,
                                        MenuTab::Shake => MenuTab::Start,
                                        MenuTab::Start => MenuTab::StartLevel,
                                    };
                                }
                                Action::CursorLeft => match self.menu_state.current_tab {
                                    MenuTab::StartLevel => {
                                        self.menu_state.start_level =
                                            self.menu_state.start_level.saturating_sub(1).max(1);
                                    }
                                    MenuTab::Sound => {
                                        self.settings.sound = !self.settings.sound;
                                        self.settings.save()?;
                                    }
                                    MenuTab::Shake => {
                                        self.settings.haptics = !self.settings.haptics;
                                        self.settings.save()?;
                                    }
                                    MenuTab::Start => {}
                                },
                                Action::CursorRight => match self.menu_state.current_tab {
                                    MenuTab::StartLevel => {
                                        self.menu_state.start_level =
                                            (self.menu_state.start_level + 1).min(MAX_START_LEVEL);
                                    }
                                    MenuTab::Sound => {
                                        self.settings.sound = !self.settings.sound;
                                        self.settings.save()?;
                                    }
                                    MenuTab::Shake => {
                                        self.settings.haptics = !self.settings.haptics;
                                        self.settings.save()?;
                                    }
                                    MenuTab::Start => {}
                                },
                                Action::Select => match self.menu_state.current_tab {
                                    MenuTab::StartLevel => {
                                        self.menu_state.current_tab = MenuTab::Start;
                                    }
                                    MenuTab::Sound => {
                                        self.settings.sound = !self.settings.sound;
                                        self.settings.save()?;
                                    }
                                    MenuTab::Shake => {
                                        self.settings.haptics = !self.settings.haptics;
                                        self.settings.save()?;
                                    }
                                    MenuTab::Start => self.start_game(),
                                },
                                Action::Pause | Action::None => {}
                            },
                            Screen::Playing => {
                                if self.engine.is_paused() {
                                    match action {
                                        Action::Pause => {
                                            self.engine.set_paused(false);
                                            self.last_tick = Instant::now();
                                        }
                                        Action::Quit => {
                                            self.screen = Screen::QuitMenu;
                                            self.quit_selected = QuitOption::Resume;
                                        }
                                        _ => {}
                                    }
                                } else {
                                    match action {
                                        Action::Pause => self.engine.set_paused(true),
                                        Action::Quit => {
                                            self.screen = Screen::QuitMenu;
                                            self.quit_selected = QuitOption::Resume;
                                        }
                                        Action::CursorLeft => {
                                            self.cursor.1 = self.cursor.1.saturating_sub(1);
                                        }
                                        Action::CursorRight => {
                                            self.cursor.1 = (self.cursor.1 + 1).min(COLS - 1);
                                        }
                                        Action::CursorUp => {
                                            self.cursor.0 = self.cursor.0.saturating_sub(1);
                                        }
                                        Action::CursorDown => {
                                            self.cursor.0 = (self.cursor.0 + 1).min(ROWS - 1);
                                        }
                                        Action::Select => self.select_cell(),
                                        Action::None => {}
                                    }
                                }
                            }
                            Screen::QuitMenu => match action {
                                Action::CursorDown | Action::CursorRight => {
                                    self.quit_selected = match self.quit_selected {
                                        QuitOption::Resume => QuitOption::MainMenu,
                                        QuitOption::MainMenu => QuitOption::Exit,
                                        QuitOption::Exit => QuitOption::Resume,
                                    };
                                }
                                Action::CursorUp | Action::CursorLeft => {
                                    self.quit_selected = match self.quit_selected {
                                        QuitOption::Resume => QuitOption::Exit,
                                        QuitOption::MainMenu => QuitOption::Resume,
                                        QuitOption::Exit => QuitOption::MainMenu,
                                    };
                                }
                                Action::Select => match self.quit_selected {
                                    QuitOption::Resume => {
                                        self.screen = Screen::Playing;
                                        self.last_tick = Instant::now();
                                    }
                                    QuitOption::MainMenu => self.screen = Screen::Menu,
                                    QuitOption::Exit => return Ok(()),
                                },
                                Action::Pause | Action::Quit => {
                                    self.screen = Screen::Playing;
                                    self.last_tick = Instant::now();
                                }
                                _ => {}
                            },
                            Screen::GameOver => {
                                if action == Action::Quit {
                                    return Ok(());
                                }
                                match key.code {
                                    KeyCode::Char('r') | KeyCode::Char('R') => self.start_game(),
                                    KeyCode::Char('m') | KeyCode::Char('M') => {
                                        self.screen = Screen::Menu;
                                    }
                                    _ => {}
                                }
                            }
                        }
                    }
                }
            }

            if self.screen == Screen::Playing
                && !self.engine.is_paused()
                && !self.engine.is_game_over()
            {
                let tick_interval =
                    Duration::from_millis(game::tick_interval_ms(self.engine.level()));
                if self.last_tick.elapsed() >= tick_interval {
                    self.last_tick = Instant::now();
                    self.engine.tick();
                }
            }

            self.note_score();
            self.drain_events()?;
        }
    }
}
