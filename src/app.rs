//! App: terminal init, frame loop, key and mouse handling.

use crate::game::GameState;
use crate::input::{Action, cell_at, key_to_action};
use crate::rng::TokenRng;
use crate::GameConfig;
use crate::theme::Theme;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind, MouseButton, MouseEventKind};
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// Target render rate; also the popup aging step.
const FRAME_MS: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    Restart,
    Exit,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    state: GameState,
    /// Keyboard cursor; arrows/hjkl move it, Enter/Space acts on it.
    cursor: (usize, usize),
    screen: Screen,
    paused: bool,
    quit_selected: QuitOption,
    /// TachyonFX fade for the shrink phase (created when the phase starts).
    shrink_effect: Option<Effect>,
    /// Last time the shrink effect was processed (for delta).
    shrink_effect_process_time: Option<Instant>,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Self {
        let rng = match config.seed {
            Some(seed) => TokenRng::new(seed),
            None => TokenRng::from_clock(),
        };
        let state = GameState::new(&config, rng);
        let center = config.size / 2;
        Self {
            config,
            theme,
            state,
            cursor: (center, center),
            screen: Screen::Playing,
            paused: false,
            quit_selected: QuitOption::Resume,
            shrink_effect: None,
            shrink_effect_process_time: None,
        }
    }

    fn reset_game(&mut self) {
        let rng = match self.config.seed {
            Some(seed) => TokenRng::new(seed),
            None => TokenRng::from_clock(),
        };
        self.state = GameState::new(&self.config, rng);
        self.screen = Screen::Playing;
        self.paused = false;
        self.quit_selected = QuitOption::Resume;
        self.shrink_effect = None;
        self.shrink_effect_process_time = None;
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();

            if !self.paused && self.screen == Screen::Playing {
                self.state.tick(now);
                self.state.tick_popups(FRAME_MS as u32);
            }
            // The effect lives exactly as long as the shrink phase does.
            if !matches!(self.state.phase(), crate::game::Phase::Shrinking(_)) {
                self.shrink_effect = None;
                self.shrink_effect_process_time = None;
            }

            let quit_menu =
                (self.screen == Screen::QuitMenu).then_some(self.quit_selected);
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    &self.state,
                    &self.theme,
                    self.cursor,
                    self.paused,
                    quit_menu,
                    now,
                    &mut self.shrink_effect,
                    &mut self.shrink_effect_process_time,
                    self.config.shrink_ms,
                )
            })?;

            let timeout = Duration::from_millis(FRAME_MS).saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    match event::read()? {
                        Event::Key(key) if key.kind == KeyEventKind::Press => {
                            if self.handle_key(key_to_action(key))? {
                                return Ok(());
                            }
                        }
                        Event::Mouse(mouse)
                            if mouse.kind == MouseEventKind::Down(MouseButton::Left) =>
                        {
                            self.handle_click(mouse.column, mouse.row)?;
                        }
                        _ => {}
                    }
                }
            }

        }
    }

    /// Returns true when the app should exit.
    fn handle_key(&mut self, action: Action) -> Result<bool> {
        let now = Instant::now();
        match self.screen {
            Screen::Playing if self.paused => match action {
                Action::Pause | Action::Select => self.paused = false,
                Action::Quit => {
                    self.screen = Screen::QuitMenu;
                    self.quit_selected = QuitOption::Resume;
                }
                _ => {}
            },
            Screen::Playing => match action {
                Action::Pause => self.paused = true,
                Action::Restart => self.reset_game(),
                Action::Quit => {
                    self.screen = Screen::QuitMenu;
                    self.quit_selected = QuitOption::Resume;
                }
                Action::MoveUp => self.cursor.0 = self.cursor.0.saturating_sub(1),
                Action::MoveDown => {
                    self.cursor.0 = (self.cursor.0 + 1).min(self.config.size - 1);
                }
                Action::MoveLeft => self.cursor.1 = self.cursor.1.saturating_sub(1),
                Action::MoveRight => {
                    self.cursor.1 = (self.cursor.1 + 1).min(self.config.size - 1);
                }
                Action::Select => self.state.handle_click(self.cursor, now),
                Action::None => {}
            },
            Screen::QuitMenu => match action {
                Action::MoveDown | Action::MoveRight => {
                    self.quit_selected = match self.quit_selected {
                        QuitOption::Resume => QuitOption::Restart,
                        QuitOption::Restart => QuitOption::Exit,
                        QuitOption::Exit => QuitOption::Resume,
                    };
                }
                Action::MoveUp | Action::MoveLeft => {
                    self.quit_selected = match self.quit_selected {
                        QuitOption::Resume => QuitOption::Exit,
                        QuitOption::Restart => QuitOption::Resume,
                        QuitOption::Exit => QuitOption::Restart,
                    };
                }
                Action::Select => match self.quit_selected {
                    QuitOption::Resume => self.screen = Screen::Playing,
                    QuitOption::Restart => self.reset_game(),
                    QuitOption::Exit => return Ok(true),
                },
                Action::Pause | Action::Quit => self.screen = Screen::Playing,
                _ => {}
            },
        }
        Ok(false)
    }

    /// Mouse click: map to a cell via the same layout the renderer uses and
    /// hand it to the selection logic. Misclicks simply do nothing.
    fn handle_click(&mut self, column: u16, row: u16) -> Result<()> {
        if self.screen != Screen::Playing || self.paused {
            return Ok(());
        }
        let (cols, rows) = crossterm::terminal::size().unwrap_or((80, 24));
        let area = Rect::new(0, 0, cols, rows);
        let board = crate::ui::board_rect(area, self.config.size);
        if let Some(cell) = cell_at(column, row, board, self.config.size) {
            self.cursor = cell;
            self.state.handle_click(cell, Instant::now());
        }
        Ok(())
    }
}
