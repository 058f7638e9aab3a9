//! Matchtui — match-3 tile puzzle in the terminal.

mod app;
mod board;
mod game;
mod input;
mod rng;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};

/// Options derived from CLI that affect game behaviour (grid, token kinds,
/// animation durations, scoring, determinism).
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub size: usize,
    pub kinds: u8,
    pub swap_ms: u64,
    pub shrink_ms: u64,
    pub fall_ms: u64,
    pub reward: u32,
    pub seed: Option<u32>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    anyhow::ensure!(
        (3..=16).contains(&args.size),
        "grid size must be between 3 and 16"
    );
    anyhow::ensure!(
        (3..=theme::MAX_KINDS).contains(&args.kinds),
        "token kinds must be between 3 and {}",
        theme::MAX_KINDS
    );
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette)?;
    let config = GameConfig {
        size: args.size,
        kinds: args.kinds,
        swap_ms: args.swap_ms,
        shrink_ms: args.shrink_ms,
        fall_ms: args.fall_ms,
        reward: args.reward,
        seed: args.seed,
    };
    let mut app = App::new(config, theme);
    app.run()?;
    Ok(())
}

/// Match-3 tile puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "matchtui",
    version,
    about = "Match-3 tile puzzle in the terminal. Swap adjacent tokens to line up three or more; runs clear, tiles fall, cascades chain.",
    long_about = "Matchtui is a terminal match-3 puzzle.\n\n\
        Click (or move the cursor and press Enter) to select a token, then an adjacent one to \
        swap them. A swap that lines up three or more equal tokens clears them; the tiles above \
        fall, fresh ones drop in, and any new runs cascade. A swap that matches nothing is \
        cancelled.\n\n\
        CONTROLS (normal):\n  Mouse       Select/swap   Arrows    Move cursor   Enter/Space  Select\n  P           Pause         R         Restart       Q / Esc      Quit\n\n\
        CONTROLS (vim):\n  h/j/k/l     Move cursor   Space     Select        q            Quit\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme) and --seed for a reproducible board."
)]
pub struct Args {
    /// Grid size N (the board is N×N).
    #[arg(short = 'n', long, default_value = "6", value_name = "N")]
    pub size: usize,

    /// Number of distinct token kinds in play.
    #[arg(short, long, default_value = "5", value_name = "K")]
    pub kinds: u8,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Swap animation duration in ms.
    #[arg(long, default_value = "600", value_name = "MS")]
    pub swap_ms: u64,

    /// Shrink (clear) animation duration in ms.
    #[arg(long, default_value = "150", value_name = "MS")]
    pub shrink_ms: u64,

    /// Fall animation duration in ms.
    #[arg(long, default_value = "900", value_name = "MS")]
    pub fall_ms: u64,

    /// Score per cleared tile.
    #[arg(long, default_value = "10", value_name = "PTS")]
    pub reward: u32,

    /// RNG seed for a reproducible board and refills. Random when not set.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u32>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
