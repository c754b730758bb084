//! Anxietui — match-3 falling-block puzzle game in the terminal.

mod app;
mod game;
mod highscores;
mod input;
mod settings;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};

/// Options derived from CLI that affect game behaviour (start level, RNG seed).
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub start_level: u32,
    pub seed: Option<u32>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette)?;
    let mut settings = settings::Settings::load();
    if args.no_sound {
        settings.sound = false;
    }
    if args.no_shake {
        settings.haptics = false;
    }
    let config = GameConfig {
        start_level: args.start_level,
        seed: args.seed,
    };
    let mut app = App::new(args, config, theme, settings)?;
    app.run()?;
    Ok(())
}

/// Match-3 falling-block puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "anxietui",
    version,
    about = "Match-3 falling-block puzzle in the terminal. Swap blocks into runs of 3+ before the board fills.",
    long_about = "Anxietui is a terminal match-3 puzzle on a 10×8 board.\n\n\
        A preview row fills one block per tick; once full, the whole row drops onto the board. \
        Swap any two cells to line up 3 or more settled blocks of one colour, horizontally or \
        vertically. Matches clear, blocks above fall, and follow-up matches chain into combos. \
        The game ends when a drop lands on an occupied top row.\n\n\
        CONTROLS:\n  Arrows / hjkl  Move cursor   Enter/Space  Pick up / swap\n  P              Pause         Q / Esc      Quit\n\n\
        Use --theme to load a btop-style theme file, --palette for high-contrast or colorblind \
        variants, and --seed for a reproducible block sequence."
)]
pub struct Args {
    /// Start level (minimum 1). Higher levels tick faster and need more points.
    #[arg(short = 'l', long, default_value = "1", value_name = "N")]
    pub start_level: u32,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses the built-in neon palette if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// RNG seed for a reproducible block sequence.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u32>,

    /// Skip main menu and start playing immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Disable the terminal bell for this run (not persisted).
    #[arg(long)]
    pub no_sound: bool,

    /// Disable the board shake effect for this run (not persisted).
    #[arg(long)]
    pub no_shake: bool,
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
