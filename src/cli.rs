use clap::{Parser, Subcommand, ValueEnum};

use speedbar::{Justify, UnitSystem};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Drive the speed decorators with a simulated transfer
    Simulate(Simulate),
    /// Format a single rate and print it
    Render {
        /// Rate in units per second
        value: f64,
        /// Unit system
        #[arg(long, value_enum, default_value_t = UnitOpt::Binary)]
        unit: UnitOpt,
        /// printf-style format for the value
        #[arg(long, default_value = "% .1f", allow_hyphen_values = true)]
        format: String,
    },
}

#[derive(Parser, Clone, Debug)]
pub struct Simulate {
    /// Bytes to transfer
    #[arg(long, default_value_t = 64 << 20)]
    pub total: u64,

    /// Bytes per chunk
    #[arg(long, default_value_t = 256 << 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub chunk: u64,

    /// Milliseconds each chunk takes
    #[arg(long, default_value_t = 20)]
    pub chunk_ms: u64,

    /// Stall once after this many bytes
    #[arg(long)]
    pub pause_at: Option<u64>,

    /// Length of the stall in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub pause_ms: u64,

    /// Unit system
    #[arg(long, value_enum, default_value_t = UnitOpt::Binary)]
    pub unit: UnitOpt,

    /// printf-style format for the speed value
    #[arg(long, default_value = "% .1f", allow_hyphen_values = true)]
    pub format: String,

    /// EWMA age of the smoothed speed; 0 selects the fixed-age average
    #[arg(long, default_value_t = 30.0, value_parser = parse_age)]
    pub age: f64,

    /// Minimum width of each speed column
    #[arg(long, default_value_t = 12)]
    pub width: usize,

    /// Alignment inside the column
    #[arg(long, value_enum, default_value_t = JustifyOpt::Right)]
    pub justify: JustifyOpt,

    /// Redraw interval in milliseconds
    #[arg(long, default_value_t = 100)]
    pub tick_ms: u64,

    /// Message shown instead of the speed once the transfer completes
    #[arg(long)]
    pub done_msg: Option<String>,

    /// Summary output format
    #[arg(long, value_enum, default_value_t = SummaryFormat::Text)]
    pub summary: SummaryFormat,
}

fn parse_age(s: &str) -> Result<f64, String> {
    let age: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if !age.is_finite() || age < 0.0 {
        return Err(format!("age must be a finite number >= 0, got {s}"));
    }
    Ok(age)
}

#[derive(ValueEnum, Copy, Clone, Debug)]
pub enum UnitOpt {
    None,
    Binary,
    Decimal,
}

impl From<UnitOpt> for UnitSystem {
    fn from(v: UnitOpt) -> Self {
        match v {
            UnitOpt::None => UnitSystem::None,
            UnitOpt::Binary => UnitSystem::Binary,
            UnitOpt::Decimal => UnitSystem::Decimal,
        }
    }
}

#[derive(ValueEnum, Copy, Clone, Debug)]
pub enum JustifyOpt {
    Left,
    Right,
}

impl From<JustifyOpt> for Justify {
    fn from(v: JustifyOpt) -> Self {
        match v {
            JustifyOpt::Left => Justify::Left,
            JustifyOpt::Right => Justify::Right,
        }
    }
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum SummaryFormat {
    Text,
    Json,
}
