use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::width::{pad, Justify};

pub const KIB: f64 = 1024.0;
pub const MIB: f64 = KIB * 1024.0;
pub const GIB: f64 = MIB * 1024.0;
pub const TIB: f64 = GIB * 1024.0;

pub const KB: f64 = 1000.0;
pub const MB: f64 = KB * 1000.0;
pub const GB: f64 = MB * 1000.0;
pub const TB: f64 = GB * 1000.0;

pub const BASE_SUFFIX: &str = "b/s";

pub const MAX_FIELD: usize = 256;

// Largest first: the first threshold met wins.
const BINARY_TABLE: [(f64, &str); 4] = [(TIB, "TiB/s"), (GIB, "GiB/s"), (MIB, "MiB/s"), (KIB, "KiB/s")];
const DECIMAL_TABLE: [(f64, &str); 4] = [(TB, "TB/s"), (GB, "GB/s"), (MB, "MB/s"), (KB, "kB/s")];

/// How a raw per-second magnitude is scaled into a unit.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    None,
    Binary,
    Decimal,
}

impl UnitSystem {
    fn table(self) -> Option<&'static [(f64, &'static str)]> {
        match self {
            UnitSystem::None => None,
            UnitSystem::Binary => Some(&BINARY_TABLE),
            UnitSystem::Decimal => Some(&DECIMAL_TABLE),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum VerbClass {
    Float,
    Integer,
    Text,
}

/// A parsed printf-style format such as `"%.1f"` or `"% -10.2f"`.
///
/// Only one verb is allowed. Literal text around it is kept and `%%`
/// stands for a single percent sign.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeedFormat {
    prefix: String,
    suffix: String,
    verb: VerbClass,
    precision: Option<usize>,
    width: usize,
    left: bool,
    space: bool,
}

impl SpeedFormat {
    pub fn parse(format: &str) -> Result<Self, FormatError> {
        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut directive: Option<(VerbClass, Option<usize>, usize, bool, bool)> = None;

        let mut chars = format.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                if directive.is_some() { suffix.push(c) } else { prefix.push(c) }
                continue;
            }
            if chars.peek() == Some(&'%') {
                chars.next();
                if directive.is_some() { suffix.push('%') } else { prefix.push('%') }
                continue;
            }

            let (mut left, mut space) = (false, false);
            while let Some(&flag) = chars.peek() {
                match flag {
                    '-' => left = true,
                    ' ' => space = true,
                    '+' | '0' | '#' => {}
                    _ => break,
                }
                chars.next();
            }

            let width = take_number(&mut chars).unwrap_or(0);
            let precision = if chars.peek() == Some(&'.') {
                chars.next();
                // "%.f" means precision zero, as in printf
                Some(take_number(&mut chars).unwrap_or(0))
            } else {
                None
            };
            if let Some(field) = Some(width).into_iter().chain(precision).find(|&n| n > MAX_FIELD) {
                return Err(FormatError::FieldTooLarge { field, format: format.to_string() });
            }

            let verb = match chars.next() {
                Some('f' | 'F' | 'e' | 'E' | 'g' | 'G' | 'v') => VerbClass::Float,
                Some('d') => VerbClass::Integer,
                Some('s') => VerbClass::Text,
                Some(other) => {
                    return Err(FormatError::UnknownVerb { verb: other, format: format.to_string() })
                }
                None => return Err(FormatError::DanglingPercent { format: format.to_string() }),
            };
            if directive.is_some() {
                return Err(FormatError::MultipleVerbs(format.to_string()));
            }
            directive = Some((verb, precision, width, left, space));
        }

        let (verb, precision, width, left, space) =
            directive.ok_or_else(|| FormatError::MissingVerb(format.to_string()))?;
        Ok(Self { prefix, suffix, verb, precision, width, left, space })
    }

    /// Digits after the point for a scaled mantissa; `None` means shortest
    /// round-trip text.
    fn mantissa_precision(&self) -> Option<usize> {
        match self.verb {
            VerbClass::Integer => Some(0),
            VerbClass::Text => None,
            VerbClass::Float => Some(self.precision.unwrap_or(6)),
        }
    }

    fn justify(&self) -> Justify {
        if self.left { Justify::Left } else { Justify::Right }
    }

    pub fn render(&self, value: f64, unit: UnitSystem) -> String {
        render(value, unit, self)
    }
}

impl FromStr for SpeedFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SpeedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let escape = |s: &str| s.replace('%', "%%");
        write!(f, "{}%", escape(&self.prefix))?;
        if self.left {
            f.write_str("-")?;
        }
        if self.space {
            f.write_str(" ")?;
        }
        if self.width > 0 {
            write!(f, "{}", self.width)?;
        }
        if let Some(p) = self.precision {
            write!(f, ".{p}")?;
        }
        let verb = match self.verb {
            VerbClass::Float => 'f',
            VerbClass::Integer => 'd',
            VerbClass::Text => 's',
        };
        write!(f, "{verb}{}", escape(&self.suffix))
    }
}

fn take_number<I: Iterator<Item = char>>(chars: &mut std::iter::Peekable<I>) -> Option<usize> {
    let mut n: Option<usize> = None;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        n = Some(n.unwrap_or(0).saturating_mul(10).saturating_add(d as usize));
        chars.next();
    }
    n
}

/// Scales `value` (units per second) into the largest unit of `unit` it
/// reaches and formats it according to `format`.
///
/// `"%.1f"` renders 1048576 as `"1.0MiB/s"` in binary units, `"% .1f"` as
/// `"1.0 MiB/s"`. Anything under the smallest threshold is an integer count
/// of `b/s`.
pub fn render(value: f64, unit: UnitSystem, format: &SpeedFormat) -> String {
    let body = match unit.table() {
        None => (value as i64).to_string(),
        Some(table) => {
            let (mantissa, suffix) = scale(value, table, format.mantissa_precision());
            if format.space {
                format!("{mantissa} {suffix}")
            } else {
                format!("{mantissa}{suffix}")
            }
        }
    };
    let body = pad(&body, format.width, format.justify());
    format!("{}{}{}", format.prefix, body, format.suffix)
}

fn scale(value: f64, table: &[(f64, &'static str)], precision: Option<usize>) -> (String, &'static str) {
    match table.iter().find(|(threshold, _)| value >= *threshold) {
        Some(&(threshold, suffix)) => {
            let scaled = value / threshold;
            let mantissa = match precision {
                Some(p) => format!("{scaled:.p$}"),
                None => format!("{scaled}"),
            };
            (mantissa, suffix)
        }
        None => ((value as i64).to_string(), BASE_SUFFIX),
    }
}
