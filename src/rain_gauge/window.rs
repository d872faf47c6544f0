// rain_gauge - Local rainfall tracker built on nearby personal weather stations
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use crate::history::DailyPrecipitation;
use serde::Serialize;
use std::error;
use std::fmt;
use std::str::FromStr;

/// Span of the rolling sum used by `CumulativeMode::Rolling` by default.
pub const DEFAULT_ROLLING_DAYS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowError {
    pub requested: usize,
    pub available: usize,
}

impl fmt::Display for WindowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "window of {} days is not within 1 to {} days",
            self.requested, self.available
        )
    }
}

impl error::Error for WindowError {}

/// How the cumulative series for a window is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "days")]
pub enum CumulativeMode {
    /// Running total over the displayed window only.
    #[default]
    Prefix,
    /// Sum of the trailing N days, computed over the full history and then trimmed to
    /// the displayed window. The first days of the history sum whatever is available.
    Rolling(usize),
}

impl fmt::Display for CumulativeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prefix => write!(f, "prefix"),
            Self::Rolling(n) => write!(f, "rolling:{}", n),
        }
    }
}

impl FromStr for CumulativeMode {
    type Err = String;

    /// Parse `prefix`, `rolling`, or `rolling:N` (case insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.split_once(':') {
            None if lower == "prefix" => Ok(Self::Prefix),
            None if lower == "rolling" => Ok(Self::Rolling(DEFAULT_ROLLING_DAYS)),
            Some(("rolling", n)) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Ok(Self::Rolling(n)),
                _ => Err(format!("invalid rolling span {:?}", n)),
            },
            _ => Err(format!("unknown cumulative mode {:?}", s)),
        }
    }
}

/// The most recent days of a history along with a cumulative total for each day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Window {
    pub days: Vec<DailyPrecipitation>,
    pub cumulative: Vec<f64>,
    pub mode: CumulativeMode,
}

impl Window {
    pub fn total_inches(&self) -> f64 {
        self.days.iter().map(|d| d.average_inches).sum()
    }
}

/// Trim `history` to its last `n` days with a running total over those days.
pub fn window(history: &[DailyPrecipitation], n: usize) -> Result<Window, WindowError> {
    window_with(history, n, CumulativeMode::Prefix)
}

/// Trim `history` to its last `n` days with a cumulative series computed per `mode`.
pub fn window_with(history: &[DailyPrecipitation], n: usize, mode: CumulativeMode) -> Result<Window, WindowError> {
    if n == 0 || n > history.len() {
        return Err(WindowError {
            requested: n,
            available: history.len(),
        });
    }

    let start = history.len() - n;
    let days = history[start..].to_vec();
    let cumulative = match mode {
        CumulativeMode::Prefix => prefix_sum(&days),
        CumulativeMode::Rolling(span) => rolling_sum(history, span).split_off(start),
    };

    Ok(Window { days, cumulative, mode })
}

fn prefix_sum(days: &[DailyPrecipitation]) -> Vec<f64> {
    days.iter()
        .scan(0.0, |total, d| {
            *total += d.average_inches;
            Some(*total)
        })
        .collect()
}

fn rolling_sum(days: &[DailyPrecipitation], span: usize) -> Vec<f64> {
    let span = span.max(1);
    (0..days.len())
        .map(|i| {
            let from = (i + 1).saturating_sub(span);
            days[from..=i].iter().map(|d| d.average_inches).sum::<f64>()
        })
        .collect()
}
