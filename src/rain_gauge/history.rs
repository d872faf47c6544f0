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

use crate::client::HistoryObservation;
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Average precipitation across all reporting stations for a single day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyPrecipitation {
    pub date: NaiveDate,
    pub average_inches: f64,
}

/// The highest precipitation total any observation for a station reported that day.
///
/// Totals accumulate over the day but the upstream feed can repeat or drop observations,
/// so the maximum is used rather than the last value. `None` if no observation included
/// a total.
pub fn station_day_max(observations: &[HistoryObservation]) -> Option<f64> {
    observations
        .iter()
        .filter_map(HistoryObservation::precip_total)
        .filter(|v| v.is_finite())
        .reduce(f64::max)
}

/// Mean of the per-station values for a day, `None` if no station reported.
pub fn day_average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Consecutive calendar days, oldest first, ending with `last_day`.
pub fn lookback_days(last_day: NaiveDate, num_days: u32) -> Vec<NaiveDate> {
    (0..num_days)
        .rev()
        .filter_map(|offset| last_day.checked_sub_days(Days::new(u64::from(offset))))
        .collect()
}

/// Merge computed daily averages into a complete series covering `days`.
///
/// Days without an entry in `averages` had no reporting stations and are filled with
/// zero. Entries in `averages` for days outside of `days` are ignored.
pub fn fill_window(days: &[NaiveDate], averages: &BTreeMap<NaiveDate, f64>) -> Vec<DailyPrecipitation> {
    days.iter()
        .map(|date| DailyPrecipitation {
            date: *date,
            average_inches: averages.get(date).copied().unwrap_or(0.0),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::{day_average, fill_window, lookback_days, station_day_max};
    use crate::client::{HistoryObservation, ImperialReadings};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn obs(total: Option<f64>) -> HistoryObservation {
        HistoryObservation {
            station_id: Some("KPA1".to_owned()),
            obs_time_local: None,
            imperial: Some(ImperialReadings {
                precip_total: total,
                precip_rate: None,
            }),
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_station_day_max() {
        assert_eq!(Some(0.3), station_day_max(&[obs(Some(0.1)), obs(Some(0.3)), obs(Some(0.2))]));
        assert_eq!(Some(0.0), station_day_max(&[obs(Some(0.0)), obs(None)]));
    }

    #[test]
    fn test_station_day_max_nothing_reported() {
        let no_imperial = HistoryObservation {
            station_id: None,
            obs_time_local: None,
            imperial: None,
        };

        assert_eq!(None, station_day_max(&[]));
        assert_eq!(None, station_day_max(&[obs(None), no_imperial]));
    }

    #[test]
    fn test_day_average() {
        assert_eq!(None, day_average(&[]));
        assert_eq!(Some(0.3), day_average(&[0.3]));

        let avg = day_average(&[0.3, 0.2]).unwrap();
        assert!((avg - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_lookback_days() {
        let days = lookback_days(date(3), 5);
        assert_eq!(
            vec![
                NaiveDate::from_ymd_opt(2024, 5, 30).unwrap(),
                NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
                date(1),
                date(2),
                date(3),
            ],
            days
        );
        assert!(lookback_days(date(3), 0).is_empty());
    }

    #[test]
    fn test_fill_window() {
        let days = lookback_days(date(5), 4);
        let mut averages = BTreeMap::new();
        averages.insert(date(3), 0.5);
        averages.insert(date(5), 0.25);
        averages.insert(date(20), 9.0);

        let filled = fill_window(&days, &averages);
        let values: Vec<f64> = filled.iter().map(|d| d.average_inches).collect();

        assert_eq!(4, filled.len());
        assert_eq!(date(2), filled[0].date);
        assert_eq!(vec![0.0, 0.5, 0.0, 0.25], values);
    }
}
