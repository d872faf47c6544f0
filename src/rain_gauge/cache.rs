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
use crate::locator::Station;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct HistoryKey {
    stations: BTreeSet<String>,
    last_day: NaiveDate,
    lookback_days: u32,
}

impl HistoryKey {
    fn new(stations: &[Station], last_day: NaiveDate, lookback_days: u32) -> Self {
        HistoryKey {
            stations: stations.iter().map(|s| s.id.clone()).collect(),
            last_day,
            lookback_days,
        }
    }
}

/// Memoized station history, keyed by the set of stations and the lookback window.
///
/// Inserting history for a day evicts entries for every older day, so a long running
/// process only holds history for the current day.
#[derive(Debug, Default)]
pub struct HistoryCache {
    entries: Mutex<HashMap<HistoryKey, Vec<DailyPrecipitation>>>,
}

impl HistoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stations: &[Station], last_day: NaiveDate, lookback_days: u32) -> Option<Vec<DailyPrecipitation>> {
        let key = HistoryKey::new(stations, last_day, lookback_days);
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(&key).cloned()
    }

    pub fn insert(&self, stations: &[Station], last_day: NaiveDate, lookback_days: u32, history: Vec<DailyPrecipitation>) {
        let key = HistoryKey::new(stations, last_day, lookback_days);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|k, _| k.last_day >= last_day);
        entries.insert(key, history);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod test {
    use super::HistoryCache;
    use crate::geo::Coordinate;
    use crate::history::DailyPrecipitation;
    use crate::locator::Station;
    use chrono::NaiveDate;

    fn station(id: &str) -> Station {
        Station {
            id: id.to_owned(),
            display_name: id.to_owned(),
            coordinate: Coordinate::new(40.0, -75.0).unwrap(),
            distance_miles: 0.0,
        }
    }

    #[test]
    fn test_station_order_ignored() {
        let cache = HistoryCache::new();
        let day = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let history = vec![DailyPrecipitation {
            date: day,
            average_inches: 0.5,
        }];

        cache.insert(&[station("A"), station("B")], day, 1, history.clone());

        assert_eq!(Some(history), cache.get(&[station("B"), station("A")], day, 1));
        assert_eq!(None, cache.get(&[station("A")], day, 1));
        assert_eq!(None, cache.get(&[station("A"), station("B")], day, 2));
        assert_eq!(1, cache.len());
    }

    #[test]
    fn test_new_day_evicts_older_days() {
        let cache = HistoryCache::new();
        let today = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let tomorrow = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let history = |date| {
            vec![DailyPrecipitation {
                date,
                average_inches: 0.1,
            }]
        };

        cache.insert(&[station("A")], today, 1, history(today));
        cache.insert(&[station("B")], today, 1, history(today));
        assert_eq!(2, cache.len());

        cache.insert(&[station("A")], tomorrow, 1, history(tomorrow));
        assert_eq!(1, cache.len());
        assert_eq!(None, cache.get(&[station("A")], today, 1));
        assert_eq!(None, cache.get(&[station("B")], today, 1));
        assert_eq!(Some(history(tomorrow)), cache.get(&[station("A")], tomorrow, 1));

        // Late inserts for an older day don't evict the newer entries
        cache.insert(&[station("B")], today, 1, history(today));
        assert_eq!(Some(history(tomorrow)), cache.get(&[station("A")], tomorrow, 1));
    }
}
