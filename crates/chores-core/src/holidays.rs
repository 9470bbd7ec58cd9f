use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Mutex;
use thiserror::Error;

/// Region whose public-holiday set is used for exclusion and adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    #[default]
    France,
    UnitedStates,
    UnitedKingdom,
}

#[derive(Error, Debug, PartialEq)]
#[error("Unknown holiday region: {0}")]
pub struct ParseRegionError(String);

impl FromStr for Region {
    type Err = ParseRegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FR" => Ok(Region::France),
            "US" => Ok(Region::UnitedStates),
            "UK" => Ok(Region::UnitedKingdom),
            _ => Err(ParseRegionError(s.to_string())),
        }
    }
}

/// Public-holiday lookup for one region, memoized per year.
///
/// Explicitly constructed and injected wherever holiday awareness is needed;
/// tests substitute an exact date set via [`HolidayCalendar::fixed`].
#[derive(Debug)]
pub struct HolidayCalendar {
    region: Region,
    fixed: Option<HashSet<NaiveDate>>,
    cache: Mutex<HashMap<i32, HashSet<NaiveDate>>>,
}

impl HolidayCalendar {
    pub fn new(region: Region) -> Self {
        Self {
            region,
            fixed: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Calendar backed by an exact date set instead of regional rules.
    pub fn fixed(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            region: Region::default(),
            fixed: Some(dates.into_iter().collect()),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        if let Some(fixed) = &self.fixed {
            return fixed.contains(&date);
        }
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache
            .entry(date.year())
            .or_insert_with(|| holidays_for_year(self.region, date.year()))
            .contains(&date)
    }
}

impl Default for HolidayCalendar {
    fn default() -> Self {
        Self::new(Region::default())
    }
}

fn holidays_for_year(region: Region, year: i32) -> HashSet<NaiveDate> {
    match region {
        Region::France => france(year),
        Region::UnitedStates => united_states(year),
        Region::UnitedKingdom => united_kingdom(year),
    }
}

fn france(year: i32) -> HashSet<NaiveDate> {
    let easter = easter_sunday(year);
    [
        ymd(year, 1, 1),
        easter + Duration::days(1),
        ymd(year, 5, 1),
        ymd(year, 5, 8),
        easter + Duration::days(39),
        easter + Duration::days(50),
        ymd(year, 7, 14),
        ymd(year, 8, 15),
        ymd(year, 11, 1),
        ymd(year, 11, 11),
        ymd(year, 12, 25),
    ]
    .into_iter()
    .collect()
}

fn united_states(year: i32) -> HashSet<NaiveDate> {
    [
        ymd(year, 1, 1),
        nth_weekday(year, 1, Weekday::Mon, 3),
        nth_weekday(year, 2, Weekday::Mon, 3),
        last_weekday(year, 5, Weekday::Mon),
        ymd(year, 6, 19),
        ymd(year, 7, 4),
        nth_weekday(year, 9, Weekday::Mon, 1),
        nth_weekday(year, 10, Weekday::Mon, 2),
        ymd(year, 11, 11),
        nth_weekday(year, 11, Weekday::Thu, 4),
        ymd(year, 12, 25),
    ]
    .into_iter()
    .collect()
}

fn united_kingdom(year: i32) -> HashSet<NaiveDate> {
    let easter = easter_sunday(year);
    [
        ymd(year, 1, 1),
        easter - Duration::days(2),
        easter + Duration::days(1),
        nth_weekday(year, 5, Weekday::Mon, 1),
        last_weekday(year, 5, Weekday::Mon),
        last_weekday(year, 8, Weekday::Mon),
        ymd(year, 12, 25),
        ymd(year, 12, 26),
    ]
    .into_iter()
    .collect()
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    // All call sites use constants valid for every year.
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> NaiveDate {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n).unwrap_or(NaiveDate::MIN)
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> NaiveDate {
    let next_month = if month == 12 {
        ymd(year + 1, 1, 1)
    } else {
        ymd(year, month + 1, 1)
    };
    let mut d = next_month - Duration::days(1);
    while d.weekday() != weekday {
        d -= Duration::days(1);
    }
    d
}

/// Anonymous Gregorian computus.
fn easter_sunday(year: i32) -> NaiveDate {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    ymd(year, month as u32, day as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(2024, 3, 31)]
    #[case(2025, 4, 20)]
    #[case(2026, 4, 5)]
    fn test_easter_known_years(#[case] year: i32, #[case] month: u32, #[case] day: u32) {
        assert_eq!(easter_sunday(year), ymd(year, month, day));
    }

    #[test]
    fn test_france_holidays() {
        let cal = HolidayCalendar::new(Region::France);
        assert!(cal.is_holiday(ymd(2024, 7, 14)));
        assert!(cal.is_holiday(ymd(2024, 4, 1))); // Easter Monday
        assert!(cal.is_holiday(ymd(2024, 5, 9))); // Ascension
        assert!(!cal.is_holiday(ymd(2024, 7, 15)));
    }

    #[test]
    fn test_united_states_holidays() {
        let cal = HolidayCalendar::new(Region::UnitedStates);
        assert!(cal.is_holiday(ymd(2024, 7, 4)));
        assert!(cal.is_holiday(ymd(2024, 11, 28))); // Thanksgiving
        assert!(cal.is_holiday(ymd(2024, 5, 27))); // Memorial Day
        assert!(!cal.is_holiday(ymd(2024, 7, 14)));
    }

    #[test]
    fn test_united_kingdom_holidays() {
        let cal = HolidayCalendar::new(Region::UnitedKingdom);
        assert!(cal.is_holiday(ymd(2024, 3, 29))); // Good Friday
        assert!(cal.is_holiday(ymd(2024, 12, 26)));
        assert!(cal.is_holiday(ymd(2024, 8, 26))); // summer bank holiday
        assert!(!cal.is_holiday(ymd(2024, 11, 11)));
    }

    #[test]
    fn test_fixed_calendar_overrides_region() {
        let cal = HolidayCalendar::fixed([ymd(2024, 6, 3)]);
        assert!(cal.is_holiday(ymd(2024, 6, 3)));
        assert!(!cal.is_holiday(ymd(2024, 7, 14)));
    }

    #[test]
    fn test_region_parsing() {
        assert_eq!("fr".parse::<Region>().unwrap(), Region::France);
        assert_eq!("US".parse::<Region>().unwrap(), Region::UnitedStates);
        assert!("DE".parse::<Region>().is_err());
    }
}
