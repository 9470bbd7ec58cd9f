use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use rrule::{RRuleSet, Tz as RRuleTz};
use std::str::FromStr;

use crate::error::CoreError;
use crate::holidays::HolidayCalendar;

/// Named shortcuts for common chore schedules. Every entry passes
/// [`RecurrenceEngine::validate`].
pub const PRESETS: &[(&str, &str)] = &[
    ("daily", "FREQ=DAILY"),
    ("weekdays", "FREQ=DAILY;BYDAY=MO,TU,WE,TH,FR"),
    ("weekends", "FREQ=WEEKLY;BYDAY=SA,SU"),
    ("weekly", "FREQ=WEEKLY"),
    ("biweekly", "FREQ=WEEKLY;INTERVAL=2"),
    ("monthly", "FREQ=MONTHLY"),
    ("quarterly", "FREQ=MONTHLY;INTERVAL=3"),
    ("yearly", "FREQ=YEARLY"),
    ("weekly_monday", "FREQ=WEEKLY;BYDAY=MO"),
    ("weekly_friday", "FREQ=WEEKLY;BYDAY=FR"),
    ("twice_weekly", "FREQ=WEEKLY;BYDAY=MO,TH"),
    ("every_two_weeks", "FREQ=WEEKLY;INTERVAL=2"),
    ("first_of_month", "FREQ=MONTHLY;BYMONTHDAY=1"),
    ("last_of_month", "FREQ=MONTHLY;BYMONTHDAY=-1"),
    ("seasonal", "FREQ=MONTHLY;INTERVAL=3;BYMONTHDAY=1"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SECONDLY" => Ok(Frequency::Secondly),
            "MINUTELY" => Ok(Frequency::Minutely),
            "HOURLY" => Ok(Frequency::Hourly),
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            "YEARLY" => Ok(Frequency::Yearly),
            _ => Err(format!("unknown frequency '{s}'")),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Frequency::Secondly => "SECONDLY",
            Frequency::Minutely => "MINUTELY",
            Frequency::Hourly => "HOURLY",
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        };
        write!(f, "{s}")
    }
}

/// Descriptive fields extracted from a validated rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleInfo {
    pub frequency: Frequency,
    pub interval: u32,
    pub by_day: Vec<Weekday>,
    pub by_month_day: Option<i32>,
    pub by_month: Option<u32>,
    pub count: Option<u32>,
    pub until: Option<NaiveDate>,
}

/// What to do with an occurrence that lands on a public holiday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolidayStrategy {
    NextWorkingDay,
    PreviousWorkingDay,
    Skip,
}

/// Parameters for assembling a rule string without hand-writing RRULE syntax.
#[derive(Debug, Clone)]
pub struct RuleParams {
    pub frequency: Frequency,
    pub interval: u32,
    pub by_day: Vec<Weekday>,
    pub by_month_day: Option<i32>,
    pub by_month: Vec<u32>,
    pub count: Option<u32>,
    pub until: Option<NaiveDate>,
}

impl Default for RuleParams {
    fn default() -> Self {
        Self {
            frequency: Frequency::Weekly,
            interval: 1,
            by_day: Vec::new(),
            by_month_day: None,
            by_month: Vec::new(),
            count: None,
            until: None,
        }
    }
}

/// RecurrenceEngine: validates RRULE strings and expands them into bounded
/// date sequences, with optional weekend/holiday exclusion.
///
/// Holds an injected [`HolidayCalendar`] so tests can substitute a fixed
/// holiday set. Expansion is deterministic for a fixed calendar: two calls
/// with identical arguments produce identical sequences.
#[derive(Debug)]
pub struct RecurrenceEngine {
    calendar: HolidayCalendar,
}

impl RecurrenceEngine {
    /// A rule producing more than this many dates in a rolling year is
    /// rejected at validation time.
    pub const MAX_OCCURRENCES_PER_YEAR: usize = 365;
    /// Hard ceiling on the span of a single expansion window, in days.
    pub const MAX_SPAN_DAYS: i64 = 365;
    /// Upper bound on raw dates pulled from the rrule iterator per call.
    const RAW_EXPANSION_LIMIT: u16 = 1000;

    pub fn new(calendar: HolidayCalendar) -> Self {
        Self { calendar }
    }

    pub fn calendar(&self) -> &HolidayCalendar {
        &self.calendar
    }

    /// Validates a rule string and extracts its descriptive fields.
    ///
    /// An empty or unparseable rule yields `InvalidInput` with a readable
    /// reason. A rule that would produce more than
    /// [`Self::MAX_OCCURRENCES_PER_YEAR`] dates over the next year yields
    /// `BusinessRuleViolation`. No panic escapes this boundary.
    pub fn validate(&self, rule: &str) -> Result<RuleInfo, CoreError> {
        let rule = rule.trim();
        if rule.is_empty() {
            return Err(CoreError::InvalidInput(
                "Recurrence rule cannot be empty".to_string(),
            ));
        }

        let info = parse_rule_fields(rule).map_err(|reason| {
            CoreError::InvalidInput(format!("Invalid recurrence rule '{rule}': {reason}"))
        })?;

        // Simulate a year of expansion to bound worst-case generation cost.
        let start = Utc::now();
        let end = start + Duration::days(Self::MAX_SPAN_DAYS) - Duration::seconds(1);
        let set = parse_rule_set(rule, start)?;
        let bounded = set
            .after(start.with_timezone(&RRuleTz::UTC))
            .before(end.with_timezone(&RRuleTz::UTC));
        let (dates, _) = bounded.all(Self::MAX_OCCURRENCES_PER_YEAR as u16 + 1);
        if dates.len() > Self::MAX_OCCURRENCES_PER_YEAR {
            return Err(CoreError::BusinessRuleViolation(format!(
                "Rule '{rule}' generates too many occurrences (more than {} per year)",
                Self::MAX_OCCURRENCES_PER_YEAR
            )));
        }

        Ok(info)
    }

    /// Expands a rule into `(date, time-of-day)` pairs within
    /// `[start, end]`, both bounds inclusive.
    ///
    /// Weekend and holiday filters are applied after raw expansion; the
    /// sequence truncates at `max_count` even if more filtered dates remain.
    pub fn expand(
        &self,
        rule: &str,
        start: NaiveDate,
        end: NaiveDate,
        exclude_weekends: bool,
        exclude_holidays: bool,
        max_count: usize,
    ) -> Result<Vec<(NaiveDate, NaiveTime)>, CoreError> {
        if end < start {
            return Err(CoreError::InvalidInput(format!(
                "End date {end} must not precede start date {start}"
            )));
        }
        if (end - start).num_days() > Self::MAX_SPAN_DAYS {
            return Err(CoreError::BusinessRuleViolation(format!(
                "Generation window cannot exceed {} days",
                Self::MAX_SPAN_DAYS
            )));
        }

        let dtstart = start.and_time(NaiveTime::MIN).and_utc();
        let end_dt = end.and_time(end_of_day()).and_utc();
        let set = parse_rule_set(rule, dtstart)?;
        let bounded = set
            .after(dtstart.with_timezone(&RRuleTz::UTC))
            .before(end_dt.with_timezone(&RRuleTz::UTC));
        let (raw, _) = bounded.all(Self::RAW_EXPANSION_LIMIT);

        let mut occurrences = Vec::new();
        for dt in raw {
            if occurrences.len() >= max_count {
                break;
            }
            let utc = dt.with_timezone(&Utc);
            let date = utc.date_naive();
            if exclude_weekends && is_weekend(date) {
                continue;
            }
            if exclude_holidays && self.calendar.is_holiday(date) {
                continue;
            }
            occurrences.push((date, utc.time()));
        }

        Ok(occurrences)
    }

    /// Computes the next `count` occurrence dates from `from` (inclusive).
    /// Errors collapse to an empty list.
    pub fn next_occurrences(
        &self,
        rule: &str,
        from: NaiveDate,
        count: usize,
        exclude_weekends: bool,
        exclude_holidays: bool,
    ) -> Vec<NaiveDate> {
        let dtstart = from.and_time(NaiveTime::MIN).and_utc();
        let set = match parse_rule_set(rule, dtstart) {
            Ok(set) => set,
            Err(e) => {
                tracing::warn!(rule, error = %e, "cannot compute next occurrences");
                return Vec::new();
            }
        };

        let cap = (count.saturating_mul(3)).min(Self::RAW_EXPANSION_LIMIT as usize) as u16;
        let (raw, _) = set.after(dtstart.with_timezone(&RRuleTz::UTC)).all(cap);

        let mut dates = Vec::with_capacity(count);
        for dt in raw {
            if dates.len() >= count {
                break;
            }
            let date = dt.with_timezone(&Utc).date_naive();
            if exclude_weekends && is_weekend(date) {
                continue;
            }
            if exclude_holidays && self.calendar.is_holiday(date) {
                continue;
            }
            dates.push(date);
        }
        dates
    }

    /// Suggests the date on which a rule resumes after skipping `skip_count`
    /// occurrences from `current_date`.
    pub fn suggest_skip_until(
        &self,
        rule: &str,
        current_date: NaiveDate,
        skip_count: usize,
    ) -> Option<NaiveDate> {
        self.next_occurrences(rule, current_date, skip_count + 1, false, false)
            .get(skip_count)
            .copied()
    }

    /// Moves a date off a public holiday according to `strategy`.
    ///
    /// Non-holiday dates always pass through unchanged. `Skip` returns
    /// `None`, signalling "omit this occurrence".
    pub fn adjust_for_holiday(
        &self,
        date: NaiveDate,
        strategy: HolidayStrategy,
    ) -> Option<NaiveDate> {
        if !self.calendar.is_holiday(date) {
            return Some(date);
        }

        let step = match strategy {
            HolidayStrategy::Skip => return None,
            HolidayStrategy::NextWorkingDay => Duration::days(1),
            HolidayStrategy::PreviousWorkingDay => Duration::days(-1),
        };

        let mut adjusted = date + step;
        while is_weekend(adjusted) || self.calendar.is_holiday(adjusted) {
            adjusted += step;
        }
        Some(adjusted)
    }

    /// Looks up a preset rule by name.
    pub fn preset(name: &str) -> Option<&'static str> {
        PRESETS
            .iter()
            .find(|(preset_name, _)| *preset_name == name)
            .map(|(_, rule)| *rule)
    }

    /// Assembles a rule string from structured parameters.
    pub fn build_rule(params: &RuleParams) -> String {
        let mut parts = vec![format!("FREQ={}", params.frequency)];

        if params.interval > 1 {
            parts.push(format!("INTERVAL={}", params.interval));
        }
        if !params.by_day.is_empty() {
            let days: Vec<&str> = params.by_day.iter().map(|d| weekday_code(*d)).collect();
            parts.push(format!("BYDAY={}", days.join(",")));
        }
        if let Some(day) = params.by_month_day {
            parts.push(format!("BYMONTHDAY={day}"));
        }
        if !params.by_month.is_empty() {
            let months: Vec<String> = params.by_month.iter().map(u32::to_string).collect();
            parts.push(format!("BYMONTH={}", months.join(",")));
        }
        if let Some(count) = params.count {
            parts.push(format!("COUNT={count}"));
        }
        if let Some(until) = params.until {
            parts.push(format!("UNTIL={}", until.format("%Y%m%d")));
        }

        parts.join(";")
    }

    /// Renders a rule as a short English phrase, e.g.
    /// "Every week on Monday, Wednesday and Friday". Unparseable rules
    /// render as "Custom recurrence".
    pub fn describe(rule: &str) -> String {
        let info = match parse_rule_fields(rule.trim()) {
            Ok(info) => info,
            Err(_) => return "Custom recurrence".to_string(),
        };

        let (singular, plural) = match info.frequency {
            Frequency::Secondly => ("second", "seconds"),
            Frequency::Minutely => ("minute", "minutes"),
            Frequency::Hourly => ("hour", "hours"),
            Frequency::Daily => ("day", "days"),
            Frequency::Weekly => ("week", "weeks"),
            Frequency::Monthly => ("month", "months"),
            Frequency::Yearly => ("year", "years"),
        };

        let mut description = if info.interval > 1 {
            format!("Every {} {}", info.interval, plural)
        } else {
            format!("Every {singular}")
        };

        if !info.by_day.is_empty() {
            let names: Vec<&str> = info.by_day.iter().map(|d| day_name(*d)).collect();
            match names.split_last() {
                Some((last, [])) => description.push_str(&format!(" on {last}")),
                Some((last, rest)) => {
                    description.push_str(&format!(" on {} and {last}", rest.join(", ")))
                }
                None => {}
            }
        }

        if let Some(day) = info.by_month_day {
            if day == -1 {
                description.push_str(" on the last day of the month");
            } else {
                description.push_str(&format!(" on day {day} of the month"));
            }
        }

        if let Some(count) = info.count {
            description.push_str(&format!(" ({count} times in total)"));
        }
        if let Some(until) = info.until {
            description.push_str(&format!(" until {}", until.format("%Y-%m-%d")));
        }

        description
    }
}

impl Default for RecurrenceEngine {
    fn default() -> Self {
        Self::new(HolidayCalendar::default())
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

/// Prefixes a bare rule with a synthetic DTSTART so the `rrule` crate can
/// evaluate it; rules carrying their own DTSTART pass through untouched.
fn parse_rule_set(rule: &str, dtstart: DateTime<Utc>) -> Result<RRuleSet, CoreError> {
    let rrule_string = if rule.contains("DTSTART") {
        rule.to_string()
    } else {
        format!(
            "DTSTART:{}\nRRULE:{}",
            dtstart.format("%Y%m%dT%H%M%SZ"),
            normalize_until(rule)
        )
    };

    rrule_string
        .parse::<RRuleSet>()
        .map_err(|e| CoreError::InvalidInput(format!("Invalid recurrence rule '{rule}': {e}")))
}

/// Rewrites a date-only `UNTIL=YYYYMMDD` to an explicit UTC instant at the
/// end of that day. The synthesized DTSTART is UTC and the `rrule` crate
/// rejects a floating UNTIL next to it; end-of-day keeps the named date
/// itself inside the bound.
fn normalize_until(rule: &str) -> String {
    rule.split(';')
        .map(|part| match part.split_once('=') {
            Some((key, value))
                if key.eq_ignore_ascii_case("UNTIL")
                    && value.len() == 8
                    && value.bytes().all(|b| b.is_ascii_digit()) =>
            {
                format!("UNTIL={value}T235959Z")
            }
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

fn weekday_from_code(code: &str) -> Option<Weekday> {
    // BYDAY entries may carry an ordinal prefix ("1MO", "-1FR").
    let code = code.trim_start_matches(|c: char| c == '+' || c == '-' || c.is_ascii_digit());
    match code {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Hand parser for the descriptive-field subset (FREQ, INTERVAL, BYDAY,
/// BYMONTHDAY, BYMONTH, COUNT, UNTIL). Unknown keys are left to the `rrule`
/// crate to judge.
fn parse_rule_fields(rule: &str) -> Result<RuleInfo, String> {
    let body = rule
        .lines()
        .find_map(|line| line.strip_prefix("RRULE:"))
        .unwrap_or(rule);

    let mut frequency = None;
    let mut interval = 1u32;
    let mut by_day = Vec::new();
    let mut by_month_day = None;
    let mut by_month = None;
    let mut count = None;
    let mut until = None;

    for part in body.split(';').filter(|p| !p.is_empty()) {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| format!("malformed component '{part}'"))?;
        match key.to_uppercase().as_str() {
            "FREQ" => frequency = Some(value.parse::<Frequency>()?),
            "INTERVAL" => {
                interval = value
                    .parse::<u32>()
                    .ok()
                    .filter(|i| *i >= 1)
                    .ok_or_else(|| format!("invalid interval '{value}'"))?;
            }
            "BYDAY" => {
                for entry in value.split(',') {
                    let day = weekday_from_code(entry)
                        .ok_or_else(|| format!("invalid weekday '{entry}'"))?;
                    by_day.push(day);
                }
            }
            "BYMONTHDAY" => {
                let day = value
                    .split(',')
                    .next()
                    .and_then(|v| v.parse::<i32>().ok())
                    .filter(|d| (-31..=31).contains(d) && *d != 0)
                    .ok_or_else(|| format!("invalid month day '{value}'"))?;
                by_month_day = Some(day);
            }
            "BYMONTH" => {
                let month = value
                    .split(',')
                    .next()
                    .and_then(|v| v.parse::<u32>().ok())
                    .filter(|m| (1..=12).contains(m))
                    .ok_or_else(|| format!("invalid month '{value}'"))?;
                by_month = Some(month);
            }
            "COUNT" => {
                count = Some(
                    value
                        .parse::<u32>()
                        .ok()
                        .filter(|c| *c >= 1)
                        .ok_or_else(|| format!("invalid count '{value}'"))?,
                );
            }
            "UNTIL" => {
                if value.len() < 8 {
                    return Err(format!("invalid until '{value}'"));
                }
                let date = NaiveDate::parse_from_str(&value[..8], "%Y%m%d")
                    .map_err(|_| format!("invalid until '{value}'"))?;
                until = Some(date);
            }
            _ => {}
        }
    }

    let frequency = frequency.ok_or_else(|| "missing FREQ component".to_string())?;
    Ok(RuleInfo {
        frequency,
        interval,
        by_day,
        by_month_day,
        by_month,
        count,
        until,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn engine() -> RecurrenceEngine {
        RecurrenceEngine::new(HolidayCalendar::fixed([]))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_validate_extracts_fields() {
        let info = engine()
            .validate("FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,TH;COUNT=10")
            .unwrap();
        assert_eq!(info.frequency, Frequency::Weekly);
        assert_eq!(info.interval, 2);
        assert_eq!(info.by_day, vec![Weekday::Mon, Weekday::Thu]);
        assert_eq!(info.count, Some(10));
        assert!(info.until.is_none());
    }

    #[test]
    fn test_validate_until_date() {
        let info = engine().validate("FREQ=DAILY;UNTIL=20261231").unwrap();
        assert_eq!(info.until, Some(date(2026, 12, 31)));
    }

    #[test]
    fn test_validate_empty_rule() {
        let err = engine().validate("").unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_validate_garbage_rule() {
        assert!(matches!(
            engine().validate("NOT_A_RULE").unwrap_err(),
            CoreError::InvalidInput(_)
        ));
        assert!(matches!(
            engine().validate("FREQ=FORTNIGHTLY").unwrap_err(),
            CoreError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_validate_rejects_too_many_occurrences() {
        // Hourly would produce ~8760 dates per year.
        let err = engine().validate("FREQ=HOURLY").unwrap_err();
        assert!(matches!(err, CoreError::BusinessRuleViolation(_)));
    }

    #[test]
    fn test_validate_daily_is_within_yearly_ceiling() {
        assert!(engine().validate("FREQ=DAILY").is_ok());
    }

    #[test]
    fn test_all_presets_validate() {
        let engine = engine();
        for (name, rule) in PRESETS {
            assert!(
                engine.validate(rule).is_ok(),
                "preset '{name}' failed validation"
            );
        }
    }

    #[test]
    fn test_preset_lookup() {
        assert_eq!(
            RecurrenceEngine::preset("weekdays"),
            Some("FREQ=DAILY;BYDAY=MO,TU,WE,TH,FR")
        );
        assert_eq!(RecurrenceEngine::preset("hourly"), None);
    }

    #[test]
    fn test_expand_weekly_by_day_window() {
        // Mon/Wed/Fri between Mon 2024-01-01 and Mon 2024-01-15, inclusive.
        let dates: Vec<NaiveDate> = engine()
            .expand(
                "FREQ=WEEKLY;BYDAY=MO,WE,FR",
                date(2024, 1, 1),
                date(2024, 1, 15),
                false,
                false,
                100,
            )
            .unwrap()
            .into_iter()
            .map(|(d, _)| d)
            .collect();

        assert_eq!(
            dates,
            vec![
                date(2024, 1, 1),
                date(2024, 1, 3),
                date(2024, 1, 5),
                date(2024, 1, 8),
                date(2024, 1, 10),
                date(2024, 1, 12),
                date(2024, 1, 15),
            ]
        );
    }

    #[test]
    fn test_expand_until_bounded_rule() {
        // The UNTIL date itself is the last generated date, even though the
        // window runs past it.
        let dates: Vec<NaiveDate> = engine()
            .expand(
                "FREQ=DAILY;UNTIL=20240105",
                date(2024, 1, 1),
                date(2024, 1, 10),
                false,
                false,
                100,
            )
            .unwrap()
            .into_iter()
            .map(|(d, _)| d)
            .collect();

        assert_eq!(
            dates,
            vec![
                date(2024, 1, 1),
                date(2024, 1, 2),
                date(2024, 1, 3),
                date(2024, 1, 4),
                date(2024, 1, 5),
            ]
        );
    }

    #[test]
    fn test_expand_rejects_inverted_window() {
        let err = engine()
            .expand("FREQ=DAILY", date(2024, 2, 1), date(2024, 1, 1), false, false, 10)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn test_expand_rejects_oversized_window() {
        let err = engine()
            .expand(
                "FREQ=DAILY",
                date(2024, 1, 1),
                date(2025, 6, 1),
                false,
                false,
                10,
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::BusinessRuleViolation(_)));
    }

    #[test]
    fn test_expand_excludes_weekends() {
        // Mon 2024-06-03 through Sun 2024-06-09.
        let dates = engine()
            .expand(
                "FREQ=DAILY",
                date(2024, 6, 3),
                date(2024, 6, 9),
                true,
                false,
                100,
            )
            .unwrap();
        assert_eq!(dates.len(), 5);
        assert!(dates.iter().all(|(d, _)| !is_weekend(*d)));
    }

    #[test]
    fn test_expand_excludes_holidays() {
        let engine = RecurrenceEngine::new(HolidayCalendar::fixed([date(2024, 6, 5)]));
        let dates: Vec<NaiveDate> = engine
            .expand(
                "FREQ=DAILY",
                date(2024, 6, 3),
                date(2024, 6, 7),
                false,
                true,
                100,
            )
            .unwrap()
            .into_iter()
            .map(|(d, _)| d)
            .collect();
        assert_eq!(dates.len(), 4);
        assert!(!dates.contains(&date(2024, 6, 5)));
    }

    #[test]
    fn test_expand_truncates_at_max_count() {
        let dates = engine()
            .expand(
                "FREQ=DAILY",
                date(2024, 1, 1),
                date(2024, 3, 1),
                false,
                false,
                5,
            )
            .unwrap();
        assert_eq!(dates.len(), 5);
    }

    #[test]
    fn test_adjust_for_holiday_passthrough() {
        let engine = RecurrenceEngine::new(HolidayCalendar::fixed([date(2024, 7, 5)]));
        for strategy in [
            HolidayStrategy::NextWorkingDay,
            HolidayStrategy::PreviousWorkingDay,
            HolidayStrategy::Skip,
        ] {
            assert_eq!(
                engine.adjust_for_holiday(date(2024, 7, 3), strategy),
                Some(date(2024, 7, 3))
            );
        }
    }

    #[test]
    fn test_adjust_for_holiday_strategies() {
        // Fri 2024-07-05 is the holiday; the following Mon is the next
        // working day, the preceding Thu the previous one.
        let engine = RecurrenceEngine::new(HolidayCalendar::fixed([date(2024, 7, 5)]));
        assert_eq!(
            engine.adjust_for_holiday(date(2024, 7, 5), HolidayStrategy::NextWorkingDay),
            Some(date(2024, 7, 8))
        );
        assert_eq!(
            engine.adjust_for_holiday(date(2024, 7, 5), HolidayStrategy::PreviousWorkingDay),
            Some(date(2024, 7, 4))
        );
        assert_eq!(
            engine.adjust_for_holiday(date(2024, 7, 5), HolidayStrategy::Skip),
            None
        );
    }

    #[test]
    fn test_adjust_walks_over_consecutive_holidays() {
        let engine = RecurrenceEngine::new(HolidayCalendar::fixed([
            date(2024, 12, 25),
            date(2024, 12, 26),
        ]));
        assert_eq!(
            engine.adjust_for_holiday(date(2024, 12, 25), HolidayStrategy::NextWorkingDay),
            Some(date(2024, 12, 27))
        );
    }

    #[test]
    fn test_next_occurrences_invalid_rule_is_empty() {
        assert!(engine()
            .next_occurrences("garbage", date(2024, 1, 1), 5, false, false)
            .is_empty());
    }

    #[test]
    fn test_suggest_skip_until() {
        let next = engine().suggest_skip_until("FREQ=WEEKLY;BYDAY=MO", date(2024, 1, 1), 1);
        assert_eq!(next, Some(date(2024, 1, 8)));
    }

    #[test]
    fn test_build_rule() {
        let rule = RecurrenceEngine::build_rule(&RuleParams {
            frequency: Frequency::Weekly,
            interval: 2,
            by_day: vec![Weekday::Mon, Weekday::Thu],
            count: Some(10),
            ..Default::default()
        });
        assert_eq!(rule, "FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,TH;COUNT=10");
        assert!(engine().validate(&rule).is_ok());
    }

    #[test]
    fn test_build_rule_minimal() {
        let rule = RecurrenceEngine::build_rule(&RuleParams::default());
        assert_eq!(rule, "FREQ=WEEKLY");
    }

    #[test]
    fn test_describe() {
        assert_eq!(RecurrenceEngine::describe("FREQ=DAILY"), "Every day");
        assert_eq!(
            RecurrenceEngine::describe("FREQ=WEEKLY;BYDAY=MO,WE,FR"),
            "Every week on Monday, Wednesday and Friday"
        );
        assert_eq!(
            RecurrenceEngine::describe("FREQ=WEEKLY;INTERVAL=2"),
            "Every 2 weeks"
        );
        assert_eq!(
            RecurrenceEngine::describe("FREQ=MONTHLY;BYMONTHDAY=-1"),
            "Every month on the last day of the month"
        );
        assert_eq!(
            RecurrenceEngine::describe("FREQ=DAILY;COUNT=3"),
            "Every day (3 times in total)"
        );
        assert_eq!(RecurrenceEngine::describe("nonsense"), "Custom recurrence");
    }

    proptest! {
        #[test]
        fn prop_expand_is_deterministic(
            preset_idx in 0usize..PRESETS.len(),
            start_offset in 0i64..1000,
            span in 0i64..365,
        ) {
            let engine = RecurrenceEngine::new(HolidayCalendar::fixed([date(2024, 5, 1)]));
            let (_, rule) = PRESETS[preset_idx];
            let start = date(2024, 1, 1) + Duration::days(start_offset);
            let end = start + Duration::days(span);

            let first = engine.expand(rule, start, end, true, true, 100).unwrap();
            let second = engine.expand(rule, start, end, true, true, 100).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
