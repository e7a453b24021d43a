//! Tests for schedule expansion: one first occurrence per resolved weekday.

use chrono::{Datelike, TimeZone, Utc};
use class_schedule::{
    expand, Frequency, RecurrenceInput, RecurrenceRule, ScheduleConfig, ScheduleError, TimeOfDay,
    Weekday, WeekdayTime,
};

fn input(start_date: &str, rule: RecurrenceRule) -> RecurrenceInput {
    RecurrenceInput {
        start_date: start_date.to_string(),
        timezone: "America/New_York".to_string(),
        rule,
        exceptions: Vec::new(),
        overrides: Vec::new(),
    }
}

fn weekly(days: &[Weekday]) -> RecurrenceRule {
    let mut rule = RecurrenceRule::new(Frequency::Weekly);
    rule.by_weekday = days.to_vec();
    rule
}

fn at(hour: u32, minute: u32) -> TimeOfDay {
    TimeOfDay::new(hour, minute).unwrap()
}

// ---------------------------------------------------------------------------
// Reference scenarios
// ---------------------------------------------------------------------------

#[test]
fn monday_start_mon_wed_gives_two_schedules() {
    // 2026-01-05 is a Monday
    let schedules = expand(
        &input("2026-01-05", weekly(&[Weekday::Monday, Weekday::Wednesday])),
        &ScheduleConfig::default(),
    )
    .expect("should expand successfully");

    assert_eq!(schedules.len(), 2);

    assert_eq!(schedules[0].weekday, Some(Weekday::Monday));
    assert_eq!(schedules[0].time, at(9, 0));
    assert_eq!(
        schedules[0].start_at,
        Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap()
    );

    assert_eq!(schedules[1].weekday, Some(Weekday::Wednesday));
    assert_eq!(
        schedules[1].start_at,
        Utc.with_ymd_and_hms(2026, 1, 7, 9, 0, 0).unwrap()
    );
}

#[test]
fn explicit_friday_time_from_a_tuesday_start() {
    // 2026-01-06 is a Tuesday → next Friday is 2026-01-09
    let mut rule = RecurrenceRule::new(Frequency::Weekly);
    rule.weekday_times = vec![WeekdayTime {
        day: Weekday::Friday,
        time: at(16, 0),
    }];

    let schedules = expand(&input("2026-01-06", rule), &ScheduleConfig::default()).unwrap();

    assert_eq!(schedules.len(), 1);
    let friday = &schedules[0];
    assert_eq!(friday.weekday, Some(Weekday::Friday));
    assert_eq!(friday.time, at(16, 0));
    assert_eq!(
        friday.start_at,
        Utc.with_ymd_and_hms(2026, 1, 9, 16, 0, 0).unwrap()
    );
    assert_eq!(
        friday.end_at,
        Utc.with_ymd_and_hms(2026, 1, 9, 17, 0, 0).unwrap()
    );
}

#[test]
fn no_weekday_information_uses_the_start_dates_weekday() {
    // 2026-01-08 is a Thursday
    let schedules = expand(
        &input("2026-01-08", RecurrenceRule::new(Frequency::Weekly)),
        &ScheduleConfig::default(),
    )
    .unwrap();

    assert_eq!(schedules.len(), 1);
    assert_eq!(schedules[0].weekday, Some(Weekday::Thursday));
    assert_eq!(schedules[0].start_at.date_naive().day(), 8);
}

// ---------------------------------------------------------------------------
// Ordering and duplicates
// ---------------------------------------------------------------------------

#[test]
fn output_follows_resolver_order_not_calendar_order() {
    // Saturday listed first even though Monday comes sooner.
    let schedules = expand(
        &input("2026-01-05", weekly(&[Weekday::Saturday, Weekday::Monday])),
        &ScheduleConfig::default(),
    )
    .unwrap();

    let days: Vec<Option<Weekday>> = schedules.iter().map(|s| s.weekday).collect();
    assert_eq!(days, vec![Some(Weekday::Saturday), Some(Weekday::Monday)]);
    assert!(schedules[0].start_at > schedules[1].start_at);
}

#[test]
fn duplicate_weekdays_pass_through() {
    let schedules = expand(
        &input("2026-01-05", weekly(&[Weekday::Tuesday, Weekday::Tuesday])),
        &ScheduleConfig::default(),
    )
    .unwrap();

    assert_eq!(schedules.len(), 2);
    assert_eq!(schedules[0], schedules[1]);
}

#[test]
fn same_weekday_at_two_times_gives_two_schedules() {
    let mut rule = RecurrenceRule::new(Frequency::Weekly);
    rule.weekday_times = vec![
        WeekdayTime {
            day: Weekday::Monday,
            time: at(8, 0),
        },
        WeekdayTime {
            day: Weekday::Monday,
            time: at(14, 30),
        },
    ];

    let schedules = expand(&input("2026-01-05", rule), &ScheduleConfig::default()).unwrap();

    assert_eq!(schedules.len(), 2);
    assert_eq!(schedules[0].time, at(8, 0));
    assert_eq!(schedules[1].time, at(14, 30));
    assert_eq!(
        schedules[1].start_at,
        Utc.with_ymd_and_hms(2026, 1, 5, 14, 30, 0).unwrap()
    );
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn configured_defaults_are_applied() {
    let config = ScheduleConfig {
        default_time: at(7, 45),
        session_minutes: 90,
        ..ScheduleConfig::default()
    };

    let schedules = expand(&input("2026-01-05", weekly(&[Weekday::Monday])), &config).unwrap();

    assert_eq!(
        schedules[0].start_at,
        Utc.with_ymd_and_hms(2026, 1, 5, 7, 45, 0).unwrap()
    );
    assert_eq!(
        schedules[0].end_at,
        Utc.with_ymd_and_hms(2026, 1, 5, 9, 15, 0).unwrap()
    );
}

#[test]
fn non_weekly_frequency_still_resolves_weekdays() {
    let mut rule = RecurrenceRule::new(Frequency::Monthly);
    rule.by_weekday = vec![Weekday::Friday];

    let schedules = expand(&input("2026-01-05", rule), &ScheduleConfig::default()).unwrap();

    assert_eq!(schedules.len(), 1);
    assert_eq!(schedules[0].weekday, Some(Weekday::Friday));
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn unparsable_start_date_is_an_input_error() {
    let result = expand(
        &input("next monday", weekly(&[Weekday::Monday])),
        &ScheduleConfig::default(),
    );

    match result {
        Err(err @ ScheduleError::InvalidDate(_)) => assert!(err.is_input_error()),
        other => panic!("expected InvalidDate, got {other:?}"),
    }
}

#[test]
fn unparsable_start_date_fails_even_with_explicit_times() {
    let mut rule = RecurrenceRule::new(Frequency::Weekly);
    rule.weekday_times = vec![WeekdayTime {
        day: Weekday::Friday,
        time: at(16, 0),
    }];

    assert!(matches!(
        expand(&input("2026/01/06", rule), &ScheduleConfig::default()),
        Err(ScheduleError::InvalidDate(_))
    ));
}
