#[path = "../support/mod.rs"]
mod support;

use chrono::NaiveTime;
use planet_lib::error::AppResult;
use planet_lib::models::event::Event;
use planet_lib::models::tag::Tag;
use planet_lib::models::task::Task;
use planet_lib::services::solver::add_tasks;
use planet_lib::utils::logger::{init_logging, LoggingOptions};

use support::{assert_spaced, at, setup_calendar};

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

#[test]
fn test_events_then_tagged_tasks_flow() -> AppResult<()> {
    init_logging(&LoggingOptions::default())?;
    let mut calendar = setup_calendar("2021-05-13 00:00")?;

    // Two-day trip; with all-day set the clock times do not matter.
    let mut trip = Event::new("trip", at("2021-05-13 14:00"), at("2021-05-14 12:00"))?;
    trip.set_all_day(true, calendar.offset())?;
    calendar.insert_event(trip)?;
    calendar.insert_event(Event::new(
        "6 hours of suffering",
        at("2021-05-13 14:00"),
        at("2021-05-14 12:00"),
    )?)?;

    let mut suffering = Event::new(
        "6 hours of suffering",
        at("2021-05-16 06:00"),
        at("2021-05-16 12:00"),
    )?;
    suffering.exclusive = false;
    calendar.insert_event(suffering)?;
    calendar.insert_event(Event::new("lecture", at("2021-05-16 15:00"), at("2021-05-16 18:30"))?)?;

    let mut sport = Tag::new("sport").with_priority(8)?;
    sport.add_daily_preferred_window(&calendar.window(), hm(17, 0), hm(22, 30), calendar.offset())?;
    calendar.upsert_tag(sport);

    let deadline = at("2021-05-16 23:30");
    let stray = Task::new("Yoga", deadline, 45)?.with_tag("weird new tag");
    let stray_events = calendar.insert_task(&stray);
    assert_eq!(stray_events.len(), 1);
    assert_eq!(stray_events[0].start_time(), at("2021-05-15 00:15"));

    let yoga = Task::new("Yoga", deadline, 45)?.with_tag("sport");
    let yoga_events = calendar.insert_task(&yoga);
    assert_eq!(yoga_events.len(), 1);
    assert_eq!(yoga_events[0].start_time(), at("2021-05-15 17:00"));
    assert!(calendar.is_interval_tagged_preferred("sport", &yoga_events[0].interval()));

    assert_eq!(calendar.len(), 6);
    Ok(())
}

#[test]
fn test_group_of_tasks_flow() -> AppResult<()> {
    init_logging(&LoggingOptions::default())?;
    let mut calendar = setup_calendar("2021-05-13 00:00")?;
    calendar.upsert_tag(Tag::new("sport").with_priority(6)?);
    calendar.upsert_tag(Tag::new("outside").with_priority(4)?);
    calendar.upsert_tag(Tag::new("school").with_priority(9)?);

    let tasks = vec![
        Task::new("trip", at("2021-05-13 14:00"), 300)?
            .with_tag("outside")
            .with_priority(4)?,
        Task::new("hw infi", at("2021-05-13 23:59"), 120)?
            .with_tag("school")
            .with_priority(7)?,
        Task::new("hw oop", at("2021-05-13 23:59"), 120)?
            .with_tag("school")
            .with_priority(9)?,
        Task::new("trip part 2", at("2021-05-16 06:00"), 150)?
            .with_tag("outside")
            .with_priority(5)?,
        Task::new("sport", at("2021-05-16 06:00"), 45)?
            .with_tag("sport")
            .with_priority(8)?,
    ];

    let outcome = add_tasks(&tasks, &mut calendar)?;
    assert!(outcome.is_complete());

    let placed: Vec<(&str, i64)> = outcome
        .placed
        .iter()
        .map(|placed| (placed.title.as_str(), placed.events[0].start_time()))
        .collect();
    assert_eq!(
        placed,
        vec![
            ("hw oop", at("2021-05-13 00:15")),
            ("hw infi", at("2021-05-13 02:45")),
            ("sport", at("2021-05-13 05:15")),
            ("trip part 2", at("2021-05-13 06:30")),
            ("trip", at("2021-05-13 09:30")),
        ]
    );

    let events: Vec<Event> = calendar.events().cloned().collect();
    assert_eq!(events.len(), 5);
    assert_spaced(&events, calendar.spacing());
    Ok(())
}
