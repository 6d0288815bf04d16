use std::time::Duration;

use profsync_events::{Event, EventBus, EventEnvelope, EventJournal};

type TestResult<T> = anyhow::Result<T>;

fn stage_started(stage: &str) -> Event {
    Event::StageStarted {
        stage: stage.to_string(),
        tasks: 1,
    }
}

#[tokio::test]
async fn late_journal_records_backlog_then_live_events_until_run_end() -> TestResult<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("events.jsonl");
    let bus = EventBus::new();
    let _ = bus.publish(stage_started("profile root"));

    let journal = EventJournal::start(&bus, &path).await?;
    let _ = bus.publish(stage_started("local appdata"));
    let _ = bus.publish(Event::RunCompleted {
        stages_run: 2,
        stages_failed: 0,
    });
    let _ = bus.publish(stage_started("after the end"));

    assert_eq!(journal.finish(Duration::from_secs(5)).await?, 3);
    let envelopes: Vec<EventEnvelope> = std::fs::read_to_string(&path)?
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    let ids: Vec<u64> = envelopes.iter().map(|envelope| envelope.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(envelopes.last().is_some_and(|envelope| envelope.event.is_terminal()));
    Ok(())
}

#[tokio::test]
async fn resumed_subscriber_skips_what_it_already_saw() {
    let bus = EventBus::with_capacity(8);
    for stage in ["a", "b", "c"] {
        let _ = bus.publish(stage_started(stage));
    }

    let mut stream = bus.subscribe(Some(2));
    let _ = bus.publish(stage_started("d"));

    let first = stream.next().await.map(|envelope| envelope.id);
    let second = stream.next().await.map(|envelope| envelope.id);
    assert_eq!((first, second), (Some(3), Some(4)));
}
