//! Reminder delivery with real timers.

mod support;

use std::sync::Arc;
use std::time::{Duration, Instant};

use psybot::Bot;
use psybot::chart::PngChartRenderer;
use psybot::config::BotConfig;
use psybot::content;
use psybot::error::ReminderError;
use psybot::history::UserStore;
use psybot::scheduler::ReminderScheduler;
use tokio_test::{assert_err, assert_ok};

use support::{RecordingChannel, Sent, message};

#[tokio::test]
async fn reminder_is_delivered_once_after_delay() {
    let channel = RecordingChannel::new();
    let scheduler = ReminderScheduler::new(channel.clone());

    let started = Instant::now();
    let handle = assert_ok!(scheduler.schedule(5, 1, "ping"));
    assert_eq!(scheduler.pending(), 1);
    assert!(channel.sent().is_empty());

    handle.join().await;
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(
        channel.sent(),
        vec![Sent::Text {
            chat: 5,
            text: "ping".to_string()
        }]
    );
    assert_eq!(scheduler.pending(), 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(channel.sent().len(), 1);
}

#[tokio::test]
async fn cancelled_reminder_never_fires() {
    let channel = RecordingChannel::new();
    let scheduler = ReminderScheduler::new(channel.clone());

    let handle = assert_ok!(scheduler.schedule(5, 1, "ping"));
    handle.cancel();
    handle.join().await;

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert!(channel.sent().is_empty());
    assert_eq!(scheduler.pending(), 0);
}

#[tokio::test]
async fn shutdown_cancels_everything_pending() {
    let channel = RecordingChannel::new();
    let scheduler = ReminderScheduler::new(channel.clone());

    let first = assert_ok!(scheduler.schedule(1, 1, "a"));
    let second = assert_ok!(scheduler.schedule(2, 1, "b"));
    assert_eq!(scheduler.pending(), 2);

    scheduler.shutdown();
    first.join().await;
    second.join().await;

    assert!(channel.sent().is_empty());
    assert_eq!(scheduler.pending(), 0);
}

#[tokio::test]
async fn invalid_reminders_are_rejected() {
    let scheduler = ReminderScheduler::new(RecordingChannel::new());

    let zero = assert_err!(scheduler.schedule(1, 0, "ping"));
    assert!(matches!(zero, ReminderError::InvalidDelay { .. }));
    let empty = assert_err!(scheduler.schedule(1, 60, "  "));
    assert!(matches!(empty, ReminderError::EmptyMessage));
    assert_eq!(scheduler.pending(), 0);
}

#[tokio::test]
async fn reminder_command_confirms_and_schedules() {
    let dir = tempfile::tempdir().unwrap();
    let channel = RecordingChannel::new();
    let bot = Bot::new(
        channel.clone(),
        Arc::new(UserStore::new(dir.path().join("user_data.json"))),
        Arc::new(PngChartRenderer::default()),
        BotConfig::default(),
    );

    bot.handle_event(message(3, "/reminder 5 Пить воду")).await;
    assert_eq!(channel.last().unwrap().text(), content::reminder_set(5));
    assert_eq!(bot.reminders().pending(), 1);

    bot.handle_event(message(3, "/reminder пять Пить воду")).await;
    assert!(channel.last().unwrap().text().contains("целое число"));
    assert_eq!(bot.reminders().pending(), 1);

    bot.reminders().shutdown();
}
