//! Asynchronous and transactional handlers, and the bus-wide wait handle.

use std::collections::BTreeSet;
use std::sync::mpsc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use netbus::Bus;

use crate::support::Recorder;

fn sleepy_append(results: &Recorder<i64>) -> impl Fn(i64, u64) + Send + Sync + 'static {
    let sink = results.clone();
    move |a: i64, sleep_ms: u64| {
        thread::sleep(Duration::from_millis(sleep_ms));
        sink.push(a);
    }
}

#[test]
fn transactional_handlers_keep_publish_order() {
    let bus = Bus::new();
    let results = Recorder::new();
    bus.subscribe_async("topic", sleepy_append(&results), true)
        .unwrap();

    bus.publish("topic", (1, 300)).unwrap();
    let handle = bus.publish_and_track("topic", (2, 0)).unwrap();
    bus.wait(&handle);

    assert_eq!(results.values(), vec![1, 2]);
}

#[test]
fn transactional_order_holds_across_many_publishes() {
    let bus = Bus::new();
    let results = Recorder::new();
    bus.subscribe_async("topic", sleepy_append(&results), true)
        .unwrap();

    for (n, sleep_ms) in [(1, 80), (2, 60), (3, 40), (4, 20), (5, 0)] {
        bus.publish("topic", (n, sleep_ms)).unwrap();
    }
    bus.wait_async();

    assert_eq!(results.values(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn transactional_topics_are_independent() {
    let bus = Bus::new();
    let results = Recorder::new();
    bus.subscribe_async("slow", sleepy_append(&results), true)
        .unwrap();
    bus.subscribe_async("fast", sleepy_append(&results), true)
        .unwrap();

    bus.publish("slow", (1, 300)).unwrap();
    bus.publish("fast", (2, 0)).unwrap();
    bus.wait_async();

    // "fast" does not queue behind "slow".
    assert_eq!(results.values(), vec![2, 1]);
}

#[test]
fn plain_async_handlers_all_run() {
    let bus = Bus::new();
    let results = Recorder::new();
    let sink = results.clone();
    bus.subscribe_async("topic", move |a: i64| sink.push(a), false)
        .unwrap();

    bus.publish("topic", (1,)).unwrap();
    let handle = bus.publish_and_track("topic", (2,)).unwrap();
    bus.wait(&handle);

    // No ordering guarantee between the two invocations.
    let seen: BTreeSet<i64> = results.values().into_iter().collect();
    assert_eq!(seen, BTreeSet::from([1, 2]));
}

#[test]
fn publish_does_not_wait_for_async_handlers() {
    let bus = Bus::new();
    let results = Recorder::new();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);

    let sink = results.clone();
    bus.subscribe_async(
        "topic",
        move || {
            let _ = release_rx.lock().unwrap().recv_timeout(Duration::from_secs(5));
            sink.push(1);
        },
        false,
    )
    .unwrap();

    // Returns while the handler is still blocked.
    bus.publish("topic", ()).unwrap();
    assert_eq!(results.len(), 0);
    assert_eq!(bus.pending(), 1);

    release_tx.send(()).unwrap();
    bus.wait_async();
    assert_eq!(results.values(), vec![1]);
}

#[test]
fn wait_handle_covers_earlier_untracked_work() {
    let bus = Bus::new();
    let results = Recorder::new();

    let slow = results.clone();
    bus.subscribe_async(
        "slow",
        move || {
            thread::sleep(Duration::from_millis(200));
            slow.push("slow");
        },
        false,
    )
    .unwrap();
    let fast = results.clone();
    bus.subscribe_async("fast", move || fast.push("fast"), false)
        .unwrap();

    bus.publish("slow", ()).unwrap();
    let handle = bus.publish_and_track("fast", ()).unwrap();
    bus.wait(&handle);

    let seen: BTreeSet<&str> = results.values().into_iter().collect();
    assert_eq!(seen, BTreeSet::from(["fast", "slow"]));
}

#[test]
fn waiting_is_idempotent_and_concurrent() {
    let bus = Bus::new();
    bus.subscribe_async(
        "topic",
        || thread::sleep(Duration::from_millis(50)),
        false,
    )
    .unwrap();

    let handle = bus.publish_and_track("topic", ()).unwrap();
    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let handle = handle.clone();
            thread::spawn(move || handle.wait())
        })
        .collect();
    for waiter in waiters {
        waiter.join().unwrap();
    }

    bus.wait(&handle);
    bus.wait(&handle);
    assert_eq!(handle.pending(), 0);
}

#[test]
fn sync_and_async_handlers_on_one_topic() {
    let bus = Bus::new();
    let results = Recorder::new();

    let sync_sink = results.clone();
    bus.subscribe("topic", move |a: i64| sync_sink.push(a)).unwrap();
    let async_sink = results.clone();
    bus.subscribe_async("topic", move |a: i64| async_sink.push(a * 10), true)
        .unwrap();

    let handle = bus.publish_and_track("topic", (3,)).unwrap();
    bus.wait(&handle);

    let seen: BTreeSet<i64> = results.values().into_iter().collect();
    assert_eq!(seen, BTreeSet::from([3, 30]));
}

#[test]
fn async_handler_on_topic_with_nul_byte() {
    let bus = Bus::new();
    let results = Recorder::new();
    let sink = results.clone();
    bus.subscribe_async("a\0b", move |n: i64| sink.push(n), false)
        .unwrap();

    let handle = bus.publish_and_track("a\0b", (1,)).unwrap();
    bus.wait(&handle);

    assert_eq!(results.values(), vec![1]);
    assert_eq!(bus.pending(), 0);
}
