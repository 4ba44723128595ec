//! Peer nodes talking to each other over loopback.

use std::sync::Arc;
use std::time::Duration;

use netbus::net::Node;
use netbus::{Bus, NodeError};

use crate::support::{address_of, dead_address, node, started_node, test_config, wait_until, Recorder};

const DELIVERY: Duration = Duration::from_secs(3);

#[test]
fn remote_subscriber_receives_publication() {
    let subscriber = started_node("/a");
    let publisher = started_node("/b");

    let seen = Recorder::new();
    let sink = seen.clone();
    subscriber
        .subscribe_remote("x", move |n: i64| sink.push(n), &address_of(&publisher), "/b")
        .unwrap();
    assert!(subscriber.bus().has_subscribers("x"));
    assert!(publisher.bus().has_subscribers("x"));

    publisher.bus().publish("x", (10,)).unwrap();

    assert!(wait_until(DELIVERY, || seen.len() == 1));
    assert_eq!(seen.values(), vec![10]);
}

#[test]
fn nodes_subscribe_to_each_other() {
    let a = started_node("/node_a");
    let b = started_node("/node_b");

    let on_a = Recorder::new();
    let on_b = Recorder::new();

    let sink = on_a.clone();
    a.subscribe_remote("topic-B", move |s: String| sink.push(s), &address_of(&b), "/node_b")
        .unwrap();
    let sink = on_b.clone();
    b.subscribe_remote("topic-A", move |s: String| sink.push(s), &address_of(&a), "/node_a")
        .unwrap();

    a.bus().publish("topic-A", ("from a",)).unwrap();
    b.bus().publish("topic-B", ("from b",)).unwrap();

    assert!(wait_until(DELIVERY, || on_a.len() == 1 && on_b.len() == 1));
    assert_eq!(on_a.values(), vec!["from b".to_string()]);
    assert_eq!(on_b.values(), vec!["from a".to_string()]);
}

#[test]
fn publications_arrive_in_order_with_all_arguments() {
    let subscriber = started_node("/ordered_sub");
    let publisher = started_node("/ordered_pub");

    let seen = Recorder::new();
    let sink = seen.clone();
    subscriber
        .subscribe_remote(
            "tick",
            move |n: u32, label: String| sink.push((n, label)),
            &address_of(&publisher),
            "/ordered_pub",
        )
        .unwrap();

    for n in 0..5u32 {
        publisher.bus().publish("tick", (n, format!("#{n}"))).unwrap();
    }

    assert!(wait_until(DELIVERY, || seen.len() == 5));
    let expected: Vec<_> = (0..5u32).map(|n| (n, format!("#{n}"))).collect();
    assert_eq!(seen.values(), expected);
}

#[test]
fn remote_once_subscription_fires_once() {
    let subscriber = started_node("/once_sub");
    let publisher = started_node("/once_pub");

    let seen = Recorder::new();
    let sink = seen.clone();
    subscriber
        .subscribe_remote_once("x", move |n: i64| sink.push(n), &address_of(&publisher), "/once_pub")
        .unwrap();

    publisher.bus().publish("x", (1,)).unwrap();
    assert!(wait_until(DELIVERY, || seen.len() == 1));
    assert!(!publisher.bus().has_subscribers("x"));

    publisher.bus().publish("x", (2,)).unwrap();
    std::thread::sleep(Duration::from_millis(100));

    assert_eq!(seen.values(), vec![1]);
    assert!(!subscriber.bus().has_subscribers("x"));
}

#[test]
fn subscribing_to_a_dead_node_fails_without_local_handler() {
    let subscriber = started_node("/lonely");

    let result = subscriber.subscribe_remote("x", |_n: i64| {}, &dead_address(), "/nobody");

    assert!(matches!(result, Err(NodeError::RemoteUnreachable { .. })));
    assert!(!subscriber.bus().has_subscribers("x"));
}

#[test]
fn refused_registration_is_reported() {
    let subscriber = started_node("/refused_sub");
    let publisher = started_node("/refused_pub");

    let result = subscriber.subscribe_remote("", |_n: i64| {}, &address_of(&publisher), "/refused_pub");

    assert!(matches!(result, Err(NodeError::RegistrationRejected { .. })));
    assert!(subscriber.bus().topics().is_empty());
    assert!(publisher.bus().topics().is_empty());
}

#[test]
fn wrong_service_path_is_unreachable() {
    let subscriber = started_node("/path_sub");
    let publisher = started_node("/path_pub");

    let result = subscriber.subscribe_remote("x", |_n: i64| {}, &address_of(&publisher), "/elsewhere");

    assert!(matches!(result, Err(NodeError::RemoteUnreachable { .. })));
    assert!(!publisher.bus().has_subscribers("x"));
}

#[test]
fn binding_a_busy_address_fails() {
    let first = started_node("/first");
    let second = Node::with_config(
        &address_of(&first),
        "/second",
        Arc::new(Bus::new()),
        test_config(),
    )
    .unwrap();

    assert!(matches!(second.start(), Err(NodeError::Io(_))));
    assert!(!second.is_started());
}

#[test]
fn node_restarts_after_stop() {
    let publisher = node("/restart_pub");
    publisher.start().unwrap();
    publisher.stop();
    assert!(!publisher.is_started());

    publisher.start().unwrap();
    let subscriber = started_node("/restart_sub");
    let seen = Recorder::new();
    let sink = seen.clone();
    subscriber
        .subscribe_remote("x", move |n: i64| sink.push(n), &address_of(&publisher), "/restart_pub")
        .unwrap();

    publisher.bus().publish("x", (3,)).unwrap();
    assert!(wait_until(DELIVERY, || seen.len() == 1));
}

#[test]
fn stopped_subscriber_does_not_break_publisher() {
    let subscriber = started_node("/gone_sub");
    let publisher = started_node("/gone_pub");

    subscriber
        .subscribe_remote("x", |_n: i64| {}, &address_of(&publisher), "/gone_pub")
        .unwrap();
    subscriber.stop();

    let local = Recorder::new();
    let sink = local.clone();
    publisher.bus().subscribe("x", move |n: i64| sink.push(n)).unwrap();

    assert!(publisher.bus().publish("x", (4,)).is_ok());
    assert_eq!(local.values(), vec![4]);
}

#[test]
fn shared_bus_sees_remote_events() {
    let bus = Arc::new(Bus::new());
    let subscriber = Node::with_config("127.0.0.1:0", "/shared", Arc::clone(&bus), test_config()).unwrap();
    subscriber.start().unwrap();
    let publisher = started_node("/shared_pub");

    let seen = Recorder::new();
    let sink = seen.clone();
    subscriber
        .subscribe_remote("x", move |n: i64| sink.push(n), &address_of(&publisher), "/shared_pub")
        .unwrap();
    assert!(bus.has_subscribers("x"));

    publisher.bus().publish("x", (8,)).unwrap();
    assert!(wait_until(DELIVERY, || seen.len() == 1));
}

#[test]
fn service_path_with_route_syntax_is_refused() {
    for path in ["/*bus", "/:bus", "/a/:b/c"] {
        let result = Node::with_config("127.0.0.1:0", path, Arc::new(Bus::new()), test_config());
        assert!(
            matches!(result, Err(NodeError::InvalidPath { .. })),
            "{path} accepted"
        );
    }
}
