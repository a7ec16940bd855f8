//! Dispatch loop behavior: shutdown decisions, the graceful leave race,
//! and reload.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::Level;

use maya_agent::config::{AgentConfig, ConfigError};
use maya_agent::lifecycle::{LifecycleOutcome, LifecycleState, SignalEvent, GRACEFUL_TIMEOUT};

mod common;

use common::{harness, leave_on_interrupt, Leave};

#[tokio::test]
async fn interrupt_without_leave_exits_immediately() {
    let h = harness(AgentConfig::default(), Leave::Succeed);
    h.events.send(SignalEvent::Interrupt).await.unwrap();

    let states = h.controller.subscribe();
    let outcome = h.controller.run().await;

    assert_eq!(outcome, LifecycleOutcome::NotGraceful);
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(h.agent.leaves(), 0);
    assert!(h.ui.contains("Caught signal: interrupt"));
    assert_eq!(*states.borrow(), LifecycleState::Terminated);
}

#[tokio::test]
async fn broken_pipe_is_transparent() {
    let h = harness(leave_on_interrupt(), Leave::Succeed);
    for _ in 0..3 {
        h.events.send(SignalEvent::Ignorable).await.unwrap();
    }
    h.events.send(SignalEvent::Interrupt).await.unwrap();

    let outcome = h.controller.run().await;

    assert_eq!(outcome, LifecycleOutcome::Clean);
    assert_eq!(h.agent.leaves(), 1);
    let caught: Vec<_> = h
        .ui
        .lines()
        .into_iter()
        .filter(|l| l.starts_with("Caught signal"))
        .collect();
    assert_eq!(caught, vec!["Caught signal: interrupt".to_string()]);
}

#[tokio::test]
async fn graceful_leave_exits_clean() {
    let h = harness(leave_on_interrupt(), Leave::Succeed);
    h.events.send(SignalEvent::Interrupt).await.unwrap();

    let outcome = h.controller.run().await;

    assert_eq!(outcome, LifecycleOutcome::Clean);
    assert_eq!(outcome.exit_code(), 0);
    assert!(h.ui.contains("Gracefully shutting down agent..."));
}

#[tokio::test(start_paused = true)]
async fn slow_leave_inside_grace_period_exits_clean() {
    let h = harness(leave_on_interrupt(), Leave::SucceedAfter(Duration::from_secs(4)));
    h.events.send(SignalEvent::Interrupt).await.unwrap();

    let start = Instant::now();
    let outcome = h.controller.run().await;

    assert_eq!(outcome, LifecycleOutcome::Clean);
    assert!(start.elapsed() < GRACEFUL_TIMEOUT);
}

#[tokio::test(start_paused = true)]
async fn hung_leave_times_out_after_grace_period() {
    let h = harness(leave_on_interrupt(), Leave::Hang);
    h.events.send(SignalEvent::Interrupt).await.unwrap();

    let start = Instant::now();
    let outcome = h.controller.run().await;
    let elapsed = start.elapsed();

    assert_eq!(outcome, LifecycleOutcome::TimedOut);
    assert_eq!(outcome.exit_code(), 1);
    assert!(elapsed >= GRACEFUL_TIMEOUT);
    assert!(elapsed < GRACEFUL_TIMEOUT + Duration::from_millis(100));
    assert_eq!(h.agent.leaves(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_leave_waits_out_grace_period() {
    let h = harness(leave_on_interrupt(), Leave::Fail);
    h.events.send(SignalEvent::Interrupt).await.unwrap();

    let start = Instant::now();
    let outcome = h.controller.run().await;

    assert_eq!(outcome, LifecycleOutcome::TimedOut);
    assert!(start.elapsed() >= GRACEFUL_TIMEOUT);
    assert!(h.ui.contains("Error: cannot leave"));
}

#[tokio::test(start_paused = true)]
async fn second_signal_forces_exit_immediately() {
    let h = harness(leave_on_interrupt(), Leave::Hang);
    h.events.send(SignalEvent::Interrupt).await.unwrap();
    h.events.send(SignalEvent::Interrupt).await.unwrap();

    let start = Instant::now();
    let outcome = h.controller.run().await;

    assert_eq!(outcome, LifecycleOutcome::Forced);
    assert_eq!(outcome.exit_code(), 1);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn second_signal_arriving_mid_leave_forces_exit() {
    let h = harness(leave_on_interrupt(), Leave::Hang);
    h.events.send(SignalEvent::Interrupt).await.unwrap();

    let events = h.events.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        events.send(SignalEvent::Terminate).await.unwrap();
    });

    let start = Instant::now();
    let outcome = h.controller.run().await;
    let elapsed = start.elapsed();

    assert_eq!(outcome, LifecycleOutcome::Forced);
    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < GRACEFUL_TIMEOUT);
}

#[tokio::test(start_paused = true)]
async fn broken_pipe_during_leave_is_not_a_second_signal() {
    let h = harness(leave_on_interrupt(), Leave::SucceedAfter(Duration::from_secs(1)));
    h.events.send(SignalEvent::Interrupt).await.unwrap();
    h.events.send(SignalEvent::Ignorable).await.unwrap();

    let outcome = h.controller.run().await;

    assert_eq!(outcome, LifecycleOutcome::Clean);
}

#[tokio::test]
async fn external_shutdown_acts_as_interrupt() {
    let h = harness(leave_on_interrupt(), Leave::Succeed);
    h.shutdown.send(()).await.unwrap();

    let outcome = h.controller.run().await;

    assert_eq!(outcome, LifecycleOutcome::Clean);
    assert_eq!(h.agent.leaves(), 1);
}

#[tokio::test(start_paused = true)]
async fn second_external_shutdown_forces_exit() {
    let h = harness(leave_on_interrupt(), Leave::Hang);
    h.shutdown.send(()).await.unwrap();
    h.shutdown.send(()).await.unwrap();

    let outcome = h.controller.run().await;

    assert_eq!(outcome, LifecycleOutcome::Forced);
}

#[tokio::test]
async fn terminate_follows_leave_on_terminate() {
    let config = AgentConfig {
        leave_on_terminate: true,
        ..Default::default()
    };

    let h = harness(config.clone(), Leave::Succeed);
    h.events.send(SignalEvent::Terminate).await.unwrap();
    assert_eq!(h.controller.run().await, LifecycleOutcome::Clean);

    let h = harness(config, Leave::Succeed);
    h.events.send(SignalEvent::Interrupt).await.unwrap();
    assert_eq!(h.controller.run().await, LifecycleOutcome::NotGraceful);
    assert_eq!(h.agent.leaves(), 0);
}

#[tokio::test]
async fn closed_sources_end_the_lifecycle() {
    let h = harness(AgentConfig::default(), Leave::Succeed);
    drop(h.events);
    drop(h.shutdown);

    assert_eq!(h.controller.run().await, LifecycleOutcome::NotGraceful);
}

#[tokio::test]
async fn reload_with_valid_level_applies_it() {
    let h = harness(AgentConfig::default(), Leave::Succeed);
    h.source.push(Ok(AgentConfig {
        log_level: "debug".into(),
        region: "eu-west".into(),
        ..Default::default()
    }));
    h.events.send(SignalEvent::Reload).await.unwrap();
    h.events.send(SignalEvent::Interrupt).await.unwrap();

    let outcome = h.controller.run().await;

    assert_eq!(outcome, LifecycleOutcome::NotGraceful);
    assert_eq!(h.filter.min_level(), Level::DEBUG);
    let active = h.config.load_full();
    assert_eq!(active.log_level, "debug");
    assert_eq!(active.region, "eu-west");
    assert!(h.ui.contains("Caught signal: hangup"));
    assert!(h.ui.contains("Reloading agent configuration..."));
}

#[tokio::test]
async fn reload_with_invalid_level_keeps_only_the_old_level() {
    let initial = AgentConfig {
        log_level: "WARN".into(),
        ..Default::default()
    };
    let h = harness(initial, Leave::Succeed);
    h.filter.set_min_level(Level::WARN);
    h.source.push(Ok(AgentConfig {
        log_level: "shouty".into(),
        datacenter: "dc7".into(),
        leave_on_interrupt: true,
        ..Default::default()
    }));
    h.events.send(SignalEvent::Reload).await.unwrap();
    h.events.send(SignalEvent::Interrupt).await.unwrap();

    let outcome = h.controller.run().await;

    // The reloaded leave_on_interrupt applies to the following interrupt.
    assert_eq!(outcome, LifecycleOutcome::Clean);
    assert_eq!(h.filter.min_level(), Level::WARN);
    let active = h.config.load_full();
    assert_eq!(active.log_level, "WARN");
    assert_eq!(active.datacenter, "dc7");
    assert!(h.ui.contains("Invalid log level: SHOUTY"));
}

#[tokio::test]
async fn failed_reload_keeps_the_same_snapshot() {
    let h = harness(AgentConfig::default(), Leave::Succeed);
    let before = h.config.load_full();
    h.source.push(Err(ConfigError::RelativePath {
        name: "data-dir",
        path: "relative/dir".into(),
    }));
    h.events.send(SignalEvent::Reload).await.unwrap();
    h.events.send(SignalEvent::Interrupt).await.unwrap();

    h.controller.run().await;

    assert!(Arc::ptr_eq(&before, &h.config.load_full()));
    assert_eq!(h.filter.min_level(), Level::INFO);
    assert!(h.ui.contains("Failed to reload config"));
}

#[tokio::test]
async fn reloads_apply_in_order() {
    let h = harness(AgentConfig::default(), Leave::Succeed);
    h.source.push(Ok(AgentConfig {
        log_level: "trace".into(),
        ..Default::default()
    }));
    h.source.push(Ok(AgentConfig {
        log_level: "error".into(),
        node_name: "second".into(),
        ..Default::default()
    }));
    h.events.send(SignalEvent::Reload).await.unwrap();
    h.events.send(SignalEvent::Reload).await.unwrap();
    h.events.send(SignalEvent::Terminate).await.unwrap();

    h.controller.run().await;

    assert_eq!(h.filter.min_level(), Level::ERROR);
    assert_eq!(h.config.load().node_name, "second");
}

#[tokio::test(start_paused = true)]
async fn states_track_a_graceful_leave() {
    let h = harness(leave_on_interrupt(), Leave::Hang);
    let mut states = h.controller.subscribe();
    assert_eq!(*states.borrow(), LifecycleState::Waiting);
    h.events.send(SignalEvent::Interrupt).await.unwrap();

    let run = tokio::spawn(h.controller.run());
    states
        .wait_for(|s| *s == LifecycleState::Leaving)
        .await
        .unwrap();

    let outcome = run.await.unwrap();
    assert_eq!(outcome, LifecycleOutcome::TimedOut);
    assert_eq!(*states.borrow(), LifecycleState::Terminated);
}

#[tokio::test]
async fn controller_leaves_teardown_to_startup() {
    let h = harness(leave_on_interrupt(), Leave::Succeed);
    h.events.send(SignalEvent::Interrupt).await.unwrap();

    assert_eq!(h.controller.run().await, LifecycleOutcome::Clean);
    assert_eq!(h.agent.leaves(), 1);
    assert_eq!(h.agent.shutdowns(), 0);
}
