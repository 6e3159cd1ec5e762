//! Timing of the simulated-error recovery sequence.
//!
//! Runs on the virtual clock, so every boundary is checked to the
//! millisecond.

use std::time::Duration;

use wiresim_core::{Command, ConnectionError, ConnectionState, ConnectionStatus};
use wiresim_harness::{InvariantRegistry, SimInstant, SimWorld};

fn state_at(world: &mut SimWorld, millis: u64) -> ConnectionState {
    world.advance_to(SimInstant::from_millis(millis));
    world.status().state
}

fn timeline_text(world: &SimWorld) -> String {
    world
        .timeline()
        .iter()
        .map(|(at, status)| format!("{at} {status}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn error_recovers_on_schedule() {
    let mut world = SimWorld::new(1).unwrap();
    world.issue(Command::SimulateError).unwrap();

    assert_eq!(state_at(&mut world, 0), ConnectionState::Disconnected);
    assert_eq!(state_at(&mut world, 999), ConnectionState::Disconnected);
    assert_eq!(state_at(&mut world, 1000), ConnectionState::Reconnecting);
    assert_eq!(state_at(&mut world, 2999), ConnectionState::Reconnecting);
    assert_eq!(state_at(&mut world, 3000), ConnectionState::Connected);
    assert_eq!(state_at(&mut world, 60_000), ConnectionState::Connected);

    assert_eq!(world.simulator().pending_recovery_timers(), 0);
}

#[test]
fn connect_cancels_pending_recovery() {
    let mut world = SimWorld::new(2).unwrap();
    world.issue(Command::SimulateError).unwrap();
    world.advance(Duration::from_millis(500));

    world.issue(Command::Connect).unwrap();
    world.advance(Duration::from_millis(5000));

    let states: Vec<ConnectionState> = world.timeline().iter().map(|(_, s)| s.state).collect();
    assert_eq!(states, vec![
        ConnectionState::Connected,
        ConnectionState::Disconnected,
        ConnectionState::Connected,
    ]);
    assert_eq!(world.simulator().pending_recovery_timers(), 0);
}

#[test]
fn disconnect_while_reconnecting_stays_down() {
    let mut world = SimWorld::new(3).unwrap();
    world.issue(Command::SimulateError).unwrap();
    assert_eq!(state_at(&mut world, 1500), ConnectionState::Reconnecting);

    world.issue(Command::Disconnect).unwrap();

    assert_eq!(state_at(&mut world, 10_000), ConnectionState::Disconnected);
    assert_eq!(world.simulator().pending_recovery_timers(), 0);
}

#[test]
fn repeated_error_restarts_the_sequence() {
    let mut world = SimWorld::new(4).unwrap();
    world.issue(Command::SimulateError).unwrap();
    world.advance_to(SimInstant::from_millis(500));
    world.issue(Command::SimulateError).unwrap();

    assert_eq!(state_at(&mut world, 1000), ConnectionState::Disconnected);
    assert_eq!(state_at(&mut world, 1500), ConnectionState::Reconnecting);
    assert_eq!(state_at(&mut world, 3000), ConnectionState::Reconnecting);
    assert_eq!(state_at(&mut world, 3500), ConnectionState::Connected);
}

#[test]
fn pause_survives_recovery() {
    let mut world = SimWorld::new(5).unwrap();
    world.issue(Command::TogglePause).unwrap();
    world.issue(Command::SimulateError).unwrap();

    let rejected = world.issue(Command::TogglePause);
    assert!(matches!(
        rejected,
        Err(ConnectionError::Precondition { state: ConnectionState::Disconnected, .. })
    ));

    world.advance(Duration::from_millis(3000));
    assert_eq!(world.status(), ConnectionStatus { state: ConnectionState::Connected, paused: true });
}

#[test]
fn connect_clears_pause() {
    let mut world = SimWorld::new(6).unwrap();
    world.issue(Command::TogglePause).unwrap();

    world.issue(Command::Connect).unwrap();

    assert_eq!(world.status(), ConnectionStatus { state: ConnectionState::Connected, paused: false });
}

#[test]
fn invariants_hold_through_recovery() {
    let registry = InvariantRegistry::standard();
    let mut world = SimWorld::new(7).unwrap();
    world.issue(Command::SimulateError).unwrap();

    for step in 0..40 {
        world.advance(Duration::from_millis(100));
        registry.assert_all(&world.snapshot(), &format!("step {step}"));
    }
}

#[test]
fn status_timeline() {
    let mut world = SimWorld::new(8).unwrap();

    world.issue(Command::SimulateError).unwrap();
    world.advance_to(SimInstant::from_millis(3000));
    world.issue(Command::TogglePause).unwrap();
    world.advance_to(SimInstant::from_millis(3500));
    world.issue(Command::Disconnect).unwrap();
    world.advance_to(SimInstant::from_millis(4000));
    world.issue(Command::Connect).unwrap();

    insta::assert_snapshot!(timeline_text(&world), @r"
    0ms connected
    0ms disconnected
    1000ms reconnecting
    3000ms connected
    3000ms connected (paused)
    3500ms disconnected
    4000ms connected
    ");
}
