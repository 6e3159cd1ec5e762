//! Terminal driver end to end on tokio's paused clock.

use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufReader};
use wiresim_app::SimulatorConfig;
use wiresim_cli::{Runtime, Simulator, SystemEnv, TerminalDriver, TokioScheduler};
use wiresim_core::Environment;

#[tokio::test(start_paused = true)]
async fn typed_commands_are_applied_in_order() {
    let env = SystemEnv::new();
    let (scheduler, timers) = TokioScheduler::new(env.clone());
    let simulator = Simulator::new(SimulatorConfig::default(), scheduler, env.clone()).unwrap();

    let input: &[u8] = b"disconnect\npause\n\nbogus\nmode realtime\nstatus\nquit\n";
    let driver = TerminalDriver::new(input, Vec::new(), timers, env.now());
    let mut runtime = Runtime::new(driver, simulator);

    runtime.run().await.unwrap();

    let output = String::from_utf8(runtime.driver().output().clone()).unwrap();
    assert!(output.starts_with("commands: "));
    assert!(output.contains("[status] connected\n"));
    assert!(output.contains("[status] disconnected\n"));
    assert!(output.contains("rejected: precondition failed: cannot toggle-pause while disconnected"));
    assert!(output.contains("unknown command: \"bogus\""));
    assert!(output.contains("[polling] mode realtime"));
    assert!(output.contains("[summary] disconnected | packets 0 | feed 0 | realtime 0 requests, 0 empty"));
}

#[tokio::test(start_paused = true)]
async fn garbled_line_is_reported_and_skipped() {
    let env = SystemEnv::new();
    let (scheduler, timers) = TokioScheduler::new(env.clone());
    let simulator = Simulator::new(SimulatorConfig::default(), scheduler, env.clone()).unwrap();

    let input: &[u8] = b"\xff\xfe\ndisconnect\nstatus\nquit\n";
    let driver = TerminalDriver::new(input, Vec::new(), timers, env.now());
    let mut runtime = Runtime::new(driver, simulator);

    runtime.run().await.unwrap();

    let output = String::from_utf8(runtime.driver().output().clone()).unwrap();
    assert!(output.contains("unknown command: \"\u{fffd}\u{fffd}\""));
    assert!(output.contains("[status] disconnected\n"));
    assert!(output.contains("[summary] disconnected | packets 0 | feed 0 | polling 0 requests, 0 empty"));
}

#[tokio::test(start_paused = true)]
async fn unterminated_last_line_is_still_applied() {
    let env = SystemEnv::new();
    let (scheduler, timers) = TokioScheduler::new(env.clone());
    let simulator = Simulator::new(SimulatorConfig::default(), scheduler, env.clone()).unwrap();

    let input: &[u8] = b"disconnect";
    let driver = TerminalDriver::new(input, Vec::new(), timers, env.now());
    let mut runtime = Runtime::new(driver, simulator);

    runtime.run().await.unwrap();

    let state = runtime.simulator().current_state().state;
    assert_eq!(state, wiresim_core::ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn timers_stream_records_until_quit() {
    let env = SystemEnv::new();
    let (scheduler, timers) = TokioScheduler::new(env.clone());
    let simulator = Simulator::new(SimulatorConfig::default(), scheduler, env.clone()).unwrap();

    let (mut keyboard, stdin) = tokio::io::duplex(64);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(3500)).await;
        keyboard.write_all(b"quit\n").await.unwrap();
    });

    let driver = TerminalDriver::new(BufReader::new(stdin), Vec::new(), timers, env.now());
    let mut runtime = Runtime::new(driver, simulator);

    runtime.run().await.unwrap();

    let output = String::from_utf8(runtime.driver().output().clone()).unwrap();
    assert!(output.contains("[packet #3 +3.2"));
    assert!(!output.contains("[packet #4"));
    assert!(output.contains("[feed #0 +2.0"));
    assert!(output.contains("[polling #2] "));
    assert!(output.contains("[request] client sends request\n"));
    assert!(output.contains("[request] server processing\n"));
    assert!(output.contains("[request] server responds\n"));
    assert_eq!(runtime.simulator().recent_events(wiresim_app::StreamKind::Packets, 10).len(), 4);
}
