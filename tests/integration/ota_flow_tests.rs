//! End-to-end OTA flows: session poll loop → update controller →
//! simulated fetch source and flash slot.

use simpleiot::app::ports::FetchPort;
use simpleiot::error::{TransportError, UpdateError};
use simpleiot::update::UpdateState;

use super::mock_ports::{Call, adm_topic, sim_session};

const URL: &str = "https://fw.example/app-2.0.bin";

fn image(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
fn streamed_download_reports_39_78_100_then_received() {
    let (mut s, mut p) = sim_session();
    p.serve(URL, image(256));
    p.plan_reads(&[100, 100, 56]);

    s.fetch(URL, &mut p).unwrap();
    assert_eq!(s.update_state(), UpdateState::Downloading);

    for _ in 0..3 {
        s.poll(&mut p).unwrap();
    }

    assert_eq!(s.handler().percents(), vec![39, 78, 100]);
    assert_eq!(s.transport().published_on(&adm_topic("received")).len(), 1);
    assert_eq!(p.committed.as_deref(), Some(image(256).as_slice()));
    assert_eq!(s.update_state(), UpdateState::Acknowledged);
    assert_eq!(p.restarts, 1);
    assert_eq!(p.delays, vec![2000]);

    // Further polls are idle and never re-acknowledge.
    s.poll(&mut p).unwrap();
    assert_eq!(s.transport().published_on(&adm_topic("received")).len(), 1);
    assert_eq!(p.restarts, 1);
}

#[test]
fn received_payload_carries_identity_and_version() {
    let (mut s, mut p) = sim_session();
    p.serve(URL, image(10));
    s.fetch(URL, &mut p).unwrap();
    s.poll(&mut p).unwrap();

    let sent = s.transport().published_on(&adm_topic("received"));
    assert_eq!(
        sent[0],
        r#"{"project":"Sunshine","serial":"TIE-DEMO01","version":"1.0.0","op":"received"}"#
    );
}

#[test]
fn second_fetch_while_downloading_is_rejected() {
    let (mut s, mut p) = sim_session();
    p.serve(URL, image(256));
    p.plan_reads(&[100]);
    s.fetch(URL, &mut p).unwrap();
    s.poll(&mut p).unwrap();
    let before = s.update_progress();

    assert_eq!(s.fetch(URL, &mut p), Err(UpdateError::AlreadyInProgress));
    assert_eq!(s.update_progress(), before);
    assert_eq!(before.current, 100);
    assert_eq!(s.update_state(), UpdateState::Downloading);
}

#[test]
fn dropped_stream_aborts_without_commit() {
    let (mut s, mut p) = sim_session();
    p.serve(URL, image(256));
    p.drop_after(150);
    s.fetch(URL, &mut p).unwrap();

    for _ in 0..4 {
        s.poll(&mut p).unwrap();
    }

    assert_eq!(s.handler().errors(), vec![UpdateError::LengthMismatch]);
    assert_eq!(
        s.update_state(),
        UpdateState::Aborted(UpdateError::LengthMismatch)
    );
    assert!(p.committed.is_none());
    assert_eq!(p.aborts, 1);
    assert_eq!(p.restarts, 0);
    assert!(s.transport().published_on(&adm_topic("received")).is_empty());
}

#[test]
fn unknown_length_commits_on_end_of_stream_without_progress() {
    let (mut s, mut p) = sim_session();
    p.serve_chunked(URL, image(300));
    s.fetch(URL, &mut p).unwrap();

    for _ in 0..3 {
        s.poll(&mut p).unwrap();
    }

    assert!(s.handler().percents().is_empty());
    assert_eq!(p.committed.as_ref().map(Vec::len), Some(300));
    assert_eq!(s.transport().published_on(&adm_topic("received")).len(), 1);
}

#[test]
fn connection_reset_with_unknown_length_never_commits() {
    let (mut s, mut p) = sim_session();
    p.serve_chunked(URL, image(300));
    p.plan_reads(&[100]);
    p.fail_read_after(100);
    s.fetch(URL, &mut p).unwrap();

    for _ in 0..4 {
        s.poll(&mut p).unwrap();
    }

    assert!(p.committed.is_none());
    assert_eq!(p.aborts, 1);
    assert_eq!(p.restarts, 0);
    assert_eq!(s.handler().errors(), vec![UpdateError::LengthMismatch]);
    assert_eq!(
        s.update_state(),
        UpdateState::Aborted(UpdateError::LengthMismatch)
    );
    assert!(s.transport().published_on(&adm_topic("received")).is_empty());
}

#[test]
fn connection_reset_with_known_length_aborts_on_the_failed_read() {
    let (mut s, mut p) = sim_session();
    p.serve(URL, image(256));
    p.fail_read_after(128);
    s.fetch(URL, &mut p).unwrap();

    s.poll(&mut p).unwrap();
    assert_eq!(s.update_state(), UpdateState::Downloading);
    s.poll(&mut p).unwrap();

    assert_eq!(s.handler().errors(), vec![UpdateError::LengthMismatch]);
    assert!(p.committed.is_none());
    assert!(!p.is_open());
}

#[test]
fn flash_write_failure_is_reported_and_retry_allowed() {
    let (mut s, mut p) = sim_session();
    p.serve(URL, image(64));
    p.fail_writes = true;
    s.fetch(URL, &mut p).unwrap();
    s.poll(&mut p).unwrap();

    assert_eq!(s.handler().errors(), vec![UpdateError::WriteFailed]);
    assert!(!p.is_open());

    p.fail_writes = false;
    s.fetch(URL, &mut p).unwrap();
    s.poll(&mut p).unwrap();
    assert_eq!(s.update_state(), UpdateState::Acknowledged);
}

#[test]
fn commit_failure_never_acknowledges() {
    let (mut s, mut p) = sim_session();
    p.serve(URL, image(32));
    p.fail_commit = true;
    s.fetch(URL, &mut p).unwrap();
    s.poll(&mut p).unwrap();

    assert_eq!(s.handler().errors(), vec![UpdateError::VerifyFailed]);
    assert!(s.transport().published_on(&adm_topic("received")).is_empty());
    assert_eq!(p.restarts, 0);
}

#[test]
fn oversized_image_is_rejected_before_writing() {
    let (mut s, mut p) = sim_session();
    p.serve(URL, vec![0; 4 * 1024 * 1024 + 1]);
    assert_eq!(s.fetch(URL, &mut p), Err(UpdateError::InvalidSize));
    assert_eq!(s.update_state(), UpdateState::Idle);
    assert!(!p.is_open());
    assert_eq!(s.handler().errors(), vec![UpdateError::InvalidSize]);
}

#[test]
fn offline_acknowledgement_is_retried() {
    let (mut s, mut p) = sim_session();
    p.serve(URL, image(16));
    s.fetch(URL, &mut p).unwrap();
    s.transport_mut().offline = true;

    assert_eq!(s.poll(&mut p), Err(TransportError::NotConnected));
    assert_eq!(s.update_state(), UpdateState::Completed);
    assert_eq!(p.restarts, 0);

    s.transport_mut().offline = false;
    s.poll(&mut p).unwrap();
    assert_eq!(s.update_state(), UpdateState::Acknowledged);
    assert_eq!(p.restarts, 1);
}

#[test]
fn pending_acknowledgement_blocks_a_new_attempt() {
    let (mut s, mut p) = sim_session();
    p.serve(URL, image(16));
    s.fetch(URL, &mut p).unwrap();
    s.transport_mut().offline = true;
    assert_eq!(s.poll(&mut p), Err(TransportError::NotConnected));
    assert_eq!(s.update_state(), UpdateState::Completed);

    assert_eq!(s.fetch(URL, &mut p), Err(UpdateError::AlreadyInProgress));
    assert!(!p.is_open());
    assert_eq!(p.committed.as_deref(), Some(image(16).as_slice()));

    s.transport_mut().offline = false;
    s.check_for_update(false).unwrap();
    assert_eq!(s.update_state(), UpdateState::Completed);

    s.poll(&mut p).unwrap();
    assert_eq!(s.transport().published_on(&adm_topic("received")).len(), 1);
    assert_eq!(s.update_state(), UpdateState::Acknowledged);
    assert_eq!(p.restarts, 1);
}

#[test]
fn open_failure_reaches_the_handler() {
    let (mut s, mut p) = sim_session();
    assert_eq!(
        s.fetch("https://fw.example/missing.bin", &mut p),
        Err(UpdateError::FetchFailed)
    );
    assert_eq!(s.handler().errors(), vec![UpdateError::FetchFailed]);
    assert_eq!(s.update_state(), UpdateState::Idle);
}

#[test]
fn check_trigger_fetch_round_trip() {
    let (mut s, mut p) = sim_session();
    p.serve(URL, image(40));

    s.check_for_update(false).unwrap();
    assert_eq!(s.update_state(), UpdateState::CheckRequested);
    assert_eq!(
        s.transport().published_on(&adm_topic("check")),
        vec![r#"{"project":"Sunshine","serial":"TIE-DEMO01","version":"1.0.0","op":"check"}"#]
    );

    s.transport_mut().inject(
        &adm_topic("update"),
        format!(r#"{{"device":"TIE-DEMO01","version":"2.0","url":"{URL}","type":"firmware"}}"#)
            .as_bytes(),
    );
    s.poll(&mut p).unwrap();

    // The trigger alone never starts a download.
    assert_eq!(s.update_state(), UpdateState::CheckRequested);
    let url = s.handler().triggers()[0].download_url.clone().unwrap();
    s.fetch(&url, &mut p).unwrap();
    s.poll(&mut p).unwrap();

    assert!(s.handler().calls.contains(&Call::Progress {
        current: 40,
        total: 40,
        percent: 100
    }));
    assert_eq!(s.update_state(), UpdateState::Acknowledged);
}

#[test]
fn installed_twice_sends_identical_messages() {
    let (mut s, _p) = sim_session();
    s.update_installed().unwrap();
    s.update_installed().unwrap();

    let sent = s.transport().published_on(&adm_topic("installed"));
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], sent[1]);
}

#[test]
fn idle_poll_sleeps_for_poll_delay() {
    let (mut s, mut p) = sim_session();
    s.poll(&mut p).unwrap();
    assert_eq!(p.delays, vec![200]);
}
