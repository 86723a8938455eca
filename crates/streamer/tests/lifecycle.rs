mod common;

use std::time::Duration;

use common::{config, harness, texture, wait_for};
use streamer::{StreamError, StreamState};

const TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn test_end_to_end_stream() {
    let (script, controller) = harness();

    let handle = controller.create(config(30), texture()).unwrap();
    assert_eq!(controller.state(handle).unwrap(), StreamState::Created);

    controller.start(handle).unwrap();
    assert_eq!(controller.state(handle).unwrap(), StreamState::Running);

    assert!(wait_for(TIMEOUT, || {
        controller.stats(handle).unwrap().packets_sent >= 3
    }));
    controller.stop(handle).unwrap();
    assert_eq!(controller.state(handle).unwrap(), StreamState::Stopped);

    {
        let script = script.lock();
        assert_eq!(script.count("mux:header"), 1);

        let header = script.position("mux:header").unwrap();
        let first_frame = script
            .events
            .iter()
            .position(|e| e.starts_with("mux:frame:"))
            .unwrap();
        assert!(header < first_frame);

        let frames = script.frames();
        assert!(frames[0].0, "first packet must be a keyframe");
        assert!(frames[0].1);

        // Flushed tail goes out last, untimed, before the trailer.
        assert_eq!(*frames.last().unwrap(), (false, false, common::TAIL.len()));
        let last_frame = script
            .events
            .iter()
            .rposition(|e| e.starts_with("mux:frame:"))
            .unwrap();
        assert!(last_frame < script.position("mux:trailer").unwrap());
        assert_eq!(script.count("mux:trailer"), 1);
        assert_eq!(script.count("enc:destroy"), 1);
    }

    controller.destroy(handle).unwrap();
    assert!(controller.is_empty());

    let script = script.lock();
    assert_eq!(script.count("mux:trailer"), 1);
    assert_eq!(script.count("enc:destroy"), 1);
    drop(script);

    assert!(matches!(
        controller.stats(handle),
        Err(StreamError::InvalidHandle)
    ));
}

#[test]
fn test_start_twice_rejected() {
    let (script, controller) = harness();
    let handle = controller.create(config(100), texture()).unwrap();

    controller.start(handle).unwrap();
    assert!(matches!(
        controller.start(handle),
        Err(StreamError::AlreadyRunning)
    ));

    assert!(wait_for(TIMEOUT, || {
        controller.stats(handle).unwrap().frames_encoded >= 5
    }));
    controller.stop(handle).unwrap();

    let script = script.lock();
    assert_eq!(script.encoders_created, 1);
    assert_eq!(script.count("mux:prepare"), 1);
}

#[test]
fn test_stop_twice_is_noop() {
    let (script, controller) = harness();
    let handle = controller.create(config(100), texture()).unwrap();

    controller.start(handle).unwrap();
    assert!(wait_for(TIMEOUT, || {
        controller.stats(handle).unwrap().packets_sent >= 1
    }));

    controller.stop(handle).unwrap();
    let events_after_first_stop = script.lock().events.len();
    controller.stop(handle).unwrap();

    let script = script.lock();
    assert_eq!(script.events.len(), events_after_first_stop);
    assert_eq!(script.count("mux:trailer"), 1);
    assert_eq!(script.count("enc:eos"), 1);
    assert_eq!(script.count("enc:destroy"), 1);
    assert_eq!(controller.state(handle).unwrap(), StreamState::Stopped);
}

#[test]
fn test_stop_before_start() {
    let (script, controller) = harness();
    let handle = controller.create(config(30), texture()).unwrap();
    let events_after_create = script.lock().events.len();

    controller.stop(handle).unwrap();

    assert_eq!(script.lock().events.len(), events_after_create);
    assert_eq!(controller.state(handle).unwrap(), StreamState::Created);

    controller.destroy(handle).unwrap();
    let script = script.lock();
    assert_eq!(script.count("enc:destroy"), 1);
    assert_eq!(script.count("mux:trailer"), 0);
}

#[test]
fn test_restart_rebuilds_encoder() {
    let (script, controller) = harness();
    let handle = controller.create(config(100), texture()).unwrap();

    controller.start(handle).unwrap();
    assert!(wait_for(TIMEOUT, || {
        controller.stats(handle).unwrap().packets_sent >= 2
    }));
    controller.stop(handle).unwrap();
    let frames_first_run = script.lock().frames().len();

    controller.start(handle).unwrap();
    assert!(wait_for(TIMEOUT, || {
        script.lock().frames().len() >= frames_first_run + 2
    }));
    controller.stop(handle).unwrap();

    let script = script.lock();
    assert_eq!(script.encoders_created, 2);
    assert_eq!(script.count("enc:init"), 2);
    assert_eq!(script.count("mux:header"), 2);
    // New session, new IDR.
    assert!(script.frames()[frames_first_run].0);
}

#[test]
fn test_create_rejects_null_texture() {
    let (script, controller) = harness();

    assert!(matches!(
        controller.create(config(30), None),
        Err(StreamError::NullTexture)
    ));
    assert_eq!(script.lock().encoders_created, 0);
    assert!(controller.is_empty());
}

#[test]
fn test_create_rejects_invalid_config() {
    let (_script, controller) = harness();

    let mut bad = config(30);
    bad.fps = 0;
    assert!(matches!(
        controller.create(bad, texture()),
        Err(StreamError::Config(_))
    ));

    let mut bad = config(30);
    bad.destination.clear();
    assert!(matches!(
        controller.create(bad, texture()),
        Err(StreamError::Config(_))
    ));
    assert!(controller.is_empty());
}

#[test]
fn test_create_fails_when_encoder_init_fails() {
    let (script, controller) = harness();
    script.lock().fail_init = true;

    assert!(matches!(
        controller.create(config(30), texture()),
        Err(StreamError::Encoder(_))
    ));
    assert!(controller.is_empty());
    assert_eq!(script.lock().muxers_created, 0);
}

#[test]
fn test_destroyed_handle_rejected() {
    let (_script, controller) = harness();
    let handle = controller.create(config(30), texture()).unwrap();

    controller.destroy(handle).unwrap();

    assert!(matches!(
        controller.start(handle),
        Err(StreamError::InvalidHandle)
    ));
    assert!(matches!(
        controller.stop(handle),
        Err(StreamError::InvalidHandle)
    ));
    assert!(matches!(
        controller.destroy(handle),
        Err(StreamError::InvalidHandle)
    ));

    // The slot is reused under a new generation.
    let next = controller.create(config(30), texture()).unwrap();
    assert_ne!(next, handle);
    assert!(controller.state(handle).is_err());
    assert_eq!(controller.state(next).unwrap(), StreamState::Created);
}

#[test]
fn test_destroy_running_stream() {
    let (script, controller) = harness();
    let handle = controller.create(config(100), texture()).unwrap();

    controller.start(handle).unwrap();
    assert!(wait_for(TIMEOUT, || {
        controller.stats(handle).unwrap().packets_sent >= 1
    }));
    controller.destroy(handle).unwrap();

    let script = script.lock();
    assert_eq!(script.count("mux:trailer"), 1);
    assert_eq!(script.count("enc:destroy"), 1);
}

#[test]
fn test_dropping_controller_stops_streams() {
    let (script, controller) = harness();
    let handle = controller.create(config(100), texture()).unwrap();

    controller.start(handle).unwrap();
    assert!(wait_for(TIMEOUT, || {
        controller.stats(handle).unwrap().packets_sent >= 1
    }));
    drop(controller);

    let script = script.lock();
    assert_eq!(script.count("mux:trailer"), 1);
    assert_eq!(script.count("enc:destroy"), 1);
}
