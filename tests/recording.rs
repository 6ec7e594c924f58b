use mayhem::components::{ControlIntents, MAX_SHIPS};
use mayhem::config::PhysicsConfig;
use mayhem::error::{RecordingError, SimulationError};
use mayhem::kinematics::Body;
use mayhem::recording::Recording;
use mayhem::simulation::{GameSimulation, SessionMode};

fn solo() -> GameSimulation {
    GameSimulation::new(
        PhysicsConfig::default(),
        6,
        SessionMode::Offline { players: 1 },
    )
    .unwrap()
}

fn script() -> Vec<ControlIntents> {
    let mut frames = Vec::new();
    frames.extend([ControlIntents::IDLE; 3]);
    frames.extend([ControlIntents::thrust(); 25]);
    frames.extend([ControlIntents::left(); 6]);
    frames.push(ControlIntents::shoot());
    frames.extend([ControlIntents::IDLE; 20]);
    frames.extend([ControlIntents::right(); 6]);
    frames.extend([ControlIntents::thrust(); 10]);
    frames
}

#[test]
fn playback_reproduces_the_recorded_flight() {
    let script = script();

    let mut live = solo();
    live.enable_recording();
    let mut trajectory: Vec<(Body, f32)> = Vec::new();
    for &frame in &script {
        let mut intents = [ControlIntents::IDLE; MAX_SHIPS];
        intents[0] = frame;
        live.step(intents).unwrap();
        let ship = live.ship(1).unwrap();
        trajectory.push((ship.body, ship.heading));
    }
    let recording = live.take_recording().unwrap();
    assert_eq!(recording.frames(), script.as_slice());

    let path = std::env::temp_dir().join(format!("mayhem-{}.rec", uuid::Uuid::new_v4()));
    recording.save(&path).unwrap();
    let loaded = Recording::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let mut replay = solo();
    replay.start_playback(loaded);
    for (tick, expected) in trajectory.iter().enumerate() {
        // Live intents are ignored while a recording plays.
        replay.step([ControlIntents::thrust(); MAX_SHIPS]).unwrap();
        let ship = replay.ship(1).unwrap();
        assert_eq!((ship.body, ship.heading), *expected, "tick {tick}");
    }

    assert!(matches!(
        replay.step([ControlIntents::IDLE; MAX_SHIPS]),
        Err(SimulationError::Recording(RecordingError::EndOfStream { frames })) if frames == script.len()
    ));
}

#[test]
fn corrupt_recording_is_rejected() {
    assert!(matches!(
        Recording::from_bytes(&[0xff, 0xff, 0xff]),
        Err(RecordingError::Decode(_))
    ));
}
