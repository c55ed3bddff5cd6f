//! Fuzz target: persistence replay
//!
//! Fills a settings store with arbitrary key/value garbage (plus a few
//! entries under real stage names) and replays it into a service:
//! - No panics under arbitrary stored bytes
//! - Unknown names and undecodable payloads are discarded
//! - A well-formed entry still lands after arbitrary neighbours
//!
//! cargo fuzz run fuzz_replay

#![no_main]

use libfuzzer_sys::fuzz_target;
use rotostage::adapters::settings::SettingsStore;
use rotostage::app::ports::StoragePort;
use rotostage::app::service::{SETTINGS_NAMESPACE, StageService};
use rotostage::config::StageConfig;
use rotostage::event::EventKind;

fn stage(name: &str) -> StageConfig {
    StageConfig {
        name: name.into(),
        kind: EventKind::Relative,
        codes: vec![0, 1],
        angle_degrees: 0,
        timeout_ms: 50,
    }
}

fuzz_target!(|data: &[u8]| {
    let mut store = SettingsStore::new();

    // Chop the input into arbitrary (key, value) entries.
    let mut rest = data;
    while rest.len() >= 2 {
        let key_len = (rest[0] as usize % 8) + 1;
        let val_len = rest[1] as usize % 8;
        rest = &rest[2..];
        if rest.len() < key_len + val_len {
            break;
        }
        let key = String::from_utf8_lossy(&rest[..key_len]).into_owned();
        let value = rest[key_len..key_len + val_len].to_vec();
        rest = &rest[key_len + val_len..];
        if key.is_empty() {
            continue;
        }
        let _ = store.save(SETTINGS_NAMESPACE, &key, &value);
    }

    // One entry that must survive the noise.
    let angle_bytes = encode_angle(73);
    let _ = store.save(SETTINGS_NAMESPACE, "anchor", &angle_bytes);

    let svc = StageService::new(vec![stage("anchor"), stage("other")]).unwrap();
    svc.replay_persisted(&store);

    assert_eq!(svc.get_angle("anchor").unwrap(), 73);
    // "other" had no valid entry unless the fuzzer forged one; either
    // way its angle must decode to something the service accepted.
    let _ = svc.get_angle("other").unwrap();
});

// The service stores angles as postcard-encoded i16.
fn encode_angle(angle: i16) -> Vec<u8> {
    postcard::to_allocvec(&angle).expect("i16 encoding cannot fail")
}
