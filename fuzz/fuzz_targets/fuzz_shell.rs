//! Fuzz target: shell command surface
//!
//! Feeds arbitrary UTF-8-ish lines through the command dispatcher:
//! - No panics on arbitrary argument vectors
//! - Exit codes stay within the documented set
//! - Service state stays queryable afterwards
//!
//! cargo fuzz run fuzz_shell

#![no_main]

use libfuzzer_sys::fuzz_target;
use rotostage::adapters::settings::SettingsStore;
use rotostage::app::service::StageService;
use rotostage::config::StageConfig;
use rotostage::event::EventKind;
use rotostage::shell::{self, EXIT_NOT_FOUND, EXIT_OK, EXIT_USAGE};

fuzz_target!(|data: &[u8]| {
    let svc = StageService::new(vec![StageConfig {
        name: "tb".into(),
        kind: EventKind::Relative,
        codes: vec![0, 1],
        angle_degrees: 15,
        timeout_ms: 50,
    }])
    .unwrap();
    let mut store = SettingsStore::new();

    let text = String::from_utf8_lossy(data);
    for line in text.lines().take(32) {
        let args: Vec<&str> = line.split_whitespace().collect();
        if args.is_empty() {
            continue;
        }
        let (_, code) = shell::run_command(&svc, &mut store, &args);
        assert!(
            code == EXIT_OK || code == EXIT_USAGE || code == EXIT_NOT_FOUND,
            "unexpected exit code {code}"
        );
    }

    // The stage must still answer the management API.
    let _ = svc.get_angle("tb").unwrap();
    let _ = svc.list_stages().unwrap();
});
