//! Command surface — a thin wrapper over the management API.
//!
//! Three commands, each mapping 1:1 onto a [`StageService`] call:
//!
//! - `status` — list every stage with its current angle
//! - `get <name>` — print one stage's angle
//! - `set <name> <angle>` — update and persist a stage's angle
//!
//! Each command returns a human-readable reply and a process-style exit
//! code (0 success, 1 usage error, 2 unknown stage).

use std::fmt::Write as _;

use crate::app::ports::StoragePort;
use crate::app::service::StageService;
use crate::error::Error;

pub const EXIT_OK: i32 = 0;
pub const EXIT_USAGE: i32 = 1;
pub const EXIT_NOT_FOUND: i32 = 2;

/// Execute one shell command against the service.
pub fn run_command(
    service: &StageService,
    storage: &mut impl StoragePort,
    args: &[&str],
) -> (String, i32) {
    match args {
        ["status"] => cmd_status(service),
        ["get", name] => cmd_get(service, name),
        ["set", name, angle] => cmd_set(service, storage, name, angle),
        _ => (
            "Usage: status | get <name> | set <name> <angle>".to_string(),
            EXIT_USAGE,
        ),
    }
}

fn cmd_status(service: &StageService) -> (String, i32) {
    let names = match service.list_stages() {
        Ok(n) => n,
        Err(e) => return (format!("Error: {e}"), EXIT_USAGE),
    };
    if names.is_empty() {
        return ("No stages found.".to_string(), EXIT_OK);
    }

    let mut out = String::from("Stages available:");
    for name in names {
        match service.get_angle(&name) {
            Ok(angle) => {
                let _ = write!(out, "\n  {name} (angle: {angle})");
            }
            Err(_) => {
                let _ = write!(out, "\n  {name} (not found)");
            }
        }
    }
    (out, EXIT_OK)
}

fn cmd_get(service: &StageService, name: &str) -> (String, i32) {
    match service.get_angle(name) {
        Ok(angle) => (format!("{name}: angle={angle}"), EXIT_OK),
        Err(_) => ("Stage not found.".to_string(), EXIT_NOT_FOUND),
    }
}

fn cmd_set(
    service: &StageService,
    storage: &mut impl StoragePort,
    name: &str,
    angle: &str,
) -> (String, i32) {
    let Ok(angle) = angle.parse::<i16>() else {
        return (
            "Usage: set <name> <angle>  (angle is a signed integer)".to_string(),
            EXIT_USAGE,
        );
    };

    match service.set_angle(name, angle, storage) {
        // The live angle is committed even when the write-back failed;
        // the failure is already logged.
        Ok(()) | Err(Error::PersistenceWrite(_)) => {
            (format!("Set {name} to angle {angle}"), EXIT_OK)
        }
        Err(_) => ("Stage not found.".to_string(), EXIT_NOT_FOUND),
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::settings::SettingsStore;
    use crate::config::StageConfig;
    use crate::event::EventKind;

    fn service() -> StageService {
        StageService::new(vec![
            StageConfig {
                name: "trackball".into(),
                kind: EventKind::Relative,
                codes: vec![0, 1],
                angle_degrees: 45,
                timeout_ms: 50,
            },
            StageConfig {
                name: "touchpad".into(),
                kind: EventKind::Absolute,
                codes: vec![0, 1],
                angle_degrees: 0,
                timeout_ms: 20,
            },
        ])
        .unwrap()
    }

    #[test]
    fn status_lists_all_stages() {
        let svc = service();
        let mut store = SettingsStore::new();
        let (out, code) = run_command(&svc, &mut store, &["status"]);
        assert_eq!(code, EXIT_OK);
        assert!(out.contains("trackball (angle: 45)"));
        assert!(out.contains("touchpad (angle: 0)"));
    }

    #[test]
    fn get_reports_angle() {
        let svc = service();
        let mut store = SettingsStore::new();
        let (out, code) = run_command(&svc, &mut store, &["get", "trackball"]);
        assert_eq!(code, EXIT_OK);
        assert_eq!(out, "trackball: angle=45");
    }

    #[test]
    fn get_unknown_stage_fails() {
        let svc = service();
        let mut store = SettingsStore::new();
        let (out, code) = run_command(&svc, &mut store, &["get", "ghost"]);
        assert_eq!(code, EXIT_NOT_FOUND);
        assert_eq!(out, "Stage not found.");
    }

    #[test]
    fn set_updates_and_persists() {
        let svc = service();
        let mut store = SettingsStore::new();
        let (out, code) = run_command(&svc, &mut store, &["set", "trackball", "-90"]);
        assert_eq!(code, EXIT_OK);
        assert_eq!(out, "Set trackball to angle -90");
        assert_eq!(svc.get_angle("trackball").unwrap(), -90);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn set_with_bad_angle_is_usage_error() {
        let svc = service();
        let mut store = SettingsStore::new();
        let (_, code) = run_command(&svc, &mut store, &["set", "trackball", "ninety"]);
        assert_eq!(code, EXIT_USAGE);
    }

    #[test]
    fn missing_args_print_usage() {
        let svc = service();
        let mut store = SettingsStore::new();
        let (out, code) = run_command(&svc, &mut store, &["get"]);
        assert_eq!(code, EXIT_USAGE);
        assert!(out.starts_with("Usage:"));

        let (_, code) = run_command(&svc, &mut store, &["set", "trackball"]);
        assert_eq!(code, EXIT_USAGE);
    }
}
