use glam::{IVec2, Vec3};

use crate::catalog::Catalog;
use crate::commands::{RemoteRequest, RequestCommand};
use crate::components::{MovementGoal, SelfDestructCountdown};
use crate::enums::MovePhase;
use crate::events::Notification;
use crate::settings::{SettingsError, SimSettings, SpawnPolicy};
use crate::types::{ClientId, NetId, Position, SimTime};

#[test]
fn test_builtin_settings_parse_and_validate() {
    let settings = SimSettings::builtin();
    settings.validate().unwrap();
    assert!(settings.units.len() >= 3);
    assert!(settings.structures.len() >= 4);
    assert!(!settings.waves.phases.is_empty());
    assert!(settings.grid.targeting_cell > settings.grid.movement_cell);
}

#[test]
fn test_builtin_has_a_non_targetable_structure() {
    let settings = SimSettings::builtin();
    assert!(settings.structures.iter().any(|(_, s)| !s.targetable));
}

#[test]
fn test_last_builtin_phase_never_advances() {
    let settings = SimSettings::builtin();
    let last = settings.waves.phases.last().unwrap();
    assert!(last.time_threshold_secs.is_none());
    assert!(last.kill_threshold.is_none());
}

#[test]
fn test_validate_rejects_weightless_spawning_phase() {
    let mut settings = SimSettings::builtin();
    let phase = settings
        .waves
        .phases
        .iter_mut()
        .find(|p| !matches!(p.spawn, SpawnPolicy::Idle))
        .unwrap();
    phase.weights.clear();
    let err = settings.validate().unwrap_err();
    assert!(matches!(err, SettingsError::Invalid(_)));
}

#[test]
fn test_validate_rejects_unknown_enemy() {
    let mut settings = SimSettings::builtin();
    let phase = settings
        .waves
        .phases
        .iter_mut()
        .find(|p| !p.weights.is_empty())
        .unwrap();
    phase.weights[0].enemy = 999;
    assert!(settings.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_cell_size() {
    let mut settings = SimSettings::builtin();
    settings.grid.movement_cell = 0.0;
    assert!(settings.validate().is_err());
}

#[test]
fn test_from_json_str_reports_parse_errors() {
    let err = SimSettings::from_json_str("{ not json").unwrap_err();
    assert!(matches!(err, SettingsError::Parse(_)));
}

#[test]
fn test_from_file_reports_missing_file() {
    let err = SimSettings::from_file(std::path::Path::new("/nonexistent/warfront.json"))
        .unwrap_err();
    assert!(matches!(err, SettingsError::ReadFailed { .. }));
}

#[test]
fn test_catalog_indices_are_append_order() {
    let mut catalog = Catalog::new();
    assert_eq!(catalog.push("worker"), 0);
    assert_eq!(catalog.push("rifleman"), 1);
    assert_eq!(catalog.push("sapper"), 2);
    assert_eq!(catalog.get(1), Some(&"rifleman"));
    assert_eq!(catalog.get(3), None);
    assert_eq!(catalog.len(), 3);
}

#[test]
fn test_request_json_is_tagged_by_type() {
    let request = RemoteRequest::new(
        ClientId(3),
        RequestCommand::Build {
            structure_index: 2,
            grid_position: IVec2::new(4, -1),
            builder: NetId(17),
        },
    );
    let json = serde_json::to_string(&request).unwrap();
    assert!(json.contains("\"type\":\"Build\""), "got {json}");
    let back: RemoteRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(back, request);
}

#[test]
fn test_notification_serializes_as_plain_variant() {
    let json = serde_json::to_string(&Notification::PopulationLimitReached).unwrap();
    assert_eq!(json, "\"PopulationLimitReached\"");
}

#[test]
fn test_self_destruct_countdown_starts_disarmed() {
    let countdown = SelfDestructCountdown::default();
    assert!(!countdown.is_armed());
    assert!(SelfDestructCountdown { remaining: 0.0 }.is_armed());
}

#[test]
fn test_movement_goal_request_marks_dirty() {
    let mut goal = MovementGoal::default();
    assert_eq!(goal.phase, MovePhase::Idle);
    goal.request(Vec3::new(4.0, 0.0, 2.0));
    assert!(goal.dirty);
    assert_eq!(goal.phase, MovePhase::PathPending);
    assert_eq!(goal.destination, Vec3::new(4.0, 0.0, 2.0));
}

#[test]
fn test_ground_distance_ignores_height() {
    let a = Position::new(0.0, 50.0, 0.0);
    let b = Position::new(3.0, 0.0, 4.0);
    assert!((a.ground_distance(&b) - 5.0).abs() < 1e-6);
}

#[test]
fn test_tick_timing_30_ticks_one_second() {
    let mut time = SimTime::default();
    for _ in 0..30 {
        time.advance();
    }
    assert_eq!(time.tick, 30);
    assert!((time.elapsed_secs - 1.0).abs() < 1e-9);
}
