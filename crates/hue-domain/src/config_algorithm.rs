//! Declarative configuration startup (§4.D.4): clean every schedule, rule
//! and scene the hub previously projected onto the bridge, then recreate
//! them from the config file. Failures during cleanup are fatal — the
//! bridge state and the config file must never silently diverge.

use crate::client::{list, HueClient, HueError};
use crate::states;
use crate::types::{
    ButtonMapping, DeclarativeConfig, Group, MotionSensorConfig, Rule, RuleAction, RuleCondition,
    RuleOperator, Scene, ScheduleEntry, TapConfig,
};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfigAlgorithmError {
    #[error("failed to clean existing bridge state: {0}")]
    Clean(#[from] HueError),
    #[error("unknown group {0}")]
    UnknownGroup(String),
}

/// Delete every existing schedule, rule, then scene, in that order.
/// Aborts (returns `Err`) on the first failure — a partially-cleaned
/// bridge must not be silently treated as clean.
pub async fn clean<C: HueClient>(client: &C) -> Result<(), ConfigAlgorithmError> {
    for schedule in list::<C, crate::types::Schedule>(client, "/schedules").await? {
        client.delete(&format!("/schedules/{}", schedule.id)).await?;
    }
    for rule in list::<C, Rule>(client, "/rules").await? {
        client.delete(&format!("/rules/{}", rule.id)).await?;
    }
    for scene in list::<C, Scene>(client, "/scenes").await? {
        client.delete(&format!("/scenes/{}", scene.id)).await?;
    }
    Ok(())
}

/// Run the full startup sequence: clean, then configure schedules, taps,
/// and motion sensors from the declarative config.
pub async fn run<C: HueClient>(client: &C, config: &DeclarativeConfig) -> Result<(), ConfigAlgorithmError> {
    clean(client).await?;

    let groups: HashMap<String, Group> = list::<C, Group>(client, "/groups")
        .await?
        .into_iter()
        .map(|g| (g.id.clone(), g))
        .collect();

    for entry in &config.schedules {
        if let Err(err) = configure_schedule(client, &groups, entry).await {
            warn!(schedule = %entry.name, error = %err, "skipping schedule");
        }
    }
    for tap in &config.taps {
        configure_tap(client, tap).await;
    }
    for sensor in &config.sensors {
        configure_motion_sensor(client, sensor).await;
    }
    Ok(())
}

async fn configure_schedule<C: HueClient>(
    client: &C,
    groups: &HashMap<String, Group>,
    entry: &ScheduleEntry,
) -> Result<(), ConfigAlgorithmError> {
    let group = groups
        .get(&entry.group)
        .ok_or_else(|| ConfigAlgorithmError::UnknownGroup(entry.group.clone()))?;
    let action = states::lookup(&entry.state)
        .map_err(|_| ConfigAlgorithmError::UnknownGroup(entry.state.clone()))?;

    let scene_body = serde_json::json!({
        "name": entry.name,
        "lights": group.lights,
        "recycle": true,
    });
    let scene_id = client.create("/scenes", scene_body).await?;

    for light in &group.lights {
        let path = format!("/scenes/{scene_id}/lightstates/{light}");
        if let Err(err) = client.update(&path, serde_json::to_value(&action).unwrap()).await {
            warn!(light = %light, scene = %scene_id, error = %err, "failed to push light state into scene");
        }
    }

    let schedule_body = serde_json::json!({
        "name": entry.name,
        "localtime": entry.localtime,
        "status": "enabled",
        "command": {
            "address": format!("/groups/{}/action", entry.group),
            "method": "PUT",
            "body": {"scene": scene_id},
        },
    });
    client.create("/schedules", schedule_body).await?;
    info!(schedule = %entry.name, scene = %scene_id, "configured schedule");
    Ok(())
}

async fn configure_tap<C: HueClient>(client: &C, tap: &TapConfig) {
    for mapping in &tap.buttons {
        if let Err(err) = create_tap_rule(client, tap, mapping).await {
            warn!(tap = %tap.id, button = mapping.button, error = %err, "failed to create tap rule");
        }
    }
}

async fn create_tap_rule<C: HueClient>(
    client: &C,
    tap: &TapConfig,
    mapping: &ButtonMapping,
) -> Result<(), ConfigAlgorithmError> {
    let action = states::lookup(&mapping.state)
        .map_err(|_| ConfigAlgorithmError::UnknownGroup(mapping.state.clone()))?;
    let actions = group_actions(&mapping.groups, &action);
    let rule_body = serde_json::json!({
        "name": format!("tap-{}-{}", tap.id, mapping.button),
        "conditions": [{
            "address": format!("/sensors/{}/state/buttonevent", tap.id),
            "operator": "eq",
            "value": mapping.button.to_string(),
        }],
        "actions": actions,
    });
    client.create("/rules", rule_body).await?;
    Ok(())
}

async fn configure_motion_sensor<C: HueClient>(client: &C, sensor: &MotionSensorConfig) {
    if let Err(err) = create_on_rule(client, sensor).await {
        warn!(sensor = %sensor.id, error = %err, "failed to create on-rule");
    }
    if !sensor.even_if_not_dark {
        if let Err(err) = create_recover_rule(client, sensor).await {
            warn!(sensor = %sensor.id, error = %err, "failed to create recover-rule");
        }
    }
    if let Err(err) = create_off_rule(client, sensor).await {
        warn!(sensor = %sensor.id, error = %err, "failed to create off-rule");
    }
}

fn group_actions(groups: &[String], action: &crate::types::LightAction) -> Vec<RuleAction> {
    groups
        .iter()
        .map(|group| RuleAction {
            address: format!("/groups/{group}/action"),
            method: "PUT".to_owned(),
            body: serde_json::to_value(action).unwrap(),
        })
        .collect()
}

async fn create_on_rule<C: HueClient>(client: &C, sensor: &MotionSensorConfig) -> Result<(), ConfigAlgorithmError> {
    let on_action = states::lookup("on").expect("on is a known state");
    let mut conditions = vec![
        RuleCondition {
            address: format!("/sensors/{}/state/presence", sensor.id),
            operator: RuleOperator::Eq,
            value: "true".to_owned(),
        },
        RuleCondition {
            address: format!("/sensors/{}/state/presence", sensor.id),
            operator: RuleOperator::Dx,
            value: String::new(),
        },
    ];
    if !sensor.even_if_not_dark {
        conditions.push(RuleCondition {
            address: format!("/sensors/{}/state/dark", sensor.light_sensor_id),
            operator: RuleOperator::Eq,
            value: "true".to_owned(),
        });
    }
    let body = serde_json::json!({
        "name": format!("{}-on", sensor.id),
        "conditions": conditions,
        "actions": group_actions(&sensor.groups, &on_action),
    });
    client.create("/rules", body).await?;
    Ok(())
}

async fn create_recover_rule<C: HueClient>(client: &C, sensor: &MotionSensorConfig) -> Result<(), ConfigAlgorithmError> {
    let on_action = states::lookup("on").expect("on is a known state");
    let conditions = vec![
        RuleCondition {
            address: format!("/sensors/{}/state/presence", sensor.id),
            operator: RuleOperator::Eq,
            value: "true".to_owned(),
        },
        RuleCondition {
            address: format!("/sensors/{}/state/presence", sensor.id),
            operator: RuleOperator::Dx,
            value: String::new(),
        },
    ];
    let body = serde_json::json!({
        "name": format!("{}-recover", sensor.id),
        "conditions": conditions,
        "actions": group_actions(&sensor.groups, &on_action),
    });
    client.create("/rules", body).await?;
    Ok(())
}

async fn create_off_rule<C: HueClient>(client: &C, sensor: &MotionSensorConfig) -> Result<(), ConfigAlgorithmError> {
    let off_action = states::lookup("long_off").expect("long_off is a known state");
    let conditions = vec![
        RuleCondition {
            address: format!("/sensors/{}/state/presence", sensor.id),
            operator: RuleOperator::Eq,
            value: "false".to_owned(),
        },
        RuleCondition {
            address: format!("/sensors/{}/state/presence", sensor.id),
            operator: RuleOperator::Ddx,
            value: sensor.off_delay.clone(),
        },
    ];
    let body = serde_json::json!({
        "name": format!("{}-off", sensor.id),
        "conditions": conditions,
        "actions": group_actions(&sensor.groups, &off_action),
    });
    client.create("/rules", body).await?;
    Ok(())
}
