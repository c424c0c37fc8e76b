//! The compile-time `States` dictionary. Immutable, never mutated at
//! runtime — unknown keys surface as a typed error rather than a default.

use crate::types::LightAction;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown state {0}")]
pub struct UnknownState(pub String);

/// Look up a named state. Matches the five states exactly: `off`, `on`,
/// `dimmed`, `long_on`, `long_off`.
pub fn lookup(name: &str) -> Result<LightAction, UnknownState> {
    let action = match name {
        "off" => LightAction { on: false, transitiontime: 30, sat: None, bri: None, hue: None, scene: None },
        "on" => LightAction { on: true, transitiontime: 30, sat: Some(0), bri: Some(254), hue: None, scene: None },
        "dimmed" => LightAction { on: true, transitiontime: 30, sat: Some(0), bri: Some(0), hue: None, scene: None },
        "long_on" => LightAction { on: true, transitiontime: 3000, sat: Some(0), bri: Some(254), hue: None, scene: None },
        "long_off" => LightAction { on: false, transitiontime: 3000, sat: None, bri: None, hue: None, scene: None },
        other => return Err(UnknownState(other.to_owned())),
    };
    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_state_matches_documented_body() {
        let action = lookup("on").unwrap();
        assert!(action.on);
        assert_eq!(action.transitiontime, 30);
        assert_eq!(action.sat, Some(0));
        assert_eq!(action.bri, Some(254));
    }

    #[test]
    fn off_state_has_no_sat_or_bri() {
        let action = lookup("off").unwrap();
        assert!(!action.on);
        assert_eq!(action.transitiontime, 30);
        assert_eq!(action.sat, None);
        assert_eq!(action.bri, None);
    }

    #[test]
    fn long_off_uses_long_transition() {
        let action = lookup("long_off").unwrap();
        assert!(!action.on);
        assert_eq!(action.transitiontime, 3000);
    }

    #[test]
    fn unknown_state_is_rejected() {
        assert!(lookup("chartreuse").is_err());
    }

    #[test]
    fn serialized_on_body_matches_wire_shape() {
        let action = lookup("on").unwrap();
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json, serde_json::json!({"on": true, "transitiontime": 30, "sat": 0, "bri": 254}));
    }

    #[test]
    fn serialized_off_body_omits_sat_and_bri() {
        let action = lookup("off").unwrap();
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json, serde_json::json!({"on": false, "transitiontime": 30}));
    }
}
