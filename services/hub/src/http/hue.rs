//! HTTP surface for the Hue provider (§4.D.5). Every handler dispatches a
//! command to the worker over the bus, then re-renders the full dashboard
//! with a banner describing the outcome.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::Html;
use axum::Form;
use serde::Deserialize;

use crate::http::dashboard::{self, Banner, BannerLevel};
use crate::state::{AppState, HubHandle};

#[derive(Debug, Deserialize)]
pub struct StateQuery {
    group: String,
    value: String,
}

pub async fn get_state(State(state): State<Arc<AppState>>, Query(query): Query<StateQuery>) -> Html<String> {
    let payload = format!("{}|{}", query.group, query.value);
    let reply = state.send_to_worker("hue", "state", payload, true).await;
    let banner = banner_from_reply(reply, &format!("{} is now {}", query.group, query.value));
    render(&state, Some(&banner)).await
}

#[derive(Debug, Deserialize)]
pub struct ScheduleForm {
    method: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    group: String,
    /// Comma-separated weekday codes (mon,tue,wed,thu,fri,sat,sun).
    #[serde(default)]
    days: String,
    #[serde(default)]
    hours: String,
    #[serde(default)]
    minutes: String,
    #[serde(default)]
    state: String,
}

pub async fn post_schedules(State(state): State<Arc<AppState>>, Form(form): Form<ScheduleForm>) -> Html<String> {
    let reply = match form.method.as_str() {
        "POST" => {
            let entry = serde_json::json!({
                "name": form.name,
                "group": form.group,
                "localtime": build_localtime(&form.days, &form.hours, &form.minutes),
                "state": form.state,
            });
            state.send_to_worker("hue", "schedules/create", entry.to_string(), true).await
        }
        "DELETE" => state.send_to_worker("hue", "schedules/delete", form.id.clone(), true).await,
        other => Some(bus_protocol::Envelope::error_reply(None, "iot", format!("unsupported method {other}"))),
    };
    let banner = banner_from_reply(reply, "schedule updated");
    render(&state, Some(&banner)).await
}

pub async fn toggle_schedule(State(state): State<Arc<AppState>>, Path((id, status)): Path<(String, String)>) -> Html<String> {
    let body = serde_json::json!({"id": id, "status": status}).to_string();
    let reply = state.send_to_worker("hue", "schedules/update", body, true).await;
    let banner = banner_from_reply(reply, &format!("schedule {id} set to {status}"));
    render(&state, Some(&banner)).await
}

pub async fn dashboard_root(State(state): State<Arc<AppState>>) -> Html<String> {
    render(&state, None).await
}

async fn render(state: &Arc<AppState>, banner: Option<&Banner>) -> Html<String> {
    let snapshots = state.hue.read().await;
    Html(dashboard::render(&snapshots, banner))
}

fn banner_from_reply(reply: Option<bus_protocol::Envelope>, success_message: &str) -> Banner {
    match reply {
        Some(envelope) if envelope.is_error() => Banner { level: BannerLevel::Error, content: envelope.payload },
        Some(_) => Banner { level: BannerLevel::Success, content: success_message.to_owned() },
        None => Banner { level: BannerLevel::Info, content: "command sent".to_owned() },
    }
}

/// Build a Hue bridge recurrence `localtime` string from form fields, e.g.
/// `"W124/T08:00:00"` for Mon+Tue+Wed at 08:00.
fn build_localtime(days: &str, hours: &str, minutes: &str) -> String {
    let mask: u8 = days
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|day| match day {
            "mon" => 64,
            "tue" => 32,
            "wed" => 16,
            "thu" => 8,
            "fri" => 4,
            "sat" => 2,
            "sun" => 1,
            _ => 0,
        })
        .sum();
    let hours: u32 = hours.parse().unwrap_or(0);
    let minutes: u32 = minutes.parse().unwrap_or(0);
    format!("W{mask}/T{hours:02}:{minutes:02}:00")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn localtime_combines_weekday_mask_and_clock_time() {
        assert_eq!(build_localtime("mon,tue,wed", "8", "0"), "W112/T08:00:00");
    }

    #[test]
    fn localtime_defaults_unparseable_clock_fields_to_zero() {
        assert_eq!(build_localtime("sun", "", ""), "W1/T00:00:00");
    }
}
