//! Dashboard rendering: hand-rolled HTML via `format!`, not a templating
//! crate (§4.D.5) — the same minimal-embedded-HTML convention this codebase
//! uses for its own fallback pages.

use crate::hue_provider::HueSnapshots;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerLevel {
    Success,
    Error,
    Info,
}

impl BannerLevel {
    fn css_class(self) -> &'static str {
        match self {
            Self::Success => "banner-success",
            Self::Error => "banner-error",
            Self::Info => "banner-info",
        }
    }
}

pub struct Banner {
    pub level: BannerLevel,
    pub content: String,
}

fn render_banner(banner: Option<&Banner>) -> String {
    match banner {
        Some(b) => format!("<div class=\"banner {}\">{}</div>", b.level.css_class(), html_escape(&b.content)),
        None => String::new(),
    }
}

fn html_escape(input: &str) -> String {
    input.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn render_groups(snapshots: &HueSnapshots) -> String {
    let mut rows = String::new();
    for group in &snapshots.groups {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            html_escape(&group.id),
            html_escape(&group.name),
            if group.state.any_on { "on" } else { "off" },
        ));
    }
    format!("<table class=\"groups\"><thead><tr><th>id</th><th>name</th><th>state</th></tr></thead><tbody>{rows}</tbody></table>")
}

fn render_schedules(snapshots: &HueSnapshots) -> String {
    let mut rows = String::new();
    for schedule in &snapshots.schedules {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:?}</td></tr>",
            html_escape(&schedule.id),
            html_escape(&schedule.name),
            html_escape(&schedule.localtime),
            schedule.status,
        ));
    }
    format!("<table class=\"schedules\"><thead><tr><th>id</th><th>name</th><th>localtime</th><th>status</th></tr></thead><tbody>{rows}</tbody></table>")
}

fn render_sensors(snapshots: &HueSnapshots) -> String {
    let mut rows = String::new();
    for sensor in &snapshots.sensors {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            html_escape(&sensor.name),
            sensor.state.temperature,
            sensor.state.presence.unwrap_or(false),
        ));
    }
    format!("<table class=\"sensors\"><thead><tr><th>name</th><th>temperature</th><th>presence</th></tr></thead><tbody>{rows}</tbody></table>")
}

pub fn render(snapshots: &HueSnapshots, banner: Option<&Banner>) -> String {
    format!(
        "<!doctype html><html><head><title>hue</title></head><body>{}\
         <h1>Groups</h1>{}\
         <h1>Schedules</h1>{}\
         <h1>Sensors</h1>{}\
         </body></html>",
        render_banner(banner),
        render_groups(snapshots),
        render_schedules(snapshots),
        render_sensors(snapshots),
    )
}
