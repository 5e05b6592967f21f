//! User-Friendly Error Messages
//!
//! Turns lifecycle errors into short messages for the host UI, with a hint
//! pointing at the system settings that usually need to change.

use crate::error::NetProbeError;

/// Settings guidance for the current device.
///
/// Some vendors gate overlays behind extra "background pop-up" and autostart
/// switches on top of the standard permission, so they get a longer hint.
pub fn permission_hint(manufacturer: Option<&str>) -> &'static str {
    match manufacturer {
        Some(m) if m.eq_ignore_ascii_case("xiaomi") => {
            "Enable \"Display pop-up windows\", \"Display pop-up windows while running in the background\", \
             autostart and notifications for this app in MIUI settings."
        }
        _ => {
            "Allow \"Display over other apps\" and notifications for this app in system settings; \
             allow autostart or background pop-ups if your device has them."
        }
    }
}

/// Convert a lifecycle error into a message suitable for the host UI
pub fn user_friendly_error(error: &NetProbeError, manufacturer: Option<&str>) -> String {
    match error {
        NetProbeError::PermissionDenied(msg) => {
            format!("{}.\n\n{}", capitalize(msg), permission_hint(manufacturer))
        }

        NetProbeError::SurfaceAttach { surface, reason } => format!(
            "Could not show the {} overlay ({}).\n\n{}",
            surface,
            simplify_message(reason),
            permission_hint(manufacturer)
        ),

        NetProbeError::ProbeTransport(msg) => {
            let lc = msg.to_lowercase();
            if lc.contains("timeout") || lc.contains("timed out") {
                "Network test timed out.\n\nPlease check your internet connection.".to_string()
            } else if lc.contains("dns") || lc.contains("resolve") {
                "DNS lookup failed.\n\nPlease check your internet connection.".to_string()
            } else {
                format!("Network test failed.\n\n{}", simplify_message(msg))
            }
        }

        NetProbeError::ProbeDataAnomaly(_) => {
            "Not enough data was transferred to measure speed.".to_string()
        }

        NetProbeError::HttpClient(_) => "Could not initialize networking.".to_string(),

        NetProbeError::InvalidConfig(msg) => format!("Invalid settings: {}", msg),

        NetProbeError::ServiceStopped => {
            "The overlay service has stopped.\n\nPlease start it again.".to_string()
        }

        NetProbeError::Runtime(_) => {
            "The overlay could not be started by the host.\n\nPlease restart the app.".to_string()
        }

        NetProbeError::Json(_) | NetProbeError::Io(_) => {
            format!("Settings error.\n\n{}", simplify_message(&error.to_string()))
        }
    }
}

/// Strip chained error detail after the first " (" or ": caused by"
fn simplify_message(msg: &str) -> String {
    let cut = [" (", ": caused by"]
        .iter()
        .filter_map(|sep| msg.find(sep))
        .min()
        .unwrap_or(msg.len());
    msg[..cut].trim().to_string()
}

fn capitalize(msg: &str) -> String {
    let mut chars = msg.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
