//! Desktop notifications via notify-send
//!
//! Best-effort: failures are logged at debug and never propagate. The
//! expire time comes from `ui.notification_duration_secs`.

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Notification sink handed to the daemon. A disabled sink drops
/// everything, so call sites don't re-check config.
#[derive(Debug, Clone)]
pub struct Notifier {
    enabled: bool,
    duration: Duration,
}

impl Notifier {
    pub fn new(config: &crate::config::UiConfig) -> Self {
        Self {
            enabled: config.show_notifications,
            duration: Duration::from_secs(config.notification_duration_secs),
        }
    }

    /// Send a desktop notification with the given title and body
    pub async fn send(&self, title: &str, body: &str) {
        if !self.enabled {
            return;
        }

        let expire = format!("--expire-time={}", self.duration.as_millis());
        let result = Command::new("notify-send")
            .args(["--app-name=Redink", &expire, title, body])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        if let Err(e) = result {
            tracing::debug!("Failed to send notification: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UiConfig;

    #[test]
    fn test_disabled_notifier_is_inert() {
        let notifier = Notifier::new(&UiConfig {
            show_notifications: false,
            notification_duration_secs: 2,
        });
        assert!(!notifier.enabled);
    }

    #[test]
    fn test_duration_from_config() {
        let notifier = Notifier::new(&UiConfig {
            show_notifications: true,
            notification_duration_secs: 5,
        });
        assert_eq!(notifier.duration, Duration::from_secs(5));
    }
}
