use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::models::alert::Alert;
use crate::models::aoi::Aoi;

/// Recipient used when an AOI has notifications enabled but no address
/// configured. Degraded delivery, not a failure.
const PLACEHOLDER_RECIPIENT: &str = "unconfigured@geosentry.invalid";

/// A single notification delivery mechanism.
///
/// Channels are fire-and-forget from the orchestrator's perspective: the
/// result is only observed to decide whether to try the next channel.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, alert: &Alert, aoi: &Aoi) -> Result<(), NotifyError>;
}

/// Tries an ordered list of channels until one succeeds.
///
/// Delivery is independent of alert persistence and job state: no outcome
/// here ever rolls back an Alert or changes a Job's terminal status.
pub struct NotificationDispatcher {
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl NotificationDispatcher {
    pub fn new(channels: Vec<Box<dyn NotificationChannel>>) -> Self {
        Self { channels }
    }

    /// Attempt delivery. Returns true if any channel accepted the alert.
    /// Never returns an error; total failure is logged and absorbed.
    pub async fn dispatch(&self, alert: &Alert, aoi: &Aoi) -> bool {
        for channel in &self.channels {
            match channel.send(alert, aoi).await {
                Ok(()) => {
                    tracing::info!(
                        alert_id = %alert.id,
                        aoi_id = %aoi.id,
                        channel = channel.name(),
                        "Alert notification delivered"
                    );
                    return true;
                }
                Err(e) => {
                    tracing::warn!(
                        alert_id = %alert.id,
                        channel = channel.name(),
                        error = %e,
                        "Notification channel failed, trying next"
                    );
                }
            }
        }

        tracing::error!(
            alert_id = %alert.id,
            aoi_id = %aoi.id,
            "All notification channels failed; alert remains persisted"
        );
        false
    }
}

/// Primary channel: rich JSON webhook with severity color coding and a
/// dashboard deep link.
pub struct WebhookChannel {
    http: Client,
    default_url: String,
    dashboard_base_url: String,
}

impl WebhookChannel {
    pub fn new(default_url: String, dashboard_base_url: String) -> Self {
        Self {
            http: Client::new(),
            default_url,
            dashboard_base_url,
        }
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, alert: &Alert, aoi: &Aoi) -> Result<(), NotifyError> {
        if !aoi.notifications.webhook_enabled {
            return Err(NotifyError::Rejected(
                "webhook channel disabled for this AOI".to_string(),
            ));
        }

        let url = aoi
            .notifications
            .webhook_url
            .clone()
            .unwrap_or_else(|| self.default_url.clone());

        let payload = json!({
            "alert_id": alert.id,
            "aoi": { "id": aoi.id, "name": aoi.name },
            "type": alert.alert_type,
            "severity": alert.severity,
            "color": alert.severity.color(),
            "confidence": alert.confidence,
            "description": alert.description,
            "detected_change": alert.detected_change,
            "link": dashboard_link(&self.dashboard_base_url, alert),
        });

        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(NotifyError::Http)?;

        response.error_for_status().map_err(NotifyError::Http)?;
        Ok(())
    }
}

/// Fallback channel: fully rendered plain message delivered through an
/// HTTP email relay.
pub struct EmailChannel {
    http: Client,
    api_url: String,
    api_token: String,
    from_address: String,
    dashboard_base_url: String,
}

impl EmailChannel {
    pub fn new(
        api_url: String,
        api_token: String,
        from_address: String,
        dashboard_base_url: String,
    ) -> Self {
        Self {
            http: Client::new(),
            api_url,
            api_token,
            from_address,
            dashboard_base_url,
        }
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, alert: &Alert, aoi: &Aoi) -> Result<(), NotifyError> {
        if !aoi.notifications.email_enabled {
            return Err(NotifyError::Rejected(
                "email channel disabled for this AOI".to_string(),
            ));
        }

        let recipient = aoi
            .notifications
            .email_address
            .clone()
            .unwrap_or_else(|| PLACEHOLDER_RECIPIENT.to_string());

        let payload = json!({
            "from": self.from_address,
            "to": recipient,
            "subject": render_subject(alert),
            "text": render_text(alert, aoi, &self.dashboard_base_url),
            "html": render_html(alert, aoi, &self.dashboard_base_url),
        });

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await
            .map_err(NotifyError::Http)?;

        response.error_for_status().map_err(NotifyError::Http)?;
        Ok(())
    }
}

pub fn dashboard_link(base_url: &str, alert: &Alert) -> String {
    format!(
        "{}/aois/{}/alerts/{}",
        base_url.trim_end_matches('/'),
        alert.aoi_id,
        alert.id
    )
}

/// Subject line encodes the alert type.
pub fn render_subject(alert: &Alert) -> String {
    format!("[GeoSentry] {} detected", alert.alert_type)
}

pub fn render_text(alert: &Alert, aoi: &Aoi, base_url: &str) -> String {
    format!(
        "Change detected in {}\n\nSeverity: {}\nConfidence: {:.0}%\n\n{}\n\n{}\n\nView in dashboard: {}",
        aoi.name,
        alert.severity,
        alert.confidence * 100.0,
        alert.description,
        alert.detected_change,
        dashboard_link(base_url, alert),
    )
}

/// Entity-escape text before it lands in HTML markup. AOI names come from
/// users and descriptions from the engine; neither is trusted as markup.
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_html(alert: &Alert, aoi: &Aoi, base_url: &str) -> String {
    format!(
        concat!(
            "<h2 style=\"color:{color}\">Change detected in {aoi}</h2>",
            "<p><strong>Severity:</strong> {severity}<br/>",
            "<strong>Confidence:</strong> {confidence:.0}%</p>",
            "<p>{description}</p>",
            "<p>{change}</p>",
            "<p><a href=\"{link}\">View in dashboard</a></p>"
        ),
        color = alert.severity.color(),
        aoi = escape_html(&aoi.name),
        severity = alert.severity,
        confidence = alert.confidence * 100.0,
        description = escape_html(&alert.description),
        change = escape_html(&alert.detected_change),
        link = dashboard_link(base_url, alert),
    )
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP delivery failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Channel rejected the message: {0}")]
    Rejected(String),
}
