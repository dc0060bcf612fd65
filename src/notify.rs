use anyhow::Result;
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::{AppConfig, EmailConfig, WhatsAppConfig};
use crate::error::NotifyError;
use crate::http_client::http_client;
use crate::model::{Channel, Match, Notification, Player};

const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";
const TWILIO_API: &str = "https://api.twilio.com/2010-04-01/Accounts";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Receipt {
    pub id: Option<String>,
}

/// One delivery channel. A send either succeeds or fails; there is no retry.
pub trait MessageSender {
    fn send(&self, to: &str, subject: Option<&str>, body: &str) -> Result<Receipt, NotifyError>;
}

/// Stand-in for a channel with no credentials; every send fails.
pub struct Unconfigured(pub &'static str);

impl MessageSender for Unconfigured {
    fn send(&self, _to: &str, _subject: Option<&str>, _body: &str) -> Result<Receipt, NotifyError> {
        Err(NotifyError::NotConfigured(self.0))
    }
}

pub struct SendGridEmail {
    client: Client,
    config: EmailConfig,
}

impl SendGridEmail {
    pub fn new(client: Client, config: EmailConfig) -> Self {
        Self { client, config }
    }
}

impl MessageSender for SendGridEmail {
    fn send(&self, to: &str, subject: Option<&str>, body: &str) -> Result<Receipt, NotifyError> {
        let payload = json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": self.config.from_email, "name": self.config.from_name },
            "subject": subject.unwrap_or("FC Descansa"),
            "content": [{ "type": "text/plain", "value": body }],
        });
        let resp = self
            .client
            .post(SENDGRID_URL)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()?;
        let status = resp.status();
        let id = resp
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(NotifyError::Rejected(format!("http {status}: {body}")));
        }
        Ok(Receipt { id })
    }
}

pub struct TwilioWhatsApp {
    client: Client,
    config: WhatsAppConfig,
}

impl TwilioWhatsApp {
    pub fn new(client: Client, config: WhatsAppConfig) -> Self {
        Self { client, config }
    }
}

impl MessageSender for TwilioWhatsApp {
    fn send(&self, to: &str, _subject: Option<&str>, body: &str) -> Result<Receipt, NotifyError> {
        let url = format!("{TWILIO_API}/{}/Messages.json", self.config.account_sid);
        let from = format!("whatsapp:{}", self.config.from_number);
        let to = format!("whatsapp:{to}");
        let resp = self
            .client
            .post(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[("From", from.as_str()), ("To", to.as_str()), ("Body", body)])
            .send()?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(NotifyError::Rejected(format!("http {status}: {body}")));
        }
        let value: Value = resp.json()?;
        Ok(Receipt {
            id: value.get("sid").and_then(Value::as_str).map(str::to_string),
        })
    }
}

/// Append-only sink for delivery attempts.
pub trait NotificationLog {
    fn append(&mut self, record: Notification) -> Result<Notification, NotifyError>;
}

impl NotificationLog for Vec<Notification> {
    fn append(&mut self, mut record: Notification) -> Result<Notification, NotifyError> {
        record.id = self.len() as u64 + 1;
        self.push(record.clone());
        Ok(record)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

impl Message {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }

    pub fn new_match(m: &Match) -> Self {
        Self::new(
            "Nuevo Partido Programado - FC DESCANSA",
            format!(
                "Hola {{name}},\n\nNuevo partido programado: {} vs {}\nFecha: {}\nHora: {}\nLugar: {}\n\nNos vemos en la cancha!",
                m.home_team,
                m.away_team,
                m.kickoff.format("%Y-%m-%d"),
                m.kickoff.format("%H:%M"),
                m.venue.as_deref().unwrap_or("por confirmar"),
            ),
        )
    }

    pub fn reminder(m: &Match) -> Self {
        Self::new(
            "Recordatorio de Partido - FC DESCANSA",
            format!(
                "Hola {{name}}, recordatorio: {} vs {} a las {} en {}.",
                m.home_team,
                m.away_team,
                m.kickoff.format("%H:%M"),
                m.venue.as_deref().unwrap_or("por confirmar"),
            ),
        )
    }

    pub fn welcome() -> Self {
        Self::new(
            "Bienvenido a FC Descansa!",
            "Hola {name},\n\nBienvenido al equipo FC Descansa! Tu registro ha sido exitoso.\n\nNos vemos en la cancha!",
        )
    }

    pub fn render_for(&self, player: &Player) -> String {
        let name = player.nickname.as_deref().unwrap_or(&player.full_name);
        self.body.replace("{name}", name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    pub player_id: u64,
    pub player_name: String,
    pub email_sent: bool,
    pub whatsapp_sent: bool,
    pub email_error: Option<String>,
    pub whatsapp_error: Option<String>,
    /// Set when recording an attempt failed; the sends themselves are still reported above.
    pub error: Option<String>,
}

pub struct NotificationDispatcher {
    email: Box<dyn MessageSender>,
    whatsapp: Box<dyn MessageSender>,
}

impl NotificationDispatcher {
    pub fn new(email: Box<dyn MessageSender>, whatsapp: Box<dyn MessageSender>) -> Self {
        Self { email, whatsapp }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = http_client(config.api.request_timeout)?;
        let email: Box<dyn MessageSender> = match &config.email {
            Some(cfg) => Box::new(SendGridEmail::new(client.clone(), cfg.clone())),
            None => Box::new(Unconfigured("email")),
        };
        let whatsapp: Box<dyn MessageSender> = match &config.whatsapp {
            Some(cfg) => Box::new(TwilioWhatsApp::new(client, cfg.clone())),
            None => Box::new(Unconfigured("whatsapp")),
        };
        Ok(Self::new(email, whatsapp))
    }

    /// Sends `message` to every player over both channels.
    ///
    /// Players are handled in order, email before WhatsApp. Each attempt is
    /// logged whatever its outcome, and nothing that goes wrong for one player
    /// or channel stops the others.
    pub fn notify_all(
        &self,
        players: &[Player],
        message: &Message,
        log: &mut dyn NotificationLog,
    ) -> Vec<DeliveryResult> {
        players
            .iter()
            .map(|player| self.deliver(player, message, log))
            .collect()
    }

    fn deliver(
        &self,
        player: &Player,
        message: &Message,
        log: &mut dyn NotificationLog,
    ) -> DeliveryResult {
        let body = message.render_for(player);
        let mut result = DeliveryResult {
            player_id: player.id,
            player_name: player.full_name.clone(),
            ..DeliveryResult::default()
        };
        let mut log_errors = Vec::new();

        let email = self.attempt(
            Channel::Email,
            self.email.as_ref(),
            player,
            &player.email,
            Some(message.subject.as_str()),
            &body,
            log,
        );
        result.email_sent = email.sent;
        result.email_error = email.error;
        log_errors.extend(email.log_error);

        let chat = self.attempt(
            Channel::WhatsApp,
            self.whatsapp.as_ref(),
            player,
            &player.whatsapp,
            None,
            &body,
            log,
        );
        result.whatsapp_sent = chat.sent;
        result.whatsapp_error = chat.error;
        log_errors.extend(chat.log_error);

        if !log_errors.is_empty() {
            result.error = Some(log_errors.join("; "));
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn attempt(
        &self,
        channel: Channel,
        sender: &dyn MessageSender,
        player: &Player,
        recipient: &str,
        subject: Option<&str>,
        body: &str,
        log: &mut dyn NotificationLog,
    ) -> Attempt {
        let outcome = if recipient.trim().is_empty() {
            Err(NotifyError::MissingRecipient(channel.label()))
        } else {
            sender.send(recipient.trim(), subject, body)
        };

        let (record, error) = match outcome {
            Ok(receipt) => {
                debug!(player_id = player.id, channel = channel.label(), id = ?receipt.id, "notification sent");
                (Notification::sent(player.id, channel, recipient, body), None)
            }
            Err(err) => {
                warn!(player_id = player.id, channel = channel.label(), error = %err, "notification failed");
                let reason = err.to_string();
                let record = Notification::failed(player.id, channel, recipient, body, reason.as_str());
                (record, Some(reason))
            }
        };
        let sent = error.is_none();

        let log_error = log.append(record).err().map(|err| {
            warn!(player_id = player.id, channel = channel.label(), error = %err, "could not record notification");
            err.to_string()
        });
        Attempt {
            sent,
            error,
            log_error,
        }
    }
}

struct Attempt {
    sent: bool,
    error: Option<String>,
    log_error: Option<String>,
}
