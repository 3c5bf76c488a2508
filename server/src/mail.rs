//! Best-effort email delivery. Messages are queued and sent by a background
//! worker; anything that goes wrong is logged and the message is dropped.

use std::sync::{Arc, Mutex};

use anyhow::Context;
use lettre::{
    message::Mailbox,
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use ride_share_lib::notify::OutboundEmail;
use tokio::sync::mpsc;

use crate::config::SmtpConfig;

/// Sends one message. Called on a blocking thread.
pub trait Mailer: Send + Sync + 'static {
    fn send(&self, email: &OutboundEmail) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        // 465 speaks TLS from the first byte, everything else upgrades with STARTTLS.
        let builder = if config.port == 465 {
            SmtpTransport::relay(&config.host)
        } else {
            SmtpTransport::starttls_relay(&config.host)
        }
        .with_context(|| format!("Invalid SMTP host {}", config.host))?
        .port(config.port);

        let builder = match (&config.user, &config.password) {
            (Some(user), Some(password)) => builder.credentials(Credentials::new(user.clone(), password.clone())),
            _ => builder,
        };

        let from = config.from.parse::<Mailbox>()
            .with_context(|| format!("Invalid sender address {}", config.from))?;

        Ok(Self { transport: builder.build(), from })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, email: &OutboundEmail) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email.to.parse::<Mailbox>().context("Invalid recipient")?)
            .subject(email.subject.clone())
            .body(email.body.clone())?;

        self.transport.send(&message)?;
        Ok(())
    }
}

/// Used when no SMTP server is configured.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, email: &OutboundEmail) -> anyhow::Result<()> {
        tracing::info!("Email to {} not sent (SMTP not configured): {}", email.to, email.subject);
        Ok(())
    }
}

/// Keeps every message, for tests.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    pub sent: Arc<Mutex<Vec<OutboundEmail>>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, email: &OutboundEmail) -> anyhow::Result<()> {
        self.sent.lock()
            .map_err(|_| anyhow::anyhow!("Recording mailer poisoned"))?
            .push(email.clone());
        Ok(())
    }
}

#[derive(Clone)]
pub struct MailQueue {
    tx: mpsc::Sender<OutboundEmail>,
}

impl MailQueue {
    /// Spawns the worker. Must be called inside a tokio runtime.
    pub fn start(mailer: Arc<dyn Mailer>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<OutboundEmail>(capacity.max(1));

        tokio::spawn(async move {
            while let Some(email) = rx.recv().await {
                let mailer = mailer.clone();
                let to = email.to.clone();
                match tokio::task::spawn_blocking(move || mailer.send(&email)).await {
                    Ok(Ok(())) => tracing::debug!("Sent email to {to}"),
                    Ok(Err(err)) => tracing::warn!("Failed to send email to {to}: {err:#}"),
                    Err(err) => tracing::warn!("Email task for {to} failed: {err}"),
                }
            }
        });

        Self { tx }
    }

    pub fn enqueue(&self, emails: Vec<OutboundEmail>) {
        for email in emails {
            if let Err(err) = self.tx.try_send(email) {
                tracing::warn!("Dropping email, queue unavailable: {err}");
            }
        }
    }
}
