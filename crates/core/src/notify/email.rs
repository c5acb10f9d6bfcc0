use crate::config::Settings;
use crate::notify::format::markdown_to_html;
use crate::notify::{Notification, Notifier, NotifyOutcome};
use anyhow::Context;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// SMTP delivery of a plain-text/HTML alternative message.
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let host = settings.require_smtp_host()?;
        let from: Mailbox = settings
            .require_sender_email()?
            .parse()
            .context("SENDER_EMAIL is not a valid mailbox")?;
        let to: Mailbox = settings
            .require_receiver_email()?
            .parse()
            .context("RECEIVER_EMAIL is not a valid mailbox")?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .with_context(|| format!("failed to configure SMTP relay {host}"))?;
        if let Some(port) = std::env::var("SMTP_PORT").ok().and_then(|s| s.parse::<u16>().ok()) {
            builder = builder.port(port);
        }
        if let (Some(user), Some(pass)) = (&settings.smtp_username, &settings.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            to,
        })
    }

    fn build_message(&self, notification: &Notification) -> anyhow::Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(notification.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                notification.body_markdown.clone(),
                markdown_to_html(&notification.body_markdown),
            ))
            .context("failed to build email")
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, notification: &Notification) -> NotifyOutcome {
        let message = match self.build_message(notification) {
            Ok(m) => m,
            Err(err) => {
                return NotifyOutcome::Failed {
                    reason: format!("{err:#}"),
                }
            }
        };

        match self.transport.send(message).await {
            Ok(_) => {
                tracing::info!(ticker = %notification.ticker, proposal = %notification.proposal, "email sent");
                NotifyOutcome::Delivered
            }
            Err(err) => NotifyOutcome::Failed {
                reason: format!("smtp send failed: {err}"),
            },
        }
    }
}
