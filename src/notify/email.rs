// src/notify/email.rs
use anyhow::{anyhow, Context, Result};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Message, Tokio1Executor};

use super::{load_inline_images, LoadedImage, Notifier};
use crate::config::EmailConfig;
use crate::report::Report;

const STARTTLS_PORT: u16 = 587;

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailNotifier {
    pub fn from_config(cfg: &EmailConfig) -> Result<Self> {
        let password = cfg
            .password
            .as_ref()
            .ok_or_else(|| anyhow!("SMTP password missing"))?;
        let creds = Credentials::new(cfg.login().to_string(), password.expose().to_string());

        // 465 is implicit TLS; 587 upgrades with STARTTLS.
        let relay = if cfg.smtp_port == STARTTLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host)
        };
        let builder = relay.with_context(|| format!("invalid SMTP host {}", cfg.smtp_host))?;
        let mailer = builder.port(cfg.smtp_port).credentials(creds).build();

        let from: Mailbox = cfg
            .from
            .parse()
            .with_context(|| format!("invalid sender address {}", cfg.from))?;
        let to = cfg
            .to
            .iter()
            .map(|addr| {
                addr.parse::<Mailbox>()
                    .with_context(|| format!("invalid recipient address {addr}"))
            })
            .collect::<Result<Vec<_>>>()?;
        if to.is_empty() {
            return Err(anyhow!("no email recipients configured"));
        }

        Ok(Self { mailer, from, to })
    }

    pub fn build_message(&self, report: &Report, images: Vec<LoadedImage>) -> Result<Message> {
        build_message(&self.from, &self.to, report, images)
    }
}

/// `multipart/alternative(text, multipart/related(html, images...))`.
pub fn build_message(
    from: &Mailbox,
    to: &[Mailbox],
    report: &Report,
    images: Vec<LoadedImage>,
) -> Result<Message> {
    let mut related = MultiPart::related().singlepart(SinglePart::html(report.html.clone()));
    for img in images {
        let content_type = ContentType::parse(img.content_type)
            .map_err(|e| anyhow!("content type {}: {e}", img.content_type))?;
        related = related.singlepart(Attachment::new_inline(img.content_id).body(img.bytes, content_type));
    }
    let body = MultiPart::alternative()
        .singlepart(SinglePart::plain(report.text.clone()))
        .multipart(related);

    let mut builder = Message::builder().from(from.clone()).subject(report.subject.clone());
    for rcpt in to {
        builder = builder.to(rcpt.clone());
    }
    builder.multipart(body).context("build email")
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn deliver(&self, report: &Report) -> Result<()> {
        let images = load_inline_images(report).await;
        tracing::info!(
            recipients = self.to.len(),
            attachments = images.len(),
            "sending email report"
        );
        let msg = self.build_message(report, images)?;
        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_carries_text_html_and_inline_images() {
        let report = Report {
            subject: "Daily Dog Report".into(),
            html: "<html><body><img src=\"cid:A1_new\"></body></html>".into(),
            text: "1 new dogs".into(),
            inline_images: vec![],
        };
        let images = vec![LoadedImage {
            content_id: "A1_new".into(),
            content_type: "image/png",
            bytes: vec![0x89, b'P', b'N', b'G'],
        }];
        let from: Mailbox = "Shelter Watch <watch@example.org>".parse().unwrap();
        let to: Vec<Mailbox> = vec!["a@example.org".parse().unwrap()];

        let msg = build_message(&from, &to, &report, images).unwrap();
        let raw = String::from_utf8_lossy(&msg.formatted()).to_string();
        assert!(raw.contains("Subject: Daily Dog Report"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("multipart/related"));
        assert!(raw.contains("Content-ID: <A1_new>"));
        assert!(raw.contains("image/png"));
    }
}
