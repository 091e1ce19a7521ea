use anyhow::Context;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use uuid::Uuid;

use crate::config::Config;

const PLATFORM_NAME: &str = "Reserva";

pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailService {
    /// Returns None if SMTP is not fully configured.
    pub fn new(config: &Config) -> Option<Self> {
        let host = config.smtp_host.as_deref()?;
        let username = config.smtp_username.clone()?;
        let password = config.smtp_password.clone()?;
        let from_addr = config.smtp_from.as_deref()?;

        let port = config.smtp_port.unwrap_or(587);
        let creds = Credentials::new(username, password);

        let transport = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .ok()?
                .credentials(creds)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .ok()?
                .credentials(creds)
                .build()
        };

        let from: Mailbox = from_addr.parse().ok()?;

        Some(Self { transport, from })
    }

    // ─── Private helpers ─────────────────────────────────────────────────────

    fn new_message_id(&self) -> String {
        format!("<{}@{}>", Uuid::new_v4(), self.from.email.domain())
    }

    fn recipient(to_name: &str, to_email: &str) -> anyhow::Result<Mailbox> {
        format!("{to_name} <{to_email}>")
            .parse()
            .or_else(|_| to_email.parse())
            .with_context(|| format!("Invalid recipient address: {to_email}"))
    }

    /// Wraps inner HTML content in a consistent branded email layout.
    fn wrap_html(content: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width,initial-scale=1">
  <title>{PLATFORM_NAME}</title>
</head>
<body style="margin:0;padding:0;background-color:#f1f5f9;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,Helvetica,Arial,sans-serif">
  <table role="presentation" width="100%" cellpadding="0" cellspacing="0" style="background-color:#f1f5f9;padding:40px 16px">
    <tr>
      <td align="center">
        <table role="presentation" width="100%" cellpadding="0" cellspacing="0" style="max-width:520px">
          <tr>
            <td align="center" style="padding-bottom:28px">
              <p style="margin:0;font-size:20px;font-weight:700;color:#0f172a;text-align:center">{PLATFORM_NAME}</p>
            </td>
          </tr>
          <tr>
            <td style="background:#ffffff;border-radius:12px;padding:40px;box-shadow:0 1px 3px rgba(0,0,0,0.08),0 8px 24px rgba(0,0,0,0.04)">
              {content}
            </td>
          </tr>
          <tr>
            <td align="center" style="padding-top:20px">
              <p style="margin:0;font-size:12px;color:#94a3b8">{PLATFORM_NAME}</p>
            </td>
          </tr>
        </table>
      </td>
    </tr>
  </table>
</body>
</html>"#
        )
    }

    async fn send_email(
        &self,
        to: Mailbox,
        subject: &str,
        text: &str,
        html: &str,
    ) -> anyhow::Result<()> {
        let email = Message::builder()
            .message_id(Some(self.new_message_id()))
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html.to_string()),
                    ),
            )
            .context("Failed to build email message")?;

        self.transport
            .send(email)
            .await
            .context("Failed to send email")?;

        Ok(())
    }

    // ─── Public methods ───────────────────────────────────────────────────────

    /// One-time delivery of an admin PIN. The plaintext exists only in
    /// this message and in memory during the request that generated it.
    pub async fn send_admin_pin(
        &self,
        to_email: &str,
        to_name: &str,
        role: &str,
        pin: &str,
    ) -> anyhow::Result<()> {
        let to = Self::recipient(to_name, to_email)?;

        let subject = format!("Your {PLATFORM_NAME} admin access PIN");

        let text = format!(
            "Hello {to_name},\n\n\
            You have been granted the {role} role on {PLATFORM_NAME}.\n\n\
            Your admin PIN is: {pin}\n\n\
            You will need this PIN together with your password to sign in to the\n\
            admin area. Keep it private; it cannot be recovered, only reissued.\n\n\
            If you were not expecting this, contact your administrator."
        );

        let content = format!(
            r#"<h1 style="margin:0 0 8px 0;font-size:22px;font-weight:700;color:#0f172a">Admin access granted</h1>
<p style="margin:0 0 24px 0;font-size:15px;color:#64748b;line-height:1.6">Hello <strong style="color:#334155">{to_name}</strong>,<br><br>You have been granted the <strong style="color:#334155">{role}</strong> role. Your admin PIN:</p>
<table role="presentation" width="100%" cellpadding="0" cellspacing="0" style="margin-bottom:24px">
  <tr>
    <td align="center" style="background:#f8fafc;border-radius:10px;border:1px solid #e2e8f0;padding:24px 16px">
      <span style="font-size:44px;font-weight:800;letter-spacing:14px;color:#0f172a;font-variant-numeric:tabular-nums">{pin}</span>
    </td>
  </tr>
</table>
<p style="margin:0;font-size:13px;color:#94a3b8;border-top:1px solid #f1f5f9;padding-top:20px;line-height:1.5">You will need this PIN together with your password to sign in to the admin area. Keep it private; it cannot be recovered, only reissued.</p>"#
        );

        let html = Self::wrap_html(&content);
        self.send_email(to, &subject, &text, &html).await
    }

    pub async fn send_role_revoked_notice(
        &self,
        to_email: &str,
        to_name: &str,
        previous_role: &str,
    ) -> anyhow::Result<()> {
        let to = Self::recipient(to_name, to_email)?;

        let subject = format!("Your {PLATFORM_NAME} admin access has been removed");

        let text = format!(
            "Hello {to_name},\n\n\
            Your {previous_role} role on {PLATFORM_NAME} has been revoked and all\n\
            of your admin sessions have been signed out.\n\n\
            Your regular account is unaffected. If you believe this is a mistake,\n\
            contact your administrator."
        );

        let content = format!(
            r#"<h1 style="margin:0 0 8px 0;font-size:22px;font-weight:700;color:#0f172a">Admin access removed</h1>
<p style="margin:0 0 28px 0;font-size:15px;color:#64748b;line-height:1.6">Hello <strong style="color:#334155">{to_name}</strong>,<br><br>Your <strong style="color:#334155">{previous_role}</strong> role has been revoked and all of your admin sessions have been signed out.</p>
<p style="margin:0;font-size:13px;color:#94a3b8;border-top:1px solid #f1f5f9;padding-top:20px;line-height:1.5">Your regular account is unaffected. If you believe this is a mistake, contact your administrator.</p>"#
        );

        let html = Self::wrap_html(&content);
        self.send_email(to, &subject, &text, &html).await
    }

    /// Sent before a deletion mutates the account, since a hard delete
    /// leaves no address to notify afterwards.
    pub async fn send_account_deletion_notice(
        &self,
        to_email: &str,
        to_name: &str,
        mode: &str,
    ) -> anyhow::Result<()> {
        let to = Self::recipient(to_name, to_email)?;

        let subject = format!("Your {PLATFORM_NAME} account is being removed");

        let action = match mode {
            "soft" => "deactivated",
            "anonymize" => "anonymized",
            _ => "permanently deleted",
        };

        let text = format!(
            "Hello {to_name},\n\n\
            Your {PLATFORM_NAME} account is being {action} at the request of an\n\
            administrator.\n\n\
            If you believe this is a mistake, reply to this message or contact\n\
            support as soon as possible."
        );

        let content = format!(
            r#"<h1 style="margin:0 0 8px 0;font-size:22px;font-weight:700;color:#0f172a">Account removal</h1>
<p style="margin:0 0 28px 0;font-size:15px;color:#64748b;line-height:1.6">Hello <strong style="color:#334155">{to_name}</strong>,<br><br>Your account is being <strong style="color:#334155">{action}</strong> at the request of an administrator.</p>
<p style="margin:0;font-size:13px;color:#94a3b8;border-top:1px solid #f1f5f9;padding-top:20px;line-height:1.5">If you believe this is a mistake, reply to this message or contact support as soon as possible.</p>"#
        );

        let html = Self::wrap_html(&content);
        self.send_email(to, &subject, &text, &html).await
    }
}
