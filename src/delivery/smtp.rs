use async_trait::async_trait;
use lettre::{
    transport::smtp::authentication::Credentials, AsyncSmtpTransport, AsyncTransport,
    Tokio1Executor,
};
use tracing::debug;

use super::{ComposedMessage, DeliveryError, MailTransport};
use crate::config::MailConfig;

const IMPLICIT_TLS_PORT: u16 = 465;

pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    /// Port 465 uses implicit TLS, any other port upgrades with STARTTLS.
    pub fn from_config(config: &MailConfig) -> Result<Self, DeliveryError> {
        let missing = |field: &str| DeliveryError::Config(format!("{field} is missing"));
        let host = config.host.as_deref().ok_or_else(|| missing("host"))?;
        let port = config.port.ok_or_else(|| missing("port"))?;
        let username = config.username.clone().ok_or_else(|| missing("username"))?;
        let password = config.password.clone().ok_or_else(|| missing("password"))?;

        let builder = if port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|err| DeliveryError::Config(err.to_string()))?;

        let transport = builder
            .port(port)
            .credentials(Credentials::new(username, password))
            .build();

        Ok(Self { transport })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, message: &ComposedMessage) -> Result<(), DeliveryError> {
        debug!(to = %message.to, "submitting message over smtp");
        self.transport
            .send(message.message.clone())
            .await
            .map_err(|err| DeliveryError::Transport(err.to_string()))?;
        Ok(())
    }
}
