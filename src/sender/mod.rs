/*
 * Copyright Stalwart Labs Ltd.
 *
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 */

use std::fmt::Display;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::{SmtpClient, SmtpClientBuilder};

use self::{
    config::{ConfigError, Settings, REQUIRED_VARS},
    message::TestMessage,
};

pub mod config;
pub mod message;

/// Outcome of a failed send attempt.
#[derive(Debug)]
pub enum SendError {
    /// Settings were missing or invalid, nothing was sent over the network.
    Configuration(ConfigError),

    /// Connecting, authenticating or submitting the message failed.
    Transport(crate::Error),
}

/// Sends the test message using the settings found in the process environment.
pub async fn send_test_email() -> Result<(), SendError> {
    send_test_email_with(|name| std::env::var(name).ok()).await
}

/// Sends the test message using settings resolved through `lookup`.
pub async fn send_test_email_with(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), SendError> {
    let settings = Settings::from_lookup(lookup)?;
    let message = TestMessage::new(&settings.username, &settings.recipient);

    println!("Connecting to {}:{}...", settings.host, settings.port);
    let client = SmtpClientBuilder::new(settings.host.as_str(), settings.port)
        .connect()
        .await?;

    deliver(client, &settings, message).await
}

/// Authenticates, submits `message` and closes the session.
///
/// The session is dropped, and the connection closed, on every error path.
pub async fn deliver<T: AsyncRead + AsyncWrite + Unpin>(
    mut client: SmtpClient<T, smtp_proto::EhloResponse<String>>,
    settings: &Settings,
    message: TestMessage<'_>,
) -> Result<(), SendError> {
    println!("Logging in to the SMTP server...");
    client.authenticate(&settings.credentials()).await?;

    println!("Sending e-mail...");
    client.send(message).await?;

    if let Err(err) = client.quit().await {
        // The message was already accepted.
        log::debug!("QUIT failed after delivery: {err}");
    }

    Ok(())
}

/// Prints the final status line for a send attempt.
pub fn report(result: &Result<(), SendError>) {
    match result {
        Ok(()) => println!("✅ E-mail sent successfully!"),
        Err(SendError::Configuration(ConfigError::Missing(names))) => {
            println!("ERROR: missing settings: {}", names.join(", "));
            println!("Make sure {} are all set.", REQUIRED_VARS.join(", "));
        }
        Err(err) => println!("❌ Failed to send e-mail: {err}"),
    }
}

impl std::error::Error for SendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SendError::Configuration(e) => Some(e),
            SendError::Transport(e) => Some(e),
        }
    }
}

impl Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendError::Configuration(e) => e.fmt(f),
            SendError::Transport(e) => e.fmt(f),
        }
    }
}

impl From<ConfigError> for SendError {
    fn from(err: ConfigError) -> Self {
        SendError::Configuration(err)
    }
}

impl From<crate::Error> for SendError {
    fn from(err: crate::Error) -> Self {
        SendError::Transport(err)
    }
}
