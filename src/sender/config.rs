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

use crate::Credentials;

pub const SMTP_SERVER: &str = "SMTP_SERVER";
pub const SMTP_PORT: &str = "SMTP_PORT";
pub const SMTP_USERNAME: &str = "SMTP_USERNAME";
pub const SMTP_PASSWORD: &str = "SMTP_PASSWORD";
pub const EMAIL_TO: &str = "EMAIL_TO";

/// Every variable the sender needs, in the order they are reported.
pub const REQUIRED_VARS: [&str; 5] = [
    SMTP_SERVER,
    SMTP_PORT,
    SMTP_USERNAME,
    SMTP_PASSWORD,
    EMAIL_TO,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// One or more required variables are unset or empty.
    Missing(Vec<&'static str>),

    /// `SMTP_PORT` is not a port number.
    InvalidPort(String),
}

/// Relay settings read from the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub recipient: String,
}

impl Settings {
    /// Reads the settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the settings through `lookup`, failing before any I/O if a
    /// variable is missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut values = Vec::with_capacity(REQUIRED_VARS.len());
        let mut missing = Vec::new();

        for name in REQUIRED_VARS {
            match lookup(name).filter(|value| !value.is_empty()) {
                Some(value) => values.push(value),
                None => missing.push(name),
            }
        }

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let [host, port, username, password, recipient]: [String; 5] = values
            .try_into()
            .map_err(|_| ConfigError::Missing(REQUIRED_VARS.to_vec()))?;
        let port = match port.trim().parse::<u16>() {
            Ok(port) if port != 0 => port,
            _ => return Err(ConfigError::InvalidPort(port)),
        };

        Ok(Settings {
            host,
            port,
            username,
            password,
            recipient,
        })
    }

    pub fn credentials(&self) -> Credentials<'_> {
        Credentials::new(self.username.as_str(), self.password.as_str())
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("recipient", &self.recipient)
            .finish()
    }
}

impl std::error::Error for ConfigError {}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(names) => {
                write!(f, "Missing configuration: {}", names.join(", "))
            }
            ConfigError::InvalidPort(port) => {
                write!(f, "Invalid {SMTP_PORT} value {port:?}, expected a port number")
            }
        }
    }
}
