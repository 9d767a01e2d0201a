/*
 * Copyright Stalwart Labs Ltd. See the COPYING
 * file at the top-level directory of this distribution.
 *
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 */

//! # smtp-test-mail
//!
//! _smtp-test-mail_ checks that a set of SMTP relay credentials works by sending
//! a single, fixed plain-text message through the relay. It includes:
//!
//! - Configuration read from the process environment (`SMTP_SERVER`, `SMTP_PORT`,
//!   `SMTP_USERNAME`, `SMTP_PASSWORD` and `EMAIL_TO`), with an optional `.env` file.
//! - Simple Mail Transfer Protocol (**SMTP**; _RFC 5321_) submission over
//!   implicit **TLS** (_RFC 8314_), verified against the Web PKI roots.
//! - SMTP Service Extension for Authentication (_RFC 4954_) with automatic mechanism
//!   negotiation (from most secure to least secure):
//!   - CRAM-MD5 (_RFC 2195_)
//!   - LOGIN
//!   - PLAIN
//! - Full async (requires Tokio).
//!
//! ## Usage Example
//!
//! Send the test message using the settings found in the environment:
//!
//! ```rust
//!     let result = smtp_test_mail::send_test_email().await;
//!     smtp_test_mail::report(&result);
//! ```
//!
//! Or drive the SMTP client directly:
//!
//! ```rust
//!     let message = Message::new("john@example.com", ["jane@example.com"], raw_message);
//!
//!     let mut client = SmtpClientBuilder::new("smtp.example.com", 465)
//!         .connect()
//!         .await?;
//!     client.authenticate(&Credentials::new("john", "p4ssw0rd")).await?;
//!     client.send(message).await?;
//!     client.quit().await?;
//! ```
//!

pub mod sender;
pub mod smtp;

use std::{fmt::Display, time::Duration};

use smtp_proto::Response;
use tokio_rustls::TlsConnector;

pub use sender::{
    config::{ConfigError, Settings},
    message::TestMessage,
    report, send_test_email, send_test_email_with, SendError,
};
pub use smtp::{
    auth::Credentials,
    message::{IntoMessage, Message},
};

#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(std::io::Error),

    /// TLS error
    Tls(Box<rustls::Error>),

    /// Base64 decode error
    Base64(base64::DecodeError),

    /// SMTP authentication error.
    Auth(smtp::auth::Error),

    /// Failure parsing SMTP reply
    UnparseableReply,

    /// Unexpected SMTP reply.
    UnexpectedReply(Response<String>),

    /// SMTP authentication failure.
    AuthenticationFailed(Response<String>),

    /// Invalid TLS name provided.
    InvalidTLSName,

    /// Missing message sender.
    MissingMailFrom,

    /// Missing message recipients.
    MissingRcptTo,

    /// The server does no support any of the available authentication methods.
    UnsupportedAuthMechanism,

    /// Connection timeout.
    Timeout,
}

pub type Result<T> = std::result::Result<T, Error>;

/// SMTP client session.
pub struct SmtpClient<T, U = ()> {
    pub stream: T,
    pub timeout: Duration,
    pub capabilities: U,
}

/// Connection settings for a [`SmtpClient`].
#[derive(Clone)]
pub struct SmtpClientBuilder<T: AsRef<str>> {
    pub timeout: Duration,
    pub tls_connector: TlsConnector,
    pub tls_hostname: T,
    pub addr: String,
    pub local_host: String,
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Tls(e) => Some(e.as_ref()),
            Error::Base64(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Tls(e) => write!(f, "TLS error: {e}"),
            Error::Base64(e) => write!(f, "Base64 decode error: {e}"),
            Error::Auth(e) => write!(f, "SMTP authentication error: {e}"),
            Error::UnparseableReply => write!(f, "Unparseable SMTP reply"),
            Error::UnexpectedReply(e) => {
                write!(f, "Unexpected reply: {} {}", e.code(), e.message())
            }
            Error::AuthenticationFailed(e) => {
                write!(f, "Authentication failed: {} {}", e.code(), e.message())
            }
            Error::InvalidTLSName => write!(f, "Invalid TLS name provided"),
            Error::MissingMailFrom => write!(f, "Missing message sender"),
            Error::MissingRcptTo => write!(f, "Missing message recipients"),
            Error::UnsupportedAuthMechanism => write!(
                f,
                "The server does no support any of the available authentication methods"
            ),
            Error::Timeout => write!(f, "Connection timeout"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::Base64(err)
    }
}

impl From<smtp::auth::Error> for Error {
    fn from(err: smtp::auth::Error) -> Self {
        Error::Auth(err)
    }
}
