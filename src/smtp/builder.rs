/*
 * Copyright Stalwart Labs Ltd.
 *
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 */

use std::time::Duration;

use smtp_proto::EhloResponse;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

use crate::{SmtpClient, SmtpClientBuilder};

use super::tls::build_tls_connector;

impl<T: AsRef<str>> SmtpClientBuilder<T> {
    pub fn new(hostname: T, port: u16) -> Self {
        SmtpClientBuilder {
            addr: format!("{}:{}", hostname.as_ref(), port),
            timeout: Duration::from_secs(60 * 60),
            tls_connector: build_tls_connector(),
            tls_hostname: hostname,
            local_host: gethostname::gethostname()
                .to_str()
                .unwrap_or("[127.0.0.1]")
                .to_string(),
        }
    }

    /// Set the EHLO hostname
    pub fn helo_host(mut self, host: impl Into<String>) -> Self {
        self.local_host = host.into();
        self
    }

    /// Sets the SMTP connection timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Connects over implicit TLS, reads the greeting and sends EHLO.
    pub async fn connect(
        &self,
    ) -> crate::Result<SmtpClient<TlsStream<TcpStream>, EhloResponse<String>>> {
        tokio::time::timeout(self.timeout, async {
            log::debug!("Connecting to {}", self.addr);
            let client = SmtpClient {
                stream: TcpStream::connect(&self.addr).await?,
                timeout: self.timeout,
                capabilities: (),
            };

            let client = client
                .into_tls(&self.tls_connector, self.tls_hostname.as_ref())
                .await?;
            log::debug!(
                "TLS established with {} ({:?})",
                self.addr,
                client.tls_connection().protocol_version()
            );

            client.handshake(&self.local_host).await
        })
        .await
        .map_err(|_| crate::Error::Timeout)?
    }
}
