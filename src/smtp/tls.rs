/*
 * Copyright Stalwart Labs Ltd.
 *
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 */

use std::{convert::TryFrom, io, sync::Arc};

use rustls::{ClientConfig, ClientConnection, RootCertStore};
use rustls_pki_types::{ServerName, TrustAnchor};
use tokio::net::TcpStream;
use tokio_rustls::{client::TlsStream, TlsConnector};

use crate::{Error, SmtpClient};

impl SmtpClient<TcpStream> {
    /// Performs the TLS handshake on a freshly opened connection.
    pub async fn into_tls(
        self,
        tls_connector: &TlsConnector,
        hostname: &str,
    ) -> crate::Result<SmtpClient<TlsStream<TcpStream>>> {
        let server_name = ServerName::try_from(hostname)
            .map_err(|_| crate::Error::InvalidTLSName)?
            .to_owned();

        tokio::time::timeout(self.timeout, async {
            Ok(SmtpClient {
                stream: tls_connector
                    .connect(server_name, self.stream)
                    .await
                    .map_err(|err| {
                        let kind = err.kind();
                        if let Some(inner) = err.into_inner() {
                            match inner.downcast::<rustls::Error>() {
                                Ok(error) => Error::Tls(error),
                                Err(error) => Error::Io(io::Error::new(kind, error)),
                            }
                        } else {
                            Error::Io(io::Error::new(kind, "Unspecified"))
                        }
                    })?,
                timeout: self.timeout,
                capabilities: (),
            })
        })
        .await
        .map_err(|_| crate::Error::Timeout)?
    }
}

impl<U> SmtpClient<TlsStream<TcpStream>, U> {
    pub fn tls_connection(&self) -> &ClientConnection {
        self.stream.get_ref().1
    }
}

/// Builds a connector that verifies server certificates against the
/// Mozilla root program bundled in `webpki-roots`.
pub fn build_tls_connector() -> TlsConnector {
    let mut root_cert_store = RootCertStore::empty();

    root_cert_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| TrustAnchor {
        subject: ta.subject.clone(),
        subject_public_key_info: ta.subject_public_key_info.clone(),
        name_constraints: ta.name_constraints.clone(),
    }));

    let config = ClientConfig::builder()
        .with_root_certificates(root_cert_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use tokio::net::{TcpListener, TcpStream};

    use crate::SmtpClient;

    use super::build_tls_connector;

    #[tokio::test]
    async fn invalid_tls_name() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let stream = TcpStream::connect(listener.local_addr().unwrap())
            .await
            .unwrap();
        let client = SmtpClient {
            stream,
            timeout: Duration::from_secs(5),
            capabilities: (),
        };

        assert!(matches!(
            client
                .into_tls(&build_tls_connector(), "not a host name")
                .await,
            Err(crate::Error::InvalidTLSName)
        ));
    }

    #[tokio::test]
    async fn handshake_with_plaintext_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;

            let (mut socket, _) = listener.accept().await.unwrap();
            // A relay speaking plaintext SMTP on the implicit TLS port
            let _ = socket
                .write_all(b"220 relay.example.com ESMTP ready\r\n")
                .await;
        });

        let client = SmtpClient {
            stream: TcpStream::connect(addr).await.unwrap(),
            timeout: Duration::from_secs(5),
            capabilities: (),
        };
        let result = client.into_tls(&build_tls_connector(), "localhost").await;
        assert!(
            matches!(result, Err(crate::Error::Tls(_)) | Err(crate::Error::Io(_))),
            "unexpected result: {:?}",
            result.err()
        );
        server.await.unwrap();
    }
}
