/*
 * Copyright Stalwart Labs Ltd.
 *
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 */

//! Scripted in-memory SMTP relay used by the test suite.

use std::{sync::Mutex, time::Duration};

use base64::{engine::general_purpose::STANDARD, Engine};
use smtp_proto::EhloResponse;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream},
    task::JoinHandle,
};

use crate::SmtpClient;

pub(crate) struct RelayBehavior {
    /// AUTH line advertised in the EHLO reply.
    pub auth: &'static str,
    pub username: &'static str,
    pub password: &'static str,
    pub reject_rcpt: bool,
}

impl Default for RelayBehavior {
    fn default() -> Self {
        RelayBehavior {
            auth: "AUTH PLAIN LOGIN",
            username: "tim",
            password: "tanstaaftanstaaf",
            reject_rcpt: false,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ReceivedMessage {
    pub mail_from: String,
    pub rcpt_to: Vec<String>,
    pub data: String,
}

#[derive(Debug, Default)]
pub(crate) struct Session {
    pub ehlo: Vec<String>,
    pub logins: Vec<(String, String)>,
    pub messages: Vec<ReceivedMessage>,
    pub quit: bool,
}

pub(crate) struct Relay {
    stream: Mutex<Option<DuplexStream>>,
    server: JoinHandle<Session>,
}

impl Relay {
    pub fn spawn(behavior: RelayBehavior) -> Self {
        let (local, remote) = tokio::io::duplex(64 * 1024);
        Relay {
            stream: Mutex::new(Some(local)),
            server: tokio::spawn(serve(remote, behavior)),
        }
    }

    /// Client end of the connection, before the greeting has been read.
    pub fn raw(&self) -> SmtpClient<DuplexStream> {
        SmtpClient {
            stream: self
                .stream
                .lock()
                .unwrap()
                .take()
                .expect("relay client already taken"),
            timeout: Duration::from_secs(30),
            capabilities: (),
        }
    }

    pub async fn client(&self) -> SmtpClient<DuplexStream, EhloResponse<String>> {
        self.raw().handshake("client.example.com").await.unwrap()
    }

    /// Waits for the client to hang up and returns what the relay saw.
    pub async fn finish(self) -> Session {
        self.server.await.unwrap()
    }
}

async fn serve(stream: DuplexStream, behavior: RelayBehavior) -> Session {
    let mut stream = BufReader::new(stream);
    let mut session = Session::default();
    let mut current = ReceivedMessage::default();

    reply(&mut stream, "220 relay.example.com ESMTP ready\r\n").await;

    while let Some(line) = read_line(&mut stream).await {
        let command = line.to_ascii_uppercase();

        if let Some(host) = command.strip_prefix("EHLO ") {
            session.ehlo.push(host.to_ascii_lowercase());
            reply(
                &mut stream,
                &format!(
                    "250-relay.example.com\r\n250-PIPELINING\r\n250 {}\r\n",
                    behavior.auth
                ),
            )
            .await;
        } else if command.starts_with("AUTH PLAIN ") {
            let decoded = STANDARD.decode(&line[11..]).unwrap_or_default();
            let decoded = String::from_utf8_lossy(&decoded).into_owned();
            let mut parts = decoded.split('\u{0}').skip(1);
            let username = parts.next().unwrap_or_default().to_string();
            let password = parts.next().unwrap_or_default().to_string();
            login(&mut stream, &mut session, &behavior, username, password).await;
        } else if command == "AUTH LOGIN" {
            reply(&mut stream, "334 VXNlcm5hbWU6\r\n").await;
            let username = read_base64(&mut stream).await;
            reply(&mut stream, "334 UGFzc3dvcmQ6\r\n").await;
            let password = read_base64(&mut stream).await;
            login(&mut stream, &mut session, &behavior, username, password).await;
        } else if command.starts_with("AUTH ") {
            reply(&mut stream, "504 5.5.4 Mechanism not supported\r\n").await;
        } else if command.starts_with("MAIL FROM:<") {
            current = ReceivedMessage {
                mail_from: angle_addr(&line),
                ..Default::default()
            };
            reply(&mut stream, "250 2.1.0 OK\r\n").await;
        } else if command.starts_with("RCPT TO:<") {
            if behavior.reject_rcpt {
                reply(&mut stream, "550 5.1.1 No such user\r\n").await;
            } else {
                current.rcpt_to.push(angle_addr(&line));
                reply(&mut stream, "250 2.1.5 OK\r\n").await;
            }
        } else if command == "DATA" {
            reply(&mut stream, "354 Start mail input\r\n").await;
            let mut data = String::new();
            loop {
                let mut line = String::new();
                if stream.read_line(&mut line).await.unwrap_or(0) == 0 || line == ".\r\n" {
                    break;
                }
                data.push_str(line.strip_prefix('.').unwrap_or(&line));
            }
            current.data = data;
            session.messages.push(std::mem::take(&mut current));
            reply(&mut stream, "250 2.0.0 Queued\r\n").await;
        } else if command == "RSET" {
            current = ReceivedMessage::default();
            reply(&mut stream, "250 2.0.0 OK\r\n").await;
        } else if command == "QUIT" {
            session.quit = true;
            reply(&mut stream, "221 2.0.0 Bye\r\n").await;
            break;
        } else {
            reply(&mut stream, "500 5.5.1 Unrecognized command\r\n").await;
        }
    }

    session
}

async fn login(
    stream: &mut BufReader<DuplexStream>,
    session: &mut Session,
    behavior: &RelayBehavior,
    username: String,
    password: String,
) {
    if username == behavior.username && password == behavior.password {
        session.logins.push((username, password));
        reply(stream, "235 2.7.0 Authentication successful\r\n").await;
    } else {
        reply(stream, "535 5.7.8 Authentication credentials invalid\r\n").await;
    }
}

async fn read_line(stream: &mut BufReader<DuplexStream>) -> Option<String> {
    let mut line = String::new();
    match stream.read_line(&mut line).await {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end().to_string()),
    }
}

async fn read_base64(stream: &mut BufReader<DuplexStream>) -> String {
    let line = read_line(stream).await.unwrap_or_default();
    String::from_utf8(STANDARD.decode(line).unwrap_or_default()).unwrap_or_default()
}

async fn reply(stream: &mut BufReader<DuplexStream>, text: &str) {
    // The client may already be gone.
    let _ = stream.get_mut().write_all(text.as_bytes()).await;
}

fn angle_addr(line: &str) -> String {
    line.split_once('<')
        .and_then(|(_, rest)| rest.split_once('>'))
        .map(|(addr, _)| addr.to_string())
        .unwrap_or_default()
}
