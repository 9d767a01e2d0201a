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

use std::borrow::Cow;

use mail_builder::{
    headers::{address::Address, HeaderType},
    MessageBuilder,
};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::SmtpClient;

/// SMTP envelope plus the raw RFC 5322 message.
#[derive(Debug, Default, Clone)]
pub struct Message<'x> {
    pub mail_from: Cow<'x, str>,
    pub rcpt_to: Vec<Cow<'x, str>>,
    pub body: Cow<'x, [u8]>,
}

impl<'x> Message<'x> {
    /// Create a new message
    pub fn new<T, U, V>(from: T, to: U, body: V) -> Self
    where
        T: Into<Cow<'x, str>>,
        U: IntoIterator<Item = T>,
        V: Into<Cow<'x, [u8]>>,
    {
        Message {
            mail_from: from.into(),
            rcpt_to: to.into_iter().map(Into::into).collect(),
            body: body.into(),
        }
    }
}

pub trait IntoMessage<'x> {
    fn into_message(self) -> crate::Result<Message<'x>>;
}

impl<'x> IntoMessage<'x> for Message<'x> {
    fn into_message(self) -> crate::Result<Message<'x>> {
        if self.mail_from.trim().is_empty() {
            return Err(crate::Error::MissingMailFrom);
        }
        if self.rcpt_to.iter().all(|rcpt| rcpt.trim().is_empty()) {
            return Err(crate::Error::MissingRcptTo);
        }
        Ok(self)
    }
}

/// Takes the envelope from the From, To, Cc and Bcc headers.
impl<'x> IntoMessage<'x> for MessageBuilder<'_> {
    fn into_message(self) -> crate::Result<Message<'x>> {
        let mut mail_from = None;
        let mut rcpt_to = Vec::new();

        for (key, value) in self.headers.iter() {
            if key.eq_ignore_ascii_case("from") {
                if let Some(HeaderType::Address(Address::Address(addr))) = Some(value) {
                    let email = addr.email.trim();
                    if !email.is_empty() {
                        mail_from = Some(email.to_string());
                    }
                }
            } else if key.eq_ignore_ascii_case("to")
                || key.eq_ignore_ascii_case("cc")
                || key.eq_ignore_ascii_case("bcc")
            {
                if let HeaderType::Address(addr) = value {
                    collect_recipients(addr, &mut rcpt_to);
                }
            }
        }

        let mail_from = mail_from.ok_or(crate::Error::MissingMailFrom)?;
        if rcpt_to.is_empty() {
            return Err(crate::Error::MissingRcptTo);
        }

        Ok(Message::new(mail_from, rcpt_to, self.write_to_vec()?))
    }
}

fn collect_recipients(addr: &Address<'_>, rcpt_to: &mut Vec<String>) {
    match addr {
        Address::Address(addr) => {
            let email = addr.email.trim();
            if !email.is_empty() && !rcpt_to.iter().any(|rcpt| rcpt == email) {
                rcpt_to.push(email.to_string());
            }
        }
        Address::Group(group) => {
            for addr in &group.addresses {
                collect_recipients(addr, rcpt_to);
            }
        }
        Address::List(list) => {
            for addr in list {
                collect_recipients(addr, rcpt_to);
            }
        }
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin, U> SmtpClient<T, U> {
    /// Sends a message to the server.
    pub async fn send<'x>(&mut self, message: impl IntoMessage<'x>) -> crate::Result<()> {
        let message = message.into_message()?;
        log::debug!(
            "Sending {} bytes from <{}> to {} recipient(s)",
            message.body.len(),
            message.mail_from,
            message.rcpt_to.len()
        );

        self.mail_from(&message.mail_from).await?;
        for rcpt in &message.rcpt_to {
            self.rcpt_to(rcpt).await?;
        }
        self.data(message.body.as_ref()).await
    }
}
