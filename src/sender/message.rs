/*
 * Copyright Stalwart Labs Ltd.
 *
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 */

use mail_builder::MessageBuilder;

use crate::{IntoMessage, Message};

pub const SUBJECT: &str = "SMTP relay test message";

/// Exact text the relay receives as the message body on every run.
pub const BODY: &str = "\
Hello!

This is a test e-mail sent by smtp-test-mail over SMTP.

If you are reading this, the relay settings are working.

Regards,
smtp-test-mail
";

/// The fixed test message, addressed from the relay account to the
/// configured recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestMessage<'x> {
    pub from: &'x str,
    pub to: &'x str,
    pub subject: &'static str,
    pub body: &'static str,
}

impl<'x> TestMessage<'x> {
    pub fn new(from: &'x str, to: &'x str) -> Self {
        TestMessage {
            from,
            to,
            subject: SUBJECT,
            body: BODY,
        }
    }

    /// Builds the RFC 5322 message, envelope taken from its From and To headers.
    pub fn builder(&self) -> MessageBuilder<'x> {
        MessageBuilder::new()
            .from(self.from)
            .to(self.to)
            .subject(self.subject)
            .text_body(self.body)
    }
}

impl<'x> IntoMessage<'x> for TestMessage<'x> {
    fn into_message(self) -> crate::Result<Message<'x>> {
        self.builder().into_message()
    }
}
