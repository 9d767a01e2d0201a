/*
 * Copyright Stalwart Labs Ltd.
 *
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 */

use smtp_test_mail::{report, send_test_email};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    println!("--- SMTP test e-mail ---");

    // Variables already set in the environment win over .env
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            eprintln!("Ignoring unreadable .env file: {err}");
        }
    }
    env_logger::init();

    let result = send_test_email().await;
    if let Err(err) = &result {
        log::debug!("send failed: {err:?}");
    }
    report(&result);
}
