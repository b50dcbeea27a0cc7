//! Message ids and order numbers.
//!
//! msgID   = yyyyMMddHHmmss + 4 random digits
//! orderNO = yyyyMMddHHmmssSSS + last 3 chars of appID + 6 random digits

use chrono::{Local, NaiveDateTime};
use rand::Rng;

pub fn message_id() -> String {
    message_id_at(Local::now().naive_local(), &mut rand::thread_rng())
}

pub fn message_id_at<R: Rng + ?Sized>(now: NaiveDateTime, rng: &mut R) -> String {
    format!("{}{}", now.format("%Y%m%d%H%M%S"), random_digits(rng, 4))
}

pub fn order_no(app_id: &str) -> String {
    order_no_at(Local::now().naive_local(), app_id, &mut rand::thread_rng())
}

pub fn order_no_at<R: Rng + ?Sized>(now: NaiveDateTime, app_id: &str, rng: &mut R) -> String {
    format!(
        "{}{}{}",
        now.format("%Y%m%d%H%M%S%3f"),
        last_chars(app_id, 3),
        random_digits(rng, 6)
    )
}

fn last_chars(s: &str, n: usize) -> &str {
    match s.char_indices().rev().nth(n.saturating_sub(1)) {
        Some((idx, _)) if n > 0 => &s[idx..],
        _ if n == 0 => "",
        _ => s,
    }
}

fn random_digits<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
