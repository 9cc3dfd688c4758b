//! # Amount in Words
//!
//! Spells out invoice amounts using the Indian numbering system.
//!
//! ```text
//!   1,23,45,678  →  One Crore Twenty Three Lakh Forty Five Thousand
//!                   Six Hundred Seventy Eight
//!
//!   group     magnitude
//!   Crore     1,00,00,000
//!   Lakh      1,00,000
//!   Thousand  1,000
//!   Hundred   100
//! ```
//!
//! Amounts of a hundred crore and above keep counting in crores
//! ("One Hundred Crore"); beyond 99,99,999 crore the word repeats per
//! position ("One Crore Crore").

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

const CRORE: u64 = 10_000_000;

/// Groups below a crore, largest first.
const GROUPS: [(u64, &str); 3] = [(100_000, "Lakh"), (1_000, "Thousand"), (100, "Hundred")];

const ONES: [&str; 20] = [
    "", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten", "Eleven",
    "Twelve", "Thirteen", "Fourteen", "Fifteen", "Sixteen", "Seventeen", "Eighteen", "Nineteen",
];

const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

fn push_below_hundred(n: u64, out: &mut Vec<&'static str>) {
    debug_assert!(n < 100);
    let n = n as usize;
    if n < 20 {
        if n > 0 {
            out.push(ONES[n]);
        }
    } else {
        out.push(TENS[n / 10]);
        if n % 10 > 0 {
            out.push(ONES[n % 10]);
        }
    }
}

fn push_below_crore(mut n: u64, out: &mut Vec<&'static str>) {
    for (magnitude, name) in GROUPS {
        let count = n / magnitude;
        if count > 0 {
            push_below_hundred(count, out);
            out.push(name);
            n %= magnitude;
        }
    }
    push_below_hundred(n, out);
}

/// Renders a whole amount in words.
///
/// ## Example
/// ```rust
/// use stockbook_core::words::render_amount_in_words;
///
/// assert_eq!(render_amount_in_words(0), "Zero");
/// assert_eq!(render_amount_in_words(100_000), "One Lakh");
/// assert_eq!(
///     render_amount_in_words(1_234_567),
///     "Twelve Lakh Thirty Four Thousand Five Hundred Sixty Seven"
/// );
/// ```
pub fn render_amount_in_words(amount: u64) -> String {
    if amount == 0 {
        return "Zero".to_string();
    }

    // base-crore digits, least significant first
    let mut chunks = Vec::new();
    let mut rest = amount;
    while rest > 0 {
        chunks.push(rest % CRORE);
        rest /= CRORE;
    }

    let mut words = Vec::new();
    for (position, chunk) in chunks.iter().enumerate().rev() {
        if *chunk == 0 {
            continue;
        }
        push_below_crore(*chunk, &mut words);
        words.extend(std::iter::repeat("Crore").take(position));
    }

    words.join(" ")
}

/// Renders a money amount the way it is printed on an invoice.
///
/// ```rust
/// use stockbook_core::words::render_money_in_words;
/// use stockbook_core::Money;
///
/// assert_eq!(
///     render_money_in_words(Money::from_paise(150_050)).unwrap(),
///     "Rupees One Thousand Five Hundred and Fifty Paise Only"
/// );
/// ```
///
/// ## Errors
/// [`CoreError::NegativeAmount`] for amounts below zero.
pub fn render_money_in_words(amount: Money) -> CoreResult<String> {
    if amount.is_negative() {
        return Err(CoreError::NegativeAmount(amount.to_string()));
    }

    let paise = amount.paise().unsigned_abs();
    let rupees = render_amount_in_words(paise / 100);

    Ok(match paise % 100 {
        0 => format!("Rupees {rupees} Only"),
        p => format!("Rupees {rupees} and {} Paise Only", render_amount_in_words(p)),
    })
}
