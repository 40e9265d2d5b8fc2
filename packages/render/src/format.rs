//! Number and date formatting for display.

use chrono::NaiveDate;

/// Groups thousands with non-breaking spaces, as the Russian locale does.
#[must_use]
pub fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 * 2);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('\u{a0}');
        }
        out.push(c);
    }
    out
}

/// `25 000 000 чел.`
#[must_use]
pub fn people(n: u64) -> String {
    format!("{} чел.", group_digits(n))
}

/// `dd.mm.yyyy`
#[must_use]
pub fn date(d: NaiveDate) -> String {
    d.format("%d.%m.%Y").to_string()
}
