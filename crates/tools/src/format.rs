//! Indonesian-locale formatting for lookup results.

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};

const MONTHS: [&str; 12] = [
    "Januari", "Februari", "Maret", "April", "Mei", "Juni", "Juli", "Agustus", "September", "Oktober",
    "November", "Desember",
];

fn month_name(month: u32) -> &'static str {
    MONTHS.get(month.saturating_sub(1) as usize).copied().unwrap_or("")
}

/// `18 September 2025`
pub fn date(d: NaiveDate) -> String {
    format!("{} {} {}", d.day(), month_name(d.month()), d.year())
}

/// `16 September 2025 pukul 14:30` (UTC)
pub fn datetime(dt: DateTime<Utc>) -> String {
    format!(
        "{} {} {} pukul {:02}:{:02}",
        dt.day(),
        month_name(dt.month()),
        dt.year(),
        dt.hour(),
        dt.minute()
    )
}

/// `Rp 18.500.000`; fractional rupiah are rounded away.
pub fn rupiah(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    if rounded < 0 {
        format!("-Rp {grouped}")
    } else {
        format!("Rp {grouped}")
    }
}
