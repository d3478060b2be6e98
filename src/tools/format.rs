//! Number formatting for answer text and PDF pages

/// `$1,234,567`, rounded to whole dollars
pub fn format_usd(value: f64) -> String {
    let sign = if value < 0.0 && value.round() != 0.0 { "-" } else { "" };
    format!("{}${}", sign, group_thousands(value.abs().round() as u64))
}

/// `+$20,000` / `-$5,000`
pub fn format_signed_usd(value: f64) -> String {
    if value.round() > 0.0 {
        format!("+{}", format_usd(value))
    } else {
        format_usd(value)
    }
}

/// Round to one decimal; values that round to zero lose their sign
fn round_tenths(value: f64) -> f64 {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// `62.5%`, or `n/a` when undefined
pub fn format_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", round_tenths(v)),
        None => "n/a".to_string(),
    }
}

/// `+20.0%` / `-3.1%`, or `n/a`
pub fn format_signed_pct(value: Option<f64>) -> String {
    match value.map(round_tenths) {
        Some(v) if v > 0.0 => format!("+{:.1}%", v),
        other => format_pct(other),
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
