/// decimals used for every derived monetary figure
pub const MONEY_DECIMALS: u32 = 2;


/// rounds `value` to `decimals` places, halves going away from zero.
///
/// ## Note
/// values such as `2.675` are stored as `2.67499999...`, so the scaled value
/// gets a nudge of a few ulps before rounding. Otherwise 2.675 would become 2.67.
pub fn round_half_up(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() { return value }

    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    let nudge = scaled.abs() * f64::EPSILON * 4.0;
    (scaled + nudge.copysign(scaled)).round() / factor
}


pub fn round_money(value: f64) -> f64 { round_half_up(value, MONEY_DECIMALS) }


/// `1234567.891` -> `$1,234,567.89`
pub fn format_currency(value: f64) -> String {
    let rounded = format!("{:.2}", round_money(value).abs());
    let (whole, cents) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, digit) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 { grouped.push(','); }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && round_money(value) != 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}
