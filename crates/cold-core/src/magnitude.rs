const SUFFIXES: [&str; 6] = ["", "k", "m", "b", "t", "q"];

/// Compact rendering of a large count: `1500` becomes `1k`, `2_750_000`
/// becomes `2m`.
///
/// Works on the decimal string, dropping three trailing digits per step, so the
/// mantissa is truncated rather than rounded (`1999` is `1k`). Past the last
/// suffix the mantissa is emitted as-is, however wide.
pub fn format_magnitude(value: u64) -> String {
    let mut digits = value.to_string();
    let mut index = 0;
    while digits.len() > 3 && index + 1 < SUFFIXES.len() {
        digits.truncate(digits.len() - 3);
        index += 1;
    }
    format!("{digits}{}", SUFFIXES[index])
}

/// Inverse of [`format_magnitude`] up to truncation: `"12k"` is `12_000`.
pub fn parse_magnitude(input: &str) -> Option<u64> {
    let input = input.trim();
    let split = input
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(input.len());
    let (mantissa, suffix) = input.split_at(split);
    let mantissa = mantissa.parse::<u64>().ok()?;
    let power = SUFFIXES.iter().position(|candidate| *candidate == suffix)?;
    let scale = 1000u64.checked_pow(u32::try_from(power).ok()?)?;
    mantissa.checked_mul(scale)
}

/// Full count with `,` between thousands groups: `3000` becomes `3,000`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
