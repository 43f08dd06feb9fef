//! Engagement counter parsing

/// Parses a rendered engagement counter into an integer
///
/// Accepts plain integers (`"42"`), comma-grouped integers (`"12,345"`) and
/// suffixed abbreviations with one decimal of precision (`"1.2K"`, `"3M"`,
/// `"1.1B"`). Grouping commas are not accepted on abbreviations. Only the first whitespace-separated token is considered, so
/// `"1.2K Likes"` parses as 1200.
///
/// # Arguments
///
/// * `text` - Counter text as rendered
///
/// # Returns
///
/// * `Some(u64)` - Normalized count
/// * `None` - The text is not a recognizable count
///
/// # Example
///
/// ```
/// use timeline_trawler::extract::parse_count;
///
/// assert_eq!(parse_count("1.2K"), Some(1200));
/// assert_eq!(parse_count("12,345"), Some(12345));
/// assert_eq!(parse_count("n/a"), None);
/// ```
pub fn parse_count(text: &str) -> Option<u64> {
    let token = text.split_whitespace().next()?;

    let (number, multiplier) = match token.chars().last()? {
        'K' | 'k' => (&token[..token.len() - 1], 1_000u64),
        'M' | 'm' => (&token[..token.len() - 1], 1_000_000),
        'B' | 'b' => (&token[..token.len() - 1], 1_000_000_000),
        _ => (token, 1),
    };
    if multiplier != 1 && number.contains(',') {
        return None;
    }
    let number = number.replace(',', "");
    let number = number.as_str();

    let (whole, fraction) = match number.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (number, None),
    };

    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let whole: u64 = whole.parse().ok()?;
    let mut value = whole.checked_mul(multiplier)?;

    if let Some(fraction) = fraction {
        // A decimal point is only meaningful on abbreviated counts.
        if multiplier == 1 || fraction.len() != 1 {
            return None;
        }
        let tenths = fraction.chars().next()?.to_digit(10)?;
        value = value.checked_add(u64::from(tenths) * (multiplier / 10))?;
    }

    Some(value)
}
