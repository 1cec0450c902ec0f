// src/services/formatting.rs

/// Groups an integer digit string the Indian way: last three digits, then pairs.
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);

    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}

/// Rupee amount with Indian digit grouping, e.g. `₹1,23,456.70`.
pub fn format_currency(amount: f64) -> String {
    let rounded = (amount * 100.0).round() / 100.0;
    let sign = if rounded < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", rounded.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    format!("{}₹{}.{}", sign, group_indian(whole), fraction)
}

/// Two-decimal percentage, `+` prefixed when positive.
pub fn format_percent(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded > 0.0 {
        format!("+{:.2}%", rounded)
    } else if rounded < 0.0 {
        format!("{:.2}%", rounded)
    } else {
        "0.00%".to_string()
    }
}
