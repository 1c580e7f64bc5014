use serde_json::Value;

/// Column-name fragments that mark a field as a money amount.
const MONEY_HINTS: &[&str] = &[
    "salary",
    "compensation",
    "bonus",
    "stipend",
    "wage",
    "pay",
    "amount",
    "incentive",
    "allowance",
];

/// Groups digits in threes and keeps at most three fraction digits,
/// e.g. `280000` -> `280,000`, `1234.5678` -> `1,234.568`, `0.8` -> `0.8`.
pub fn format_grouped(n: f64) -> String {
    let fixed = format!("{:.3}", n.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut out = String::new();
    if n < 0.0 && (int_part != "0" || !frac_part.is_empty()) {
        out.push('-');
    }
    out.push_str(&group_digits(int_part));
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

/// USD with two decimals, e.g. `$280,000.00`.
pub fn format_currency(n: f64) -> String {
    let fixed = format!("{:.2}", n.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if n < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}${}.{}", sign, group_digits(int_part), frac_part)
}

fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// True when the last word of the column name is a money hint, so
/// `baseSalary` and `signing_bonus` match but `payPeriodsPerYear` does not.
pub fn is_money_column(column: &str) -> bool {
    column_words(column)
        .last()
        .map(|word| {
            let word = word.trim_end_matches(|c: char| c.is_ascii_digit());
            MONEY_HINTS.contains(&word)
        })
        .unwrap_or(false)
}

/// Lower-cased words of a camelCase, snake_case or kebab-case name.
fn column_words(column: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in column.chars() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.extend(ch.to_lowercase());
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Display form for collected block items: numbers grouped, everything else
/// in its string form.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Number(n) => n.as_f64().map(format_grouped).unwrap_or_else(|| n.to_string()),
        other => plain_value(other),
    }
}

/// Display form for a directly mapped field.
pub fn plain_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Display form for a field substituted into a template. Money columns with a
/// numeric value become currency.
pub fn field_value(column: &str, value: &Value) -> String {
    if is_money_column(column) {
        let amount = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s
                .trim()
                .trim_start_matches('$')
                .replace(',', "")
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite()),
            _ => None,
        };
        if let Some(amount) = amount {
            return format_currency(amount);
        }
    }
    plain_value(value)
}
