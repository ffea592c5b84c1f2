use serde_json::Value;

/// Keys tried in order when printing the single headline value. Results that
/// carry a more specific answer (balance, outcome) list it ahead of the
/// payment they also report.
const PRIORITY_KEYS: [&str; 7] = [
    "payment_due",
    "remaining_balance",
    "outcome",
    "payment",
    "term_years",
    "annual_rate",
    "difference",
];

/// Print just the key answer value from the output.
///
/// Looks for well-known result fields in order of priority, then falls back
/// to the first field in the result object.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_line(value));
}

fn minimal_line(value: &Value) -> String {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        for key in &PRIORITY_KEYS {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    // Term adjustments: the outcome alone hides the new term.
                    if *key == "outcome" {
                        if let Some(term) = map.get("term_years").and_then(Value::as_u64) {
                            return format!("{}, {} years", format_minimal(val), term);
                        }
                    }
                    return format_minimal(val);
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            return format!("{}: {}", key, format_minimal(val));
        }
    }

    format_minimal(result_obj)
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
