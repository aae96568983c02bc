use serde_json::Value;

/// Print just the key answer value from the output.
///
/// For risk runs that is the VaR at each confidence level, one per line as
/// `confidence var`. Otherwise look for well-known fields in priority order,
/// then fall back to the first field.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(Value::Array(metrics)) = result_obj.get("metrics") {
        for m in metrics {
            println!(
                "{} {}",
                format_minimal(&m["confidence"]),
                format_minimal(&m["var"])
            );
        }
        return;
    }

    let priority_keys = ["var", "total_value", "results", "cholesky_lower"];

    if let Value::Object(map) = result_obj {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_minimal(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
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
