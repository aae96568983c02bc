use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::csv_out::row_headers;

/// Format output as tables using the tabled crate.
///
/// Scalar fields go into one Field/Value table; every array of objects
/// (per-confidence metrics, per-asset summaries, percentile points) gets a
/// table of its own. Matrices are printed row by row.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_object(map);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    if let Value::Object(res_map) = result {
        print_object(res_map);
    } else {
        println!("{}", format_value(result));
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut nested: Vec<(&String, &Value)> = Vec::new();
    for (key, val) in map {
        if is_table_like(val) {
            nested.push((key, val));
        } else {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
    }
    println!("{}", Table::from(builder));

    for (key, val) in nested {
        println!("\n{}:", key);
        if let Value::Array(arr) = val {
            print_array_table(arr);
        }
    }
}

/// Arrays of objects and arrays of arrays.
fn is_table_like(value: &Value) -> bool {
    match value {
        Value::Array(arr) => matches!(arr.first(), Some(Value::Object(_)) | Some(Value::Array(_))),
        _ => false,
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    match arr.first() {
        Some(Value::Object(_)) => {
            let headers = row_headers(arr);
            let mut builder = Builder::default();
            builder.push_record(headers.iter().copied());
            for item in arr {
                if let Value::Object(map) = item {
                    let row: Vec<String> = headers
                        .iter()
                        .map(|h| map.get(*h).map(format_value).unwrap_or_default())
                        .collect();
                    builder.push_record(row);
                }
            }
            println!("{}", Table::from(builder));
        }
        Some(Value::Array(_)) => {
            let mut builder = Builder::default();
            for row in arr {
                if let Value::Array(cells) = row {
                    builder.push_record(cells.iter().map(format_value));
                }
            }
            println!("{}", Table::from(builder));
        }
        _ => {
            for item in arr {
                println!("{}", format_value(item));
            }
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
