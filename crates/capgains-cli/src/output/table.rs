use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as tables using the tabled crate.
///
/// Scalar fields of the result go into one summary table; every nested
/// section (tax, indexation, compliance, ...) and every list of records
/// (lots, simulations) gets its own titled table.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => {
                print_sections(result);
                print_envelope(map);
            }
            _ => print_sections(map),
        },
        Value::Array(rows) => print_rows(rows),
        _ => println!("{}", value),
    }
}

fn print_sections(map: &Map<String, Value>) {
    let mut summary = Builder::default();
    summary.push_record(["Field", "Value"]);
    let mut has_summary = false;

    for (key, val) in map {
        if !matches!(val, Value::Object(_) | Value::Array(_)) {
            summary.push_record([key.as_str(), &format_value(val)]);
            has_summary = true;
        }
    }
    if has_summary {
        println!("{}", Table::from(summary));
    }

    for (key, val) in map {
        match val {
            Value::Object(section) => {
                println!("\n{}", title(key));
                print_key_values(section);
            }
            Value::Array(rows) if rows.iter().any(Value::is_object) => {
                println!("\n{}", title(key));
                print_rows(rows);
            }
            Value::Array(items) if !items.is_empty() => {
                println!("\n{}", title(key));
                for item in items {
                    println!("  - {}", format_value(item));
                }
            }
            _ => {}
        }
    }
}

fn print_key_values(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_rows(rows: &[Value]) {
    let Some(Value::Object(first)) = rows.iter().find(|r| r.is_object()) else {
        println!("(empty)");
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for item in rows {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
    }
    println!("{}", Table::from(builder));
}

fn print_envelope(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }
    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn title(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_titles() {
        assert_eq!(title("holding_period"), "Holding Period");
        assert_eq!(title("tax"), "Tax");
    }
}
