use serde_json::Value;

/// Headline figures, most specific first, as JSON pointers into `result`.
const HEADLINE_POINTERS: [&str; 6] = [
    "/tax/total_liability",
    "/redemption_tax/total_tax",
    "/optimal_exit/exit_date",
    "/cost_inflation_index",
    "/fiscal_year",
    "/unindexed_gain",
];

/// Print just the headline answer.
///
/// A loss has no tax block, so for an asset report the unindexed gain is
/// printed instead of falling through to an unrelated field.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if result.get("is_loss").and_then(Value::as_bool) == Some(true) {
        if let Some(gain) = result.get("unindexed_gain") {
            println!("loss: {}", format_minimal(gain));
            return;
        }
    }

    for pointer in HEADLINE_POINTERS {
        if let Some(found) = result.pointer(pointer).filter(|v| !v.is_null()) {
            println!("{}", format_minimal(found));
            return;
        }
    }

    if let Some((key, val)) = result.as_object().and_then(|m| m.iter().next()) {
        println!("{}: {}", key, format_minimal(val));
        return;
    }
    println!("{}", format_minimal(result));
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
