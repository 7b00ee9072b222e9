//! Quote pricing
//!
//! Applied to quote update patches before they are written:
//! - each item gets `totalPrice = unitPrice * quantity * (100 - discount) / 100`
//! - `subTotal` is the sum of the item totals
//! - `total = subTotal + subTotal * tax / 100`
//!
//! Totals are recomputed whenever the patch touches `items` or `tax`.
//! Whichever of the two the patch leaves out comes from the stored quote.

use serde_json::{Map, Number, Value};

fn number(value: Option<&Value>) -> f64 {
    value.and_then(Value::as_f64).unwrap_or(0.0)
}

fn to_value(amount: f64) -> Value {
    if amount.fract() == 0.0 && amount.abs() < i64::MAX as f64 {
        Value::from(amount as i64)
    } else {
        Number::from_f64(amount).map_or(Value::Null, Value::Number)
    }
}

/// Fills in derived price fields on a quote patch.
pub fn apply_quote_pricing(stored: Option<&Value>, patch: &mut Map<String, Value>) {
    let items_changed = patch.contains_key("items");
    if !items_changed && !patch.contains_key("tax") {
        return;
    }

    let sub_total = match patch.get_mut("items") {
        Some(Value::Array(items)) => {
            let mut sum = 0.0;
            for item in items.iter_mut().filter_map(Value::as_object_mut) {
                let total = number(item.get("unitPrice"))
                    * number(item.get("quantity"))
                    * (100.0 - number(item.get("discount")))
                    / 100.0;
                item.insert("totalPrice".into(), to_value(total));
                sum += total;
            }
            sum
        }
        _ => number(stored.and_then(|q| q.get("subTotal"))),
    };
    if items_changed {
        patch.insert("subTotal".into(), to_value(sub_total));
    }

    let tax = number(patch.get("tax").or_else(|| stored.and_then(|q| q.get("tax"))));
    patch.insert("total".into(), to_value(sub_total + sub_total * tax / 100.0));
}
