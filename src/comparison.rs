use std::cmp::Ordering;

use chrono::{Duration, Local, NaiveDate};

/// Compares two attribute values, numerically when both sides are numbers
/// and lexically otherwise. ISO dates therefore order chronologically.
pub fn cmp_values<F>(a: &str, b: &str, pred_on_ord: F) -> bool
where
    F: Fn(Ordering) -> bool,
{
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(da), Ok(db)) => {
            let ord = if (da - db).abs() < f64::EPSILON {
                Ordering::Equal
            } else if da < db {
                Ordering::Less
            } else {
                Ordering::Greater
            };
            pred_on_ord(ord)
        }
        _ => pred_on_ord(a.cmp(b)),
    }
}

/// Resolves `today`, `yesterday`, `tomorrow` and `now` relative to `today`.
/// Anything else is returned unchanged.
pub fn resolve_named_date(raw: &str, today: NaiveDate) -> String {
    let day = match raw {
        "today" | "now" => today,
        "yesterday" => today - Duration::days(1),
        "tomorrow" => today + Duration::days(1),
        _ => return raw.to_string(),
    };
    day.format("%Y-%m-%d").to_string()
}

pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}
