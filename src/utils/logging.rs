use serde::Serialize;
use tracing::Level;

/// Renders `value` as indented JSON for `log_action`, only when `level` is enabled.
pub(crate) fn with_pretty_json<T, F>(level: Level, value: &T, log_action: F)
where
    T: Serialize + ?Sized,
    F: FnOnce(&str),
{
    let enabled = match level {
        Level::TRACE => tracing::enabled!(Level::TRACE),
        Level::DEBUG => tracing::enabled!(Level::DEBUG),
        Level::INFO => tracing::enabled!(Level::INFO),
        Level::WARN => tracing::enabled!(Level::WARN),
        _ => tracing::enabled!(Level::ERROR),
    };
    if !enabled {
        return;
    }

    let pretty = serde_json::to_string_pretty(value)
        .unwrap_or_else(|error| format!("<pretty serialize failed: {error}>"));
    log_action(pretty.as_str());
}

pub(crate) fn with_pretty_json_debug<T, F>(value: &T, log_action: F)
where
    T: Serialize + ?Sized,
    F: FnOnce(&str),
{
    with_pretty_json(Level::DEBUG, value, log_action);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn skips_rendering_without_a_subscriber() {
        let mut called = false;
        with_pretty_json(Level::TRACE, &json!({ "a": 1 }), |_| called = true);
        assert!(!called);
    }
}
