use serde_json::{Value, json};

const AVATAR_COLORS: [&str; 8] = [
    "FF6B6B", "4ECDC4", "45B7D1", "96CEB4", "FFEAA7", "DDA0DD", "FF7675", "74B9FF",
];

/// Initials avatar whose background colour is picked from the first character.
pub fn default_avatar(username: &str) -> String {
    let idx = username.chars().next().map(|c| c as usize).unwrap_or(0) % AVATAR_COLORS.len();
    let name: String = url::form_urlencoded::byte_serialize(username.as_bytes()).collect();
    format!(
        "https://ui-avatars.com/api/?name={name}&background={}&color=fff&size=128",
        AVATAR_COLORS[idx]
    )
}

pub fn default_preferences() -> Value {
    json!({
        "theme": "liquid-glass",
        "language": "zh-CN",
        "timezone": "Asia/Shanghai",
        "notifications": { "email": true, "browser": true, "sound": false },
        "dashboard": {
            "refreshInterval": 2000,
            "defaultPage": "overview",
            "showAnimations": true
        },
        "charts": { "type": "line", "timeRange": "1h", "autoRefresh": true }
    })
}

/// Top-level keys of `update` replace those of `current`; nested objects are not merged.
pub fn merge_preferences(current: &Value, update: &Value) -> Value {
    let mut merged = match current {
        Value::Object(map) => map.clone(),
        _ => match default_preferences() {
            Value::Object(map) => map,
            _ => Default::default(),
        },
    };
    if let Value::Object(update) = update {
        for (key, value) in update {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar_colour_follows_first_char() {
        // 'a' = 97, 97 % 8 = 1
        assert_eq!(
            default_avatar("alice"),
            "https://ui-avatars.com/api/?name=alice&background=4ECDC4&color=fff&size=128"
        );
        assert!(default_avatar("h").contains("background=FF6B6B"));
    }

    #[test]
    fn merge_is_shallow() {
        let merged = merge_preferences(
            &default_preferences(),
            &json!({ "theme": "dark", "charts": { "type": "bar" } }),
        );
        assert_eq!(merged["theme"], "dark");
        assert_eq!(merged["charts"], json!({ "type": "bar" }));
        assert_eq!(merged["language"], "zh-CN");
    }

    #[test]
    fn merge_falls_back_to_defaults_for_garbage() {
        let merged = merge_preferences(&Value::Null, &json!({ "language": "en" }));
        assert_eq!(merged["language"], "en");
        assert_eq!(merged["theme"], "liquid-glass");
    }
}
