//! Label selector rendering.

use std::collections::BTreeMap;

/// Renders a selector mapping as an equality-based label selector query,
/// e.g. `app=web,tier=frontend`.
pub fn render_label_selector(selector: &BTreeMap<String, String>) -> String {
    selector
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}
