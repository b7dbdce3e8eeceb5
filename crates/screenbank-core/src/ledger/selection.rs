use serde::{Deserialize, Serialize};

/// The set of apps the shield targets.
///
/// Tokens are opaque platform identifiers; only their counts are ever shown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSelection {
    #[serde(default)]
    pub applications: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub web_domains: Vec<String>,
}

impl AppSelection {
    pub fn is_empty(&self) -> bool {
        self.applications.is_empty() && self.categories.is_empty() && self.web_domains.is_empty()
    }

    /// Label recorded as the source of spend transactions.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        push_count(&mut parts, self.applications.len(), "app", "apps");
        push_count(&mut parts, self.categories.len(), "category", "categories");
        push_count(&mut parts, self.web_domains.len(), "website", "websites");

        if parts.is_empty() {
            "Screen time".to_string()
        } else {
            format!("Screen time: {}", parts.join(", "))
        }
    }
}

fn push_count(parts: &mut Vec<String>, n: usize, one: &str, many: &str) {
    match n {
        0 => {}
        1 => parts.push(format!("1 {one}")),
        n => parts.push(format!("{n} {many}")),
    }
}
