//! Declarative apply output: `kubectl apply|delete`, `docker compose up|down`.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::records::{ResourceAction, ResourceChange};

/// `deployment.apps/web configured (dry run)`
static KUBECTL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<kind>[A-Za-z][\w.-]*)/(?P<name>\S+) (?P<action>[a-z][\w-]*)(?: \(.*\))?$")
        .expect("valid kubectl regex")
});

/// ` ✔ Container app-web-1  Started  0.4s`
static COMPOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:[✔✘⠿]\s+)?(?P<kind>Container|Network|Volume|Image)\s+(?P<name>\S+)\s+(?P<action>[A-Za-z-]+)",
    )
    .expect("valid compose regex")
});

pub fn parse_resources(text: &str) -> Vec<ResourceChange> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim_end();
            let caps = KUBECTL.captures(line).or_else(|| COMPOSE.captures(line))?;
            Some(ResourceChange {
                kind: caps["kind"].to_ascii_lowercase(),
                name: caps["name"].to_string(),
                action: ResourceAction::from_word(&caps["action"]),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kubectl_apply() {
        let text = "\
namespace/shop unchanged
deployment.apps/web configured
service/web created
configmap/settings unchanged (server dry run)
Warning: resource is missing the last-applied annotation
";
        let changes = parse_resources(text);
        assert_eq!(changes.len(), 4);
        assert_eq!(changes[1].kind, "deployment.apps");
        assert_eq!(changes[1].action, ResourceAction::Configured);
        assert_eq!(changes[2].action, ResourceAction::Created);
        assert_eq!(changes[3].action, ResourceAction::Unchanged);
    }

    #[test]
    fn test_compose_up() {
        let text = "\
[+] Running 3/3
 ✔ Network shop_default  Created      0.1s
 ✔ Container shop-db-1   Running      0.0s
 ✔ Container shop-web-1  Started      0.4s
";
        let changes = parse_resources(text);
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[0].kind, "network");
        assert_eq!(changes[1].action, ResourceAction::Unchanged);
        assert_eq!(changes[2].name, "shop-web-1");
        assert_eq!(changes[2].action, ResourceAction::Configured);
    }
}
