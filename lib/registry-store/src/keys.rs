//! Record keys for persisted services
//!
//! Each service `N` is stored as two records, `registry_N_hosts` and
//! `registry_N_endpoints`.

const KEY_PREFIX: &str = "registry_";
const HOSTS_SUFFIX: &str = "_hosts";
const ENDPOINTS_SUFFIX: &str = "_endpoints";

/// Pattern matching every hosts record
pub const HOSTS_PATTERN: &str = "registry_*_hosts";

pub fn hosts_key(name: &str) -> String {
    format!("{}{}{}", KEY_PREFIX, name, HOSTS_SUFFIX)
}

pub fn endpoints_key(name: &str) -> String {
    format!("{}{}{}", KEY_PREFIX, name, ENDPOINTS_SUFFIX)
}

/// Extract the service name from a hosts record key.
///
/// Names may themselves contain underscores.
pub fn service_name_from_hosts_key(key: &str) -> Option<&str> {
    key.strip_prefix(KEY_PREFIX)?
        .strip_suffix(HOSTS_SUFFIX)
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        assert_eq!(hosts_key("orders"), "registry_orders_hosts");
        assert_eq!(endpoints_key("orders"), "registry_orders_endpoints");
    }

    #[test]
    fn test_name_extraction() {
        assert_eq!(service_name_from_hosts_key("registry_orders_hosts"), Some("orders"));
        assert_eq!(
            service_name_from_hosts_key("registry_order_items_hosts"),
            Some("order_items")
        );
        assert_eq!(service_name_from_hosts_key("registry__hosts"), None);
        assert_eq!(service_name_from_hosts_key("registry_orders_endpoints"), None);
        assert_eq!(service_name_from_hosts_key("orders_hosts"), None);
    }

    #[test]
    fn test_name_round_trip() {
        for name in ["a", "order_items", "svc-1"] {
            assert_eq!(service_name_from_hosts_key(&hosts_key(name)), Some(name));
        }
    }
}
