const MONITOR_CONFIG: &str = "MONITOR_CONFIG";

const DEFAULT_CONFIG: &str = "./monitor.json";

pub fn get_default_config_path() -> String {
    DEFAULT_CONFIG.to_string()
}

pub fn get_config_path() -> String {
    std::env::var(MONITOR_CONFIG).unwrap_or_else(|_| get_default_config_path())
}

const MONITOR_INTERVAL: &str = "MONITOR_INTERVAL";

/// Global interval override from the environment, if set and valid
pub fn get_interval_override() -> Option<u64> {
    std::env::var(MONITOR_INTERVAL)
        .ok()
        .and_then(|value| value.parse().ok())
        .filter(|secs| *secs > 0)
}
