use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "LEADSHEET_LOG";

fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// `-v` flags win; otherwise `LEADSHEET_LOG`; otherwise warnings only.
pub fn filter_for(verbose: u8, env_value: Option<&str>) -> EnvFilter {
    if verbose == 0 {
        if let Some(directive) = env_value.map(str::trim).filter(|value| !value.is_empty()) {
            if let Ok(filter) = EnvFilter::try_new(directive) {
                return filter;
            }
        }
    }
    EnvFilter::new(level_for(verbose))
}

/// Installs the stderr subscriber. Safe to call more than once.
pub fn init(verbose: u8) {
    let env_value = std::env::var(LOG_ENV).ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbose, env_value.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(filter_for(0, None).to_string(), "warn");
        assert_eq!(filter_for(1, None).to_string(), "info");
        assert_eq!(filter_for(3, None).to_string(), "debug");
    }

    #[test]
    fn env_directive_applies_without_flags() {
        assert_eq!(filter_for(0, Some("leadsheet=trace")).to_string(), "leadsheet=trace");
        assert_eq!(filter_for(1, Some("trace")).to_string(), "info");
        assert_eq!(filter_for(0, Some("  ")).to_string(), "warn");
    }
}
