use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "FORK_TRIAGE_LOG";

/// Install the global subscriber. `FORK_TRIAGE_LOG` wins over `--verbose`.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "fork_triage=debug,warn"
    } else {
        "warn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_enables_crate_debug() {
        assert_eq!(default_directive(true), "fork_triage=debug,warn");
        assert_eq!(default_directive(false), "warn");
    }
}
