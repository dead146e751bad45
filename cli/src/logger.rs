use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;
use std::sync::OnceLock;

/// Crates whose logs `--verbose` turns on, the AWS SDK stays quiet unless RUST_LOG asks for it
const OWN_CRATES: [&str; 3] = ["storefront", "storefront_stacks", "storefront_common"];

/// Log output routed around the progress spinners
pub struct Logger {
    multi_progress: MultiProgress,
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

impl Logger {
    /// Set up the logger once, with the filter matching the number of `-v` flags
    ///
    /// RUST_LOG, when set, takes precedence over the flags.
    pub fn init(verbosity: u8) -> &'static Self {
        LOGGER.get_or_init(|| {
            let env = env_logger::Env::default().default_filter_or(filter(verbosity));
            let logger = env_logger::Builder::from_env(env).build();

            let level = logger.filter();
            let multi_progress = MultiProgress::new();

            // Fails only if another logger is already set, e.g. by a test harness
            if LogWrapper::new(multi_progress.clone(), logger)
                .try_init()
                .is_ok()
            {
                log::set_max_level(level);
            }

            Self { multi_progress }
        })
    }

    /// Progress bars drawn here don't get torn by log lines
    pub fn multi_progress() -> &'static MultiProgress {
        &Self::init(0).multi_progress
    }
}

/// Default filter: silent, then info and debug of the storefront crates, then everything at debug
fn filter(verbosity: u8) -> String {
    let level = match verbosity {
        0 => return "off".into(),
        1 => "info",
        2 => "debug",
        _ => return "debug".into(),
    };

    OWN_CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_by_default() {
        assert_eq!(filter(0), "off");
    }

    #[test]
    fn verbose_flags_raise_own_crates_only() {
        assert_eq!(
            filter(1),
            "storefront=info,storefront_stacks=info,storefront_common=info"
        );
        assert_eq!(
            filter(2),
            "storefront=debug,storefront_stacks=debug,storefront_common=debug"
        );
        assert_eq!(filter(3), "debug");
    }
}
