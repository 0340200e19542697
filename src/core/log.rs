//! Log output goes to stderr so it never mixes with conversion results.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Directive, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

const VERBOSE_DIRECTIVE: &str = concat!(env!("CARGO_CRATE_NAME"), "=debug");

/// `RUST_LOG` wins when set; otherwise logging is off. `--verbose` adds
/// debug output for this crate on top of either.
fn build_filter(verbose: bool) -> EnvFilter {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::OFF.into())
        .from_env_lossy();
    if !verbose {
        return filter;
    }
    match VERBOSE_DIRECTIVE.parse::<Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

pub fn init_logging(verbose: bool) {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .pretty()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(build_filter(verbose))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_enables_crate_debug() {
        assert_eq!(VERBOSE_DIRECTIVE, "fxconv=debug");
        assert!(build_filter(true).to_string().contains("fxconv=debug"));
        assert!(!build_filter(false).to_string().contains("fxconv=debug"));
    }
}
