//! Target filtering shared by the `log` and `tracing` bridges.
//!
//! Records from the sink itself and from its HTTP and TLS stack are never
//! forwarded; doing so would feed the sender thread its own output.

/// Target prefixes never forwarded to a sink.
pub const IGNORED_TARGETS: &[&str] = &["splunk_trace_sink", "ureq", "rustls"];

/// Return `true` if `target` is one of [`IGNORED_TARGETS`] or a module
/// beneath one.
pub fn is_ignored_target(target: &str) -> bool {
    IGNORED_TARGETS.iter().any(|prefix| {
        target
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("splunk_trace_sink", true)]
    #[case("splunk_trace_sink::worker", true)]
    #[case("ureq::pool", true)]
    #[case("rustls::client::hs", true)]
    #[case("ureqish", false)]
    #[case("my_app::rustls", false)]
    #[case("app", false)]
    fn matches_whole_path_segments(#[case] target: &str, #[case] ignored: bool) {
        assert_eq!(is_ignored_target(target), ignored);
    }
}
