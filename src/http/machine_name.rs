//! Machine name detection for the `host` query parameter.

use std::env;

/// Return the name of the local machine.
///
/// Tries, in order: the `COMPUTERNAME` and `HOSTNAME` environment variables,
/// the `gethostname` system call, and finally `"unknown"`.
#[must_use]
pub fn machine_name() -> String {
    for var in ["COMPUTERNAME", "HOSTNAME"] {
        if let Ok(name) = env::var(var) {
            if let Some(name) = non_empty(&name) {
                return name;
            }
        }
    }

    if let Some(name) = system_hostname() {
        return name;
    }

    log::warn!("could not determine machine name, using 'unknown'");
    "unknown".to_owned()
}

fn non_empty(name: &str) -> Option<String> {
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_owned())
}

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    match nix::unistd::gethostname() {
        Ok(name) => name.to_str().and_then(non_empty),
        Err(err) => {
            log::warn!("failed to get system hostname: {err}");
            None
        }
    }
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn machine_name_is_not_empty() {
        let name = machine_name();
        assert!(!name.is_empty());
        assert_eq!(name, name.trim());
    }

    #[cfg(unix)]
    #[test]
    fn system_hostname_is_resolved_without_environment() {
        let name = system_hostname().expect("gethostname should succeed");
        assert_ne!(name, "unknown");
        assert_eq!(name, name.trim());
    }

    #[rstest]
    #[case("  build-01\n", Some("build-01"))]
    #[case("", None)]
    #[case(" \n", None)]
    fn names_are_trimmed(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(non_empty(raw).as_deref(), expected);
    }
}
