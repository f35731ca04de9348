use std::sync::OnceLock;

/// `git describe` of the source tree this binary was built from, when the
/// build ran inside a checkout.
pub fn revision() -> Option<&'static str> {
    option_env!("FSTK_BUILD_REVISION")
}

/// Version string shown by `--version`, with the revision appended when known.
pub fn long_version() -> &'static str {
    static VERSION: OnceLock<String> = OnceLock::new();
    VERSION.get_or_init(|| version_string(env!("CARGO_PKG_VERSION"), revision()))
}

fn version_string(version: &str, revision: Option<&str>) -> String {
    match revision {
        Some(revision) => format!("{version} ({revision})"),
        None => version.to_owned(),
    }
}
