use std::process::Command;

/// Stamp `FSTK_BUILD_REVISION` with `git describe` output, e.g.
/// `v0.1.0-3-g1a2b3c4d5e6f-dirty`. Builds outside a checkout get no stamp.
fn main() {
    for path in [".git/HEAD", ".git/refs", ".git/index"] {
        println!("cargo:rerun-if-changed={path}");
    }

    let revision = Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=12"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_owned())
        .filter(|revision| !revision.is_empty());

    if let Some(revision) = revision {
        println!("cargo:rustc-env=FSTK_BUILD_REVISION={revision}");
    }
}
