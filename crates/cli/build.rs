use std::process::Command;

/// Run git in the workspace root and return trimmed stdout on success.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/refs/heads");
    println!("cargo:rerun-if-env-changed=PAYLIST_BUILD_ID");

    // Packagers may pin a build id; otherwise describe the checkout
    let build_id = std::env::var("PAYLIST_BUILD_ID")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| git(&["describe", "--always", "--dirty=+"]))
        .unwrap_or_else(|| "unknown".into());
    println!("cargo:rustc-env=PAYLIST_BUILD_ID={build_id}");

    let target = std::env::var("TARGET").unwrap_or_else(|_| "unknown".into());
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".into());
    println!("cargo:rustc-env=PAYLIST_TARGET={target}");
    println!("cargo:rustc-env=PAYLIST_PROFILE={profile}");
}
