//! Exports the variables read by `common::build_info!`

use std::env;
use std::process::Command;

/// Trimmed stdout of a successful command
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn emit(key: &str, value: &str) {
    println!("cargo:rustc-env={}={}", key, value);
}

/// Release pipelines pin the version with `FINGERKEY_BUILD_REF`, otherwise
/// it comes from git, then from the package version.
fn repository_version() -> String {
    env::var("FINGERKEY_BUILD_REF")
        .ok()
        .filter(|r| !r.is_empty())
        .or_else(|| command_output("git", &["describe", "--always", "--dirty", "--long", "--tags"]))
        .or_else(|| env::var("CARGO_PKG_VERSION").ok())
        .unwrap_or_else(|| "unknown".to_string())
}

fn enabled_features() -> String {
    let mut features: Vec<String> = env::vars()
        .filter_map(|(key, _)| key.strip_prefix("CARGO_FEATURE_").map(str::to_lowercase))
        .collect();
    features.sort();
    if features.is_empty() {
        return "none".to_string();
    }
    features.join(",")
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-env-changed=FINGERKEY_BUILD_REF");

    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());

    emit(
        "BUILD_PROFILE",
        &env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string()),
    );
    emit("BUILD_FEATURES", &enabled_features());
    emit("REPO_VERSION", &repository_version());
    emit("BUILD_TIMESTAMP", &chrono::Utc::now().to_rfc3339());
    emit(
        "RUST_VERSION",
        &command_output(&rustc, &["--version"]).unwrap_or_else(|| "unknown".to_string()),
    );
    if let Ok(target) = env::var("TARGET") {
        emit("BUILD_TARGET", &target);
    }
}
