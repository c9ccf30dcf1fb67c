//! Build script for the disgate_protocol crate.
//!
//! Captures the compiler version so that `ABI_VERSION` can be assembled at
//! compile time. Plugins built with a different compiler are refused by the
//! loader unless the operator overrides the check.

use std::process::Command;

fn main() {
    println!("cargo:rustc-env=DISGATE_RUSTC_VERSION={}", detect_rustc_version());
    println!("cargo:rerun-if-env-changed=RUSTC_VERSION");
    println!("cargo:rerun-if-changed=build.rs");
}

fn detect_rustc_version() -> String {
    // CI systems sometimes pin this explicitly
    if let Ok(version) = std::env::var("RUSTC_VERSION") {
        return version;
    }

    let rustc = std::env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let Ok(output) = Command::new(rustc).arg("--version").output() else {
        return "unknown".to_string();
    };
    if !output.status.success() {
        return "unknown".to_string();
    }

    // "rustc 1.75.0 (82e1608df 2023-12-21)" -> "1.75.0"
    String::from_utf8_lossy(&output.stdout)
        .split_whitespace()
        .nth(1)
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}
