//! Build script: embeds version metadata into the binary.

use std::process::Command;

fn main() {
    // Release builds set DEVBOOT_VERSION; local builds fall back to git describe.
    if let Ok(version) = std::env::var("DEVBOOT_VERSION") {
        println!("cargo:rustc-env=DEVBOOT_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=DEVBOOT_VERSION={version}");
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=DEVBOOT_VERSION");
}
