use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_else(|_| "unknown".to_string());

    if target_os != "linux" {
        println!(
            "cargo:warning=Building for {}. Kickstart ISO builds need Linux loop mounts and will fail preflight elsewhere.",
            target_os
        );
    }
}
