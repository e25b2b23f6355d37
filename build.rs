//! Build script — sets SENTINEL_BUILD_ID at compile time.
//!
//! Uses the BUILD_ID environment variable when the release pipeline provides
//! one, otherwise the UTC build time.

#[path = "src/epoch.rs"]
#[allow(dead_code)]
mod epoch;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src/epoch.rs");
    println!("cargo:rerun-if-env-changed=BUILD_ID");

    let build_id = match std::env::var("BUILD_ID") {
        Ok(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => {
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);
            epoch::format_epoch(now)
        }
    };
    println!("cargo:rustc-env=SENTINEL_BUILD_ID={}", build_id);
}
