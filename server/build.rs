// tag_arena/server/build.rs

fn main() {
    // Build-time information (crate version, profile, rustc) surfaced in the startup log.
    built::write_built_file().expect("Failed to acquire build-time information");
    println!("cargo:rerun-if-changed=build.rs");
}
