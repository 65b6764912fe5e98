// Shared build script helper that turns a crate README into crate-level rustdoc.
// Include this in build.rs files with: include!("../build_common.rs");
//
// Required imports in the including file:
//   use std::env;
//   use std::fs;
//   use std::path::Path;

/// Copy a crate's README.md into `OUT_DIR/README_GENERATED.md` with its links
/// rewritten so rustdoc can resolve them.
///
/// Rewrites:
/// 1. `](src/foo.rs)` becomes `](foo)` so links land on modules
/// 2. `](../../README.md` becomes the repository URL from the workspace manifest
///
/// A missing README still produces an (empty) generated file so that
/// `include_str!` in `lib.rs` never fails.
fn process_readme_for_rustdoc(crate_dir: &str) {
    println!("cargo:rerun-if-changed=README.md");
    println!("cargo:rerun-if-changed=../../Cargo.toml");

    let readme_path = Path::new(crate_dir).join("README.md");
    let content = fs::read_to_string(&readme_path).unwrap_or_default();

    let mut rustdoc_content = content.replace("](src/", "](").replace(".rs)", ")");

    if let Some(url) = workspace_repo_url(crate_dir) {
        rustdoc_content = rustdoc_content.replace("](../../README.md", &format!("]({url}"));
    }

    let out_dir = env::var("OUT_DIR").unwrap();
    fs::write(Path::new(&out_dir).join("README_GENERATED.md"), rustdoc_content).unwrap();
}

/// Read `repository = "..."` from the workspace Cargo.toml, if present.
fn workspace_repo_url(crate_dir: &str) -> Option<String> {
    let workspace_toml = Path::new(crate_dir).parent()?.parent()?.join("Cargo.toml");
    let content = fs::read_to_string(workspace_toml).ok()?;

    content.lines().map(str::trim).find_map(|line| {
        let rest = line.strip_prefix("repository")?.trim_start().strip_prefix('=')?;
        let start = rest.find('"')?;
        let end = rest.rfind('"')?;
        (start < end).then(|| rest[start + 1..end].to_string())
    })
}
