//! Materializes a PoC record into a self-contained, buildable cargo project.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::PocError;
use crate::metadata::PocDocument;
use crate::runner::RunnerEnv;

/// Produce the throwaway project for `document` under `target_dir`:
/// a manifest pinning the target (and peers) to exact versions, a build
/// hook pointing the linker at the shared native-library directory, and the
/// record's code body as `src/main.rs`.
///
/// `target_dir` must already exist and be writable; the caller owns its
/// cleanup (typically a `tempfile::TempDir` guard).
pub fn materialize(
    id: &str,
    document: &PocDocument,
    target_dir: &Path,
    config: &Config,
    env: &RunnerEnv,
) -> Result<(), PocError> {
    let manifest = render_manifest(id, document, config)?;
    write_file(&target_dir.join("Cargo.toml"), &manifest)?;

    let build_hook = format!(
        "fn main() {{\n    println!(\"cargo:rustc-link-search={}\");\n}}\n",
        env.link_path.display()
    );
    write_file(&target_dir.join("build.rs"), &build_hook)?;

    let src_dir = target_dir.join("src");
    fs::create_dir_all(&src_dir).map_err(|source| PocError::MaterializationFailed {
        path: src_dir.clone(),
        source,
    })?;
    let mut main_src = document.code.clone();
    main_src.push('\n');
    write_file(&src_dir.join("main.rs"), &main_src)?;
    Ok(())
}

/// Render the project manifest. The package name is derived from the record
/// id so concurrently materialized records never collide on identity.
fn render_manifest(id: &str, document: &PocDocument, config: &Config) -> Result<String, PocError> {
    let metadata = &document.metadata;
    let target_crate = metadata.target_crate()?;
    let target_version = metadata.target_version()?;

    let mut manifest = format!(
        "[package]\n\
         name = \"poc-{id}\"\n\
         version = \"0.1.0\"\n\
         authors = [\"{} <{}>\"]\n\
         edition = \"2018\"\n\
         build = \"build.rs\"\n\
         \n\
         [dependencies]\n",
        config.name, config.email
    );
    manifest.push_str(&format!("{target_crate} = \"={target_version}\"\n"));
    for peer in &metadata.target.peer {
        manifest.push_str(&format!("{} = \"={}\"\n", peer.krate, peer.version));
    }
    Ok(manifest)
}

fn write_file(path: &Path, contents: &str) -> Result<(), PocError> {
    fs::write(path, contents).map_err(|source| PocError::MaterializationFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Copy a materialized project tree to `dest`, replacing anything there.
/// Used by `run --copy` to keep the build directory around for debugging.
pub fn copy_tree(source_root: &Path, dest_root: &Path) -> anyhow::Result<()> {
    use anyhow::Context;

    if dest_root.exists() {
        fs::remove_dir_all(dest_root)?;
    }
    fs::create_dir_all(dest_root)?;
    for file in collect_files_recursive(source_root)? {
        let rel = file
            .strip_prefix(source_root)
            .context("strip source prefix")?;
        let dest = dest_root.join(rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&file, &dest)?;
    }
    Ok(())
}

fn collect_files_recursive(root: &Path) -> Result<Vec<PathBuf>, PocError> {
    let mut files = Vec::new();
    if !root.exists() {
        return Ok(files);
    }
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            files.extend(collect_files_recursive(&path)?);
        } else if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
