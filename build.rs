//! Build script for the sporldl backend.
//!
//! Copies `.env.example` into the local data directory
//! (`<data_local_dir>/sporldl/.env.example`) so an installed binary ships a
//! configuration template next to where it looks for `.env`.
//!
//! Nothing here is allowed to break the build: sandboxed builders often have
//! no writable home directory, so every failure becomes a cargo warning.

use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=.env.example");

    if let Err(e) = copy_env_template() {
        println!("cargo:warning=could not install .env.example: {}", e);
    }
}

fn copy_env_template() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let env_example_path = manifest_dir.join(".env.example");

    if !env_example_path.is_file() {
        println!(
            "cargo:warning=.env.example not found at {}",
            env_example_path.display()
        );
        return Ok(());
    }

    let Some(mut out_dir) = dirs::data_local_dir() else {
        return Ok(());
    };
    out_dir.push("sporldl");
    fs::create_dir_all(&out_dir)?;
    fs::copy(&env_example_path, out_dir.join(".env.example"))?;

    Ok(())
}
