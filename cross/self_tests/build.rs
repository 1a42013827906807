//! Copies `memory.x` into the output directory and puts it on the linker
//! search path, so the linker finds it from inside the workspace.
use std::{env, fs, path::PathBuf};

use anyhow::{Context, Result};

fn main() -> Result<()> {
    let out = PathBuf::from(env::var_os("OUT_DIR").context("OUT_DIR not set")?);
    fs::write(out.join("memory.x"), include_bytes!("../memory.x"))?;
    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rerun-if-changed=../memory.x");

    println!("cargo:rustc-link-arg-tests=--nmagic");
    println!("cargo:rustc-link-arg-tests=-Tlink.x");
    println!("cargo:rustc-link-arg-tests=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-tests=-Tdefmt.x");

    Ok(())
}
