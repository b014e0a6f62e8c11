// Compiles the GLSL sources in resources/shaders to SPIR-V in target/shaders

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const STAGE_EXTENSIONS: [&str; 3] = ["vert", "frag", "comp"];

fn is_stale(source: &Path, output: &Path) -> bool {
    let modified = |path: &Path| fs::metadata(path).and_then(|meta| meta.modified()).ok();
    match (modified(source), modified(output)) {
        (Some(src), Some(dst)) => src > dst,
        _ => true,
    }
}

fn compile(glslc: &Path, source: &Path, output: &Path) -> Result<(), String> {
    let status = Command::new(glslc)
        .arg("--target-env=vulkan1.2")
        .arg(source)
        .arg("-o")
        .arg(output)
        .status()
        .map_err(|e| format!("failed to run {}: {e}", glslc.display()))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("glslc failed for {} ({status})", source.display()))
    }
}

fn main() {
    println!("cargo:rerun-if-changed=resources/shaders");
    println!("cargo:rerun-if-env-changed=VULKAN_SDK");
    println!("cargo:rerun-if-env-changed=SKIP_SHADERS");

    if env::var_os("SKIP_SHADERS").is_some() {
        println!("cargo:warning=SKIP_SHADERS set, shader compilation skipped");
        return;
    }

    let Some(sdk) = env::var_os("VULKAN_SDK") else {
        println!("cargo:warning=VULKAN_SDK not set, shader compilation skipped");
        return;
    };
    let glslc = PathBuf::from(sdk)
        .join(if cfg!(windows) { "Bin" } else { "bin" })
        .join(if cfg!(windows) { "glslc.exe" } else { "glslc" });
    if !glslc.exists() {
        println!("cargo:warning=glslc not found at {}", glslc.display());
        return;
    }

    let source_dir = Path::new("resources/shaders");
    let target_dir = Path::new("target/shaders");
    if let Err(e) = fs::create_dir_all(target_dir) {
        println!("cargo:warning=cannot create {}: {e}", target_dir.display());
        return;
    }

    let Ok(entries) = fs::read_dir(source_dir) else {
        return;
    };
    for path in entries.filter_map(Result::ok).map(|entry| entry.path()) {
        let is_stage = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| STAGE_EXTENSIONS.contains(&ext));
        let Some(name) = path.file_name() else { continue };
        if !is_stage {
            continue;
        }

        // scene.vert -> scene.vert.spv
        let mut output_name = name.to_os_string();
        output_name.push(".spv");
        let output = target_dir.join(output_name);
        if !is_stale(&path, &output) {
            continue;
        }
        if let Err(message) = compile(&glslc, &path, &output) {
            panic!("{message}");
        }
    }
}
