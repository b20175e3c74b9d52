// build.rs

use std::process::Command;

const SHADERS: &[(&str, &str)] = &[
    ("shaders/shader.vert", "shaders/vert.spv"),
    ("shaders/shader.frag", "shaders/frag.spv"),
];

fn main() {
    for (source, output) in SHADERS {
        match Command::new("glslc").args([*source, "-o", *output]).status() {
            Err(err) => {
                println!("cargo::warning=glslc unavailable, {} not compiled: {}", source, err);
            }
            Ok(status) if !status.success() => {
                println!("cargo::warning=glslc failed on {}: {}", source, status);
            }
            Ok(_) => {}
        }
        println!("cargo::rerun-if-changed={}", source);
    }
}
