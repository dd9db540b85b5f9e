use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Helper to run the CLI binary with given args
fn run_cli(args: &[&str]) -> Result<std::process::Output> {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_syllabus-rag"));
    cmd.args(args).env("RUST_LOG", "error"); // Reduce log noise

    let output = cmd.output()?;
    Ok(output)
}

/// Helper to write a hashing-embedder config with artifacts inside `temp_dir`
fn write_config(temp_dir: &TempDir) -> Result<PathBuf> {
    let config = format!(
        "chunk_size = 20\noverlap = 5\nembedder = \"hashing\"\nindex_path = {:?}\nchunks_path = {:?}\n",
        temp_dir.path().join("rag_index.vec"),
        temp_dir.path().join("chunks.json"),
    );
    let path = temp_dir.path().join("rag.toml");
    std::fs::write(&path, config)?;
    Ok(path)
}

fn write_syllabus(dir: &Path) -> Result<PathBuf> {
    let text = "\
Unit 1 Introduction to artificial intelligence, intelligent agents and their environments. \
Unit 2 Problem solving by search: breadth first search, depth first search, A star search and heuristics. \
Unit 3 Knowledge representation with propositional logic and first order logic inference.";
    let path = dir.join("syllabus.txt");
    std::fs::write(&path, text)?;
    Ok(path)
}

/// Test that the CLI help command works
#[test]
fn test_cli_help() -> Result<()> {
    let output = run_cli(&["--help"])?;
    assert!(
        output.status.success(),
        "CLI help command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("build"));
    assert!(stdout.contains("search"));
    assert!(stdout.contains("context"));
    assert!(stdout.contains("status"));

    Ok(())
}

/// Test build, then search and context over the built index
#[test]
fn test_cli_build_and_search() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let config = write_config(&temp_dir)?;
    let syllabus = write_syllabus(temp_dir.path())?;
    let config = config.to_str().unwrap_or_default();

    let output = run_cli(&["--config", config, "build", syllabus.to_str().unwrap_or_default()])?;
    assert!(
        output.status.success(),
        "build failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Indexed"));
    assert!(temp_dir.path().join("rag_index.vec").is_file());
    assert!(temp_dir.path().join("chunks.json").is_file());

    let output = run_cli(&[
        "--config", config, "search", "logic inference", "--top-k", "2", "--format", "json",
    ])?;
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let results = json["results"].as_array().cloned().unwrap_or_default();
    assert!(!results.is_empty() && results.len() <= 2);
    assert!(results[0]["chunk"]["text"].as_str().unwrap_or_default().contains("logic"));

    let output = run_cli(&["--config", config, "search", "search", "--unit", "unit-1"])?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.starts_with("Found 1 results"));
    assert!(stdout.contains("| Unit-1 |"));
    assert!(!stdout.contains("| Unit-3 |"));

    let output = run_cli(&["--config", config, "context", "agents", "-k", "1"])?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.starts_with("[Chunk 1 - "));

    Ok(())
}

/// Test that search without an index degrades to no results
#[test]
fn test_cli_search_without_index() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let config = write_config(&temp_dir)?;

    let output = run_cli(&["--config", config.to_str().unwrap_or_default(), "search", "anything"])?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Found 0 results"));
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("No index found"));

    Ok(())
}

/// Test status output as JSON
#[test]
fn test_cli_status_json() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let config = write_config(&temp_dir)?;

    let output = run_cli(&[
        "--config",
        config.to_str().unwrap_or_default(),
        "status",
        "--format",
        "json",
    ])?;
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(json["ready"], false);
    assert_eq!(json["chunk_count"], 0);
    assert_eq!(json["model_id"], "hashing:fnv-hashing-384:384");

    Ok(())
}

/// Test strict and lenient handling of a broken config file
#[test]
fn test_cli_config_policy() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let broken = temp_dir.path().join("broken.toml");
    std::fs::write(&broken, "chunk_size = 10\noverlap = 10\n")?;
    let broken = broken.to_str().unwrap_or_default();

    let output = run_cli(&["--strict", "--config", broken, "--embedder", "hashing", "status"])?;
    assert!(!output.status.success(), "strict mode should reject the config");
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("Configuration error"));

    let output = run_cli(&["--config", broken, "--embedder", "hashing", "status"])?;
    assert!(
        output.status.success(),
        "lenient mode should fall back to defaults: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    Ok(())
}

/// Test error handling for invalid arguments
#[test]
fn test_cli_error_handling() -> Result<()> {
    // search needs a query
    let output = run_cli(&["search"])?;
    assert!(!output.status.success());

    let output = run_cli(&["--embedder", "openai", "status"])?;
    assert!(!output.status.success());

    Ok(())
}
