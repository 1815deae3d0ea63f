use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

static BUILD_LAMBDALITH: OnceLock<Result<(), String>> = OnceLock::new();

/// Variables the binary reads; cleared before every run so the caller's
/// environment cannot leak into assertions.
const CONTROLLED_ENV: [&str; 3] = ["UPSTASH_EMAIL", "UPSTASH_API_KEY", "LAMBDALITH_LOG"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub command_line: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunResult {
    #[must_use]
    pub fn transcript(&self) -> String {
        format!(
            "$ {}\n[exit: {}]\n[stdout]\n{}[stderr]\n{}",
            self.command_line, self.exit_code, self.stdout, self.stderr
        )
    }
}

/// Run `lambdalith synth` as an external process against `root`.
///
/// `NO_PAGER=1` is always set to keep output deterministic for assertions.
///
/// # Errors
///
/// Returns an error if building/running the `lambdalith` binary fails.
pub fn run_synth(
    root: &Path,
    flags: &[&str],
    env_overrides: &[(String, String)],
) -> Result<RunResult, String> {
    ensure_lambdalith_built()?;
    let bin = lambdalith_bin()?;

    let mut command = Command::new(bin);
    for name in CONTROLLED_ENV {
        command.env_remove(name);
    }
    command.env("NO_PAGER", "1");
    command.arg("synth");
    command.arg("--project-root");
    command.arg(root);
    command.args(flags);

    let mut command_parts = vec![
        "lambdalith".to_string(),
        "synth".to_string(),
        "--project-root".to_string(),
        root.display().to_string(),
    ];
    command_parts.extend(flags.iter().map(|flag| (*flag).to_string()));

    for (name, value) in env_overrides {
        command.env(name, value);
    }

    let output = command
        .output()
        .map_err(|error| format!("failed to run lambdalith synth: {error}"))?;

    Ok(RunResult {
        command_line: command_parts.join(" "),
        exit_code: output.status.code().unwrap_or(1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Credentials accepted by the binary, as environment overrides.
#[must_use]
pub fn credential_env(email: &str, api_key: &str) -> Vec<(String, String)> {
    vec![
        ("UPSTASH_EMAIL".to_string(), email.to_string()),
        ("UPSTASH_API_KEY".to_string(), api_key.to_string()),
    ]
}

/// Write a text file, creating parent directories if needed.
///
/// # Errors
///
/// Returns an error if directories or file contents cannot be written.
pub fn write_file(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

/// Lay out `functions/back/Dockerfile` and `functions/front/Dockerfile`.
///
/// # Errors
///
/// Returns an error if a Dockerfile cannot be written.
pub fn write_project(root: &Path, back: &str, front: &str) -> std::io::Result<()> {
    write_file(&root.join("functions/back/Dockerfile"), back)?;
    write_file(&root.join("functions/front/Dockerfile"), front)
}

fn ensure_lambdalith_built() -> Result<(), String> {
    match BUILD_LAMBDALITH.get_or_init(|| {
        let status = Command::new("cargo")
            .arg("build")
            .arg("-q")
            .arg("-p")
            .arg("lambdalith")
            .status()
            .map_err(|error| format!("failed to build lambdalith binary: {error}"))?;

        if status.success() {
            Ok(())
        } else {
            Err(format!(
                "failed to build lambdalith binary: cargo exited with status {status}"
            ))
        }
    }) {
        Ok(()) => Ok(()),
        Err(error) => Err(error.clone()),
    }
}

fn lambdalith_bin() -> Result<PathBuf, String> {
    let mut path = std::env::current_exe()
        .map_err(|error| format!("failed to determine current executable: {error}"))?;
    if !path.pop() {
        return Err("failed to resolve test executable directory".to_string());
    }
    if path.ends_with("deps") {
        let _ = path.pop();
    }
    Ok(path.join(format!("lambdalith{}", std::env::consts::EXE_SUFFIX)))
}
