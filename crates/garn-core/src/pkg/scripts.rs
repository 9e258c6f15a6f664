//! Lifecycle script execution.
//!
//! Commands are split on whitespace and spawned directly, without a shell,
//! so quoting and escaping are not supported.

use super::error::PkgError;
use super::link::bin_dir;
use super::manifest::{LifecyclePhase, Manifest};
use super::report::Reporter;
use std::env;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Run the `preinstall`, `install` and `postinstall` scripts a package
/// declares, in that order, skipping phases it does not declare.
///
/// # Errors
/// Returns `ScriptExecutionError` on the first script that cannot be spawned
/// or exits non-zero.
pub async fn run_lifecycle_scripts(
    package: &str,
    manifest: &Manifest,
    package_dir: &Path,
    reporter: &impl Reporter,
) -> Result<(), PkgError> {
    for (phase, command) in manifest.lifecycle_scripts() {
        reporter.running_script(package, phase, command);
        let stdout = run_script(phase, command, package_dir).await?;
        reporter.script_output(package, phase, &stdout);
    }
    Ok(())
}

/// Run one command line in `package_dir` with the package's `.bin` first on
/// `PATH`. Returns captured stdout.
///
/// # Errors
/// Returns `ScriptExecutionError` if the command cannot be spawned or exits
/// non-zero.
pub async fn run_script(
    phase: LifecyclePhase,
    command: &str,
    package_dir: &Path,
) -> Result<String, PkgError> {
    let mut words = command.split_whitespace();
    let Some(program) = words.next() else {
        return Err(PkgError::script(phase.as_str(), command, "empty command"));
    };
    let path = script_path(package_dir, env::var_os("PATH"))
        .map_err(|reason| PkgError::script(phase.as_str(), command, reason))?;

    let output = Command::new(program)
        .args(words)
        .current_dir(package_dir)
        .env("PATH", path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| PkgError::script(phase.as_str(), command, format!("failed to spawn: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let status = output
            .status
            .code()
            .map_or_else(|| "terminated by signal".to_string(), |c| format!("exit code {c}"));
        return Err(PkgError::script(
            phase.as_str(),
            command,
            format!("{status}: {}", stderr.trim()),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// `<package_dir>/node_modules/.bin` followed by the inherited `PATH`.
///
/// # Errors
/// Returns a message if the directory cannot be placed in `PATH` (it
/// contains the platform separator).
pub fn script_path(package_dir: &Path, inherited: Option<OsString>) -> Result<OsString, String> {
    let mut dirs = vec![bin_dir(package_dir)];
    if let Some(inherited) = inherited {
        dirs.extend(env::split_paths(&inherited));
    }
    env::join_paths(dirs).map_err(|e| format!("invalid PATH: {e}"))
}
