use garn_core::pkg::{
    DependencyNode, Installer, LifecyclePhase, Manifest, PackageReference, PinnedPackage,
    PkgError, RegistryClient, Reporter, Resolver,
};
use garn_core::Config;
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

/// Install result for JSON output.
#[derive(Serialize)]
struct InstallJsonResult {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tree: Option<DependencyNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<InstallErrorInfo>,
}

#[derive(Serialize)]
struct InstallErrorInfo {
    code: String,
    message: String,
}

/// Turns core progress events into tracing records and, outside `--json`,
/// progress lines on stdout.
struct CliReporter {
    quiet: bool,
}

impl CliReporter {
    fn say(&self, line: &str) {
        if !self.quiet {
            println!("{line}");
        }
    }
}

impl Reporter for CliReporter {
    fn resolving(&self, pkg: &PackageReference) {
        debug!(package = %pkg, "resolving dependencies");
    }

    fn pinned(&self, dep: &PackageReference, pinned: &PinnedPackage) {
        debug!(dependency = %dep, pinned = %pinned.reference, "pinned");
    }

    fn reused(&self, dep: &PackageReference, ancestor: &str) {
        debug!(dependency = %dep, ancestor, "satisfied by ancestor");
    }

    fn extracting(&self, pkg: &PinnedPackage, target: &Path) {
        debug!(package = %pkg, target = %target.display(), "extracting");
    }

    fn linked_binary(&self, name: &str, link: &Path, target: &Path) {
        debug!(binary = name, link = %link.display(), target = %target.display(), "linked binary");
    }

    fn running_script(&self, package: &str, phase: LifecyclePhase, command: &str) {
        info!(package, phase = %phase, command, "running lifecycle script");
        self.say(&format!("Running {phase} script for {package}: {command}"));
    }

    fn script_output(&self, _package: &str, _phase: LifecyclePhase, stdout: &str) {
        let stdout = stdout.trim_end();
        if !stdout.is_empty() {
            self.say(&format!("Output: {stdout}"));
        }
    }
}

pub fn run(config: &Config) -> Result<()> {
    info!(cwd = %config.cwd.display(), registry = %config.registry, "install");

    let reporter = CliReporter {
        quiet: config.json_logs,
    };

    // One fetch at a time: the core awaits sequentially on a single thread.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;
    let result = runtime.block_on(install_project(config, &reporter));

    match result {
        Ok(tree) => {
            if config.json_logs {
                let result = InstallJsonResult {
                    ok: true,
                    tree: Some(tree),
                    error: None,
                };
                println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
            } else {
                println!("Done: {} packages installed", tree.descendant_count());
            }
            Ok(())
        }
        Err(e) => {
            if config.json_logs {
                let result = InstallJsonResult {
                    ok: false,
                    tree: None,
                    error: Some(InstallErrorInfo {
                        code: e.code().to_string(),
                        message: e.to_string(),
                    }),
                };
                println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
                std::process::exit(1);
            }
            let code = e.code();
            Err(e).into_diagnostic().wrap_err(code)
        }
    }
}

async fn install_project(
    config: &Config,
    reporter: &CliReporter,
) -> std::result::Result<DependencyNode, PkgError> {
    let manifest = Manifest::read_from_dir(&config.cwd)?;
    let registry = RegistryClient::new(&config.registry)?;

    reporter.say("Resolving packages...");
    let tree = Resolver::new(&registry, reporter)
        .with_max_depth(config.max_depth)
        .resolve_project(&manifest)
        .await?;
    debug!(packages = tree.descendant_count(), "resolved\n{}", tree.render());

    reporter.say("Linking dependencies...");
    Installer::new(&registry, reporter)
        .install(&tree, &config.cwd)
        .await?;

    Ok(tree)
}
