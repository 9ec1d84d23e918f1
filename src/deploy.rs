use std::process::{Command, Stdio};
use std::time::Instant;

use console::style;

use crate::config::Config;
use crate::error::DeployError;
use crate::io::as_overhead;

/// Synchronize the build directory with the fixed remote destination.
///
/// The transfer itself is rsync's job; this only assembles the invocation.
/// OS artifacts never leave the machine, and server config files are
/// transferred even though rsync's default rules would hide them. Nothing
/// is rolled back on a partial transfer.
pub fn deploy(config: &Config) -> Result<(), DeployError> {
    let s = Instant::now();
    let target = format!("{}:{}", config.deploy.host, config.deploy.destination);

    eprintln!(
        "Deploying {} to {}",
        style(config.build.as_str()).green(),
        style(&target).yellow(),
    );

    let output = Command::new("rsync")
        .args(rsync_args(config))
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped())
        .output()?;

    if !output.status.success() {
        return Err(DeployError::Rsync(
            output.status,
            String::from_utf8(output.stderr)?,
        ));
    }

    eprintln!("Deployed the build directory {}", as_overhead(s));

    Ok(())
}

/// Include rules must precede excludes, or rsync drops the includes too.
fn rsync_args(config: &Config) -> Vec<String> {
    let mut args = vec!["--archive".to_string(), "--compress".to_string()];

    for pattern in &config.deploy.include {
        args.push(format!("--include={pattern}"));
    }

    for pattern in &config.deploy.exclude {
        args.push(format!("--exclude={pattern}"));
    }

    // Trailing slash syncs the directory's contents, not the directory
    args.push(format!("{}/", config.build));
    args.push(format!(
        "{}:{}",
        config.deploy.host, config.deploy.destination
    ));

    args
}
