use std::io::Write;
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::config::Config;
use crate::task::{Artifact, Selector, Task};

/// Errors that can occur when bundling scripts.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// An I/O error occurred during process execution.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The Esbuild process returned a non-zero exit code.
    #[error("Esbuild execution failed: {0}")]
    Esbuild(String),

    /// Failed to parse process output as UTF-8.
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub const BUNDLE_NAME: &str = "script.min.js";

/// Concatenate the page scripts in path order into one bundle, then minify
/// it.
///
/// **Note:** minification requires the `esbuild` binary on the system
/// `PATH`, the same way the original toolchain shelled out for it.
pub fn task(config: &Config) -> Task {
    let base = config.src_dir("js");
    let watch = format!("{base}/*.js");

    Task::new(
        "scripts",
        Selector::new(base, ["*.js"]),
        config.build_dir("js"),
    )
    .step("concat", |_, artifacts| Ok(vec![concat(artifacts)?]))
    .step("minify", |_, artifacts| {
        artifacts
            .into_iter()
            .map(|artifact| {
                let minified = minify_esbuild(artifact.data.as_bytes())?;
                Ok(Artifact::binary(artifact.path, minified))
            })
            .collect()
    })
    .watch(watch)
}

/// Join the inputs with newlines into the single output bundle.
fn concat(artifacts: Vec<Artifact>) -> Result<Artifact, ScriptError> {
    let mut bundle = String::new();

    for artifact in artifacts {
        let text = artifact.data.into_utf8()?;

        if !bundle.is_empty() {
            bundle.push('\n');
        }

        bundle.push_str(text.trim_end());
    }

    Ok(Artifact::utf8(BUNDLE_NAME, bundle))
}

fn minify_esbuild(source: &[u8]) -> Result<Vec<u8>, ScriptError> {
    let mut child = Command::new("esbuild")
        .arg("--minify")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(source)?;
    }

    let output = child.wait_with_output()?;

    if !output.status.success() {
        return Err(ScriptError::Esbuild(String::from_utf8(output.stdout)?));
    }

    Ok(output.stdout)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_concat_preserves_input_order() {
        let artifacts = vec![
            Artifact::utf8("src/js/app.js", "const app = 1;\n"),
            Artifact::utf8("src/js/menu.js", "const menu = 2;\n"),
        ];

        let bundle = concat(artifacts).unwrap();
        assert_eq!(bundle.path, BUNDLE_NAME);
        assert_eq!(
            bundle.data.into_utf8().unwrap(),
            "const app = 1;\nconst menu = 2;",
        );
    }

    #[test]
    fn test_concat_rejects_non_utf8() {
        let artifacts = vec![Artifact::binary("src/js/bad.js", vec![0xff, 0xfe])];
        assert!(matches!(concat(artifacts), Err(ScriptError::Utf8(_))));
    }
}
