use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KarakuriError {
    #[error("Error while clearing the build directory:\n{0}")]
    Clean(#[from] CleanError),

    #[error("Error while building the site:\n{0}")]
    Build(#[from] BuildError),
}

/// Failure to load the site data document at startup. This is always fatal;
/// a missing or malformed data file must never be substituted with an empty
/// context.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Couldn't read site data from '{0}'.\n{1}")]
    Read(Utf8PathBuf, std::io::Error),

    #[error("Malformed JSON in '{0}'.\n{1}")]
    Parse(Utf8PathBuf, serde_json::Error),
}

#[derive(Debug, Error)]
pub enum CleanError {
    #[error(transparent)]
    Remove(std::io::Error),

    #[error(transparent)]
    Create(std::io::Error),
}

/// Failure of a single task invocation.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Couldn't compile glob pattern.\n{0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Couldn't run glob.\n{0}")]
    Glob(#[from] glob::GlobError),

    #[error("Couldn't convert path to UTF-8.\n{0}")]
    PathFormat(#[from] camino::FromPathBufError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Step '{0}':\n{1}")]
    Step(&'static str, anyhow::Error),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Task '{0}' is not registered")]
    Unknown(String),

    #[error("Task '{0}':\n{1}")]
    Task(String, TaskError),

    #[error("{}", format_stage(.0))]
    Stage(Vec<BuildError>),
}

fn format_stage(failures: &[BuildError]) -> String {
    let list = failures
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n");

    format!("{} task(s) failed:\n{list}", failures.len())
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Couldn't bind the live-reload socket.\n{0}")]
    Bind(std::io::Error),

    #[error("Couldn't compile watch pattern.\n{0}")]
    Pattern(#[from] glob::PatternError),
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("rsync exited with {0}:\n{1}")]
    Rsync(std::process::ExitStatus, String),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
