use camino::{Utf8Path, Utf8PathBuf};

/// Project layout and fixed targets. Built once in `main` and carried,
/// immutable, into every task invocation; tasks never reach for path
/// constants of their own.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of all source assets.
    pub src: Utf8PathBuf,
    /// Root of the generated output tree. Removed wholesale by `clean`.
    pub build: Utf8PathBuf,
    /// Port the dev HTTP server listens on.
    pub http_port: u16,
    /// Remote target for the deploy task.
    pub deploy: DeployTarget,
}

/// Fixed remote destination for `deploy`. Not configurable per invocation.
#[derive(Debug, Clone)]
pub struct DeployTarget {
    /// `user@host` for the rsync transfer.
    pub host: String,
    /// Destination path on the remote.
    pub destination: String,
    /// Patterns to transfer even if an exclude rule would drop them.
    pub include: Vec<String>,
    /// Patterns never transferred (OS artifacts).
    pub exclude: Vec<String>,
}

impl Config {
    /// Path of the site data document.
    pub fn data_file(&self) -> Utf8PathBuf {
        self.src.join("data/data.json")
    }

    /// Source subdirectory, e.g. `sass` or `views/pages`.
    pub fn src_dir(&self, dir: impl AsRef<Utf8Path>) -> Utf8PathBuf {
        self.src.join(dir.as_ref())
    }

    /// Output subdirectory, e.g. `css` or `img`.
    pub fn build_dir(&self, dir: impl AsRef<Utf8Path>) -> Utf8PathBuf {
        self.build.join(dir.as_ref())
    }
}
