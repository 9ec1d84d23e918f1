use std::collections::BTreeSet;
use std::fmt::Debug;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::Globals;
use crate::error::TaskError;

/// Payload of a single build artifact.
pub enum ArtifactData {
    Utf8(String),
    Binary(Vec<u8>),
}

impl ArtifactData {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ArtifactData::Utf8(text) => text.as_bytes(),
            ArtifactData::Binary(data) => data,
        }
    }

    /// Consume the payload as text. Binary payloads are validated.
    pub fn into_utf8(self) -> Result<String, std::string::FromUtf8Error> {
        match self {
            ArtifactData::Utf8(text) => Ok(text),
            ArtifactData::Binary(data) => String::from_utf8(data),
        }
    }
}

/// A file flowing through a task's step chain. Artifacts entering the first
/// step carry the source path; artifacts leaving the last step carry a path
/// relative to the task's output directory.
pub struct Artifact {
    pub path: Utf8PathBuf,
    pub data: ArtifactData,
}

impl Artifact {
    pub fn utf8(path: impl Into<Utf8PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            data: ArtifactData::Utf8(text.into()),
        }
    }

    pub fn binary(path: impl Into<Utf8PathBuf>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data: ArtifactData::Binary(data),
        }
    }
}

type StepFn = Box<dyn Fn(&Globals, Vec<Artifact>) -> anyhow::Result<Vec<Artifact>> + Send + Sync>;

/// One named transform in a task's chain, taking the previous step's
/// artifacts as input.
struct Step {
    name: &'static str,
    func: StepFn,
}

/// Selects the input files of a task: one or more glob patterns rooted at a
/// base directory. The base is what output paths are mirrored against.
pub struct Selector {
    base: Utf8PathBuf,
    patterns: Vec<String>,
}

impl Selector {
    pub fn new<I, S>(base: impl Into<Utf8PathBuf>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            base: base.into(),
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve the patterns and read every matching file. The result is
    /// sorted by path, so downstream steps see a deterministic order.
    fn collect(&self) -> Result<Vec<Artifact>, TaskError> {
        let mut paths = BTreeSet::new();

        for pattern in &self.patterns {
            for entry in glob::glob(self.base.join(pattern).as_str())? {
                let path = Utf8PathBuf::try_from(entry?)?;
                if path.is_file() {
                    paths.insert(path);
                }
            }
        }

        paths
            .into_iter()
            .map(|path| {
                let data = fs::read(&path)?;
                Ok(Artifact {
                    path,
                    data: ArtifactData::Binary(data),
                })
            })
            .collect()
    }
}

/// A named, independently invocable build step: input selector, output
/// directory and an ordered chain of transforms. Defined once at startup,
/// invoked any number of times, never mutated.
pub struct Task {
    pub name: &'static str,
    selector: Selector,
    output: Utf8PathBuf,
    steps: Vec<Step>,
    watch: Option<String>,
}

impl Task {
    pub fn new(name: &'static str, selector: Selector, output: impl Into<Utf8PathBuf>) -> Self {
        Self {
            name,
            selector,
            output: output.into(),
            steps: Vec::new(),
            watch: None,
        }
    }

    /// Append a transform to the chain.
    pub fn step<F>(mut self, name: &'static str, func: F) -> Self
    where
        F: Fn(&Globals, Vec<Artifact>) -> anyhow::Result<Vec<Artifact>> + Send + Sync + 'static,
    {
        self.steps.push(Step {
            name,
            func: Box::new(func),
        });
        self
    }

    /// Bind a glob pattern whose changes re-invoke this task in watch mode.
    pub fn watch(mut self, pattern: impl Into<String>) -> Self {
        self.watch = Some(pattern.into());
        self
    }

    pub(crate) fn watch_pattern(&self) -> Option<&str> {
        self.watch.as_deref()
    }

    /// Run the task: select inputs, fold them through the step chain, write
    /// the resulting artifacts under the output directory. No matching
    /// inputs completes as a no-op success without touching the filesystem.
    pub fn run(&self, globals: &Globals) -> Result<(), TaskError> {
        let mut artifacts = self.selector.collect()?;

        if artifacts.is_empty() {
            return Ok(());
        }

        for step in &self.steps {
            artifacts =
                (step.func)(globals, artifacts).map_err(|e| TaskError::Step(step.name, e))?;
        }

        for artifact in &artifacts {
            let path = self.output.join(&artifact.path);

            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }

            fs::write(&path, artifact.data.as_bytes())?;
        }

        Ok(())
    }
}

impl Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Task({})", self.name)
    }
}

/// Strip `base` from `path`, yielding the mirrored output-relative path.
pub fn rebase(path: &Utf8Path, base: &Utf8Path) -> Utf8PathBuf {
    path.strip_prefix(base)
        .map(ToOwned::to_owned)
        .unwrap_or_else(|_| path.to_owned())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_globals;

    #[test]
    fn test_rebase() {
        assert_eq!(
            rebase(
                Utf8Path::new("src/views/pages/about/index.jinja"),
                Utf8Path::new("src/views/pages"),
            ),
            Utf8Path::new("about/index.jinja"),
        );

        // Paths outside the base pass through unchanged
        assert_eq!(
            rebase(Utf8Path::new("other/file.txt"), Utf8Path::new("src")),
            Utf8Path::new("other/file.txt"),
        );
    }

    #[test]
    fn test_no_inputs_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let globals = test_globals(dir.path());
        let src = globals.config.src_dir("empty");
        let out = globals.config.build_dir("out");

        let task = Task::new("noop", Selector::new(src, ["*.txt"]), out.clone())
            .step("explode", |_, _| anyhow::bail!("step must not run"));

        task.run(&globals).unwrap();
        assert!(!out.exists());
    }

    #[test]
    fn test_steps_run_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let globals = test_globals(dir.path());
        let src = globals.config.src_dir("txt");
        let out = globals.config.build_dir("out");

        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.txt"), "start").unwrap();

        let task = Task::new("chain", Selector::new(src, ["*.txt"]), out.clone())
            .step("first", |_, artifacts| {
                Ok(artifacts
                    .into_iter()
                    .map(|a| {
                        Artifact::utf8("a.txt", format!("{}+first", a.data.into_utf8().unwrap()))
                    })
                    .collect())
            })
            .step("second", |_, artifacts| {
                Ok(artifacts
                    .into_iter()
                    .map(|a| {
                        Artifact::utf8("a.txt", format!("{}+second", a.data.into_utf8().unwrap()))
                    })
                    .collect())
            });

        task.run(&globals).unwrap();

        let written = fs::read_to_string(out.join("a.txt")).unwrap();
        assert_eq!(written, "start+first+second");
    }

    #[test]
    fn test_artifacts_written_under_output_root() {
        let dir = tempfile::tempdir().unwrap();
        let globals = test_globals(dir.path());
        let src = globals.config.src_dir("txt");
        let out = globals.config.build_dir("out");

        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.txt"), "x").unwrap();

        let task = Task::new("nest", Selector::new(src, ["*.txt"]), out.clone())
            .step("nest", |_, _| Ok(vec![Artifact::utf8("deep/nested/a.txt", "x")]));

        task.run(&globals).unwrap();
        assert_eq!(
            fs::read_to_string(out.join("deep/nested/a.txt")).unwrap(),
            "x"
        );
    }

    #[test]
    fn test_failing_step_reports_name() {
        let dir = tempfile::tempdir().unwrap();
        let globals = test_globals(dir.path());
        let src = globals.config.src_dir("txt");

        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.txt"), "x").unwrap();

        let task = Task::new(
            "bad",
            Selector::new(src, ["*.txt"]),
            globals.config.build.clone(),
        )
        .step("kaboom", |_, _| anyhow::bail!("nope"));

        let err = task.run(&globals).unwrap_err();
        assert!(matches!(err, TaskError::Step("kaboom", _)));
    }
}
