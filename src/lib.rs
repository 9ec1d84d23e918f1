#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

pub mod config;
pub mod data;
pub mod deploy;
mod error;
pub mod io;
pub mod site;
pub mod task;
pub mod transform;
pub mod watch;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

pub use crate::config::{Config, DeployTarget};
pub use crate::data::SiteData;
pub use crate::error::*;
pub use crate::task::{Artifact, ArtifactData, Selector, Task};

/// This value controls whether the pipeline runs in `Build` or `Watch` mode.
/// In `Build` mode, every task runs once and the process stops. In `Watch`
/// mode, the pipeline performs the initial build, opens up a websocket port,
/// serves the build directory over HTTP and re-runs bound tasks on any
/// change in the source file system.
#[derive(Debug, Clone, Copy)]
pub enum Mode {
    /// Run every task once and stop.
    Build,
    /// Rebuild on change, with live reload.
    Watch,
}

/// Read-only state shared by every task invocation: the execution mode, the
/// live-reload port (watch mode only), the project configuration and the
/// site data document.
#[derive(Debug)]
pub struct Globals {
    pub mode: Mode,
    /// Watch port
    pub port: Option<u16>,
    pub config: Config,
    pub data: SiteData,
}

impl Globals {
    /// HTML snippet which connects to the live-reload socket and reloads the
    /// page whenever the watcher broadcasts a successful rebuild.
    pub fn refresh_script(&self) -> Option<String> {
        self.port.map(|port| {
            format!(
                r#"<script>
const socket = new WebSocket("ws://localhost:{port}");
socket.addEventListener("message", event => {{
    window.location.reload();
}});
</script>"#
            )
        })
    }
}

/// The orchestrator: an ordered registry of named tasks, composed into
/// stages. Tasks are registered once through the [`Builder`] and queried by
/// name afterwards.
pub struct Pipeline {
    tasks: Vec<Task>,
}

impl Pipeline {
    pub fn builder() -> Builder {
        Builder { tasks: Vec::new() }
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.name == name)
    }

    /// Every registered task name, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|task| task.name).collect()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Run a single task by name.
    pub fn run(&self, name: &str, globals: &Globals) -> Result<(), BuildError> {
        let task = self
            .get(name)
            .ok_or_else(|| BuildError::Unknown(name.to_string()))?;

        task.run(globals)
            .map_err(|e| BuildError::Task(task.name.to_string(), e))
    }

    /// Run tasks in order, aborting the remainder on the first failure.
    pub fn run_sequential(&self, names: &[&str], globals: &Globals) -> Result<(), BuildError> {
        for task in self.lookup(names)? {
            task.run(globals)
                .map_err(|e| BuildError::Task(task.name.to_string(), e))?;
        }

        Ok(())
    }

    /// Run tasks concurrently. The stage always waits for every task to
    /// finish; if any failed, the aggregate result is a failure naming each
    /// failed task, but side effects of the succeeded siblings stand.
    pub fn run_parallel(&self, names: &[&str], globals: &Globals) -> Result<(), BuildError> {
        let s = Instant::now();
        let tasks = self.lookup(names)?;

        let bar = ProgressBar::new(tasks.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("invalid progress bar template")
                .progress_chars("#>-"),
        );

        let active = Arc::new(Mutex::new(HashSet::new()));

        let mut failures: Vec<BuildError> = tasks
            .par_iter()
            .map(|task| {
                {
                    let mut active = active.lock().unwrap();
                    active.insert(task.name);
                    bar.set_message(format_active(&active));
                }

                let result = task
                    .run(globals)
                    .map_err(|e| BuildError::Task(task.name.to_string(), e));

                {
                    let mut active = active.lock().unwrap();
                    active.remove(task.name);
                    bar.set_message(format_active(&active));
                    bar.inc(1);
                }

                result
            })
            .filter_map(|result| result.err())
            .collect();

        bar.finish_with_message(format!("Finished tasks {}", io::as_overhead(s)));

        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(BuildError::Stage(failures)),
        }
    }

    /// The default build graph: clean the output root, then every task in
    /// one parallel stage. Terminal on clean failure.
    pub fn build(&self, globals: &Globals) -> Result<(), KarakuriError> {
        io::clean(&globals.config)?;
        self.run_parallel(&self.names(), globals)?;

        Ok(())
    }

    fn lookup<'a>(&'a self, names: &[&str]) -> Result<Vec<&'a Task>, BuildError> {
        names
            .iter()
            .map(|name| {
                self.get(name)
                    .ok_or_else(|| BuildError::Unknown(name.to_string()))
            })
            .collect()
    }
}

fn format_active(active: &HashSet<&str>) -> String {
    const MAX: usize = 5;
    let mut names: Vec<_> = active.iter().copied().collect();
    names.sort_unstable();

    if names.len() <= MAX {
        names.join(", ")
    } else {
        format!("{}… ({} total)", names[..MAX].join(", "), names.len())
    }
}

/// Builder for a [`Pipeline`]: explicit, ordered task registration.
pub struct Builder {
    tasks: Vec<Task>,
}

impl Builder {
    pub fn task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn finish(self) -> Pipeline {
        Pipeline { tasks: self.tasks }
    }
}

#[cfg(test)]
pub(crate) fn test_globals(dir: &std::path::Path) -> Globals {
    let root = camino::Utf8PathBuf::from_path_buf(dir.to_path_buf()) //
        .expect("temp dir is not UTF-8");

    Globals {
        mode: Mode::Build,
        port: None,
        config: Config {
            src: root.join("src"),
            build: root.join("build"),
            http_port: 8080,
            deploy: DeployTarget {
                host: "user@host".into(),
                destination: "site/".into(),
                include: vec!["*.htaccess".into()],
                exclude: vec!["**/Thumbs.db".into(), "**/*.DS_Store".into()],
            },
        },
        data: serde_json::json!({}),
    }
}
