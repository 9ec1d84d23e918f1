use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::config::Config;
use crate::task::{Artifact, Selector, Task};

/// Errors that can occur when compiling stylesheets.
#[derive(Debug, Error)]
pub enum StyleError {
    /// A Sass compilation error occurred.
    #[error("Sass compilation error: {0}")]
    Sass(#[from] Box<grass::Error>),
}

/// Compile the SCSS entrypoint into a single compressed stylesheet at
/// `css/main.min.css`. Partials pulled in through `@use` are resolved by
/// the compiler relative to the entrypoint, so the whole `sass` tree is
/// watched even though only the entrypoint is selected.
pub fn task(config: &Config) -> Task {
    let base = config.src_dir("sass");
    let watch = format!("{base}/**/*.scss");

    Task::new(
        "styles",
        Selector::new(base, ["main.scss"]),
        config.build_dir("css"),
    )
    .step("sass", |_, artifacts| {
        artifacts
            .into_iter()
            .map(|artifact| {
                let opts = grass::Options::default().style(grass::OutputStyle::Compressed);
                let css = grass::from_path(&artifact.path, &opts).map_err(StyleError::Sass)?;

                Ok(Artifact::utf8(min_name(&artifact.path), css))
            })
            .collect()
    })
    .watch(watch)
}

/// `main.scss` → `main.min.css`
fn min_name(path: &Utf8Path) -> Utf8PathBuf {
    let stem = path.file_stem().unwrap_or("main");
    Utf8PathBuf::from(format!("{stem}.min.css"))
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;
    use crate::test_globals;

    #[test]
    fn test_min_name() {
        assert_eq!(min_name(Utf8Path::new("src/sass/main.scss")), "main.min.css");
    }

    #[test]
    fn test_compiles_nested_scss() {
        let dir = tempfile::tempdir().unwrap();
        let globals = test_globals(dir.path());
        let sass = globals.config.src_dir("sass");

        fs::create_dir_all(&sass).unwrap();
        fs::write(sass.join("main.scss"), "a {\n  b { color: red; }\n}\n").unwrap();

        task(&globals.config).run(&globals).unwrap();

        let css = fs::read_to_string(globals.config.build_dir("css/main.min.css")).unwrap();
        assert!(css.contains("color:red"));
    }

    #[test]
    fn test_invalid_scss_fails_the_task() {
        let dir = tempfile::tempdir().unwrap();
        let globals = test_globals(dir.path());
        let sass = globals.config.src_dir("sass");

        fs::create_dir_all(&sass).unwrap();
        fs::write(sass.join("main.scss"), "a { color: ").unwrap();

        assert!(task(&globals.config).run(&globals).is_err());
    }
}
