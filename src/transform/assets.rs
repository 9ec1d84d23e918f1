use camino::Utf8Path;

use crate::config::Config;
use crate::task::{Artifact, Selector, Task, rebase};

/// Copy the webfonts verbatim, paths mirrored.
pub fn fonts(config: &Config) -> Task {
    let base = config.src_dir("fonts");

    Task::new(
        "fonts",
        Selector::new(base.clone(), ["*.*"]),
        config.build_dir("fonts"),
    )
    .step("copy", move |_, artifacts| Ok(mirror(artifacts, &base)))
}

pub fn favicon(config: &Config) -> Task {
    let base = config.src.clone();

    Task::new(
        "favicon",
        Selector::new(base.clone(), ["favicon.ico"]),
        config.build.clone(),
    )
    .step("copy", move |_, artifacts| Ok(mirror(artifacts, &base)))
}

fn mirror(artifacts: Vec<Artifact>, base: &Utf8Path) -> Vec<Artifact> {
    artifacts
        .into_iter()
        .map(|artifact| Artifact {
            path: rebase(&artifact.path, base),
            data: artifact.data,
        })
        .collect()
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;
    use crate::test_globals;

    #[test]
    fn test_fonts_copied_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let globals = test_globals(dir.path());
        let fonts_dir = globals.config.src_dir("fonts");

        fs::create_dir_all(&fonts_dir).unwrap();
        fs::write(fonts_dir.join("display.woff2"), b"\x00\x01font").unwrap();

        fonts(&globals.config).run(&globals).unwrap();

        let copied = fs::read(globals.config.build_dir("fonts/display.woff2")).unwrap();
        assert_eq!(copied, b"\x00\x01font");
    }

    #[test]
    fn test_favicon_lands_at_build_root() {
        let dir = tempfile::tempdir().unwrap();
        let globals = test_globals(dir.path());

        fs::create_dir_all(&globals.config.src).unwrap();
        fs::write(globals.config.src.join("favicon.ico"), b"icon").unwrap();

        favicon(&globals.config).run(&globals).unwrap();

        assert_eq!(
            fs::read(globals.config.build_dir("favicon.ico")).unwrap(),
            b"icon",
        );
    }
}
