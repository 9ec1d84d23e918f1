use minijinja::{Environment, path_loader};
use thiserror::Error;

use crate::config::Config;
use crate::task::{Artifact, Selector, Task, rebase};

/// Errors that can occur when rendering page templates.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),
}

/// Render every template under `views/pages/` with the site data document
/// as context, mirroring the page tree into the build root. The loader is
/// rooted at `views/`, so pages can `{% extends %}` layouts and
/// `{% include %}` partials kept next to them.
///
/// In watch mode the live-reload snippet is spliced into each page before
/// the closing `</body>` tag.
pub fn task(config: &Config) -> Task {
    let views = config.src_dir("views");
    let pages = views.join("pages");
    let watch = format!("{views}/**/*.jinja");

    Task::new(
        "pages",
        Selector::new(pages.clone(), ["**/*.jinja"]),
        config.build.clone(),
    )
    .step("render", move |globals, artifacts| {
        let mut env = Environment::new();
        env.set_loader(path_loader(&views));

        let ctx = minijinja::Value::from_serialize(&globals.data);

        artifacts
            .into_iter()
            .map(|artifact| {
                let rel = rebase(&artifact.path, &pages);

                let template = env
                    .get_template(&format!("pages/{rel}"))
                    .map_err(PageError::Template)?;
                let mut html = template.render(&ctx).map_err(PageError::Template)?;

                if let Some(script) = globals.refresh_script() {
                    html = inject_before_body_end(&html, &script);
                }

                Ok(Artifact::utf8(rel.with_extension("html"), html))
            })
            .collect()
    })
    .watch(watch)
}

/// Splice `snippet` in right before the closing `</body>` tag, or append it
/// when the page has none.
fn inject_before_body_end(html: &str, snippet: &str) -> String {
    match html.rfind("</body>") {
        Some(at) => format!("{}{}{}", &html[..at], snippet, &html[at..]),
        None => format!("{html}{snippet}"),
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;
    use crate::test_globals;

    fn write_views(globals: &crate::Globals) {
        let views = globals.config.src_dir("views");

        fs::create_dir_all(views.join("layouts")).unwrap();
        fs::create_dir_all(views.join("pages/about")).unwrap();

        fs::write(
            views.join("layouts/base.jinja"),
            "<html><body>{% block content %}{% endblock %}</body></html>",
        )
        .unwrap();

        fs::write(
            views.join("pages/index.jinja"),
            "{% extends \"layouts/base.jinja\" %}{% block content %}<h1>{{ title }}</h1>{% endblock %}",
        )
        .unwrap();

        fs::write(
            views.join("pages/about/index.jinja"),
            "<html><body>{{ company.name }}</body></html>",
        )
        .unwrap();
    }

    #[test]
    fn test_renders_data_into_mirrored_pages() {
        let dir = tempfile::tempdir().unwrap();
        let mut globals = test_globals(dir.path());
        globals.data = serde_json::json!({
            "title": "Beauty Force",
            "company": { "name": "BF Ltd" },
        });

        write_views(&globals);
        task(&globals.config).run(&globals).unwrap();

        let index = fs::read_to_string(globals.config.build_dir("index.html")).unwrap();
        assert!(index.contains("<h1>Beauty Force</h1>"));

        let about = fs::read_to_string(globals.config.build_dir("about/index.html")).unwrap();
        assert!(about.contains("BF Ltd"));
    }

    #[test]
    fn test_watch_mode_injects_reload_snippet() {
        let dir = tempfile::tempdir().unwrap();
        let mut globals = test_globals(dir.path());
        globals.data = serde_json::json!({ "title": "x", "company": { "name": "y" } });
        globals.port = Some(1337);

        write_views(&globals);
        task(&globals.config).run(&globals).unwrap();

        let index = fs::read_to_string(globals.config.build_dir("index.html")).unwrap();
        let at_script = index.find("ws://localhost:1337").unwrap();
        let at_close = index.find("</body>").unwrap();
        assert!(at_script < at_close);
    }

    #[test]
    fn test_missing_key_fails_the_task() {
        let dir = tempfile::tempdir().unwrap();
        let mut globals = test_globals(dir.path());
        globals.data = serde_json::json!({ "title": "x" });

        write_views(&globals);
        // `company.name` on an undefined value is a render error, not empty
        // output.
        assert!(task(&globals.config).run(&globals).is_err());
    }

    #[test]
    fn test_inject_before_body_end() {
        assert_eq!(
            inject_before_body_end("<body>hi</body>", "<script>s</script>"),
            "<body>hi<script>s</script></body>",
        );
        assert_eq!(
            inject_before_body_end("no body", "<script>s</script>"),
            "no body<script>s</script>",
        );
    }
}
