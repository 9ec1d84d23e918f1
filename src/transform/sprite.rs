use camino::Utf8PathBuf;
use thiserror::Error;

use crate::config::Config;
use crate::task::{Artifact, Selector, Task};

/// Errors that can occur when assembling the icon sprite.
#[derive(Debug, Error)]
pub enum SpriteError {
    #[error("'{0}' is not valid UTF-8")]
    Utf8(Utf8PathBuf),

    #[error("'{0}' does not contain an <svg> element")]
    Markup(Utf8PathBuf),
}

/// Collapse every icon under `svg/` into a single `img/sprite.svg` of
/// `<symbol>` elements, addressable as `sprite.svg#<file-stem>`.
pub fn task(config: &Config) -> Task {
    let base = config.src_dir("svg");
    let watch = format!("{base}/*.svg");

    Task::new(
        "sprite",
        Selector::new(base, ["*.svg"]),
        config.build_dir("img"),
    )
    .step("sprite", |_, artifacts| {
        let mut symbols = String::new();

        for artifact in artifacts {
            let Artifact { path, data } = artifact;

            let text = data
                .into_utf8()
                .map_err(|_| SpriteError::Utf8(path.clone()))?;
            let stem = path.file_stem().unwrap_or("icon");

            let symbol =
                symbol(stem, &minify(&text)).ok_or_else(|| SpriteError::Markup(path.clone()))?;
            symbols.push_str(&symbol);
        }

        Ok(vec![Artifact::utf8(
            "sprite.svg",
            format!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" style="display:none">{symbols}</svg>"#
            ),
        )])
    })
    .watch(watch)
}

/// Strip the XML declaration, doctype and comments, and collapse formatting
/// whitespace.
fn minify(svg: &str) -> String {
    let svg = strip_blocks(svg, "<!--", "-->");
    let svg = strip_blocks(&svg, "<?", "?>");
    let svg = strip_blocks(&svg, "<!DOCTYPE", ">");
    let svg = strip_blocks(&svg, "<!doctype", ">");

    let collapsed = svg.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.replace("> <", "><")
}

fn strip_blocks(s: &str, open: &str, close: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(at) = rest.find(open) {
        out.push_str(&rest[..at]);
        match rest[at..].find(close) {
            Some(end) => rest = &rest[at + end + close.len()..],
            // unterminated block runs to the end of input
            None => rest = "",
        }
    }

    out.push_str(rest);
    out
}

/// Rewrap the root `<svg>` element of one icon as a `<symbol>` carrying the
/// original `viewBox`.
fn symbol(id: &str, svg: &str) -> Option<String> {
    let open = svg.find("<svg")?;
    let rest = &svg[open..];
    let attrs_end = rest.find('>')?;
    let attrs = rest[4..attrs_end].trim_end_matches('/');

    let inner = match rest.rfind("</svg>") {
        Some(close) if close > attrs_end => &rest[attrs_end + 1..close],
        // self-closing or malformed root carries no content
        _ => "",
    };

    let viewbox = attr_value(attrs, "viewBox")
        .map(|v| format!(r#" viewBox="{v}""#))
        .unwrap_or_default();

    Some(format!(r#"<symbol id="{id}"{viewbox}>{inner}</symbol>"#))
}

/// Extract a double-quoted attribute value.
fn attr_value<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let at = attrs.find(&format!("{name}=\""))?;
    let rest = &attrs[at + name.len() + 2..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;
    use crate::test_globals;

    #[test]
    fn test_minify_strips_decl_and_comments() {
        let svg = "<?xml version=\"1.0\"?>\n<!-- a comment -->\n<svg>\n  <path d=\"M 0 0\"/>\n</svg>\n";
        assert_eq!(minify(svg), r#"<svg><path d="M 0 0"/></svg>"#);
    }

    #[test]
    fn test_symbol_keeps_viewbox_and_content() {
        let svg = r#"<svg xmlns="x" viewBox="0 0 24 24"><path d="M1 1"/></svg>"#;
        assert_eq!(
            symbol("menu", svg).unwrap(),
            r#"<symbol id="menu" viewBox="0 0 24 24"><path d="M1 1"/></symbol>"#,
        );
    }

    #[test]
    fn test_symbol_without_svg_root() {
        assert!(symbol("x", "<div>nope</div>").is_none());
    }

    #[test]
    fn test_sprite_contains_one_symbol_per_icon() {
        let dir = tempfile::tempdir().unwrap();
        let globals = test_globals(dir.path());
        let svg = globals.config.src_dir("svg");

        fs::create_dir_all(&svg).unwrap();
        fs::write(
            svg.join("arrow.svg"),
            r#"<svg viewBox="0 0 16 16"><path d="M0 0"/></svg>"#,
        )
        .unwrap();
        fs::write(
            svg.join("cross.svg"),
            r#"<svg viewBox="0 0 16 16"><path d="M1 1"/></svg>"#,
        )
        .unwrap();

        task(&globals.config).run(&globals).unwrap();

        let sprite = fs::read_to_string(globals.config.build_dir("img/sprite.svg")).unwrap();
        assert!(sprite.contains(r#"<symbol id="arrow""#));
        assert!(sprite.contains(r#"<symbol id="cross""#));
        assert!(sprite.starts_with("<svg"));
    }
}
