//! The declarative part of the pipeline: fixed project layout, the deploy
//! target, and the ordered task registry. Everything else in the crate is
//! generic orchestration that never mentions a concrete path.

use crate::Pipeline;
use crate::config::{Config, DeployTarget};
use crate::transform;

/// Port the dev server listens on.
const HTTP_PORT: u16 = 8080;

pub fn config() -> Config {
    Config {
        src: "src".into(),
        build: "build".into(),
        http_port: HTTP_PORT,
        deploy: DeployTarget {
            host: "9162345584@beautyforce.ru".into(),
            destination: "domains/beautyforce.ru/".into(),
            include: vec!["*.htaccess".into()],
            exclude: vec!["**/Thumbs.db".into(), "**/*.DS_Store".into()],
        },
    }
}

/// Register every task, in the order they run inside the default parallel
/// stage. No two tasks write overlapping output paths.
pub fn pipeline(config: &Config) -> Pipeline {
    Pipeline::builder()
        .task(transform::styles::task(config))
        .task(transform::sprite::task(config))
        .task(transform::scripts::task(config))
        .task(transform::pages::task(config))
        .task(transform::images::task(config))
        .task(transform::assets::favicon(config))
        .task(transform::assets::fonts(config))
        .finish()
}
