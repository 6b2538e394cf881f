//! Local SSR and web environments.
//!
//! The SSR environment compiles server render fragments from disk with
//! minijinja; the web environment serves the client HTML template with the
//! reload client injected. Both resolve a logical page name to files under
//! the configured directories.

use crate::error::RenderError;
use crate::host::render::{RenderEntry, SsrEnvironment, WebEnvironment};
use crate::local::reload::inject_reload_script;
use async_trait::async_trait;
use minijinja::{context, Environment};
use std::path::PathBuf;
use std::sync::Arc;

/// Loads server render fragments from a directory.
///
/// A fragment for page `name` lives at `<ssr_dir>/<name>.html.j2`. The file
/// is read and compiled per request, so edits take effect without a restart.
pub struct LocalSsrEnvironment {
    ssr_dir: PathBuf,
}

impl LocalSsrEnvironment {
    /// Create an environment over a fragment directory.
    pub fn new(ssr_dir: PathBuf) -> Self {
        Self { ssr_dir }
    }
}

#[async_trait]
impl SsrEnvironment for LocalSsrEnvironment {
    async fn load_bundle(&self, name: &str) -> Result<Arc<dyn RenderEntry>, RenderError> {
        let path = self.ssr_dir.join(format!("{}.html.j2", name));

        let source =
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| RenderError::BundleLoad {
                    name: name.to_string(),
                    message: format!("{}: {}", path.display(), e),
                })?;

        let mut env = Environment::new();
        env.add_template_owned(name.to_string(), source)
            .map_err(|e| RenderError::BundleLoad {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        Ok(Arc::new(LocalRenderEntry {
            env,
            name: name.to_string(),
        }))
    }
}

/// A compiled render fragment.
struct LocalRenderEntry {
    env: Environment<'static>,
    name: String,
}

impl RenderEntry for LocalRenderEntry {
    fn render(&self) -> Result<String, RenderError> {
        let template = self
            .env
            .get_template(&self.name)
            .map_err(|e| RenderError::Render(e.to_string()))?;

        template
            .render(context! { entry => self.name })
            .map_err(|e| RenderError::Render(e.to_string()))
    }
}

/// Serves the transformed client HTML template.
///
/// The template for page `name` lives at `<root>/<name>.html`; the reload
/// client script is injected so server-rendered pages reload like any other.
pub struct LocalWebEnvironment {
    root: PathBuf,
}

impl LocalWebEnvironment {
    /// Create an environment over the client asset root.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl WebEnvironment for LocalWebEnvironment {
    async fn transformed_html(&self, name: &str) -> Result<String, RenderError> {
        let path = self.root.join(format!("{}.html", name));

        let content =
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| RenderError::TemplateFetch {
                    name: name.to_string(),
                    message: format!("{}: {}", path.display(), e),
                })?;

        let injected = inject_reload_script(content.as_bytes(), "text/html");
        String::from_utf8(injected).map_err(|e| RenderError::TemplateFetch {
            name: name.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ssr_renders_fragment() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("index.html.j2"),
            "<h1>Rendered {{ entry }}</h1>",
        )
        .unwrap();

        let env = LocalSsrEnvironment::new(temp.path().to_path_buf());
        let bundle = env.load_bundle("index").await.unwrap();
        let markup = bundle.render().unwrap();

        assert_eq!(markup, "<h1>Rendered index</h1>");
    }

    #[tokio::test]
    async fn test_ssr_missing_fragment_fails() {
        let temp = TempDir::new().unwrap();
        let env = LocalSsrEnvironment::new(temp.path().to_path_buf());

        let err = env.load_bundle("index").await.unwrap_err();
        assert!(matches!(err, RenderError::BundleLoad { .. }));
    }

    #[tokio::test]
    async fn test_ssr_invalid_template_fails_at_load() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("index.html.j2"), "{% broken").unwrap();

        let env = LocalSsrEnvironment::new(temp.path().to_path_buf());
        let err = env.load_bundle("index").await.unwrap_err();
        assert!(matches!(err, RenderError::BundleLoad { .. }));
    }

    #[tokio::test]
    async fn test_web_serves_template_with_reload_script() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("index.html"),
            "<html><body><!--app-content--></body></html>",
        )
        .unwrap();

        let env = LocalWebEnvironment::new(temp.path().to_path_buf());
        let html = env.transformed_html("index").await.unwrap();

        assert!(html.contains("<!--app-content-->"));
        assert!(html.contains("__devhost_reload__"));
    }

    #[tokio::test]
    async fn test_web_missing_template_fails() {
        let temp = TempDir::new().unwrap();
        let env = LocalWebEnvironment::new(temp.path().to_path_buf());

        let err = env.transformed_html("index").await.unwrap_err();
        assert!(matches!(err, RenderError::TemplateFetch { .. }));
    }
}
