//! Deployment-configurable path remapping.
//!
//! Deployments remap paths between the catalog's view and the virtual
//! filesystem's view (prefix swaps, first-letter home buckets). The
//! transform is a tera template compiled once at construction; the input
//! path is exposed as `{{ path }}`, so the identity transform is the
//! default `{{ path }}`.

use cellar_common::Error;

const TEMPLATE_NAME: &str = "path";

pub struct PathTemplate {
    tera: tera::Tera,
}

impl PathTemplate {
    /// Compile failures are configuration errors and abort construction.
    pub fn compile(source: &str) -> Result<Self, Error> {
        let mut tera = tera::Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, source)
            .map_err(|e| Error::InvalidConfig(format!("invalid path template: {e}")))?;
        Ok(Self { tera })
    }

    /// Render failures at request time indicate a misconfigured
    /// deployment template and surface as internal errors.
    pub fn render(&self, path: &str) -> Result<String, Error> {
        let mut ctx = tera::Context::new();
        ctx.insert("path", path);
        self.tera
            .render(TEMPLATE_NAME, &ctx)
            .map_err(|e| Error::internal("path template rendering failed", e))
    }
}
