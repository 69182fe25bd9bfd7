//! Compilation Pipeline - Single Entry Point
//!
//! CRITICAL: build MUST call validate internally. Raw JSON never reaches
//! the normalizer or the renderers without passing the validator first.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::compiler::{compile_site, Revision};
use crate::diff::{diff, PagePatch};
use crate::model::{SiteSpec, SiteSpecDraft, TemplateSlug};
use crate::normalize::normalize;
use crate::render::RenderRegistry;
use crate::store::{ProjectId, RevisionStore, StoreError};
use crate::templates::{Template, TemplateRegistry};
use crate::validation::{IssueKind, ValidationIssue, ValidationResult, Validator};
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("schema validation failed with {} issue(s)", .0.len())]
    Schema(Vec<ValidationIssue>),

    #[error("unsupported template: {0}")]
    UnsupportedTemplate(TemplateSlug),

    #[error("Template version {0} requires engine >= {1}, current is {2}")]
    EngineVersionMismatch(String, String, String),

    #[error("Compilation error: {0}")]
    CompilationError(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl PipelineError {
    /// Validation issues to feed back to the generator, if any.
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            PipelineError::Schema(issues) => issues,
            _ => &[],
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, PipelineError::Store(StoreError::StaleRevision { .. }))
    }
}

/// Result of one successful build.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    pub revision: Revision,
    /// Section patches against the previous revision, when there was one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patches: Option<Vec<PagePatch>>,
    /// Brand, template, entry page or navigation changed: every page must
    /// be re-rendered even where no section changed.
    pub full_render: bool,
}

/// The compilation pipeline - single entry point for all site operations
pub struct SitePipeline {
    templates: TemplateRegistry,
    renderers: RenderRegistry,
    validator: Validator,
}

impl SitePipeline {
    pub fn new(templates: TemplateRegistry, renderers: RenderRegistry) -> Self {
        Self {
            templates,
            renderers,
            validator: Validator::new(),
        }
    }

    /// List all available template families
    pub fn list_templates(&self) -> Vec<&Template> {
        self.templates.list()
    }

    pub fn get_template(&self, slug: TemplateSlug) -> Option<&Template> {
        self.templates.get(slug)
    }

    pub fn renderers(&self) -> &RenderRegistry {
        &self.renderers
    }

    /// This is the ONLY validation entry point.
    pub fn validate(&self, raw: &Value) -> ValidationResult {
        self.validator.validate(raw, &self.renderers)
    }

    /// Validate a JSON document given as text. Syntax errors are reported
    /// as a single issue at the document root.
    pub fn validate_str(&self, raw: &str) -> ValidationResult {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => self.validate(&value),
            Err(e) => ValidationResult::Invalid(vec![ValidationIssue::new(
                "",
                IssueKind::TypeMismatch,
                format!("document is not valid JSON: {}", e),
            )]),
        }
    }

    pub fn normalize(&self, draft: SiteSpecDraft, previous: Option<&SiteSpec>) -> Result<SiteSpec, PipelineError> {
        let template = self.template_for(draft.template_slug)?;
        Ok(normalize(draft, previous, template, &self.renderers))
    }

    pub fn compile_site(&self, spec: &SiteSpec) -> Result<Revision, PipelineError> {
        let template = self.template_for(spec.template_slug)?;
        Ok(compile_site(&self.renderers, spec, template.layout)?)
    }

    pub fn diff(&self, previous: &SiteSpec, next: &SiteSpec) -> Vec<PagePatch> {
        diff(previous, next)
    }

    /// Validate, normalize against `previous`, compile, and diff.
    ///
    /// CRITICAL: This ALWAYS validates first. No bypass possible.
    pub fn build(&self, raw: &Value, previous: Option<&Revision>) -> Result<Build, PipelineError> {
        let draft = self.validate(raw).into_result().map_err(|issues| {
            tracing::debug!(issues = issues.len(), "draft rejected");
            PipelineError::Schema(issues)
        })?;

        let previous_spec = previous.map(|r| &r.spec);
        let spec = self.normalize(draft, previous_spec)?;
        let revision = self.compile_site(&spec)?;

        let (patches, full_render) = match previous_spec {
            None => (None, true),
            Some(prev) => (Some(diff(prev, &spec)), needs_full_render(prev, &spec)),
        };

        tracing::info!(
            revision_id = revision.revision_id,
            pages = revision.artifacts.len(),
            warnings = revision.warnings().count(),
            full_render,
            "built revision"
        );
        Ok(Build { revision, patches, full_render })
    }

    /// Build against the project's latest revision and commit the result.
    ///
    /// A concurrent commit between the read and the write surfaces as
    /// `StaleRevision`; the caller re-fetches and retries.
    pub fn regenerate(
        &self,
        store: &dyn RevisionStore,
        project: ProjectId,
        raw: &Value,
    ) -> Result<Build, PipelineError> {
        let latest = store.latest(project)?;
        let previous = latest.as_deref().map(|stored| &stored.revision);
        let expected = previous.map(|r| r.revision_id);

        let build = self.build(raw, previous)?;
        store.commit(project, expected, build.revision.clone())?;
        Ok(build)
    }

    fn template_for(&self, slug: TemplateSlug) -> Result<&Template, PipelineError> {
        let template = self
            .templates
            .get(slug)
            .ok_or(PipelineError::UnsupportedTemplate(slug))?;
        self.check_engine_version(template)?;
        Ok(template)
    }

    fn check_engine_version(&self, template: &Template) -> Result<(), PipelineError> {
        let engine_ver = semver::Version::parse(ENGINE_VERSION)
            .map_err(|_| PipelineError::CompilationError("Invalid engine version".into()))?;
        let min_ver = semver::Version::parse(&template.engine_min_version)
            .map_err(|_| PipelineError::CompilationError("Invalid template min version".into()))?;

        if engine_ver < min_ver {
            return Err(PipelineError::EngineVersionMismatch(
                template.template_version.clone(),
                template.engine_min_version.clone(),
                ENGINE_VERSION.to_string(),
            ));
        }

        Ok(())
    }
}

fn needs_full_render(previous: &SiteSpec, next: &SiteSpec) -> bool {
    previous.template_slug != next.template_slug
        || previous.brand != next.brand
        || previous.entry_page != next.entry_page
        || previous.nav() != next.nav()
}

impl Default for SitePipeline {
    fn default() -> Self {
        Self::new(TemplateRegistry::builtin(), RenderRegistry::builtin())
    }
}
