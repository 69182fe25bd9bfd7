//! SiteSpec Core - Site Specification Compiler
//!
//! # The Five Laws (Non-Negotiable)
//! 1. Nothing Renders Unvalidated
//! 2. Section Identity Survives Regeneration
//! 3. Same Revision, Same Bytes
//! 4. One Broken Section Never Breaks a Page
//! 5. History Is Append-Only

pub mod model;
pub mod schema;
pub mod templates;
pub mod tokens;
pub mod validation;
pub mod render;
pub mod normalize;
pub mod hashing;
pub mod compiler;
pub mod diff;
pub mod store;
pub mod pipeline;

pub use model::{Brand, Page, Section, SectionKind, SiteSpec, SiteSpecDraft, TemplateSlug};
pub use templates::{Template, TemplateRegistry};
pub use tokens::TokenAuthority;
pub use validation::{IssueKind, ValidationIssue, ValidationResult, ValidationRule, Validator};
pub use render::{Fragment, RenderError, RenderRegistry, SectionRenderer};
pub use compiler::{compile_site, PartialRenderWarning, RenderedArtifact, Revision};
pub use diff::{diff, PagePatch, PatchOp};
pub use hashing::{canonical_json, compute_spec_hash};
pub use store::{FileRevisionStore, InMemoryRevisionStore, ProjectId, RevisionStore, StoreError};
pub use pipeline::{Build, PipelineError, SitePipeline};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
