//! Page Compiler - Sections to Documents
//!
//! A section that fails to render is replaced by a marked placeholder and
//! reported as a warning. The rest of the page is still produced.

use maud::{html, Markup, PreEscaped, DOCTYPE};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::hashing::{compute_bundle_hash, compute_spec_hash, sha256_hex};
use crate::model::{page_path, Brand, NavEntry, Page, SectionId, SectionKind, SiteSpec};
use crate::render::{AssetRef, PageContext, RenderError, RenderRegistry, REQUIRED_PALETTE_ROLES};
use crate::templates::LayoutTokens;
use crate::tokens::system_color;
use crate::ENGINE_VERSION;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialRenderWarning {
    pub page_slug: String,
    pub section_id: SectionId,
    pub kind: SectionKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedArtifact {
    pub page_slug: String,
    pub path: String,
    pub html: String,
    pub section_ids: Vec<SectionId>,
    pub assets: Vec<AssetRef>,
    pub revision_id: u64,
    pub content_hash: String,
    #[serde(default)]
    pub warnings: Vec<PartialRenderWarning>,
}

/// Immutable compile result for one SiteSpec revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    pub revision_id: u64,
    pub spec: SiteSpec,
    pub artifacts: Vec<RenderedArtifact>,
    pub spec_hash: String,
    pub bundle_hash: String,
}

impl Revision {
    pub fn artifact(&self, page_slug: &str) -> Option<&RenderedArtifact> {
        self.artifacts.iter().find(|a| a.page_slug == page_slug)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &PartialRenderWarning> {
        self.artifacts.iter().flat_map(|a| a.warnings.iter())
    }
}

pub struct PageCompiler<'a> {
    renderers: &'a RenderRegistry,
    layout: LayoutTokens,
    revision_id: u64,
    entry_page: &'a str,
}

impl<'a> PageCompiler<'a> {
    pub fn new(renderers: &'a RenderRegistry, layout: LayoutTokens, revision_id: u64, entry_page: &'a str) -> Self {
        Self { renderers, layout, revision_id, entry_page }
    }

    pub fn compile_page(&self, page: &Page, brand: &Brand, nav: &[NavEntry]) -> RenderedArtifact {
        let mut fragments = Vec::with_capacity(page.sections.len());
        let mut assets: Vec<AssetRef> = vec![];
        let mut warnings = vec![];

        if let Some(url) = &brand.typography.font_url {
            assets.push(AssetRef::stylesheet(url));
        }

        for section in &page.sections {
            let ctx = PageContext { slug: &page.slug, section_id: &section.id, nav };
            let rendered = panic::catch_unwind(AssertUnwindSafe(|| {
                self.renderers.render(section.kind, &section.props, brand, &ctx)
            }))
            .unwrap_or_else(|payload| {
                Err(RenderError::Invariant {
                    kind: section.kind,
                    reason: format!("renderer panicked: {}", panic_message(payload.as_ref())),
                })
            });
            match rendered {
                Ok(fragment) => {
                    for asset in fragment.assets {
                        if !assets.contains(&asset) {
                            assets.push(asset);
                        }
                    }
                    fragments.push(fragment.html);
                }
                Err(error) => {
                    tracing::warn!(
                        page = %page.slug,
                        section = %section.id,
                        kind = %section.kind,
                        %error,
                        "section failed to render, substituting placeholder"
                    );
                    warnings.push(PartialRenderWarning {
                        page_slug: page.slug.clone(),
                        section_id: section.id.clone(),
                        kind: section.kind,
                        message: error.to_string(),
                    });
                    fragments.push(placeholder(&section.id, section.kind).into_string());
                }
            }
        }

        let html = self.shell(page, brand, nav, &fragments).into_string();
        RenderedArtifact {
            page_slug: page.slug.clone(),
            path: page_path(&page.slug, page.slug == self.entry_page),
            content_hash: sha256_hex(html.as_bytes()),
            html,
            section_ids: page.sections.iter().map(|s| s.id.clone()).collect(),
            assets,
            revision_id: self.revision_id,
            warnings,
        }
    }

    fn shell(&self, page: &Page, brand: &Brand, nav: &[NavEntry], fragments: &[String]) -> Markup {
        let home = page_path(self.entry_page, true);
        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="utf-8";
                    meta name="viewport" content="width=device-width, initial-scale=1";
                    title { (page.title) " | " (brand.name) }
                    @if !brand.description.is_empty() {
                        meta name="description" content=(brand.description);
                    }
                    meta name="generator" content={ "sitespec " (ENGINE_VERSION) };
                    @if let Some(url) = &brand.typography.font_url {
                        link rel="stylesheet" href=(url);
                    }
                    style { (PreEscaped(stylesheet(brand, &self.layout))) }
                }
                body data-page=(page.slug) {
                    header.site-header {
                        div.container.header-inner {
                            a.site-brand href=(home) { (brand.name) }
                            nav.site-nav aria-label="Primary" {
                                ul {
                                    @for entry in nav {
                                        li {
                                            @if entry.slug == page.slug {
                                                a href=(entry.href) aria-current="page" { (entry.title) }
                                            } @else {
                                                a href=(entry.href) { (entry.title) }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                    @for fragment in fragments {
                        (PreEscaped(fragment.as_str()))
                    }
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Visible stand-in for a section whose renderer failed.
fn placeholder(section_id: &str, kind: SectionKind) -> Markup {
    html! {
        section.section.section-placeholder id=(section_id) data-section-id=(section_id) data-kind=(kind.as_str()) data-render-error="true" role="note" {
            div.container {
                p.placeholder-title { "This " (kind.as_str()) " section could not be displayed." }
                p.placeholder-detail { "It will reappear once its content is corrected." }
            }
        }
    }
}

/// Compile every page of `spec`. Pages are compiled in parallel; artifact
/// order follows page order.
pub fn compile_site(
    renderers: &RenderRegistry,
    spec: &SiteSpec,
    layout: LayoutTokens,
) -> Result<Revision, serde_json::Error> {
    let nav = spec.nav();
    let compiler = PageCompiler::new(renderers, layout, spec.revision_id, &spec.entry_page);

    let artifacts: Vec<RenderedArtifact> = spec
        .pages
        .par_iter()
        .map(|page| compiler.compile_page(page, &spec.brand, &nav))
        .collect();

    let warnings: usize = artifacts.iter().map(|a| a.warnings.len()).sum();
    tracing::debug!(
        revision_id = spec.revision_id,
        pages = artifacts.len(),
        warnings,
        "compiled site"
    );

    Ok(Revision {
        revision_id: spec.revision_id,
        spec_hash: compute_spec_hash(spec)?,
        bundle_hash: compute_bundle_hash(&artifacts),
        spec: spec.clone(),
        artifacts,
    })
}

fn stylesheet(brand: &Brand, layout: &LayoutTokens) -> String {
    let mut vars = String::new();
    for (role, value) in &brand.palette {
        if !is_css_ident(role) {
            continue;
        }
        let color = if is_hex_color(value) {
            value.as_str()
        } else if REQUIRED_PALETTE_ROLES.contains(&role.as_str()) {
            system_color(role)
        } else {
            continue;
        };
        vars.push_str(&format!("--color-{}:{};", role, color));
    }
    vars.push_str(&format!(
        "--font-heading:'{}',system-ui,sans-serif;--font-body:'{}',system-ui,sans-serif;",
        css_font(&brand.typography.heading_font),
        css_font(&brand.typography.body_font),
    ));
    vars.push_str(&format!(
        "--max-width:{}px;--radius:{}px;--section-spacing:{}px;",
        layout.max_width, layout.radius, layout.section_spacing
    ));

    format!(":root{{{}}}{}", vars, BASE_CSS)
}

fn is_css_ident(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn is_hex_color(s: &str) -> bool {
    match s.strip_prefix('#') {
        Some(hex) => matches!(hex.len(), 3 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

fn css_font(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '-')
        .collect()
}

const BASE_CSS: &str = "*{box-sizing:border-box}\
body{margin:0;background:var(--color-background);color:var(--color-text);font-family:var(--font-body);line-height:1.6}\
h1,h2,h3{font-family:var(--font-heading);line-height:1.2;margin:0 0 16px}\
img{max-width:100%;height:auto}\
.container{max-width:var(--max-width);margin:0 auto;padding:0 24px}\
.section{padding:var(--section-spacing) 0}\
.site-header{padding:16px 0;border-bottom:1px solid var(--color-surface)}\
.header-inner,.footer-inner{display:flex;justify-content:space-between;align-items:center;gap:24px;flex-wrap:wrap}\
.site-brand{font-weight:700;color:var(--color-text);text-decoration:none}\
.site-nav ul,.footer-nav ul,.contact-channels{display:flex;gap:16px;list-style:none;margin:0;padding:0}\
.site-nav a,.footer-nav a{color:var(--color-muted);text-decoration:none}\
.site-nav a[aria-current],.footer-nav a[aria-current]{color:var(--color-primary)}\
.button{display:inline-block;padding:12px 24px;border-radius:var(--radius);font-weight:600;text-decoration:none;border:0;cursor:pointer}\
.button-primary{background:var(--color-primary);color:var(--color-background)}\
.button-inverse{background:var(--color-background);color:var(--color-primary)}\
.hero-inner{display:grid;gap:48px;grid-template-columns:repeat(auto-fit,minmax(320px,1fr));align-items:center}\
.hero-headline{font-size:3rem}\
.hero-subheadline,.section-subtitle{color:var(--color-muted);font-size:1.25rem}\
.hero-image{border-radius:var(--radius)}\
.feature-grid,.pricing-grid,.testimonial-grid{display:grid;gap:24px;grid-template-columns:repeat(auto-fit,minmax(240px,1fr));list-style:none;padding:0}\
.feature-card,.pricing-tier,.testimonial{background:var(--color-surface);border-radius:var(--radius);padding:24px;margin:0}\
.feature-icon{font-size:1.5rem}\
.pricing-tier-highlighted{outline:2px solid var(--color-accent)}\
.tier-amount{font-size:2rem;font-weight:700}\
.tier-period{color:var(--color-muted)}\
.cta{background:var(--color-primary);color:var(--color-background);text-align:center}\
.testimonial-avatar{border-radius:50%}\
.testimonial-role{display:block;color:var(--color-muted)}\
.contact-form{display:grid;gap:16px;max-width:480px;margin-top:24px}\
.contact-form input,.contact-form textarea{display:block;width:100%;padding:8px;border-radius:var(--radius);border:1px solid var(--color-muted)}\
.site-footer{background:var(--color-surface)}\
.footer-copyright{color:var(--color-muted)}\
.section-placeholder{border:2px dashed var(--color-accent);text-align:center;color:var(--color-muted)}";
