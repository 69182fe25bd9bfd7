//! SiteSpec Data Model
//!
//! Drafts are what the validator hands out; `SiteSpec` is what the
//! normalizer produces and everything downstream consumes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::tokens::TokenAuthority;

pub type SectionId = String;
pub type PageSlug = String;
pub type Palette = BTreeMap<String, String>;

/// Supported template families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateSlug {
    Startup,
    Portfolio,
    Saas,
    Agency,
    Restaurant,
}

impl TemplateSlug {
    pub const ALL: [TemplateSlug; 5] = [
        TemplateSlug::Startup,
        TemplateSlug::Portfolio,
        TemplateSlug::Saas,
        TemplateSlug::Agency,
        TemplateSlug::Restaurant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateSlug::Startup => "startup",
            TemplateSlug::Portfolio => "portfolio",
            TemplateSlug::Saas => "saas",
            TemplateSlug::Agency => "agency",
            TemplateSlug::Restaurant => "restaurant",
        }
    }
}

impl fmt::Display for TemplateSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateSlug {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplateSlug::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// The fixed set of renderable building blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Hero,
    Features,
    Cta,
    Pricing,
    Testimonials,
    Contact,
    Footer,
}

impl SectionKind {
    pub const ALL: [SectionKind; 7] = [
        SectionKind::Hero,
        SectionKind::Features,
        SectionKind::Cta,
        SectionKind::Pricing,
        SectionKind::Testimonials,
        SectionKind::Contact,
        SectionKind::Footer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Hero => "hero",
            SectionKind::Features => "features",
            SectionKind::Cta => "cta",
            SectionKind::Pricing => "pricing",
            SectionKind::Testimonials => "testimonials",
            SectionKind::Contact => "contact",
            SectionKind::Footer => "footer",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typography {
    pub heading_font: String,
    pub body_font: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_url: Option<String>,
}

/// Partial typography as it arrives in a draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypographyDraft {
    #[serde(default)]
    pub heading_font: Option<String>,
    #[serde(default)]
    pub body_font: Option<String>,
    #[serde(default)]
    pub font_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub palette: Palette,
    pub typography: Typography,
    #[serde(default)]
    pub token_sources: BTreeMap<String, TokenAuthority>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub palette: Palette,
    #[serde(default)]
    pub typography: Option<TypographyDraft>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub kind: SectionKind,
    pub props: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDraft {
    #[serde(default)]
    pub id: Option<SectionId>,
    pub kind: SectionKind,
    #[serde(default)]
    pub props: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub slug: PageSlug,
    pub title: String,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDraft {
    pub slug: PageSlug,
    pub title: String,
    #[serde(default)]
    pub sections: Vec<SectionDraft>,
}

/// A validated, normalized site description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSpec {
    pub template_slug: TemplateSlug,
    pub brand: Brand,
    pub pages: Vec<Page>,
    pub entry_page: PageSlug,
    pub revision_id: u64,
}

impl SiteSpec {
    pub fn page(&self, slug: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.slug == slug)
    }

    pub fn entry(&self) -> Option<&Page> {
        self.page(&self.entry_page)
    }

    /// Navigation shared by every page, in page order.
    pub fn nav(&self) -> Vec<NavEntry> {
        self.pages
            .iter()
            .map(|p| NavEntry {
                slug: p.slug.clone(),
                title: p.title.clone(),
                href: page_path(&p.slug, p.slug == self.entry_page),
            })
            .collect()
    }
}

/// Structurally valid document that has not been normalized yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSpecDraft {
    pub template_slug: TemplateSlug,
    pub brand: BrandDraft,
    pub pages: Vec<PageDraft>,
    #[serde(default)]
    pub entry_page: Option<PageSlug>,
    #[serde(default)]
    pub revision_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavEntry {
    pub slug: PageSlug,
    pub title: String,
    pub href: String,
}

/// Output file for a page: the entry page is the site index.
pub fn page_path(slug: &str, is_entry: bool) -> String {
    if is_entry {
        "index.html".to_string()
    } else {
        format!("{}.html", slug)
    }
}
