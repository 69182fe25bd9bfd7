//! Section Render Registry
//!
//! Every section kind owns a prop schema and a pure renderer. The validator
//! reads schemas from here so the two can never disagree.
//!
//! Renderers must not touch the network, the filesystem, the clock or any
//! randomness: identical input yields byte-identical HTML.

mod contact;
mod cta;
mod features;
mod footer;
mod hero;
mod pricing;
mod testimonials;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::{Brand, NavEntry, SectionKind};
use crate::schema::PropSchema;

pub use contact::ContactRenderer;
pub use cta::CtaRenderer;
pub use features::FeaturesRenderer;
pub use footer::FooterRenderer;
pub use hero::HeroRenderer;
pub use pricing::PricingRenderer;
pub use testimonials::TestimonialsRenderer;

/// Palette roles every renderer may reference as CSS custom properties.
pub const REQUIRED_PALETTE_ROLES: &[&str] =
    &["primary", "secondary", "accent", "background", "surface", "text", "muted"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Stylesheet,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    pub kind: AssetKind,
    pub url: String,
}

impl AssetRef {
    pub fn image(url: &str) -> Self {
        Self { kind: AssetKind::Image, url: url.to_string() }
    }

    pub fn stylesheet(url: &str) -> Self {
        Self { kind: AssetKind::Stylesheet, url: url.to_string() }
    }
}

/// Rendered HTML for one section plus the external assets it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub html: String,
    pub assets: Vec<AssetRef>,
}

impl Fragment {
    pub fn new(html: String) -> Self {
        Self { html, assets: vec![] }
    }

    pub fn with_assets(html: String, assets: Vec<AssetRef>) -> Self {
        Self { html, assets }
    }
}

/// What a renderer may know about the page it sits on.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub slug: &'a str,
    pub section_id: &'a str,
    pub nav: &'a [NavEntry],
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{kind} props do not match the renderer contract: {source}")]
    Decode {
        kind: SectionKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("{kind} invariant violated: {reason}")]
    Invariant { kind: SectionKind, reason: String },

    #[error("no renderer registered for {0}")]
    Unregistered(SectionKind),
}

pub trait SectionRenderer: Send + Sync {
    fn kind(&self) -> SectionKind;
    fn schema(&self) -> &'static PropSchema;
    fn render(&self, props: &Value, brand: &Brand, ctx: &PageContext<'_>) -> Result<Fragment, RenderError>;
}

/// Typed view of validated props. Failure here means the schema and the
/// renderer's struct have drifted apart.
pub(crate) fn decode<T: DeserializeOwned>(kind: SectionKind, props: &Value) -> Result<T, RenderError> {
    T::deserialize(props).map_err(|source| RenderError::Decode { kind, source })
}

pub struct RenderRegistry {
    renderers: BTreeMap<SectionKind, Box<dyn SectionRenderer>>,
}

impl RenderRegistry {
    pub fn new() -> Self {
        Self { renderers: BTreeMap::new() }
    }

    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(HeroRenderer));
        registry.register(Box::new(FeaturesRenderer));
        registry.register(Box::new(CtaRenderer));
        registry.register(Box::new(PricingRenderer));
        registry.register(Box::new(TestimonialsRenderer));
        registry.register(Box::new(ContactRenderer));
        registry.register(Box::new(FooterRenderer));
        registry
    }

    pub fn register(&mut self, renderer: Box<dyn SectionRenderer>) {
        self.renderers.insert(renderer.kind(), renderer);
    }

    pub fn contains(&self, kind: SectionKind) -> bool {
        self.renderers.contains_key(&kind)
    }

    pub fn kinds(&self) -> Vec<SectionKind> {
        self.renderers.keys().copied().collect()
    }

    pub fn schema(&self, kind: SectionKind) -> Option<&'static PropSchema> {
        self.renderers.get(&kind).map(|r| r.schema())
    }

    pub fn render(
        &self,
        kind: SectionKind,
        props: &Value,
        brand: &Brand,
        ctx: &PageContext<'_>,
    ) -> Result<Fragment, RenderError> {
        self.renderers
            .get(&kind)
            .ok_or(RenderError::Unregistered(kind))?
            .render(props, brand, ctx)
    }
}

impl Default for RenderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::model::Typography;

    pub fn brand() -> Brand {
        Brand {
            name: "Acme".to_string(),
            description: "Rockets & more".to_string(),
            palette: REQUIRED_PALETTE_ROLES
                .iter()
                .map(|role| (role.to_string(), "#000000".to_string()))
                .collect(),
            typography: Typography {
                heading_font: "Inter".to_string(),
                body_font: "Inter".to_string(),
                font_url: None,
            },
            token_sources: BTreeMap::new(),
        }
    }

    pub fn nav() -> Vec<NavEntry> {
        vec![
            NavEntry { slug: "home".into(), title: "Home".into(), href: "index.html".into() },
            NavEntry { slug: "about".into(), title: "About".into(), href: "about.html".into() },
        ]
    }

    pub fn render(kind: SectionKind, props: Value) -> Result<Fragment, RenderError> {
        let nav = nav();
        let ctx = PageContext { slug: "home", section_id: "home-test-0", nav: &nav };
        RenderRegistry::builtin().render(kind, &props, &brand(), &ctx)
    }
}
