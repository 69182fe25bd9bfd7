//! Token Authority System
//!
//! Brand tokens resolve brand -> template -> system. Every resolved token
//! records which layer supplied it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{BrandDraft, Palette, Typography, TypographyDraft};
use crate::render::REQUIRED_PALETTE_ROLES;
use crate::templates::Template;

/// Where a resolved token value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenAuthority {
    /// Engine fallback
    #[default]
    System,
    /// Template family defaults
    Template,
    /// Supplied by the draft
    Brand,
}

pub const SYSTEM_FONT: &str = "system-ui";

pub fn system_color(role: &str) -> &'static str {
    match role {
        "primary" => "#2563eb",
        "secondary" => "#475569",
        "accent" => "#f59e0b",
        "background" => "#ffffff",
        "surface" => "#f8fafc",
        "text" => "#111827",
        "muted" => "#6b7280",
        _ => "#000000",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPalette {
    pub colors: Palette,
    pub sources: BTreeMap<String, TokenAuthority>,
}

/// Fully populate the palette. Extra brand roles are kept as-is.
pub fn resolve_palette(brand: &BrandDraft, template: &Template) -> ResolvedPalette {
    let mut colors = Palette::new();
    let mut sources = BTreeMap::new();

    for role in REQUIRED_PALETTE_ROLES {
        let (value, authority) = match (brand.palette.get(*role), template.palette.get(*role)) {
            (Some(v), _) => (v.clone(), TokenAuthority::Brand),
            (None, Some(v)) => (v.clone(), TokenAuthority::Template),
            (None, None) => (system_color(role).to_string(), TokenAuthority::System),
        };
        colors.insert(role.to_string(), value);
        sources.insert(role.to_string(), authority);
    }

    for (role, value) in &brand.palette {
        if !colors.contains_key(role) {
            colors.insert(role.clone(), value.clone());
            sources.insert(role.clone(), TokenAuthority::Brand);
        }
    }

    ResolvedPalette { colors, sources }
}

pub fn resolve_typography(draft: Option<&TypographyDraft>, template: &Template) -> Typography {
    let base = template.typography.clone().unwrap_or_else(|| Typography {
        heading_font: SYSTEM_FONT.to_string(),
        body_font: SYSTEM_FONT.to_string(),
        font_url: None,
    });

    match draft {
        None => base,
        Some(d) => Typography {
            heading_font: d.heading_font.clone().unwrap_or(base.heading_font),
            body_font: d.body_font.clone().unwrap_or(base.body_font),
            font_url: d.font_url.clone().or(base.font_url),
        },
    }
}
