//! Template Defaults - Per-Family Token Tables
//!
//! Built-in defaults ship with the engine. A directory of JSON files can
//! override individual families without rebuilding.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::model::{Palette, TemplateSlug, Typography};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub slug: TemplateSlug,
    pub name: String,
    pub description: String,
    pub template_version: String,
    pub engine_min_version: String,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub palette: Palette,
    #[serde(default)]
    pub typography: Option<Typography>,
    #[serde(default)]
    pub layout: LayoutTokens,
}

/// Spacing and shape tokens, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutTokens {
    #[serde(default = "default_max_width")]
    pub max_width: u32,
    #[serde(default = "default_radius")]
    pub radius: u32,
    #[serde(default = "default_section_spacing")]
    pub section_spacing: u32,
}

fn default_max_width() -> u32 { 1120 }
fn default_radius() -> u32 { 8 }
fn default_section_spacing() -> u32 { 96 }

impl Default for LayoutTokens {
    fn default() -> Self {
        Self {
            max_width: default_max_width(),
            radius: default_radius(),
            section_spacing: default_section_spacing(),
        }
    }
}

/// Template registry - built-in families plus directory overrides
pub struct TemplateRegistry {
    templates: BTreeMap<TemplateSlug, Template>,
}

impl TemplateRegistry {
    /// An empty registry. Every compile against it fails with
    /// `UnsupportedTemplate`.
    pub fn new() -> Self {
        Self { templates: BTreeMap::new() }
    }

    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for template in builtin_templates() {
            registry.register(template);
        }
        registry
    }

    /// Built-ins overlaid with every parseable `*.json` file in `dir`.
    pub fn load_from_dir(dir: &Path) -> Result<Self, std::io::Error> {
        let mut registry = Self::builtin();
        if !dir.exists() {
            return Ok(registry);
        }

        let mut paths: Vec<_> = fs::read_dir(dir)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| path.extension().map_or(false, |e| e == "json"))
            .collect();
        paths.sort();

        for path in paths {
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<Template>(&content) {
                Ok(template) => {
                    tracing::debug!(slug = %template.slug, path = %path.display(), "loaded template override");
                    registry.register(template);
                }
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "skipping unreadable template file");
                }
            }
        }
        Ok(registry)
    }

    pub fn get(&self, slug: TemplateSlug) -> Option<&Template> {
        self.templates.get(&slug)
    }

    pub fn list(&self) -> Vec<&Template> {
        self.templates.values().collect()
    }

    pub fn register(&mut self, template: Template) {
        self.templates.insert(template.slug, template);
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn palette(entries: &[(&str, &str)]) -> Palette {
    entries
        .iter()
        .map(|(role, color)| (role.to_string(), color.to_string()))
        .collect()
}

fn fonts(heading: &str, body: &str) -> Option<Typography> {
    Some(Typography {
        heading_font: heading.to_string(),
        body_font: body.to_string(),
        font_url: None,
    })
}

fn builtin_templates() -> Vec<Template> {
    vec![
        Template {
            slug: TemplateSlug::Startup,
            name: "Startup".to_string(),
            description: "Bold launch page for early-stage products".to_string(),
            template_version: "1.0.0".to_string(),
            engine_min_version: "1.0.0".to_string(),
            deprecated: false,
            palette: palette(&[
                ("primary", "#6d28d9"),
                ("secondary", "#4f46e5"),
                ("accent", "#f59e0b"),
                ("background", "#ffffff"),
                ("surface", "#f5f3ff"),
                ("text", "#1f2937"),
                ("muted", "#6b7280"),
            ]),
            typography: fonts("Inter", "Inter"),
            layout: LayoutTokens { max_width: 1120, radius: 12, section_spacing: 96 },
        },
        Template {
            slug: TemplateSlug::Portfolio,
            name: "Portfolio".to_string(),
            description: "Quiet, image-forward personal showcase".to_string(),
            template_version: "1.0.0".to_string(),
            engine_min_version: "1.0.0".to_string(),
            deprecated: false,
            palette: palette(&[
                ("primary", "#111827"),
                ("secondary", "#374151"),
                ("accent", "#ef4444"),
                ("background", "#fafafa"),
                ("surface", "#ffffff"),
                ("text", "#111827"),
                ("muted", "#6b7280"),
            ]),
            typography: fonts("Playfair Display", "Source Sans 3"),
            layout: LayoutTokens { max_width: 960, radius: 0, section_spacing: 120 },
        },
        Template {
            slug: TemplateSlug::Saas,
            name: "SaaS".to_string(),
            description: "Product marketing site with pricing focus".to_string(),
            template_version: "1.0.0".to_string(),
            engine_min_version: "1.0.0".to_string(),
            deprecated: false,
            palette: palette(&[
                ("primary", "#2563eb"),
                ("secondary", "#0ea5e9"),
                ("accent", "#22c55e"),
                ("background", "#ffffff"),
                ("surface", "#f8fafc"),
                ("text", "#0f172a"),
                ("muted", "#64748b"),
            ]),
            typography: fonts("Inter", "Inter"),
            layout: LayoutTokens { max_width: 1200, radius: 8, section_spacing: 88 },
        },
        Template {
            slug: TemplateSlug::Agency,
            name: "Agency".to_string(),
            description: "Dark, high-contrast studio site".to_string(),
            template_version: "1.0.0".to_string(),
            engine_min_version: "1.0.0".to_string(),
            deprecated: false,
            palette: palette(&[
                ("primary", "#db2777"),
                ("secondary", "#7c3aed"),
                ("accent", "#facc15"),
                ("background", "#0f0f10"),
                ("surface", "#1c1c1f"),
                ("text", "#f4f4f5"),
                ("muted", "#a1a1aa"),
            ]),
            typography: fonts("Space Grotesk", "Inter"),
            layout: LayoutTokens { max_width: 1280, radius: 4, section_spacing: 112 },
        },
        Template {
            slug: TemplateSlug::Restaurant,
            name: "Restaurant".to_string(),
            description: "Warm menu-and-reservations site".to_string(),
            template_version: "1.0.0".to_string(),
            engine_min_version: "1.0.0".to_string(),
            deprecated: false,
            palette: palette(&[
                ("primary", "#b45309"),
                ("secondary", "#78350f"),
                ("accent", "#65a30d"),
                ("background", "#fffbeb"),
                ("surface", "#fef3c7"),
                ("text", "#292524"),
                ("muted", "#78716c"),
            ]),
            typography: fonts("Lora", "Open Sans"),
            layout: LayoutTokens { max_width: 1040, radius: 16, section_spacing: 96 },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::REQUIRED_PALETTE_ROLES;

    #[test]
    fn builtins_cover_every_family_and_role() {
        let registry = TemplateRegistry::builtin();
        for slug in TemplateSlug::ALL {
            let template = registry.get(slug).expect("built-in template");
            for role in REQUIRED_PALETTE_ROLES {
                assert!(template.palette.contains_key(*role), "{slug} missing {role}");
            }
        }
    }

    #[test]
    fn directory_override_replaces_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let json = r##"{
            "slug": "startup",
            "name": "Startup Dark",
            "description": "override",
            "templateVersion": "1.1.0",
            "engineMinVersion": "1.0.0",
            "palette": { "primary": "#000000" }
        }"##;
        fs::write(dir.path().join("startup.json"), json).unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        let registry = TemplateRegistry::load_from_dir(dir.path()).unwrap();
        let startup = registry.get(TemplateSlug::Startup).unwrap();
        assert_eq!(startup.name, "Startup Dark");
        assert_eq!(startup.layout, LayoutTokens::default());
        assert_eq!(registry.list().len(), TemplateSlug::ALL.len());
    }

    #[test]
    fn missing_directory_yields_builtins() {
        let registry = TemplateRegistry::load_from_dir(Path::new("/nonexistent/templates")).unwrap();
        assert!(registry.get(TemplateSlug::Agency).is_some());
    }
}
