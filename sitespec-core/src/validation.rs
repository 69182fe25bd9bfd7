//! Validation System - Rule Collection
//!
//! Rules produce structured issues; the validator runs every rule and
//! returns all issues together. Prop shapes come from the render registry.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::model::{
    BrandDraft, PageDraft, Palette, SectionDraft, SectionKind, SiteSpecDraft, TemplateSlug, TypographyDraft,
};
use crate::render::RenderRegistry;
use crate::schema::json_type;

pub(crate) static SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("slug pattern"));
static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").expect("color pattern")
});
static FONT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 -]{0,63}$").expect("font pattern"));

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IssueKind {
    MissingField,
    UnknownKind,
    TypeMismatch,
    ConstraintViolation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub kind: IssueKind,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, kind: IssueKind, message: impl Into<String>) -> Self {
        Self { path: path.into(), kind, message: message.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ValidationResult {
    Valid(SiteSpecDraft),
    Invalid(Vec<ValidationIssue>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            ValidationResult::Valid(_) => &[],
            ValidationResult::Invalid(issues) => issues,
        }
    }

    pub fn into_result(self) -> Result<SiteSpecDraft, Vec<ValidationIssue>> {
        match self {
            ValidationResult::Valid(draft) => Ok(draft),
            ValidationResult::Invalid(issues) => Err(issues),
        }
    }
}

/// Validation rule trait - produces issues for one part of the document
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, doc: &Map<String, Value>, renderers: &RenderRegistry) -> Vec<ValidationIssue>;
}

// --- Concrete Rules ---

pub struct DocumentRule;

impl ValidationRule for DocumentRule {
    fn name(&self) -> &'static str { "document" }

    fn validate(&self, doc: &Map<String, Value>, _renderers: &RenderRegistry) -> Vec<ValidationIssue> {
        let mut issues = vec![];

        match present(doc, "templateSlug") {
            None => issues.push(missing("templateSlug")),
            Some(Value::String(s)) => {
                if s.parse::<TemplateSlug>().is_err() {
                    let known: Vec<_> = TemplateSlug::ALL.iter().map(|t| t.as_str()).collect();
                    issues.push(ValidationIssue::new(
                        "templateSlug",
                        IssueKind::UnknownKind,
                        format!("unknown template '{}', expected one of: {}", s, known.join(", ")),
                    ));
                }
            }
            Some(other) => issues.push(mismatch("templateSlug", "a string", other)),
        }

        if let Some(rev) = present(doc, "revisionId") {
            if rev.as_u64().is_none() {
                issues.push(mismatch("revisionId", "a non-negative integer", rev));
            }
        }

        issues
    }
}

pub struct BrandRule;

impl ValidationRule for BrandRule {
    fn name(&self) -> &'static str { "brand" }

    fn validate(&self, doc: &Map<String, Value>, _renderers: &RenderRegistry) -> Vec<ValidationIssue> {
        let mut issues = vec![];
        let brand = match present(doc, "brand") {
            None => return vec![missing("brand")],
            Some(Value::Object(brand)) => brand,
            Some(other) => return vec![mismatch("brand", "an object", other)],
        };

        match present(brand, "name") {
            None => issues.push(missing("brand.name")),
            Some(Value::String(s)) if s.trim().is_empty() => {
                issues.push(ValidationIssue::new("brand.name", IssueKind::ConstraintViolation, "must not be blank"));
            }
            Some(Value::String(_)) => {}
            Some(other) => issues.push(mismatch("brand.name", "a string", other)),
        }

        if let Some(desc) = present(brand, "description") {
            if !desc.is_string() {
                issues.push(mismatch("brand.description", "a string", desc));
            }
        }

        match present(brand, "palette") {
            None => {}
            Some(Value::Object(palette)) => {
                for (role, color) in palette {
                    let path = format!("brand.palette.{}", role);
                    match color.as_str() {
                        None => issues.push(mismatch(&path, "a color string", color)),
                        Some(c) if !HEX_COLOR.is_match(c) => issues.push(ValidationIssue::new(
                            path,
                            IssueKind::ConstraintViolation,
                            format!("'{}' is not a hex color", c),
                        )),
                        Some(_) => {}
                    }
                }
            }
            Some(other) => issues.push(mismatch("brand.palette", "an object", other)),
        }

        match present(brand, "typography") {
            None => {}
            Some(Value::Object(typography)) => {
                for field in ["headingFont", "bodyFont"] {
                    let path = format!("brand.typography.{}", field);
                    match present(typography, field) {
                        None => {}
                        Some(Value::String(font)) if !FONT_NAME.is_match(font) => {
                            issues.push(ValidationIssue::new(
                                path,
                                IssueKind::ConstraintViolation,
                                "font names may only contain letters, digits, spaces and hyphens",
                            ));
                        }
                        Some(Value::String(_)) => {}
                        Some(other) => issues.push(mismatch(&path, "a string", other)),
                    }
                }
                match present(typography, "fontUrl") {
                    None => {}
                    Some(Value::String(url))
                        if !(url.starts_with("https://") || url.starts_with("http://")) =>
                    {
                        issues.push(ValidationIssue::new(
                            "brand.typography.fontUrl",
                            IssueKind::ConstraintViolation,
                            "font stylesheet must be an http(s) URL",
                        ));
                    }
                    Some(Value::String(_)) => {}
                    Some(other) => issues.push(mismatch("brand.typography.fontUrl", "a string", other)),
                }
            }
            Some(other) => issues.push(mismatch("brand.typography", "an object", other)),
        }

        issues
    }
}

pub struct PagesRule;

impl ValidationRule for PagesRule {
    fn name(&self) -> &'static str { "pages" }

    fn validate(&self, doc: &Map<String, Value>, _renderers: &RenderRegistry) -> Vec<ValidationIssue> {
        let mut issues = vec![];
        let pages = match present(doc, "pages") {
            None => return vec![missing("pages")],
            Some(Value::Array(pages)) => pages,
            Some(other) => return vec![mismatch("pages", "an array", other)],
        };

        if pages.is_empty() {
            issues.push(ValidationIssue::new(
                "pages",
                IssueKind::ConstraintViolation,
                "a site needs at least one page",
            ));
        }

        let mut seen = HashSet::new();
        for (i, page) in pages.iter().enumerate() {
            let path = format!("pages[{}]", i);
            let Some(page) = page.as_object() else {
                issues.push(mismatch(&path, "an object", page));
                continue;
            };

            let slug_path = format!("{}.slug", path);
            match present(page, "slug") {
                None => issues.push(missing(&slug_path)),
                Some(Value::String(slug)) => {
                    if !SLUG.is_match(slug) {
                        issues.push(ValidationIssue::new(
                            &slug_path,
                            IssueKind::ConstraintViolation,
                            format!("'{}' is not URL-safe (lowercase letters, digits, hyphens)", slug),
                        ));
                    }
                    if !seen.insert(slug.as_str()) {
                        issues.push(ValidationIssue::new(
                            &slug_path,
                            IssueKind::ConstraintViolation,
                            format!("duplicate page slug '{}'", slug),
                        ));
                    }
                }
                Some(other) => issues.push(mismatch(&slug_path, "a string", other)),
            }

            let title_path = format!("{}.title", path);
            match present(page, "title") {
                None => issues.push(missing(&title_path)),
                Some(Value::String(t)) if t.trim().is_empty() => issues.push(ValidationIssue::new(
                    title_path,
                    IssueKind::ConstraintViolation,
                    "must not be blank",
                )),
                Some(Value::String(_)) => {}
                Some(other) => issues.push(mismatch(&title_path, "a string", other)),
            }
        }

        match present(doc, "entryPage") {
            None => {}
            Some(Value::String(entry)) if !seen.contains(entry.as_str()) => {
                issues.push(ValidationIssue::new(
                    "entryPage",
                    IssueKind::ConstraintViolation,
                    format!("entry page '{}' is not one of the pages", entry),
                ));
            }
            Some(Value::String(_)) => {}
            Some(other) => issues.push(mismatch("entryPage", "a string", other)),
        }

        issues
    }
}

pub struct SectionsRule;

impl ValidationRule for SectionsRule {
    fn name(&self) -> &'static str { "sections" }

    fn validate(&self, doc: &Map<String, Value>, renderers: &RenderRegistry) -> Vec<ValidationIssue> {
        let mut issues = vec![];
        let Some(Value::Array(pages)) = present(doc, "pages") else {
            return issues;
        };

        let mut ids = HashSet::new();
        for (i, page) in pages.iter().enumerate() {
            let Some(page) = page.as_object() else { continue };
            let path = format!("pages[{}].sections", i);
            let sections = match present(page, "sections") {
                None => {
                    issues.push(missing(&path));
                    continue;
                }
                Some(Value::Array(sections)) => sections,
                Some(other) => {
                    issues.push(mismatch(&path, "an array", other));
                    continue;
                }
            };

            for (j, section) in sections.iter().enumerate() {
                let path = format!("{}[{}]", path, j);
                let Some(section) = section.as_object() else {
                    issues.push(mismatch(&path, "an object", section));
                    continue;
                };
                check_section(section, &path, renderers, &mut ids, &mut issues);
            }
        }

        issues
    }
}

fn check_section<'a>(
    section: &'a Map<String, Value>,
    path: &str,
    renderers: &RenderRegistry,
    ids: &mut HashSet<&'a str>,
    issues: &mut Vec<ValidationIssue>,
) {
    if let Some(id) = present(section, "id") {
        let id_path = format!("{}.id", path);
        match id.as_str() {
            None => issues.push(mismatch(&id_path, "a string", id)),
            Some(id) if !SLUG.is_match(id) => issues.push(ValidationIssue::new(
                id_path,
                IssueKind::ConstraintViolation,
                format!("section id '{}' is not URL-safe", id),
            )),
            Some(id) if !ids.insert(id) => issues.push(ValidationIssue::new(
                id_path,
                IssueKind::ConstraintViolation,
                format!("duplicate section id '{}'", id),
            )),
            Some(_) => {}
        }
    }

    let kind_path = format!("{}.kind", path);
    let kind = match present(section, "kind") {
        None => {
            issues.push(missing(&kind_path));
            None
        }
        Some(Value::String(kind)) => match kind.parse::<SectionKind>() {
            Ok(kind) if renderers.contains(kind) => Some(kind),
            _ => {
                let known: Vec<_> = renderers.kinds().iter().map(|k| k.as_str()).collect();
                issues.push(ValidationIssue::new(
                    kind_path,
                    IssueKind::UnknownKind,
                    format!("unknown section kind '{}', expected one of: {}", kind, known.join(", ")),
                ));
                None
            }
        },
        Some(other) => {
            issues.push(mismatch(&kind_path, "a string", other));
            None
        }
    };

    let props_path = format!("{}.props", path);
    let empty = Map::new();
    let props = match present(section, "props") {
        None => &empty,
        Some(Value::Object(props)) => props,
        Some(other) => {
            issues.push(mismatch(&props_path, "an object", other));
            return;
        }
    };

    if let Some(schema) = kind.and_then(|k| renderers.schema(k)) {
        schema.check(props, &props_path, issues);
    }
}

/// Validator orchestrates rules over one document
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(DocumentRule),
                Box::new(BrandRule),
                Box::new(PagesRule),
                Box::new(SectionsRule),
            ],
        }
    }

    pub fn validate(&self, raw: &Value, renderers: &RenderRegistry) -> ValidationResult {
        let Some(doc) = raw.as_object() else {
            return ValidationResult::Invalid(vec![mismatch("", "a JSON object", raw)]);
        };

        let mut all_issues = vec![];
        for rule in &self.rules {
            let issues = rule.validate(doc, renderers);
            if !issues.is_empty() {
                tracing::debug!(rule = rule.name(), count = issues.len(), "rule reported issues");
            }
            all_issues.extend(issues);
        }

        if !all_issues.is_empty() {
            return ValidationResult::Invalid(all_issues);
        }

        match build_draft(doc) {
            Some(draft) => ValidationResult::Valid(draft),
            None => ValidationResult::Invalid(vec![ValidationIssue::new(
                "",
                IssueKind::TypeMismatch,
                "document could not be read after validation",
            )]),
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Lookup that treats explicit `null` as absent.
fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn missing(path: &str) -> ValidationIssue {
    let field = path.rsplit('.').next().unwrap_or(path);
    ValidationIssue::new(path, IssueKind::MissingField, format!("required field '{}' is missing", field))
}

fn mismatch(path: &str, expected: &str, actual: &Value) -> ValidationIssue {
    ValidationIssue::new(
        path,
        IssueKind::TypeMismatch,
        format!("expected {}, found {}", expected, json_type(actual)),
    )
}

fn string_at(obj: &Map<String, Value>, key: &str) -> Option<String> {
    present(obj, key).and_then(Value::as_str).map(str::to_string)
}

fn build_draft(doc: &Map<String, Value>) -> Option<SiteSpecDraft> {
    let template_slug: TemplateSlug = present(doc, "templateSlug")?.as_str()?.parse().ok()?;

    let brand = present(doc, "brand")?.as_object()?;
    let palette: Palette = present(brand, "palette")
        .and_then(Value::as_object)
        .map(|p| {
            p.iter()
                .filter_map(|(role, color)| color.as_str().map(|c| (role.clone(), c.to_string())))
                .collect()
        })
        .unwrap_or_default();
    let typography = present(brand, "typography").and_then(Value::as_object).map(|t| TypographyDraft {
        heading_font: string_at(t, "headingFont"),
        body_font: string_at(t, "bodyFont"),
        font_url: string_at(t, "fontUrl"),
    });
    let brand = BrandDraft {
        name: string_at(brand, "name")?.trim().to_string(),
        description: string_at(brand, "description").unwrap_or_default(),
        palette,
        typography,
    };

    let mut pages = vec![];
    for page in present(doc, "pages")?.as_array()? {
        let page = page.as_object()?;
        let mut sections = vec![];
        for section in present(page, "sections")?.as_array()? {
            let section = section.as_object()?;
            sections.push(SectionDraft {
                id: string_at(section, "id"),
                kind: present(section, "kind")?.as_str()?.parse().ok()?,
                props: present(section, "props")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
            });
        }
        pages.push(PageDraft {
            slug: string_at(page, "slug")?,
            title: string_at(page, "title")?,
            sections,
        });
    }

    Some(SiteSpecDraft {
        template_slug,
        brand,
        pages,
        entry_page: string_at(doc, "entryPage"),
        revision_id: present(doc, "revisionId").and_then(Value::as_u64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(raw: Value) -> ValidationResult {
        Validator::new().validate(&raw, &RenderRegistry::builtin())
    }

    fn minimal() -> Value {
        json!({
            "templateSlug": "startup",
            "brand": { "name": "Acme" },
            "pages": [{ "slug": "home", "title": "Home", "sections": [] }]
        })
    }

    #[test]
    fn minimal_document_is_valid() {
        let result = validate(minimal());
        assert!(result.is_valid(), "{:?}", result.issues());
    }

    #[test]
    fn empty_pages_is_constraint_violation() {
        let mut raw = minimal();
        raw["pages"] = json!([]);
        let issues = validate(raw).into_result().unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "pages");
        assert_eq!(issues[0].kind, IssueKind::ConstraintViolation);
    }

    #[test]
    fn unknown_template_is_unknown_kind() {
        let mut raw = minimal();
        raw["templateSlug"] = json!("cyberpunk");
        let issues = validate(raw).into_result().unwrap_err();
        assert_eq!(issues[0].kind, IssueKind::UnknownKind);
        assert_eq!(issues[0].path, "templateSlug");
    }

    #[test]
    fn duplicate_slugs_are_rejected() {
        let mut raw = minimal();
        raw["pages"] = json!([
            { "slug": "home", "title": "Home", "sections": [] },
            { "slug": "home", "title": "Again", "sections": [] }
        ]);
        let issues = validate(raw).into_result().unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "pages[1].slug");
        assert_eq!(issues[0].kind, IssueKind::ConstraintViolation);
    }

    #[test]
    fn all_issues_are_reported_together() {
        let raw = json!({
            "templateSlug": 3,
            "brand": { "palette": { "primary": "purple" } },
            "pages": [{ "slug": "Home Page", "sections": [{ "kind": "carousel" }] }],
            "entryPage": "about"
        });
        let issues = validate(raw).into_result().unwrap_err();
        let paths: Vec<_> = issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "templateSlug",
                "brand.name",
                "brand.palette.primary",
                "pages[0].slug",
                "pages[0].title",
                "entryPage",
                "pages[0].sections[0].kind",
            ]
        );
    }

    #[test]
    fn duplicate_explicit_section_ids_are_rejected() {
        let mut raw = minimal();
        raw["pages"][0]["sections"] = json!([
            { "id": "intro", "kind": "footer" },
            { "id": "intro", "kind": "footer" }
        ]);
        let issues = validate(raw).into_result().unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "pages[0].sections[1].id");
    }

    #[test]
    fn extra_fields_are_ignored() {
        let mut raw = minimal();
        raw["pages"][0]["sections"] = json!([
            { "kind": "hero", "props": { "headline": "Hi", "sparkles": true } }
        ]);
        raw["aiNotes"] = json!("ignored");
        let draft = validate(raw).into_result().unwrap();
        assert_eq!(draft.pages[0].sections[0].props["sparkles"], json!(true));
    }

    #[test]
    fn null_props_read_as_empty() {
        let mut raw = minimal();
        raw["pages"][0]["sections"] = json!([{ "kind": "footer", "props": null }]);
        let draft = validate(raw).into_result().unwrap();
        assert!(draft.pages[0].sections[0].props.is_empty());
    }

    #[test]
    fn non_object_root_is_type_mismatch() {
        let issues = validate(json!([1, 2])).into_result().unwrap_err();
        assert_eq!(issues[0].kind, IssueKind::TypeMismatch);
        assert_eq!(issues[0].path, "");
    }
}
