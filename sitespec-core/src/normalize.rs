//! Normalizer - Draft to SiteSpec
//!
//! Never fails: validation has already gated structure. Section IDs are
//! stable across regenerations, inherited from the previous revision when
//! one is supplied.

use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use crate::model::{
    Brand, Page, PageDraft, Section, SectionId, SectionKind, SiteSpec, SiteSpecDraft,
};
use crate::render::RenderRegistry;
use crate::schema::clamp_text;
use crate::templates::Template;
use crate::tokens::{resolve_palette, resolve_typography};

const MAX_TITLE_LEN: usize = 80;
const MAX_DESCRIPTION_LEN: usize = 300;

/// Deterministic id for the `ordinal`-th section of `kind` on a page.
pub fn derived_id(page_slug: &str, kind: SectionKind, ordinal: usize) -> SectionId {
    format!("{}-{}-{}", page_slug, kind, ordinal)
}

pub fn normalize(
    draft: SiteSpecDraft,
    previous: Option<&SiteSpec>,
    template: &Template,
    renderers: &RenderRegistry,
) -> SiteSpec {
    let resolved = resolve_palette(&draft.brand, template);
    let brand = Brand {
        name: draft.brand.name.trim().to_string(),
        description: clamp_text(&draft.brand.description, MAX_DESCRIPTION_LEN),
        palette: resolved.colors,
        typography: resolve_typography(draft.brand.typography.as_ref(), template),
        token_sources: resolved.sources,
    };

    let mut used: HashSet<SectionId> = draft
        .pages
        .iter()
        .flat_map(|p| p.sections.iter().filter_map(|s| s.id.clone()))
        .collect();

    let entry_page = draft
        .entry_page
        .clone()
        .or_else(|| draft.pages.first().map(|p| p.slug.clone()))
        .unwrap_or_default();

    let mut inherited = 0usize;
    let pages: Vec<Page> = draft
        .pages
        .into_iter()
        .map(|page| {
            let prev_page = previous.and_then(|p| p.page(&page.slug));
            normalize_page(page, prev_page, renderers, &mut used, &mut inherited)
        })
        .collect();

    let revision_id = previous
        .map(|p| p.revision_id + 1)
        .or(draft.revision_id)
        .unwrap_or(1);

    tracing::debug!(
        template = %draft.template_slug,
        pages = pages.len(),
        inherited_ids = inherited,
        revision_id,
        "normalized draft"
    );

    SiteSpec {
        template_slug: draft.template_slug,
        brand,
        pages,
        entry_page,
        revision_id,
    }
}

fn normalize_page(
    page: PageDraft,
    previous: Option<&Page>,
    renderers: &RenderRegistry,
    used: &mut HashSet<SectionId>,
    inherited: &mut usize,
) -> Page {
    let drafts: Vec<(SectionKind, Value)> = page
        .sections
        .iter()
        .map(|section| {
            let props = match renderers.schema(section.kind) {
                Some(schema) => Value::Object(schema.clamp(&section.props)),
                None => Value::Object(section.props.clone()),
            };
            (section.kind, props)
        })
        .collect();
    let mut ids: Vec<Option<SectionId>> = page.sections.iter().map(|s| s.id.clone()).collect();

    if let Some(prev) = previous {
        // Unchanged sections keep their id wherever they moved; the rest
        // pair up with leftover same-kind sections in order.
        inherit_ids(prev, &drafts, &mut ids, used, inherited, |before, props| before.props == *props);
        inherit_ids(prev, &drafts, &mut ids, used, inherited, |_, _| true);
    }

    let mut ordinals: BTreeMap<SectionKind, usize> = BTreeMap::new();
    let sections = drafts
        .into_iter()
        .zip(ids)
        .map(|((kind, props), id)| {
            let ordinal = ordinals.entry(kind).or_insert(0);
            let k = *ordinal;
            *ordinal += 1;

            let id = id.unwrap_or_else(|| unique_id(derived_id(&page.slug, kind, k), used));
            used.insert(id.clone());
            Section { id, kind, props }
        })
        .collect();

    Page {
        title: clamp_text(&page.title, MAX_TITLE_LEN),
        slug: page.slug,
        sections,
    }
}

/// Give each id-less draft section the first unclaimed previous section of
/// the same kind that `accept` allows. Claimed ids go into `used`.
fn inherit_ids(
    previous: &Page,
    drafts: &[(SectionKind, Value)],
    ids: &mut [Option<SectionId>],
    used: &mut HashSet<SectionId>,
    inherited: &mut usize,
    accept: impl Fn(&Section, &Value) -> bool,
) {
    for ((kind, props), slot) in drafts.iter().zip(ids.iter_mut()) {
        if slot.is_some() {
            continue;
        }
        let candidate = previous
            .sections
            .iter()
            .find(|s| s.kind == *kind && !used.contains(&s.id) && accept(s, props));
        if let Some(section) = candidate {
            used.insert(section.id.clone());
            *slot = Some(section.id.clone());
            *inherited += 1;
        }
    }
}

fn unique_id(base: SectionId, used: &HashSet<SectionId>) -> SectionId {
    if !used.contains(&base) {
        return base;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !used.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BrandDraft, SectionDraft, TemplateSlug};
    use crate::templates::TemplateRegistry;
    use crate::tokens::TokenAuthority;
    use serde_json::{json, Map};

    fn section(kind: SectionKind, props: Value) -> SectionDraft {
        SectionDraft {
            id: None,
            kind,
            props: props.as_object().cloned().unwrap_or_else(Map::new),
        }
    }

    fn draft(sections: Vec<SectionDraft>) -> SiteSpecDraft {
        SiteSpecDraft {
            template_slug: TemplateSlug::Startup,
            brand: BrandDraft {
                name: " Acme ".to_string(),
                description: String::new(),
                palette: [("primary".to_string(), "#6d28d9".to_string())].into_iter().collect(),
                typography: None,
            },
            pages: vec![PageDraft { slug: "home".to_string(), title: "Home".to_string(), sections }],
            entry_page: None,
            revision_id: None,
        }
    }

    fn run(d: SiteSpecDraft, previous: Option<&SiteSpec>) -> SiteSpec {
        let templates = TemplateRegistry::builtin();
        let template = templates.get(d.template_slug).unwrap();
        normalize(d, previous, template, &RenderRegistry::builtin())
    }

    #[test]
    fn derives_ids_per_kind_ordinal() {
        let spec = run(
            draft(vec![
                section(SectionKind::Hero, json!({ "headline": "A" })),
                section(SectionKind::Cta, json!({ "headline": "B", "buttonLabel": "Go" })),
                section(SectionKind::Cta, json!({ "headline": "C", "buttonLabel": "Go" })),
            ]),
            None,
        );
        let ids: Vec<_> = spec.pages[0].sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["home-hero-0", "home-cta-0", "home-cta-1"]);
        assert_eq!(spec.entry_page, "home");
        assert_eq!(spec.revision_id, 1);
        assert_eq!(spec.brand.name, "Acme");
    }

    #[test]
    fn normalization_is_repeatable() {
        let d = draft(vec![section(SectionKind::Hero, json!({ "headline": "A" }))]);
        assert_eq!(run(d.clone(), None), run(d, None));
    }

    #[test]
    fn inherits_custom_ids_from_previous() {
        let mut first = draft(vec![section(SectionKind::Hero, json!({ "headline": "A" }))]);
        first.pages[0].sections[0].id = Some("intro".to_string());
        let previous = run(first, None);

        let next = run(draft(vec![section(SectionKind::Hero, json!({ "headline": "B" }))]), Some(&previous));
        assert_eq!(next.pages[0].sections[0].id, "intro");
        assert_eq!(next.revision_id, previous.revision_id + 1);
    }

    fn features(title: &str) -> SectionDraft {
        section(SectionKind::Features, json!({ "items": [{ "title": title }] }))
    }

    fn ids(spec: &SiteSpec) -> Vec<&str> {
        spec.pages[0].sections.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn reordered_sections_keep_their_ids() {
        let previous = run(draft(vec![features("Alpha"), features("Beta")]), None);
        let next = run(draft(vec![features("Beta"), features("Alpha")]), Some(&previous));

        assert_eq!(ids(&previous), vec!["home-features-0", "home-features-1"]);
        assert_eq!(ids(&next), vec!["home-features-1", "home-features-0"]);
        assert_eq!(next.pages[0].sections[0].props, previous.pages[0].sections[1].props);
    }

    #[test]
    fn inserted_section_does_not_take_an_existing_id() {
        let previous = run(draft(vec![features("Alpha")]), None);
        let next = run(draft(vec![features("New"), features("Alpha")]), Some(&previous));

        assert_eq!(next.pages[0].sections[1].id, "home-features-0");
        assert_eq!(next.pages[0].sections[0].id, "home-features-0-1");
    }

    #[test]
    fn edited_section_falls_back_to_leftover_id() {
        let previous = run(draft(vec![features("Alpha"), features("Beta")]), None);
        let next = run(draft(vec![features("Alpha!"), features("Beta")]), Some(&previous));
        assert_eq!(ids(&next), vec!["home-features-0", "home-features-1"]);
    }

    #[test]
    fn derived_ids_avoid_explicit_collisions() {
        let mut d = draft(vec![
            section(SectionKind::Footer, json!({})),
            section(SectionKind::Hero, json!({ "headline": "A" })),
        ]);
        d.pages[0].sections[0].id = Some("home-hero-0".to_string());
        let spec = run(d, None);
        assert_eq!(spec.pages[0].sections[0].id, "home-hero-0");
        assert_eq!(spec.pages[0].sections[1].id, "home-hero-0-1");
    }

    #[test]
    fn fills_palette_and_clamps_props() {
        let long = "x".repeat(500);
        let spec = run(
            draft(vec![section(SectionKind::Hero, json!({ "headline": long, "bogus": 1 }))]),
            None,
        );
        let props = &spec.pages[0].sections[0].props;
        assert_eq!(props["headline"].as_str().unwrap().len(), 120);
        assert!(props.get("bogus").is_none());

        assert_eq!(spec.brand.palette["primary"], "#6d28d9");
        assert_eq!(spec.brand.palette["background"], "#ffffff");
        assert_eq!(spec.brand.token_sources["primary"], TokenAuthority::Brand);
        assert_eq!(spec.brand.token_sources["text"], TokenAuthority::Template);
    }
}
