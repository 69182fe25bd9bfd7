//! Diff/Patch Engine
//!
//! Pages match by slug, sections by id. Sections whose relative order is
//! preserved (a longest common subsequence of ids) never move; everything
//! else shared between the revisions is a `Move`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::model::{Page, SectionId, SectionKind, SiteSpec};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum PatchOp {
    Insert {
        section_id: SectionId,
        position: usize,
        kind: SectionKind,
        props: Value,
    },
    Update {
        section_id: SectionId,
        props: Value,
    },
    Remove {
        section_id: SectionId,
    },
    Move {
        section_id: SectionId,
        position: usize,
    },
}

impl PatchOp {
    pub fn section_id(&self) -> &str {
        match self {
            PatchOp::Insert { section_id, .. }
            | PatchOp::Update { section_id, .. }
            | PatchOp::Remove { section_id }
            | PatchOp::Move { section_id, .. } => section_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Added,
    Removed,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePatch {
    pub page_slug: String,
    pub status: PageStatus,
    /// New title, when it changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub ops: Vec<PatchOp>,
}

impl PagePatch {
    /// Replay the patch over the previous section order.
    ///
    /// Removed and moved ids are taken out first; inserts and moves are then
    /// placed at their final positions in ascending order.
    pub fn apply(&self, previous: &[SectionId]) -> Vec<SectionId> {
        let taken: HashSet<&str> = self
            .ops
            .iter()
            .filter_map(|op| match op {
                PatchOp::Remove { section_id } | PatchOp::Move { section_id, .. } => Some(section_id.as_str()),
                _ => None,
            })
            .collect();

        let mut ids: Vec<SectionId> = previous
            .iter()
            .filter(|id| !taken.contains(id.as_str()))
            .cloned()
            .collect();

        let mut placements: Vec<(usize, &SectionId)> = self
            .ops
            .iter()
            .filter_map(|op| match op {
                PatchOp::Insert { section_id, position, .. } | PatchOp::Move { section_id, position } => {
                    Some((*position, section_id))
                }
                _ => None,
            })
            .collect();
        placements.sort_by_key(|(position, _)| *position);

        for (position, id) in placements {
            ids.insert(position.min(ids.len()), id.clone());
        }
        ids
    }

    pub fn count(&self, pred: impl Fn(&PatchOp) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }
}

/// Section-level patches turning `previous` into `next`. Unchanged pages
/// are omitted.
pub fn diff(previous: &SiteSpec, next: &SiteSpec) -> Vec<PagePatch> {
    let mut patches = vec![];

    for page in &next.pages {
        match previous.page(&page.slug) {
            None => patches.push(PagePatch {
                page_slug: page.slug.clone(),
                status: PageStatus::Added,
                title: Some(page.title.clone()),
                ops: diff_sections(None, Some(page)),
            }),
            Some(prev) => {
                let ops = diff_sections(Some(prev), Some(page));
                let title = (prev.title != page.title).then(|| page.title.clone());
                if !ops.is_empty() || title.is_some() {
                    patches.push(PagePatch {
                        page_slug: page.slug.clone(),
                        status: PageStatus::Modified,
                        title,
                        ops,
                    });
                }
            }
        }
    }

    for page in &previous.pages {
        if next.page(&page.slug).is_none() {
            patches.push(PagePatch {
                page_slug: page.slug.clone(),
                status: PageStatus::Removed,
                title: None,
                ops: diff_sections(Some(page), None),
            });
        }
    }

    tracing::debug!(
        from = previous.revision_id,
        to = next.revision_id,
        pages = patches.len(),
        ops = patches.iter().map(|p| p.ops.len()).sum::<usize>(),
        "diffed revisions"
    );
    patches
}

fn diff_sections(previous: Option<&Page>, next: Option<&Page>) -> Vec<PatchOp> {
    let prev = previous.map(|p| p.sections.as_slice()).unwrap_or(&[]);
    let next = next.map(|p| p.sections.as_slice()).unwrap_or(&[]);

    let prev_by_id: HashMap<&str, _> = prev.iter().map(|s| (s.id.as_str(), s)).collect();

    // Same id with a different kind is a different section.
    let shared: HashSet<&str> = next
        .iter()
        .filter(|s| prev_by_id.get(s.id.as_str()).map_or(false, |p| p.kind == s.kind))
        .map(|s| s.id.as_str())
        .collect();

    let mut ops: Vec<PatchOp> = prev
        .iter()
        .filter(|s| !shared.contains(s.id.as_str()))
        .map(|s| PatchOp::Remove { section_id: s.id.clone() })
        .collect();

    let prev_order: Vec<&str> = prev.iter().map(|s| s.id.as_str()).filter(|id| shared.contains(id)).collect();
    let next_order: Vec<&str> = next.iter().map(|s| s.id.as_str()).filter(|id| shared.contains(id)).collect();
    let anchored = longest_common_subsequence(&prev_order, &next_order);

    let mut updates = vec![];
    for (position, section) in next.iter().enumerate() {
        let id = section.id.as_str();
        let Some(before) = prev_by_id.get(id).filter(|_| shared.contains(id)) else {
            ops.push(PatchOp::Insert {
                section_id: section.id.clone(),
                position,
                kind: section.kind,
                props: section.props.clone(),
            });
            continue;
        };

        if !anchored.contains(id) {
            ops.push(PatchOp::Move { section_id: section.id.clone(), position });
        }
        if before.props != section.props {
            updates.push(PatchOp::Update { section_id: section.id.clone(), props: section.props.clone() });
        }
    }

    ops.extend(updates);
    ops
}

/// Ids on one longest common subsequence of `a` and `b`.
fn longest_common_subsequence<'a>(a: &[&'a str], b: &[&'a str]) -> HashSet<&'a str> {
    let (n, m) = (a.len(), b.len());
    let mut table = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if a[i] == b[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut kept = HashSet::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            kept.insert(a[i]);
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Section, TemplateSlug};
    use crate::render::fixtures;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn s(id: &str, kind: SectionKind, headline: &str) -> Section {
        Section { id: id.to_string(), kind, props: json!({ "headline": headline }) }
    }

    fn site(pages: Vec<(&str, Vec<Section>)>) -> SiteSpec {
        SiteSpec {
            template_slug: TemplateSlug::Startup,
            brand: fixtures::brand(),
            pages: pages
                .into_iter()
                .map(|(slug, sections)| Page { slug: slug.to_string(), title: slug.to_string(), sections })
                .collect(),
            entry_page: "home".to_string(),
            revision_id: 1,
        }
    }

    fn ids(page: &Page) -> Vec<SectionId> {
        page.sections.iter().map(|s| s.id.clone()).collect()
    }

    #[test]
    fn identical_specs_produce_no_patches() {
        let a = site(vec![("home", vec![s("h", SectionKind::Hero, "x")])]);
        assert!(diff(&a, &a.clone()).is_empty());
    }

    #[test]
    fn swap_is_a_single_move() {
        let a = site(vec![(
            "home",
            vec![s("f1", SectionKind::Features, "a"), s("f2", SectionKind::Features, "b")],
        )]);
        let b = site(vec![(
            "home",
            vec![s("f2", SectionKind::Features, "b"), s("f1", SectionKind::Features, "a")],
        )]);
        let patches = diff(&a, &b);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].ops.len(), 1);
        assert!(matches!(patches[0].ops[0], PatchOp::Move { .. }));
        assert_eq!(patches[0].apply(&ids(&a.pages[0])), ids(&b.pages[0]));
    }

    #[test]
    fn kind_change_under_same_id_is_remove_and_insert() {
        let a = site(vec![("home", vec![s("x", SectionKind::Hero, "a")])]);
        let b = site(vec![("home", vec![s("x", SectionKind::Cta, "a")])]);
        let ops = &diff(&a, &b)[0].ops;
        assert_eq!(
            ops,
            &vec![
                PatchOp::Remove { section_id: "x".to_string() },
                PatchOp::Insert {
                    section_id: "x".to_string(),
                    position: 0,
                    kind: SectionKind::Cta,
                    props: json!({ "headline": "a" }),
                },
            ]
        );
    }

    #[test]
    fn mixed_edit_replays_to_next_order() {
        let a = site(vec![(
            "home",
            vec![
                s("a", SectionKind::Hero, "1"),
                s("b", SectionKind::Features, "2"),
                s("c", SectionKind::Cta, "3"),
                s("d", SectionKind::Pricing, "4"),
                s("e", SectionKind::Footer, "5"),
            ],
        )]);
        let b = site(vec![(
            "home",
            vec![
                s("d", SectionKind::Pricing, "4"),
                s("a", SectionKind::Hero, "1!"),
                s("n", SectionKind::Contact, "new"),
                s("c", SectionKind::Cta, "3"),
                s("e", SectionKind::Footer, "5"),
            ],
        )]);
        let patch = &diff(&a, &b)[0];
        assert_eq!(patch.count(|op| matches!(op, PatchOp::Remove { .. })), 1);
        assert_eq!(patch.count(|op| matches!(op, PatchOp::Insert { .. })), 1);
        assert_eq!(patch.count(|op| matches!(op, PatchOp::Move { .. })), 1);
        assert_eq!(patch.count(|op| matches!(op, PatchOp::Update { .. })), 1);
        assert_eq!(patch.apply(&ids(&a.pages[0])), ids(&b.pages[0]));
    }

    #[test]
    fn pages_added_and_removed() {
        let a = site(vec![("home", vec![]), ("blog", vec![s("p", SectionKind::Hero, "x")])]);
        let b = site(vec![("home", vec![]), ("about", vec![s("q", SectionKind::Hero, "y")])]);
        let patches = diff(&a, &b);
        let summary: Vec<_> = patches.iter().map(|p| (p.page_slug.as_str(), p.status)).collect();
        assert_eq!(summary, vec![("about", PageStatus::Added), ("blog", PageStatus::Removed)]);
        assert_eq!(patches[1].ops, vec![PatchOp::Remove { section_id: "p".to_string() }]);
    }

    #[test]
    fn ops_serialize_with_tag() {
        let op = PatchOp::Move { section_id: "x".to_string(), position: 2 };
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({ "op": "move", "sectionId": "x", "position": 2 })
        );
    }
}
