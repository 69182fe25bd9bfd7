//! Generation round trips through the pipeline and a file-backed store.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use sitespec_core::{
    FileRevisionStore, PipelineError, ProjectId, RevisionStore, SitePipeline, StoreError, TokenAuthority,
};

fn acme() -> Value {
    json!({
        "templateSlug": "startup",
        "brand": { "name": "Acme", "palette": { "primary": "#6d28d9" } },
        "pages": [{
            "slug": "home",
            "title": "Home",
            "sections": [
                { "kind": "hero", "props": { "headline": "Build fast" } },
                { "kind": "footer", "props": {} }
            ]
        }]
    })
}

#[test]
fn acme_startup_site_compiles() {
    let pipeline = SitePipeline::default();
    let build = pipeline.build(&acme(), None).unwrap();
    let spec = &build.revision.spec;

    assert_eq!(spec.entry_page, "home");
    assert_eq!(spec.revision_id, 1);
    let home_ids: Vec<_> = spec.pages[0].sections.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(home_ids, vec!["home-hero-0", "home-footer-0"]);

    let startup = pipeline.get_template(spec.template_slug).unwrap();
    assert_eq!(spec.brand.palette["primary"], "#6d28d9");
    assert_eq!(spec.brand.token_sources["primary"], TokenAuthority::Brand);
    for role in ["secondary", "accent", "background", "surface", "text", "muted"] {
        assert_eq!(spec.brand.palette[role], startup.palette[role]);
        assert_eq!(spec.brand.token_sources[role], TokenAuthority::Template);
    }

    assert_eq!(build.revision.artifacts.len(), 1);
    let home = build.revision.artifact("home").unwrap();
    assert_eq!(home.path, "index.html");
    assert!(home.warnings.is_empty());
    assert_eq!(home.section_ids, vec!["home-hero-0", "home-footer-0"]);
    let hero_at = home.html.find(r#"data-section-id="home-hero-0""#).unwrap();
    let footer_at = home.html.find(r#"data-section-id="home-footer-0""#).unwrap();
    assert!(hero_at < footer_at);
    assert!(home.html.contains("Build fast"));
    assert!(home.html.contains("--color-primary:#6d28d9;"));
}

#[test]
fn explicit_entry_page_becomes_index() {
    let raw = json!({
        "templateSlug": "startup",
        "brand": { "name": "Acme" },
        "entryPage": "about",
        "pages": [
            { "slug": "home", "title": "Home", "sections": [
                { "kind": "hero", "props": { "headline": "Build fast" } }
            ]},
            { "slug": "about", "title": "About", "sections": [
                { "kind": "footer", "props": {} }
            ]}
        ]
    });
    let build = SitePipeline::default().build(&raw, None).unwrap();
    let revision = &build.revision;

    assert_eq!(revision.spec.entry_page, "about");
    assert_eq!(revision.artifact("about").unwrap().path, "index.html");
    assert_eq!(revision.artifact("home").unwrap().path, "home.html");

    let home = &revision.artifact("home").unwrap().html;
    assert!(home.contains(r#"href="index.html">Acme</a>"#));
    assert!(home.contains(r#"<a href="home.html" aria-current="page">Home</a>"#));
    assert!(home.contains(r#"<a href="index.html">About</a>"#));

    let about = &revision.artifact("about").unwrap().html;
    assert!(about.contains(r#"<a href="index.html" aria-current="page">About</a>"#));
    assert!(about.contains(r#"<a href="home.html">Home</a>"#));
}

#[test]
fn file_store_chains_regenerations() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileRevisionStore::open(dir.path()).unwrap();
    let pipeline = SitePipeline::default();
    let project = ProjectId::new();

    pipeline.regenerate(&store, project, &acme()).unwrap();

    let mut edited = acme();
    edited["pages"][0]["sections"][0]["props"]["headline"] = json!("Build better rockets");
    let second = pipeline.regenerate(&store, project, &edited).unwrap();

    assert_eq!(store.history(project).unwrap(), vec![1, 2]);
    let patches = second.patches.unwrap();
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].page_slug, "home");
    assert_eq!(patches[0].ops.len(), 1);
    assert_eq!(patches[0].ops[0].section_id(), "home-hero-0");
}

#[test]
fn racing_commit_is_rejected_as_stale() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileRevisionStore::open(dir.path()).unwrap();
    let pipeline = SitePipeline::default();
    let project = ProjectId::new();
    pipeline.regenerate(&store, project, &acme()).unwrap();

    let base = store.latest(project).unwrap().unwrap();
    let ours = pipeline.build(&acme(), Some(&base.revision)).unwrap();

    // Someone else lands revision 2 first.
    pipeline.regenerate(&store, project, &acme()).unwrap();

    let err = store.commit(project, Some(1), ours.revision).unwrap_err();
    assert!(matches!(err, StoreError::StaleRevision { expected: Some(1), actual: Some(2) }));
    assert!(PipelineError::from(err).is_stale());
    assert_eq!(store.history(project).unwrap(), vec![1, 2]);
}

#[test]
fn rejected_draft_is_never_committed() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileRevisionStore::open(dir.path()).unwrap();
    let project = ProjectId::new();

    let mut raw = acme();
    raw["brand"]["palette"]["primary"] = json!("orange");
    let err = SitePipeline::default().regenerate(&store, project, &raw).unwrap_err();

    assert_eq!(err.issues()[0].path, "brand.palette.primary");
    assert!(store.history(project).unwrap().is_empty());
}
