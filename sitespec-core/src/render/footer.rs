use maud::html;
use serde::Deserialize;
use serde_json::Value;

use super::{decode, Fragment, PageContext, RenderError, SectionRenderer};
use crate::model::{Brand, SectionKind};
use crate::schema::{FieldSpec, FieldType, PropSchema};

const LINK: &[FieldSpec] = &[
    FieldSpec::required("label", FieldType::Text { max_len: 40 }),
    FieldSpec::required("href", FieldType::Link),
];

static SCHEMA: PropSchema = PropSchema {
    fields: &[
        FieldSpec::optional("tagline", FieldType::Text { max_len: 160 }),
        FieldSpec::optional("links", FieldType::ObjectList { max_items: 12, fields: LINK }),
        FieldSpec::optional("copyright", FieldType::Text { max_len: 120 }),
    ],
};

#[derive(Debug, Deserialize)]
struct FooterProps {
    tagline: Option<String>,
    #[serde(default)]
    links: Vec<FooterLink>,
    copyright: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FooterLink {
    label: String,
    href: String,
}

/// Site-wide footer: page navigation first, then any extra links.
pub struct FooterRenderer;

impl SectionRenderer for FooterRenderer {
    fn kind(&self) -> SectionKind {
        SectionKind::Footer
    }

    fn schema(&self) -> &'static PropSchema {
        &SCHEMA
    }

    fn render(&self, props: &Value, brand: &Brand, ctx: &PageContext<'_>) -> Result<Fragment, RenderError> {
        let props: FooterProps = decode(SectionKind::Footer, props)?;
        let copyright = props.copyright.unwrap_or_else(|| format!("© {}", brand.name));

        let markup = html! {
            footer.section.site-footer id=(ctx.section_id) data-section-id=(ctx.section_id) data-kind="footer" {
                div.container.footer-inner {
                    div.footer-brand {
                        strong { (brand.name) }
                        @if let Some(tagline) = &props.tagline {
                            p.footer-tagline { (tagline) }
                        }
                    }
                    nav.footer-nav aria-label="Footer" {
                        ul {
                            @for entry in ctx.nav {
                                li {
                                    @if entry.slug == ctx.slug {
                                        a href=(entry.href) aria-current="page" { (entry.title) }
                                    } @else {
                                        a href=(entry.href) { (entry.title) }
                                    }
                                }
                            }
                            @for link in &props.links {
                                li { a href=(link.href) { (link.label) } }
                            }
                        }
                    }
                    p.footer-copyright { (copyright) }
                }
            }
        };

        Ok(Fragment::new(markup.into_string()))
    }
}
