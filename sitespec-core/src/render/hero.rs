use maud::html;
use serde::Deserialize;
use serde_json::Value;

use super::{decode, AssetRef, Fragment, PageContext, RenderError, SectionRenderer};
use crate::model::{Brand, SectionKind};
use crate::schema::{FieldSpec, FieldType, PropSchema};

static SCHEMA: PropSchema = PropSchema {
    fields: &[
        FieldSpec::required("headline", FieldType::Text { max_len: 120 }),
        FieldSpec::optional("subheadline", FieldType::Text { max_len: 280 }),
        FieldSpec::optional("ctaLabel", FieldType::Text { max_len: 40 }),
        FieldSpec::optional("ctaHref", FieldType::Link),
        FieldSpec::optional("imageUrl", FieldType::Link),
        FieldSpec::optional("imageAlt", FieldType::Text { max_len: 160 }),
    ],
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeroProps {
    headline: String,
    subheadline: Option<String>,
    cta_label: Option<String>,
    cta_href: Option<String>,
    image_url: Option<String>,
    image_alt: Option<String>,
}

pub struct HeroRenderer;

impl SectionRenderer for HeroRenderer {
    fn kind(&self) -> SectionKind {
        SectionKind::Hero
    }

    fn schema(&self) -> &'static PropSchema {
        &SCHEMA
    }

    fn render(&self, props: &Value, _brand: &Brand, ctx: &PageContext<'_>) -> Result<Fragment, RenderError> {
        let props: HeroProps = decode(SectionKind::Hero, props)?;
        let cta_href = props.cta_href.as_deref().unwrap_or("#contact");

        let markup = html! {
            section.section.hero id=(ctx.section_id) data-section-id=(ctx.section_id) data-kind="hero" {
                div.container.hero-inner {
                    div.hero-copy {
                        h1.hero-headline { (props.headline) }
                        @if let Some(sub) = &props.subheadline {
                            p.hero-subheadline { (sub) }
                        }
                        @if let Some(label) = &props.cta_label {
                            a.button.button-primary href=(cta_href) { (label) }
                        }
                    }
                    @if let Some(src) = &props.image_url {
                        img.hero-image src=(src) alt=(props.image_alt.as_deref().unwrap_or(""));
                    }
                }
            }
        };

        let assets = props.image_url.iter().map(|url| AssetRef::image(url)).collect();
        Ok(Fragment::with_assets(markup.into_string(), assets))
    }
}
