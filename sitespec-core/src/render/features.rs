use maud::html;
use serde::Deserialize;
use serde_json::Value;

use super::{decode, Fragment, PageContext, RenderError, SectionRenderer};
use crate::model::{Brand, SectionKind};
use crate::schema::{FieldSpec, FieldType, PropSchema};

const ITEM: &[FieldSpec] = &[
    FieldSpec::required("title", FieldType::Text { max_len: 80 }),
    FieldSpec::optional("description", FieldType::Text { max_len: 280 }),
    FieldSpec::optional("icon", FieldType::Text { max_len: 8 }),
];

static SCHEMA: PropSchema = PropSchema {
    fields: &[
        FieldSpec::optional("title", FieldType::Text { max_len: 120 }),
        FieldSpec::optional("subtitle", FieldType::Text { max_len: 280 }),
        FieldSpec::required("items", FieldType::ObjectList { max_items: 12, fields: ITEM }),
    ],
};

#[derive(Debug, Deserialize)]
struct FeaturesProps {
    title: Option<String>,
    subtitle: Option<String>,
    items: Vec<FeatureItem>,
}

#[derive(Debug, Deserialize)]
struct FeatureItem {
    title: String,
    description: Option<String>,
    icon: Option<String>,
}

pub struct FeaturesRenderer;

impl SectionRenderer for FeaturesRenderer {
    fn kind(&self) -> SectionKind {
        SectionKind::Features
    }

    fn schema(&self) -> &'static PropSchema {
        &SCHEMA
    }

    fn render(&self, props: &Value, _brand: &Brand, ctx: &PageContext<'_>) -> Result<Fragment, RenderError> {
        let props: FeaturesProps = decode(SectionKind::Features, props)?;
        if props.items.is_empty() {
            return Err(RenderError::Invariant {
                kind: SectionKind::Features,
                reason: "a features grid needs at least one item".to_string(),
            });
        }

        let markup = html! {
            section.section.features id=(ctx.section_id) data-section-id=(ctx.section_id) data-kind="features" {
                div.container {
                    @if let Some(title) = &props.title {
                        h2.section-title { (title) }
                    }
                    @if let Some(subtitle) = &props.subtitle {
                        p.section-subtitle { (subtitle) }
                    }
                    ul.feature-grid {
                        @for item in &props.items {
                            li.feature-card {
                                @if let Some(icon) = &item.icon {
                                    span.feature-icon aria-hidden="true" { (icon) }
                                }
                                h3.feature-title { (item.title) }
                                @if let Some(description) = &item.description {
                                    p.feature-description { (description) }
                                }
                            }
                        }
                    }
                }
            }
        };

        Ok(Fragment::new(markup.into_string()))
    }
}
