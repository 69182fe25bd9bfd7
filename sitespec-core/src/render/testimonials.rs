use maud::html;
use serde::Deserialize;
use serde_json::Value;

use super::{decode, AssetRef, Fragment, PageContext, RenderError, SectionRenderer};
use crate::model::{Brand, SectionKind};
use crate::schema::{FieldSpec, FieldType, PropSchema};

const ITEM: &[FieldSpec] = &[
    FieldSpec::required("quote", FieldType::Text { max_len: 400 }),
    FieldSpec::required("author", FieldType::Text { max_len: 80 }),
    FieldSpec::optional("role", FieldType::Text { max_len: 80 }),
    FieldSpec::optional("avatarUrl", FieldType::Link),
];

static SCHEMA: PropSchema = PropSchema {
    fields: &[
        FieldSpec::optional("title", FieldType::Text { max_len: 120 }),
        FieldSpec::required("items", FieldType::ObjectList { max_items: 9, fields: ITEM }),
    ],
};

#[derive(Debug, Deserialize)]
struct TestimonialsProps {
    title: Option<String>,
    items: Vec<Testimonial>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Testimonial {
    quote: String,
    author: String,
    role: Option<String>,
    avatar_url: Option<String>,
}

pub struct TestimonialsRenderer;

impl SectionRenderer for TestimonialsRenderer {
    fn kind(&self) -> SectionKind {
        SectionKind::Testimonials
    }

    fn schema(&self) -> &'static PropSchema {
        &SCHEMA
    }

    fn render(&self, props: &Value, _brand: &Brand, ctx: &PageContext<'_>) -> Result<Fragment, RenderError> {
        let props: TestimonialsProps = decode(SectionKind::Testimonials, props)?;

        let markup = html! {
            section.section.testimonials id=(ctx.section_id) data-section-id=(ctx.section_id) data-kind="testimonials" {
                div.container {
                    @if let Some(title) = &props.title {
                        h2.section-title { (title) }
                    }
                    div.testimonial-grid {
                        @for item in &props.items {
                            figure.testimonial {
                                blockquote.testimonial-quote { p { (item.quote) } }
                                figcaption.testimonial-author {
                                    @if let Some(avatar) = &item.avatar_url {
                                        img.testimonial-avatar src=(avatar) alt=(item.author) width="48" height="48";
                                    }
                                    cite { (item.author) }
                                    @if let Some(role) = &item.role {
                                        span.testimonial-role { (role) }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        };

        let assets = props
            .items
            .iter()
            .filter_map(|item| item.avatar_url.as_deref())
            .map(AssetRef::image)
            .collect();
        Ok(Fragment::with_assets(markup.into_string(), assets))
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use serde_json::json;

    #[test]
    fn avatars_are_collected_as_assets() {
        let fragment = fixtures::render(
            SectionKind::Testimonials,
            json!({ "items": [
                { "quote": "Great", "author": "Sam", "avatarUrl": "https://cdn.example.com/sam.jpg" },
                { "quote": "Fine", "author": "Alex", "role": "CTO" }
            ]}),
        )
        .unwrap();
        assert_eq!(fragment.assets, vec![AssetRef::image("https://cdn.example.com/sam.jpg")]);
        assert!(fragment.html.contains("<cite>Alex</cite>"));
    }
}
