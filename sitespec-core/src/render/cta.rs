use maud::html;
use serde::Deserialize;
use serde_json::Value;

use super::{decode, Fragment, PageContext, RenderError, SectionRenderer};
use crate::model::{Brand, SectionKind};
use crate::schema::{FieldSpec, FieldType, PropSchema};

static SCHEMA: PropSchema = PropSchema {
    fields: &[
        FieldSpec::required("headline", FieldType::Text { max_len: 120 }),
        FieldSpec::optional("body", FieldType::Text { max_len: 400 }),
        FieldSpec::required("buttonLabel", FieldType::Text { max_len: 40 }),
        FieldSpec::optional("buttonHref", FieldType::Link),
    ],
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CtaProps {
    headline: String,
    body: Option<String>,
    button_label: String,
    button_href: Option<String>,
}

pub struct CtaRenderer;

impl SectionRenderer for CtaRenderer {
    fn kind(&self) -> SectionKind {
        SectionKind::Cta
    }

    fn schema(&self) -> &'static PropSchema {
        &SCHEMA
    }

    fn render(&self, props: &Value, _brand: &Brand, ctx: &PageContext<'_>) -> Result<Fragment, RenderError> {
        let props: CtaProps = decode(SectionKind::Cta, props)?;
        let href = props.button_href.as_deref().unwrap_or("#contact");

        let markup = html! {
            section.section.cta id=(ctx.section_id) data-section-id=(ctx.section_id) data-kind="cta" {
                div.container.cta-inner {
                    h2.cta-headline { (props.headline) }
                    @if let Some(body) = &props.body {
                        p.cta-body { (body) }
                    }
                    a.button.button-inverse href=(href) { (props.button_label) }
                }
            }
        };

        Ok(Fragment::new(markup.into_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use serde_json::json;

    #[test]
    fn button_uses_given_href() {
        let fragment = fixtures::render(
            SectionKind::Cta,
            json!({ "headline": "Ready?", "buttonLabel": "Go", "buttonHref": "/signup?plan=pro&ref=hero" }),
        )
        .unwrap();
        assert!(fragment.html.contains(r#"href="/signup?plan=pro&amp;ref=hero""#));
        assert!(fragment.html.contains(">Go</a>"));
    }
}
