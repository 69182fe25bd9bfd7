use maud::html;
use serde::Deserialize;
use serde_json::Value;

use super::{decode, Fragment, PageContext, RenderError, SectionRenderer};
use crate::model::{Brand, SectionKind};
use crate::schema::{FieldSpec, FieldType, PropSchema};

const TIER: &[FieldSpec] = &[
    FieldSpec::required("name", FieldType::Text { max_len: 60 }),
    FieldSpec::required("price", FieldType::Text { max_len: 30 }),
    FieldSpec::optional("period", FieldType::Text { max_len: 30 }),
    FieldSpec::optional("description", FieldType::Text { max_len: 200 }),
    FieldSpec::optional("features", FieldType::TextList { max_items: 12, max_len: 120 }),
    FieldSpec::optional("highlighted", FieldType::Bool),
    FieldSpec::optional("ctaLabel", FieldType::Text { max_len: 40 }),
    FieldSpec::optional("ctaHref", FieldType::Link),
];

static SCHEMA: PropSchema = PropSchema {
    fields: &[
        FieldSpec::optional("title", FieldType::Text { max_len: 120 }),
        FieldSpec::optional("subtitle", FieldType::Text { max_len: 280 }),
        FieldSpec::required("tiers", FieldType::ObjectList { max_items: 4, fields: TIER }),
    ],
};

#[derive(Debug, Deserialize)]
struct PricingProps {
    title: Option<String>,
    subtitle: Option<String>,
    tiers: Vec<Tier>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Tier {
    name: String,
    price: String,
    period: Option<String>,
    description: Option<String>,
    #[serde(default)]
    features: Vec<String>,
    #[serde(default)]
    highlighted: bool,
    cta_label: Option<String>,
    cta_href: Option<String>,
}

pub struct PricingRenderer;

impl SectionRenderer for PricingRenderer {
    fn kind(&self) -> SectionKind {
        SectionKind::Pricing
    }

    fn schema(&self) -> &'static PropSchema {
        &SCHEMA
    }

    fn render(&self, props: &Value, _brand: &Brand, ctx: &PageContext<'_>) -> Result<Fragment, RenderError> {
        let props: PricingProps = decode(SectionKind::Pricing, props)?;

        let highlighted = props.tiers.iter().filter(|t| t.highlighted).count();
        if highlighted > 1 {
            return Err(RenderError::Invariant {
                kind: SectionKind::Pricing,
                reason: format!("{} tiers are highlighted, at most one may be", highlighted),
            });
        }

        let markup = html! {
            section.section.pricing id=(ctx.section_id) data-section-id=(ctx.section_id) data-kind="pricing" {
                div.container {
                    @if let Some(title) = &props.title {
                        h2.section-title { (title) }
                    }
                    @if let Some(subtitle) = &props.subtitle {
                        p.section-subtitle { (subtitle) }
                    }
                    div.pricing-grid {
                        @for tier in &props.tiers {
                            article.pricing-tier.pricing-tier-highlighted[tier.highlighted] {
                                h3.tier-name { (tier.name) }
                                p.tier-price {
                                    span.tier-amount { (tier.price) }
                                    @if let Some(period) = &tier.period {
                                        " "
                                        span.tier-period { (period) }
                                    }
                                }
                                @if let Some(description) = &tier.description {
                                    p.tier-description { (description) }
                                }
                                @if !tier.features.is_empty() {
                                    ul.tier-features {
                                        @for feature in &tier.features {
                                            li { (feature) }
                                        }
                                    }
                                }
                                @if let Some(label) = &tier.cta_label {
                                    a.button.button-primary href=(tier.cta_href.as_deref().unwrap_or("#contact")) { (label) }
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

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use serde_json::json;

    #[test]
    fn marks_highlighted_tier() {
        let fragment = fixtures::render(
            SectionKind::Pricing,
            json!({ "tiers": [
                { "name": "Free", "price": "$0" },
                { "name": "Pro", "price": "$29", "period": "/mo", "highlighted": true, "features": ["SSO"] }
            ]}),
        )
        .unwrap();
        assert_eq!(fragment.html.matches("pricing-tier-highlighted").count(), 1);
        assert!(fragment.html.contains("<li>SSO</li>"));
    }

    #[test]
    fn two_highlighted_tiers_fail() {
        let err = fixtures::render(
            SectionKind::Pricing,
            json!({ "tiers": [
                { "name": "A", "price": "1", "highlighted": true },
                { "name": "B", "price": "2", "highlighted": true }
            ]}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("2 tiers are highlighted"));
    }
}
