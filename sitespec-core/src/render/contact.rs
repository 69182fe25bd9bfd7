use maud::html;
use serde::Deserialize;
use serde_json::Value;

use super::{decode, Fragment, PageContext, RenderError, SectionRenderer};
use crate::model::{Brand, SectionKind};
use crate::schema::{FieldSpec, FieldType, PropSchema};

static SCHEMA: PropSchema = PropSchema {
    fields: &[
        FieldSpec::optional("title", FieldType::Text { max_len: 120 }),
        FieldSpec::optional("body", FieldType::Text { max_len: 400 }),
        FieldSpec::optional("email", FieldType::Email),
        FieldSpec::optional("phone", FieldType::Text { max_len: 40 }),
        FieldSpec::optional("address", FieldType::Text { max_len: 200 }),
        FieldSpec::optional("formAction", FieldType::Link),
        FieldSpec::optional("submitLabel", FieldType::Text { max_len: 40 }),
    ],
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContactProps {
    title: Option<String>,
    body: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    form_action: Option<String>,
    submit_label: Option<String>,
}

pub struct ContactRenderer;

impl SectionRenderer for ContactRenderer {
    fn kind(&self) -> SectionKind {
        SectionKind::Contact
    }

    fn schema(&self) -> &'static PropSchema {
        &SCHEMA
    }

    fn render(&self, props: &Value, _brand: &Brand, ctx: &PageContext<'_>) -> Result<Fragment, RenderError> {
        let props: ContactProps = decode(SectionKind::Contact, props)?;

        if props.email.is_none()
            && props.phone.is_none()
            && props.address.is_none()
            && props.form_action.is_none()
        {
            return Err(RenderError::Invariant {
                kind: SectionKind::Contact,
                reason: "no email, phone, address or form to contact".to_string(),
            });
        }

        let markup = html! {
            section.section.contact id=(ctx.section_id) data-section-id=(ctx.section_id) data-kind="contact" {
                div.container.contact-inner {
                    h2.section-title { (props.title.as_deref().unwrap_or("Get in touch")) }
                    @if let Some(body) = &props.body {
                        p.section-subtitle { (body) }
                    }
                    ul.contact-channels {
                        @if let Some(email) = &props.email {
                            li { a href={ "mailto:" (email) } { (email) } }
                        }
                        @if let Some(phone) = &props.phone {
                            li { a href={ "tel:" (phone.replace(' ', "")) } { (phone) } }
                        }
                        @if let Some(address) = &props.address {
                            li { address { (address) } }
                        }
                    }
                    @if let Some(action) = &props.form_action {
                        form.contact-form method="post" action=(action) {
                            label { "Name" input type="text" name="name" required; }
                            label { "Email" input type="email" name="email" required; }
                            label { "Message" textarea name="message" rows="5" required {} }
                            button.button.button-primary type="submit" {
                                (props.submit_label.as_deref().unwrap_or("Send"))
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
    fn renders_channels() {
        let fragment = fixtures::render(
            SectionKind::Contact,
            json!({ "email": "hi@acme.test", "phone": "+1 555 0100" }),
        )
        .unwrap();
        assert!(fragment.html.contains(r#"href="mailto:hi@acme.test""#));
        assert!(fragment.html.contains(r#"href="tel:+15550100""#));
        assert!(!fragment.html.contains("<form"));
    }

    #[test]
    fn unreachable_contact_violates_invariant() {
        let err = fixtures::render(SectionKind::Contact, json!({ "title": "Say hi" })).unwrap_err();
        assert!(matches!(err, RenderError::Invariant { kind: SectionKind::Contact, .. }));
    }
}
