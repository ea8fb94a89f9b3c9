//! Contact form hand-off to the visitor's email client.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;

/// Everything but unreserved characters is escaped in mailto components.
const MAILTO_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub organization: String,
    pub phone: String,
    pub message: String,
}

impl ContactForm {
    pub fn body(&self) -> String {
        format!(
            "Name: {}\nEmail: {}\nOrg: {}\nPhone: {}\nMessage:\n{}",
            self.name.trim(),
            self.email.trim(),
            self.organization.trim(),
            self.phone.trim(),
            self.message
        )
    }
}

/// `mailto:` URI with percent-encoded subject and body.
pub fn mailto_uri(recipient: &str, subject: &str, form: &ContactForm) -> String {
    format!(
        "mailto:{}?subject={}&body={}",
        recipient.trim(),
        utf8_percent_encode(subject, MAILTO_COMPONENT),
        utf8_percent_encode(&form.body(), MAILTO_COMPONENT)
    )
}
