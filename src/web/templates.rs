//! Server-rendered HTML.
//!
//! Templates are compiled into the binary and registered once at startup.

use std::collections::HashMap;

use serde_json::Value;
use tera::{Context, Tera};

use crate::error::AppResult;
use crate::i18n::{messages, switch_locale, Locale};
use crate::services::pdf_export::group_thousands;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("macros.html", include_str!("../../templates/macros.html")),
    ("home.html", include_str!("../../templates/home.html")),
    ("cars.html", include_str!("../../templates/cars.html")),
    ("car_detail.html", include_str!("../../templates/car_detail.html")),
    ("inquire.html", include_str!("../../templates/inquire.html")),
    ("contact.html", include_str!("../../templates/contact.html")),
    ("pre_approval.html", include_str!("../../templates/pre_approval.html")),
    ("pre_approval_success.html", include_str!("../../templates/pre_approval_success.html")),
    ("admin_login.html", include_str!("../../templates/admin_login.html")),
    ("admin_dashboard.html", include_str!("../../templates/admin_dashboard.html")),
    ("not_found.html", include_str!("../../templates/not_found.html")),
    ("email_enquiry.html", include_str!("../../templates/email_enquiry.html")),
    ("email_pre_approval.html", include_str!("../../templates/email_pre_approval.html")),
];

pub struct Templates {
    tera: Tera,
}

impl Templates {
    pub fn new() -> AppResult<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.to_vec())?;
        tera.autoescape_on(vec![".html"]);
        tera.set_escape_fn(escape);
        tera.register_filter("thousands", thousands);
        Ok(Self { tera })
    }

    pub fn render(&self, name: &str, context: &Context) -> AppResult<String> {
        Ok(self.tera.render(name, context)?)
    }
}

/// Values every page needs: language, translated strings and the URL of the
/// same page in the other language.
pub fn page_context(locale: Locale, path_and_query: &str) -> Context {
    let mut context = Context::new();
    context.insert("lang", locale.as_str());
    context.insert("t", &messages(locale));
    context.insert("other_lang", locale.other().as_str());
    context.insert("switch_url", &switch_locale(path_and_query, locale.other()));
    context
}

/// HTML escaping that leaves `/` alone so URLs stay readable.
fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// `{{ car.price | thousands }}` -> `18,900`.
fn thousands(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    match value.as_f64() {
        Some(n) => Ok(Value::String(group_thousands(n.round() as i64))),
        None => Ok(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_templates_compile() {
        let templates = Templates::new().unwrap();
        let context = page_context(Locale::Es, "/es/contact");
        let html = templates.render("contact.html", &context).unwrap();
        assert!(html.contains("Contáctenos"));
        assert!(html.contains("href=\"/en/contact\""));
    }

    #[test]
    fn test_email_bodies_are_escaped() {
        let templates = Templates::new().unwrap();
        let mut context = Context::new();
        context.insert("name", "<b>Tom</b>");
        context.insert("email", "tom@example.com");
        context.insert("phone", "-");
        context.insert("message_lines", &vec!["Tom & \"Jerry\"", "it's <i>red</i>?"]);
        context.insert("vehicle", &None::<()>);

        let html = templates.render("email_enquiry.html", &context).unwrap();

        assert!(html.contains("New message from &lt;b&gt;Tom&lt;/b&gt;"));
        assert!(html.contains("Tom &amp; &quot;Jerry&quot;<br>it&#x27;s &lt;i&gt;red&lt;/i&gt;?"));
        assert!(!html.contains("Vehicle"));
    }

    #[test]
    fn test_escape_keeps_slashes() {
        assert_eq!(escape("/en/cars?a=1&b=<x>"), "/en/cars?a=1&amp;b=&lt;x&gt;");
    }

    #[test]
    fn test_thousands_filter() {
        let out = thousands(&serde_json::json!(18900.4), &HashMap::new()).unwrap();
        assert_eq!(out, Value::String("18,900".into()));
        let out = thousands(&Value::Null, &HashMap::new()).unwrap();
        assert_eq!(out, Value::Null);
    }
}
