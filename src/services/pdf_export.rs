//! One-page spec sheet for a car.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::error::{AppError, AppResult};
use crate::i18n::{t, Locale};
use crate::models::Car;

const A4_WIDTH: i64 = 595;
const A4_HEIGHT: i64 = 842;
const MARGIN: i64 = 56;
const LINE_HEIGHT: i64 = 22;

/// Attachment file name: the stock number when set, else the id.
pub fn pdf_filename(car: &Car) -> String {
    let stem: String = car
        .display_id()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}.pdf", stem)
}

/// Encodes text for the standard Helvetica font with WinAnsi encoding.
/// Latin-1 characters pass through; a few common typographic characters are
/// mapped to ASCII and anything else becomes `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => b'\'',
            '\u{201C}' | '\u{201D}' => b'"',
            '\u{2013}' | '\u{2014}' => b'-',
            '\u{20AC}' => 0x80,
            c if (' '..='~').contains(&c) => c as u8,
            c if ('\u{A0}'..='\u{FF}').contains(&c) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn format_price(price: Option<f64>, locale: Locale) -> String {
    match price {
        Some(p) => format!("${}", group_thousands(p.round() as i64)),
        None => t(locale, "car.call_for_price").to_string(),
    }
}

/// `1234567` -> `"1,234,567"`.
pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 {
        out.insert(0, '-');
    }
    out
}

fn spec_rows(car: &Car, locale: Locale) -> Vec<(String, String)> {
    let mut rows = vec![
        (t(locale, "search.make").to_string(), car.brand.clone()),
        (t(locale, "search.model").to_string(), car.model.clone()),
    ];
    if let Some(trim) = &car.trim {
        rows.push((t(locale, "car.trim").to_string(), trim.clone()));
    }
    rows.push((t(locale, "car.year").to_string(), car.model_year.to_string()));
    rows.push((
        t(locale, "car.mileage").to_string(),
        group_thousands(i64::from(car.mileage)),
    ));
    rows.push((t(locale, "car.price").to_string(), format_price(car.price, locale)));
    rows.push((t(locale, "car.vin").to_string(), car.vin.clone()));
    if let Some(body_style) = &car.body_style {
        rows.push((t(locale, "car.body_style").to_string(), body_style.clone()));
    }
    if let Some(drivetrain) = &car.drivetrain {
        rows.push((t(locale, "car.drivetrain").to_string(), drivetrain.clone()));
    }
    if let Some(cylinders) = car.cylinders {
        rows.push((t(locale, "car.cylinders").to_string(), cylinders.to_string()));
    }
    if let Some(custom_id) = &car.custom_id {
        rows.push((t(locale, "car.stock").to_string(), custom_id.clone()));
    }
    rows.push((t(locale, "car.status").to_string(), car.status.to_string()));
    rows
}

fn text_at(ops: &mut Vec<Operation>, font: &str, size: i64, x: i64, y: i64, text: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
    ops.push(Operation::new("Td", vec![x.into(), y.into()]));
    ops.push(Operation::new("Tj", vec![Object::string_literal(win_ansi(text))]));
    ops.push(Operation::new("ET", vec![]));
}

/// Renders the spec sheet as an uncompressed single-page A4 PDF.
pub fn render_car_pdf(car: &Car, locale: Locale) -> AppResult<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut ops = Vec::new();
    let mut y = A4_HEIGHT - MARGIN;
    text_at(&mut ops, "F2", 20, MARGIN, y, &car.name);
    y -= LINE_HEIGHT;
    text_at(&mut ops, "F1", 11, MARGIN, y, t(locale, "car.spec_sheet"));
    y -= LINE_HEIGHT * 2;

    for (label, value) in spec_rows(car, locale) {
        text_at(&mut ops, "F2", 12, MARGIN, y, &label);
        text_at(&mut ops, "F1", 12, MARGIN + 160, y, &value);
        y -= LINE_HEIGHT;
    }

    let content = Content { operations: ops };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), A4_WIDTH.into(), A4_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| AppError::Internal(format!("failed to write PDF: {}", e)))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::sample_car;

    #[test]
    fn test_pdf_contains_car_attributes() {
        let mut car = sample_car("Toyota", "Camry", 2019);
        car.price = Some(18_900.0);
        car.custom_id = Some("STK-1001".into());

        let bytes = render_car_pdf(&car, Locale::En).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let text = pdf_extract::extract_text_from_mem(&bytes).unwrap();
        assert!(text.contains("2019 Toyota Camry"));
        assert!(text.contains("$18,900"));
        assert!(text.contains("STK-1001"));
    }

    #[test]
    fn test_spanish_labels_survive_encoding() {
        let car = sample_car("Honda", "Civic", 2020);
        let bytes = render_car_pdf(&car, Locale::Es).unwrap();
        let text = pdf_extract::extract_text_from_mem(&bytes).unwrap();
        assert!(text.contains("Año"));
    }

    #[test]
    fn test_filename_prefers_stock_number() {
        let mut car = sample_car("Kia", "Soul", 2020);
        assert_eq!(pdf_filename(&car), format!("{}.pdf", car.id));
        car.custom_id = Some("STK 7/A".into());
        assert_eq!(pdf_filename(&car), "STK_7_A.pdf");
    }

    #[test]
    fn test_win_ansi_replaces_unsupported_characters() {
        assert_eq!(win_ansi("Año"), vec![b'A', 0xF1, b'o']);
        assert_eq!(win_ansi("\u{2014}\u{4E2D}"), b"-?".to_vec());
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(1234567), "1,234,567");
        assert_eq!(group_thousands(-1500), "-1,500");
    }
}
