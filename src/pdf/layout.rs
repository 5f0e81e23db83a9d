// Page composition for the certificate layouts.
//
// `compose` turns a certificate into a `PagePlan` (pure data, positions in mm
// from the bottom-left corner); `draw` turns a plan into PDF bytes. Text uses
// the base-14 Helvetica family so no font files are needed on the host; text
// those fonts cannot encode is refused rather than silently dropped.

use chrono::{DateTime, Utc};
use printpdf::{
    Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfLayerReference, Point, Rgb,
};
use std::path::{Path, PathBuf};

use super::fonts::{self, FontFace};
use super::{Layout, RenderError};
use crate::certificate::Certificate;

const A4_SHORT_MM: f32 = 210.0;
const A4_LONG_MM: f32 = 297.0;

const PT_TO_MM: f32 = 0.3528;
const SIDE_MARGIN_MM: f32 = 20.0;
const BACKGROUND_DPI: f32 = 300.0;

const NAVY: (u8, u8, u8) = (0x1a, 0x52, 0x76);
const SLATE: (u8, u8, u8) = (0x2c, 0x3e, 0x50);

/// One horizontally centred line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub face: FontFace,
    pub size_pt: f32,
    pub color: (u8, u8, u8),
    pub baseline_mm: f32,
}

/// A centred horizontal rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub y_mm: f32,
    pub width_mm: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    pub width_mm: f32,
    pub height_mm: f32,
    pub background: Option<PathBuf>,
    pub border: bool,
    pub lines: Vec<TextLine>,
    pub rules: Vec<Rule>,
}

/// Values written to the PDF /Info dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInfo {
    pub title: String,
    pub author: String,
    pub subject: String,
    pub keywords: Vec<String>,
}

impl DocumentInfo {
    pub fn for_certificate(certificate: &Certificate, issuer: &str) -> Self {
        Self {
            title: format!("{} Certificate - {}", issuer, certificate.name),
            author: format!("{} Certificate Service", issuer),
            subject: "Certificate of Completion".to_string(),
            keywords: vec![
                "certificate".to_string(),
                "completion".to_string(),
                issuer.to_lowercase(),
            ],
        }
    }
}

/// Long-form English date, e.g. "January 5, 2025".
pub fn format_long_date(date: &DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Rendered width of `text`, from the AFM advances of `face`.
pub fn text_width_mm(text: &str, face: FontFace, size_pt: f32) -> f32 {
    fonts::text_width_em(text, face) * size_pt * PT_TO_MM
}

/// Shrink `size_pt` until `text` fits in `max_width_mm`.
fn fit_size(text: &str, face: FontFace, size_pt: f32, max_width_mm: f32) -> f32 {
    let width = text_width_mm(text, face, size_pt);
    if width <= max_width_mm || width == 0.0 {
        size_pt
    } else {
        (size_pt * max_width_mm / width).max(8.0)
    }
}

/// Left edge that centres `line` on a page `page_width_mm` wide.
fn centred_x(line: &TextLine, page_width_mm: f32) -> f32 {
    let width = text_width_mm(&line.text, line.face, line.size_pt);
    ((page_width_mm - width) / 2.0).max(0.0)
}

pub fn compose(certificate: &Certificate, layout: &Layout, issuer: &str) -> PagePlan {
    match layout {
        Layout::Plain => compose_plain(certificate, issuer),
        Layout::ImageBackground { asset_path } => {
            compose_image_background(certificate, issuer, asset_path)
        }
    }
}

fn detail_lines(certificate: &Certificate) -> [String; 3] {
    [
        format!("Certificate ID: {}", certificate.id),
        format!("Issue Date: {}", format_long_date(&certificate.issue_date)),
        format!("Valid Until: {}", format_long_date(&certificate.expiry_date)),
    ]
}

fn compose_plain(certificate: &Certificate, issuer: &str) -> PagePlan {
    let width = A4_SHORT_MM;
    let height = A4_LONG_MM;
    let max_text = width - 2.0 * SIDE_MARGIN_MM;
    let from_top = |mm: f32| height - mm;

    let mut lines = vec![
        TextLine {
            text: "Certificate of Completion".to_string(),
            face: FontFace::Bold,
            size_pt: 30.0,
            color: NAVY,
            baseline_mm: from_top(45.0),
        },
        TextLine {
            text: "This is to certify that".to_string(),
            face: FontFace::Regular,
            size_pt: 16.0,
            color: SLATE,
            baseline_mm: from_top(70.0),
        },
        TextLine {
            size_pt: fit_size(&certificate.name, FontFace::Bold, 24.0, max_text),
            text: certificate.name.clone(),
            face: FontFace::Bold,
            color: NAVY,
            baseline_mm: from_top(88.0),
        },
        TextLine {
            text: format!("has successfully completed the {} course", issuer),
            face: FontFace::Regular,
            size_pt: 16.0,
            color: SLATE,
            baseline_mm: from_top(104.0),
        },
    ];

    for (i, text) in detail_lines(certificate).into_iter().enumerate() {
        lines.push(TextLine {
            size_pt: fit_size(&text, FontFace::Regular, 12.0, max_text),
            text,
            face: FontFace::Regular,
            color: SLATE,
            baseline_mm: from_top(130.0 + 8.0 * i as f32),
        });
    }

    lines.push(TextLine {
        text: format!("{} Authorized Signature", issuer),
        face: FontFace::Oblique,
        size_pt: 14.0,
        color: SLATE,
        baseline_mm: from_top(194.0),
    });

    PagePlan {
        width_mm: width,
        height_mm: height,
        background: None,
        border: true,
        lines,
        // 200pt wide, just above the signature label
        rules: vec![Rule {
            y_mm: from_top(186.0),
            width_mm: 200.0 * PT_TO_MM,
        }],
    }
}

fn compose_image_background(certificate: &Certificate, issuer: &str, asset: &Path) -> PagePlan {
    let width = A4_LONG_MM;
    let height = A4_SHORT_MM;
    let max_text = width - 2.0 * SIDE_MARGIN_MM;
    let at = |fraction_from_top: f32| height * (1.0 - fraction_from_top);

    let mut lines = vec![
        TextLine {
            size_pt: fit_size(&certificate.name, FontFace::Bold, 36.0, max_text),
            text: certificate.name.clone(),
            face: FontFace::Bold,
            color: NAVY,
            baseline_mm: at(0.45),
        },
        TextLine {
            text: format!("has successfully completed the {} course", issuer),
            face: FontFace::Regular,
            size_pt: 16.0,
            color: SLATE,
            baseline_mm: at(0.55),
        },
    ];

    for (i, text) in detail_lines(certificate).into_iter().enumerate() {
        lines.push(TextLine {
            size_pt: fit_size(&text, FontFace::Regular, 12.0, max_text),
            text,
            face: FontFace::Regular,
            color: SLATE,
            baseline_mm: at(0.66 + 0.06 * i as f32),
        });
    }

    PagePlan {
        width_mm: width,
        height_mm: height,
        background: Some(asset.to_path_buf()),
        border: false,
        lines,
        rules: Vec::new(),
    }
}

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(Rgb::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        None,
    ))
}

fn pdf_err(e: impl std::fmt::Display) -> RenderError {
    RenderError::Pdf(e.to_string())
}

/// Decode the background image, or fail if the asset is absent.
fn load_background(path: &Path) -> Result<Image, RenderError> {
    if !path.is_file() {
        return Err(RenderError::MissingAsset(path.to_path_buf()));
    }
    let decoded =
        printpdf::image_crate::open(path).map_err(|e| RenderError::Image(e.to_string()))?;
    // alpha channels are not carried into the XObject
    let rgb = printpdf::image_crate::DynamicImage::ImageRgb8(decoded.to_rgb8());
    Ok(Image::from_dynamic_image(&rgb))
}

fn place_background(
    layer: &PdfLayerReference,
    image: Image,
    width_mm: f32,
    height_mm: f32,
) {
    let px_w = image.image.width.0 as f32;
    let px_h = image.image.height.0 as f32;
    let native_w_mm = px_w / BACKGROUND_DPI * 25.4;
    let native_h_mm = px_h / BACKGROUND_DPI * 25.4;

    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(0.0)),
            translate_y: Some(Mm(0.0)),
            scale_x: Some(width_mm / native_w_mm),
            scale_y: Some(height_mm / native_h_mm),
            dpi: Some(BACKGROUND_DPI),
            ..Default::default()
        },
    );
}

fn draw_border(layer: &PdfLayerReference, width_mm: f32, height_mm: f32) {
    // 20pt inset, 3pt stroke
    let inset = 20.0 * PT_TO_MM;
    let corners = [
        (inset, inset),
        (width_mm - inset, inset),
        (width_mm - inset, height_mm - inset),
        (inset, height_mm - inset),
    ];
    layer.set_outline_color(rgb(NAVY));
    layer.set_outline_thickness(3.0);
    layer.add_line(Line {
        points: corners
            .iter()
            .map(|&(x, y)| (Point::new(Mm(x), Mm(y)), false))
            .collect(),
        is_closed: true,
    });
}

fn draw_rule(layer: &PdfLayerReference, rule: Rule, page_width_mm: f32) {
    let left = (page_width_mm - rule.width_mm) / 2.0;
    layer.set_outline_color(rgb(SLATE));
    layer.set_outline_thickness(1.0);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(left), Mm(rule.y_mm)), false),
            (Point::new(Mm(left + rule.width_mm), Mm(rule.y_mm)), false),
        ],
        is_closed: false,
    });
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    oblique: IndirectFontRef,
}

impl Fonts {
    fn get(&self, face: FontFace) -> &IndirectFontRef {
        match face {
            FontFace::Regular => &self.regular,
            FontFace::Bold => &self.bold,
            FontFace::Oblique => &self.oblique,
        }
    }
}

/// Serialise a plan into a complete single-page PDF.
pub fn draw(plan: &PagePlan, info: &DocumentInfo) -> Result<Vec<u8>, RenderError> {
    for line in &plan.lines {
        let missing = fonts::unprintable_chars(&line.text);
        if !missing.is_empty() {
            return Err(RenderError::UnsupportedText(missing.into_iter().collect()));
        }
    }

    // Decode first so a bad asset fails before any PDF work.
    let background = plan.background.as_deref().map(load_background).transpose()?;

    let (doc, page, layer) = PdfDocument::new(
        info.title.as_str(),
        Mm(plan.width_mm),
        Mm(plan.height_mm),
        "certificate",
    );
    let doc = doc
        .with_author(info.author.as_str())
        .with_subject(info.subject.as_str())
        .with_keywords(info.keywords.clone())
        .with_creator(info.author.as_str());
    let layer = doc.get_page(page).get_layer(layer);

    let fonts = Fonts {
        regular: doc
            .add_builtin_font(FontFace::Regular.builtin())
            .map_err(pdf_err)?,
        bold: doc.add_builtin_font(FontFace::Bold.builtin()).map_err(pdf_err)?,
        oblique: doc
            .add_builtin_font(FontFace::Oblique.builtin())
            .map_err(pdf_err)?,
    };

    if let Some(image) = background {
        place_background(&layer, image, plan.width_mm, plan.height_mm);
    }
    if plan.border {
        draw_border(&layer, plan.width_mm, plan.height_mm);
    }
    for rule in &plan.rules {
        draw_rule(&layer, *rule, plan.width_mm);
    }
    for line in &plan.lines {
        let x = centred_x(line, plan.width_mm);
        layer.set_fill_color(rgb(line.color));
        layer.use_text(
            line.text.as_str(),
            line.size_pt,
            Mm(x),
            Mm(line.baseline_mm),
            fonts.get(line.face),
        );
    }

    doc.save_to_bytes().map_err(pdf_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::CertificateId;
    use chrono::TimeZone;

    fn sample() -> Certificate {
        let issue = Utc.with_ymd_and_hms(2025, 1, 5, 9, 0, 0).unwrap();
        Certificate {
            id: CertificateId::parse("CSG-0001").unwrap(),
            user_id: Some("u1".into()),
            name: "Jane Doe".into(),
            email: "jane@example.com".into(),
            issue_date: issue,
            expiry_date: Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn formats_long_dates() {
        let date = Utc.with_ymd_and_hms(2025, 1, 5, 23, 59, 0).unwrap();
        assert_eq!(format_long_date(&date), "January 5, 2025");
        let date = Utc.with_ymd_and_hms(2024, 12, 25, 0, 0, 0).unwrap();
        assert_eq!(format_long_date(&date), "December 25, 2024");
    }

    #[test]
    fn plain_layout_stacks_fields_in_order() {
        let plan = compose(&sample(), &Layout::Plain, "CSG");
        assert_eq!((plan.width_mm, plan.height_mm), (210.0, 297.0));
        assert!(plan.border);
        assert_eq!(plan.rules.len(), 1);

        let texts: Vec<&str> = plan.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(
            texts,
            [
                "Certificate of Completion",
                "This is to certify that",
                "Jane Doe",
                "has successfully completed the CSG course",
                "Certificate ID: CSG-0001",
                "Issue Date: January 5, 2025",
                "Valid Until: January 5, 2026",
                "CSG Authorized Signature",
            ]
        );

        // baselines descend down the page
        assert!(plan.lines.windows(2).all(|w| w[0].baseline_mm > w[1].baseline_mm));

        // id, issue and expiry share one spacing
        let gaps: Vec<f32> = plan.lines[4..7]
            .windows(2)
            .map(|w| w[0].baseline_mm - w[1].baseline_mm)
            .collect();
        assert!((gaps[0] - gaps[1]).abs() < f32::EPSILON);
    }

    #[test]
    fn image_layout_uses_landscape_percentages() {
        let layout = Layout::ImageBackground {
            asset_path: PathBuf::from("assets/background.png"),
        };
        let plan = compose(&sample(), &layout, "CSG");
        assert_eq!((plan.width_mm, plan.height_mm), (297.0, 210.0));
        assert_eq!(plan.background.as_deref(), Some(Path::new("assets/background.png")));
        assert!(plan.rules.is_empty());
        assert!(!plan.border);
        assert_eq!(plan.lines[0].text, "Jane Doe");
        assert!((plan.lines[0].baseline_mm - 210.0 * 0.55).abs() < 0.01);
    }

    #[test]
    fn long_names_are_shrunk_to_fit() {
        let mut cert = sample();
        cert.name = "Maximiliana Alexandrina Konstantinopoulou-Papadimitriou".into();
        let plan = compose(&cert, &Layout::Plain, "CSG");
        let name = &plan.lines[2];
        assert!(name.size_pt < 24.0);
        assert!(text_width_mm(&name.text, name.face, name.size_pt) <= 210.0 - 2.0 * SIDE_MARGIN_MM + 0.01);
    }

    #[test]
    fn draws_extractable_pdf() {
        let cert = sample();
        let plan = compose(&cert, &Layout::Plain, "CSG");
        let bytes = draw(&plan, &DocumentInfo::for_certificate(&cert, "CSG")).unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        let text = pdf_extract::extract_text_from_mem(&bytes).unwrap();
        assert!(text.contains("Jane Doe"), "extracted: {text}");
        assert!(text.contains("CSG-0001"), "extracted: {text}");
    }

    #[test]
    fn centres_on_real_glyph_widths() {
        let line = |text: &str| TextLine {
            text: text.to_string(),
            face: FontFace::Regular,
            size_pt: 30.0,
            color: NAVY,
            baseline_mm: 100.0,
        };
        let wide = line("WWWW");
        let narrow = line("iiii");

        let wide_w = text_width_mm(&wide.text, wide.face, wide.size_pt);
        let narrow_w = text_width_mm(&narrow.text, narrow.face, narrow.size_pt);
        assert!((wide_w / narrow_w - 944.0 / 222.0).abs() < 1e-4);

        for l in [&wide, &narrow] {
            let w = text_width_mm(&l.text, l.face, l.size_pt);
            let centre = centred_x(l, 210.0) + w / 2.0;
            assert!((centre - 105.0).abs() < 1e-3, "{} centred at {centre}", l.text);
        }
    }

    #[test]
    fn refuses_text_the_fonts_cannot_encode() {
        for name in ["\u{141}ukasz \u{17b}\u{f3}\u{142}\u{107}", "\u{674e}\u{96f7}"] {
            let mut cert = sample();
            cert.name = name.to_string();
            let plan = compose(&cert, &Layout::Plain, "CSG");
            let err = draw(&plan, &DocumentInfo::for_certificate(&cert, "CSG")).unwrap_err();
            assert!(matches!(err, RenderError::UnsupportedText(_)), "{name}: {err}");
        }

        let mut cert = sample();
        cert.name = "Jos\u{e9} N\u{fa}\u{f1}ez".into();
        let plan = compose(&cert, &Layout::Plain, "CSG");
        let bytes = draw(&plan, &DocumentInfo::for_certificate(&cert, "CSG")).unwrap();
        let text = pdf_extract::extract_text_from_mem(&bytes).unwrap();
        assert!(text.contains("Jos\u{e9} N\u{fa}\u{f1}ez"), "extracted: {text}");
    }

    #[test]
    fn missing_background_is_reported() {
        let layout = Layout::ImageBackground {
            asset_path: PathBuf::from("/definitely/not/here.png"),
        };
        let cert = sample();
        let plan = compose(&cert, &layout, "CSG");
        let err = draw(&plan, &DocumentInfo::for_certificate(&cert, "CSG")).unwrap_err();
        assert!(matches!(err, RenderError::MissingAsset(_)));
    }

    #[test]
    fn metadata_follows_certificate() {
        let info = DocumentInfo::for_certificate(&sample(), "CSG");
        assert_eq!(info.title, "CSG Certificate - Jane Doe");
        assert_eq!(info.author, "CSG Certificate Service");
        assert_eq!(info.subject, "Certificate of Completion");
        assert_eq!(info.keywords, ["certificate", "completion", "csg"]);
    }
}
