//! Inline vector markup sanitization
//!
//! Models occasionally sketch a word as a small SVG instead of naming an
//! image. The markup is untrusted: it gets reparsed and rebuilt from an
//! element allow-list, never passed through. Anything unparsable collapses
//! to a fixed placeholder graphic rather than an error.

use once_cell::sync::Lazy;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;

const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// Coordinate frame injected when the source declares no viewBox
const DEFAULT_VIEW_BOX: &str = "0 0 100 100";

/// Neutral "no picture" graphic used when markup cannot be salvaged
pub const PLACEHOLDER_MARKUP: &str = concat!(
    r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">"#,
    r##"<rect x="18" y="18" width="64" height="64" rx="8" fill="none" stroke="#b0b0b0" stroke-width="3"/>"##,
    r##"<path d="M30 66 L44 48 L56 60 L64 52 L70 66 Z" fill="#c8c8c8"/>"##,
    r##"<circle cx="40" cy="36" r="6" fill="#c8c8c8"/>"##,
    "</svg>"
);

/// Elements that survive sanitization; everything else is dropped with its subtree
const ALLOWED_TAGS: [&str; 16] = [
    "svg", "g", "defs", "path", "rect", "circle", "ellipse", "line", "polyline", "polygon",
    "clipPath", "mask", "title", "desc", "text", "tspan",
];

static STYLE_URL_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)url\(\s*["']?\s*(.)"#).expect("Failed to compile style url regex")
});

struct SvgElement {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<SvgNode>,
}

enum SvgNode {
    Element(SvgElement),
    Text(String),
}

/// Rebuild untrusted SVG markup into a safe, renderable form.
///
/// Guarantees on the output: well-formed, allow-listed elements only, no
/// event handlers, no remote references, root carries the SVG namespace and
/// a viewBox, no width/height on the root. Input that is not parsable SVG
/// yields [`PLACEHOLDER_MARKUP`].
pub fn sanitize_vector_markup(raw: &str) -> String {
    match rebuild(raw) {
        Some(markup) => markup,
        None => PLACEHOLDER_MARKUP.to_string(),
    }
}

fn rebuild(raw: &str) -> Option<String> {
    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    let mut root: Option<SvgElement> = None;
    let mut stack: Vec<SvgElement> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let tag = tag_name(&e);
                if stack.is_empty() {
                    if root.is_some() || !tag.eq_ignore_ascii_case("svg") {
                        return None;
                    }
                    stack.push(build_element("svg", &e)?);
                } else if ALLOWED_TAGS.contains(&tag.as_str()) {
                    stack.push(build_element(&tag, &e)?);
                } else {
                    // drop the whole subtree
                    if reader.read_to_end(e.name()).is_err() {
                        return None;
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                let tag = tag_name(&e);
                if stack.is_empty() {
                    if root.is_some() || !tag.eq_ignore_ascii_case("svg") {
                        return None;
                    }
                    root = Some(build_element("svg", &e)?);
                } else if ALLOWED_TAGS.contains(&tag.as_str()) {
                    let element = build_element(&tag, &e)?;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(SvgNode::Element(element));
                    }
                }
            }
            Ok(Event::End(_)) => {
                let finished = stack.pop()?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(SvgNode::Element(finished)),
                    None => root = Some(finished),
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(parent) = stack.last_mut() {
                    match e.unescape() {
                        Ok(text) => parent.children.push(SvgNode::Text(text.into_owned())),
                        Err(_) => return None,
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(parent) = stack.last_mut() {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    parent.children.push(SvgNode::Text(text));
                }
            }
            Ok(Event::Comment(_)) | Ok(Event::Decl(_)) | Ok(Event::PI(_)) | Ok(Event::DocType(_)) => {}
            Ok(Event::Eof) => break,
            Err(_) => return None,
        }
    }

    if !stack.is_empty() {
        return None;
    }
    let mut root = root?;
    finalize_root(&mut root);
    let mut out = String::new();
    render(&root, &mut out);
    Some(out)
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

/// Build a sanitized element from a start tag. `None` means the attribute
/// list itself was malformed, which condemns the whole document.
fn build_element(tag: &str, e: &BytesStart<'_>) -> Option<SvgElement> {
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.ok()?;
        let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().ok()?.into_owned();
        if keep_attribute(&name, &value) {
            attributes.push((name, value));
        }
    }
    Some(SvgElement {
        tag: tag.to_string(),
        attributes,
        children: Vec::new(),
    })
}

fn keep_attribute(name: &str, value: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    if lower.starts_with("on") {
        return false;
    }
    if lower == "href" || lower == "xlink:href" {
        return false;
    }
    if lower == "xmlns" || lower.starts_with("xmlns:") {
        // the root gets the SVG namespace re-applied after filtering
        return false;
    }
    if lower == "style" && has_remote_style_reference(value) {
        return false;
    }
    true
}

/// True when a style value references anything through url() that is not a
/// local fragment.
fn has_remote_style_reference(style: &str) -> bool {
    STYLE_URL_REF
        .captures_iter(style)
        .any(|caps| &caps[1] != "#")
}

fn finalize_root(root: &mut SvgElement) {
    root.attributes.retain(|(name, _)| {
        let lower = name.to_ascii_lowercase();
        lower != "width" && lower != "height"
    });
    let has_view_box = root
        .attributes
        .iter()
        .any(|(name, _)| name.eq_ignore_ascii_case("viewBox"));
    if !has_view_box {
        root.attributes
            .push(("viewBox".to_string(), DEFAULT_VIEW_BOX.to_string()));
    }
    root.attributes.insert(0, ("xmlns".to_string(), SVG_NS.to_string()));

    let (frame_w, frame_h) = view_box_frame(root);
    root.children.retain(|child| match child {
        SvgNode::Element(el) => !is_background_rect(el, frame_w, frame_h),
        SvgNode::Text(_) => true,
    });
}

fn view_box_frame(root: &SvgElement) -> (f32, f32) {
    let declared = root
        .attributes
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("viewBox"))
        .map(|(_, value)| value.as_str())
        .unwrap_or(DEFAULT_VIEW_BOX);
    let parts: Vec<f32> = declared
        .split_whitespace()
        .filter_map(|p| p.parse::<f32>().ok())
        .collect();
    if parts.len() == 4 && parts[2] > 0.0 && parts[3] > 0.0 {
        (parts[2], parts[3])
    } else {
        (100.0, 100.0)
    }
}

/// The AI "page background" artifact: a full-frame opaque rect anchored at
/// the origin. Anything ambiguous stays in.
fn is_background_rect(el: &SvgElement, frame_w: f32, frame_h: f32) -> bool {
    if el.tag != "rect" {
        return false;
    }
    let props = effective_properties(el);
    let get = |name: &str| {
        props
            .iter()
            .rev()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, v)| v.as_str())
    };

    let Some(width) = get("width").and_then(|v| parse_dimension(v, frame_w)) else {
        return false;
    };
    let Some(height) = get("height").and_then(|v| parse_dimension(v, frame_h)) else {
        return false;
    };
    if width < 0.95 * frame_w || height < 0.95 * frame_h {
        return false;
    }

    for (name, frame) in [("x", frame_w), ("y", frame_h)] {
        match get(name) {
            None => {}
            Some(value) => match parse_dimension(value, frame) {
                Some(offset) if offset.abs() <= 0.02 * frame => {}
                _ => return false,
            },
        }
    }

    if let Some(fill) = get("fill") {
        let fill = fill.trim().to_ascii_lowercase();
        if fill == "none" || fill == "transparent" || fill.contains("url(") {
            return false;
        }
    }
    for name in ["opacity", "fill-opacity"] {
        if let Some(value) = get(name) {
            match value.trim().parse::<f32>() {
                Ok(opacity) if opacity >= 1.0 => {}
                _ => return false,
            }
        }
    }
    true
}

/// Presentation attributes with style declarations layered on top, since
/// style wins in SVG.
fn effective_properties(el: &SvgElement) -> Vec<(String, String)> {
    let mut props: Vec<(String, String)> = Vec::new();
    for (name, value) in &el.attributes {
        let lower = name.to_ascii_lowercase();
        if lower != "style" {
            props.push((lower, value.trim().to_string()));
        }
    }
    for (name, value) in &el.attributes {
        if name.eq_ignore_ascii_case("style") {
            for declaration in value.split(';') {
                if let Some((prop, val)) = declaration.split_once(':') {
                    props.push((prop.trim().to_ascii_lowercase(), val.trim().to_string()));
                }
            }
        }
    }
    props
}

fn parse_dimension(value: &str, frame: f32) -> Option<f32> {
    let value = value.trim();
    if let Some(percent) = value.strip_suffix('%') {
        return percent.trim().parse::<f32>().ok().map(|p| p / 100.0 * frame);
    }
    value.trim_end_matches("px").trim().parse::<f32>().ok()
}

fn render(element: &SvgElement, out: &mut String) {
    out.push('<');
    out.push_str(&element.tag);
    for (name, value) in &element.attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &element.children {
        match child {
            SvgNode::Element(el) => render(el, out),
            SvgNode::Text(text) => out.push_str(&escape(text.as_str())),
        }
    }
    out.push_str("</");
    out.push_str(&element.tag);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparsable_input_yields_placeholder() {
        assert_eq!(sanitize_vector_markup(""), PLACEHOLDER_MARKUP);
        assert_eq!(sanitize_vector_markup("just words"), PLACEHOLDER_MARKUP);
        assert_eq!(sanitize_vector_markup("<svg><circle></svg>"), PLACEHOLDER_MARKUP);
        assert_eq!(sanitize_vector_markup("<div><p>nope</p></div>"), PLACEHOLDER_MARKUP);
    }

    #[test]
    fn placeholder_is_already_in_sanitized_form() {
        // the placeholder must survive its own pipeline unchanged: allow-listed
        // shapes, hex fill colors intact, no width/height on the root
        let resanitized = sanitize_vector_markup(PLACEHOLDER_MARKUP);
        assert!(resanitized.contains(r##"stroke="#b0b0b0""##));
        assert!(resanitized.contains(r##"fill="#c8c8c8""##));
        assert!(resanitized.contains("<path"));
        assert!(resanitized.contains("<circle"));
        assert!(resanitized.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg""#));
    }

    #[test]
    fn event_handlers_and_remote_references_are_stripped() {
        let dirty = r#"<svg viewBox="0 0 10 10"><circle cx="5" cy="5" r="4" onclick="alert(1)"/><a href="https://evil.test"><path d="M0 0"/></a></svg>"#;
        let clean = sanitize_vector_markup(dirty);
        assert!(!clean.contains("onclick"));
        assert!(!clean.contains("href"));
        assert!(!clean.contains("<a"));
        assert!(clean.contains("<circle"));
        // the path rode inside a dropped element, so it goes too
        assert!(!clean.contains("<path"));
    }

    #[test]
    fn script_elements_are_dropped_with_their_content() {
        let dirty = r#"<svg viewBox="0 0 10 10"><script>alert(1)</script><rect x="1" y="1" width="3" height="3" fill="red"/></svg>"#;
        let clean = sanitize_vector_markup(dirty);
        assert!(!clean.contains("script"));
        assert!(!clean.contains("alert"));
        assert!(clean.contains("<rect"));
    }

    #[test]
    fn root_gets_namespace_and_view_box_and_loses_dimensions() {
        let clean = sanitize_vector_markup(r#"<svg width="640" height="480"><g/></svg>"#);
        assert!(clean.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg""#));
        assert!(clean.contains(r#"viewBox="0 0 100 100""#));
        assert!(!clean.contains("width=\"640\""));
        assert!(!clean.contains("height=\"480\""));
    }

    #[test]
    fn declared_view_box_is_preserved() {
        let clean = sanitize_vector_markup(r#"<svg viewBox="0 0 24 24"><path d="M1 1"/></svg>"#);
        assert!(clean.contains(r#"viewBox="0 0 24 24""#));
    }

    #[test]
    fn full_frame_background_rect_is_removed() {
        let dirty = r##"<svg viewBox="0 0 100 100"><rect width="100" height="100" fill="#ffffff"/><rect x="40" y="40" width="20" height="20" fill="blue"/></svg>"##;
        let clean = sanitize_vector_markup(dirty);
        assert!(!clean.contains(r#"width="100" height="100""#));
        assert!(clean.contains(r#"x="40""#));
    }

    #[test]
    fn transparent_or_partial_rects_survive() {
        let transparent =
            r#"<svg viewBox="0 0 100 100"><rect width="100" height="100" fill="none"/></svg>"#;
        assert!(sanitize_vector_markup(transparent).contains("<rect"));

        let faded = r##"<svg viewBox="0 0 100 100"><rect width="100" height="100" fill="#fff" opacity="0.4"/></svg>"##;
        assert!(sanitize_vector_markup(faded).contains("<rect"));

        let offset = r##"<svg viewBox="0 0 100 100"><rect x="30" y="0" width="100" height="100" fill="#fff"/></svg>"##;
        assert!(sanitize_vector_markup(offset).contains("<rect"));
    }

    #[test]
    fn style_with_remote_url_is_stripped_but_local_kept() {
        let dirty = r#"<svg viewBox="0 0 10 10"><rect width="2" height="2" style="fill: url(https://evil.test/x)"/><circle r="1" style="fill: url(#grad)"/></svg>"#;
        let clean = sanitize_vector_markup(dirty);
        assert!(!clean.contains("evil.test"));
        assert!(clean.contains("url(#grad)"));
    }

    #[test]
    fn text_content_is_escaped_on_output() {
        let dirty = r#"<svg viewBox="0 0 10 10"><text>a &amp; b</text></svg>"#;
        let clean = sanitize_vector_markup(dirty);
        assert!(clean.contains("a &amp; b"));
    }

    #[test]
    fn output_is_stable_under_resanitization() {
        let dirty = r#"<svg width="10" height="10"><rect width="4" height="4" fill="red" onmouseover="x()"/></svg>"#;
        let once = sanitize_vector_markup(dirty);
        assert_eq!(sanitize_vector_markup(&once), once);
    }
}
