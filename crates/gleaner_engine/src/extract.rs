use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html};
use url::Url;

/// Attributes forum software and lazy-load scripts hide image sources in.
const IMAGE_ATTRS: &[&str] = &["src", "data-src", "data-original", "ess-data", "file"];

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

/// Collect raw image URL strings from a page in document order.
///
/// Two sources are walked in a single pass: `<img>` tags (every attribute
/// in [`IMAGE_ATTRS`], relative references resolved against `base_url`)
/// and absolute image-extension URLs pasted into text, which forums show
/// as plain links. The output is deliberately raw; cleaning, keyword
/// rejection and deduplication belong to the candidate filter.
pub fn extract_image_urls(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let base = Url::parse(base_url).ok();
    let mut urls = Vec::new();

    for child in document.root_element().children() {
        visit_node(child, base.as_ref(), &mut urls);
    }
    urls
}

fn visit_node(node: NodeRef<'_, Node>, base: Option<&Url>, urls: &mut Vec<String>) {
    match node.value() {
        Node::Text(text) => collect_text_urls(text, urls),
        Node::Element(element) => {
            if element.name().eq_ignore_ascii_case("img") {
                if let Some(element) = ElementRef::wrap(node) {
                    collect_img_attrs(element, base, urls);
                }
            }
            // Scripts hold no user-pasted links worth keeping.
            if element.name().eq_ignore_ascii_case("script")
                || element.name().eq_ignore_ascii_case("style")
            {
                return;
            }
            for child in node.children() {
                visit_node(child, base, urls);
            }
        }
        _ => {
            for child in node.children() {
                visit_node(child, base, urls);
            }
        }
    }
}

fn collect_img_attrs(element: ElementRef, base: Option<&Url>, urls: &mut Vec<String>) {
    for attr in IMAGE_ATTRS {
        if let Some(value) = element.value().attr(attr).map(str::trim) {
            if value.is_empty() {
                continue;
            }
            if let Some(resolved) = resolve_reference(value, base) {
                urls.push(resolved);
            }
        }
    }
}

fn resolve_reference(reference: &str, base: Option<&Url>) -> Option<String> {
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return Some(reference.to_string());
    }
    if reference.starts_with("data:") || reference.starts_with("javascript:") {
        return None;
    }
    base.and_then(|base| base.join(reference).ok())
        .map(Into::into)
}

/// Pull absolute `https?://...` tokens with an image extension out of a
/// text node.
fn collect_text_urls(text: &str, urls: &mut Vec<String>) {
    for token in text.split(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '<' | '>')) {
        let Some(start) = token.find("http://").or_else(|| token.find("https://")) else {
            continue;
        };
        let candidate = &token[start..];
        if has_image_extension(candidate) {
            urls.push(candidate.to_string());
        }
    }
}

fn has_image_extension(url: &str) -> bool {
    let path = url.split_once('?').map_or(url, |(before, _)| before);
    let Some((_, extension)) = path.rsplit_once('.') else {
        return false;
    };
    IMAGE_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(extension))
}
