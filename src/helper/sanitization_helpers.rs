use ammonia::Builder;
use std::collections::HashSet;

/// Tags produced by the block editor. Anything else is stripped.
const CONTENT_TAGS: &[&str] = &[
    "section", "div", "span", "p", "br", "hr", "h1", "h2", "h3", "h4", "h5", "h6", "b", "strong",
    "i", "em", "u", "s", "a", "ul", "ol", "li", "blockquote", "code", "pre", "img", "video",
    "source", "figure", "figcaption",
];

const CONTENT_ATTRIBUTES: &[&str] = &[
    "class", "style", "src", "alt", "title", "href", "width", "height", "poster", "controls",
    "autoplay", "loop", "muted", "playsinline", "type",
];

/// Cleans rich project content while keeping the site's class contract and
/// `data-*` attributes intact. Scripts and event handlers are removed.
pub fn sanitize_rich_content(html: &str) -> String {
    let tags: HashSet<&str> = CONTENT_TAGS.iter().copied().collect();
    let attributes: HashSet<&str> = CONTENT_ATTRIBUTES.iter().copied().collect();

    Builder::new()
        .tags(tags)
        .generic_attributes(attributes)
        .generic_attribute_prefixes(["data-"].into_iter().collect())
        .link_rel(Some("noopener noreferrer"))
        .strip_comments(true)
        .clean(html)
        .to_string()
}

/// Strips all HTML tags from input (for titles and other plain fields).
/// The result is plain text, so the entities ammonia writes are decoded again.
pub fn strip_all_html(input: &str) -> String {
    let clean = Builder::new().tags(HashSet::new()).clean(input).to_string();
    html_escape::decode_html_entities(&clean).into_owned()
}
