//! Read-only HTML export used for previews. The output is not parsed back.

use crate::node::{Document, ElementFormat, Node, TextFormat, TextNode};

pub fn export(doc: &Document) -> String {
    let mut out = String::new();
    for node in doc.children() {
        write_node(&mut out, node);
    }
    out
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Text(text) => write_text(out, text),
        Node::Paragraph(p) => {
            out.push_str("<p");
            write_align(out, p.format);
            out.push('>');
            write_children(out, &p.children);
            out.push_str("</p>");
        }
        Node::Code(code) => {
            out.push_str("<pre><code");
            if let Some(language) = code.language.as_deref().filter(|l| !l.is_empty()) {
                out.push_str(&format!(" class=\"language-{}\"", escape_html(language)));
            }
            out.push('>');
            write_children(out, &code.children);
            out.push_str("</code></pre>");
        }
        Node::Mention(m) => {
            out.push_str(&format!(
                "<span class=\"mention\" data-mention=\"{}\"{}>{}</span>",
                escape_html(&m.mention_name),
                style_attr(&m.style),
                escape_html(&m.text),
            ));
        }
        Node::Keyword(k) => {
            out.push_str(&format!(
                "<span class=\"keyword\"{}>{}</span>",
                style_attr(&k.style),
                escape_html(&k.text),
            ));
        }
        Node::Equation(e) => {
            let tag = if e.inline { "span" } else { "div" };
            out.push_str(&format!(
                "<{tag} class=\"equation\" data-equation=\"{}\">{}</{tag}>",
                escape_html(&e.equation),
                escape_html(&e.equation),
            ));
        }
        Node::InlineImage(img) => {
            out.push_str(&format!(
                "<img src=\"{}\" alt=\"{}\"",
                escape_html(&img.src),
                escape_html(&img.alt_text),
            ));
            if let Some(width) = img.width {
                out.push_str(&format!(" width=\"{width}\""));
            }
            if let Some(height) = img.height {
                out.push_str(&format!(" height=\"{height}\""));
            }
            out.push_str(" />");
        }
        Node::Poll(poll) => {
            out.push_str("<div class=\"poll\"><p>");
            out.push_str(&escape_html(&poll.question));
            out.push_str("</p><ul>");
            for option in &poll.options {
                out.push_str("<li>");
                out.push_str(&escape_html(option));
                out.push_str("</li>");
            }
            out.push_str("</ul></div>");
        }
    }
}

fn write_children(out: &mut String, children: &[Node]) {
    if children
        .iter()
        .all(|n| matches!(n, Node::Text(t) if t.text.is_empty()))
    {
        out.push_str("<br />");
        return;
    }
    for child in children {
        write_node(out, child);
    }
}

const FORMAT_TAGS: [(TextFormat, &str); 8] = [
    (TextFormat::BOLD, "strong"),
    (TextFormat::ITALIC, "em"),
    (TextFormat::STRIKETHROUGH, "s"),
    (TextFormat::UNDERLINE, "u"),
    (TextFormat::CODE, "code"),
    (TextFormat::SUBSCRIPT, "sub"),
    (TextFormat::SUPERSCRIPT, "sup"),
    (TextFormat::HIGHLIGHT, "mark"),
];

fn write_text(out: &mut String, text: &TextNode) {
    if text.text.is_empty() {
        return;
    }
    let tags: Vec<&str> = FORMAT_TAGS
        .iter()
        .filter(|(flag, _)| text.format.contains(*flag))
        .map(|(_, tag)| *tag)
        .collect();

    for tag in &tags {
        out.push_str(&format!("<{tag}>"));
    }
    if text.style.is_empty() {
        out.push_str(&escape_html(&text.text));
    } else {
        out.push_str(&format!(
            "<span{}>{}</span>",
            style_attr(&text.style),
            escape_html(&text.text)
        ));
    }
    for tag in tags.iter().rev() {
        out.push_str(&format!("</{tag}>"));
    }
}

fn write_align(out: &mut String, format: ElementFormat) {
    let align = match format {
        ElementFormat::Unset => return,
        ElementFormat::Left | ElementFormat::Start => "left",
        ElementFormat::Center => "center",
        ElementFormat::Right | ElementFormat::End => "right",
        ElementFormat::Justify => "justify",
    };
    out.push_str(&format!(" style=\"text-align: {align};\""));
}

fn style_attr(style: &str) -> String {
    if style.is_empty() {
        return String::new();
    }
    format!(" style=\"{}\"", escape_html(style))
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
