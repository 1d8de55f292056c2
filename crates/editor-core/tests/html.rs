use cms_editor_core::{
    CodeNode, Document, ElementFormat, EquationNode, ImageNode, KeywordNode, MentionNode, Node,
    ParagraphNode, PollNode, TextFormat, TextNode, html,
};

#[test]
fn paragraphs_carry_alignment_and_inline_nodes() {
    let paragraph = ParagraphNode {
        format: ElementFormat::Center,
        ..ParagraphNode::new(vec![
            Node::text("Hi "),
            Node::Mention(MentionNode::new("Ann & Bo").unwrap()),
            Node::text(" "),
            Node::Keyword(KeywordNode::new("bravo").unwrap()),
        ])
    };
    let out = html::export(&Document::new(vec![Node::Paragraph(paragraph)]));

    assert_eq!(
        out,
        "<p style=\"text-align: center;\">Hi \
         <span class=\"mention\" data-mention=\"Ann &amp; Bo\">Ann &amp; Bo</span> \
         <span class=\"keyword\">bravo</span></p>"
    );
}

#[test]
fn empty_paragraph_renders_a_line_break() {
    let out = html::export(&Document::new(vec![Node::paragraph("")]));
    assert_eq!(out, "<p><br /></p>");
}

#[test]
fn text_formats_nest_in_a_fixed_order() {
    let text = TextNode::new("x<y")
        .with_format(TextFormat::ITALIC | TextFormat::BOLD)
        .with_style("color: red;");
    let out = html::export(&Document::new(vec![Node::paragraph_with(vec![Node::Text(
        text,
    )])]));
    assert_eq!(
        out,
        "<p><strong><em><span style=\"color: red;\">x&lt;y</span></em></strong></p>"
    );
}

#[test]
fn block_nodes_export() {
    let doc = Document::new(vec![
        Node::Code(CodeNode::new(
            Some("rust".into()),
            vec![Node::text("let a = 1;")],
        )),
        Node::Poll(PollNode::new("Tea?", vec!["Yes".into(), "No".into()])),
        Node::paragraph_with(vec![
            Node::Equation(EquationNode::new("a^2", false).unwrap()),
            Node::InlineImage(
                ImageNode::new("/cat.png", "a \"cat\"")
                    .unwrap()
                    .with_size(Some(320), None),
            ),
        ]),
    ]);
    let out = html::export(&doc);

    assert!(out.starts_with("<pre><code class=\"language-rust\">let a = 1;</code></pre>"));
    assert!(out.contains("<div class=\"poll\"><p>Tea?</p><ul><li>Yes</li><li>No</li></ul></div>"));
    assert!(out.contains("<div class=\"equation\" data-equation=\"a^2\">a^2</div>"));
    assert!(out.contains("<img src=\"/cat.png\" alt=\"a &quot;cat&quot;\" width=\"320\" />"));
}
