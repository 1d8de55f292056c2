use cms_editor_core::plugins::mentions::MentionsPlugin;
use cms_editor_core::plugins::standard_plugins;
use cms_editor_core::{
    Document, DocumentError, Editor, EditorConfig, EditorPlugin, ImageNode, LookupError, Node,
    NodeError, PollNode, TextFormat,
};

fn full_document() -> serde_json::Value {
    serde_json::json!({
        "root": {
            "children": [
                {
                    "type": "paragraph",
                    "children": [
                        { "type": "text", "text": "Hi ", "format": 1, "detail": 0, "mode": "normal", "style": "color: red;", "version": 1 },
                        { "type": "mention", "mentionName": "John Doe", "text": "John Doe", "version": 1 },
                        { "type": "text", "text": " is ", "version": 1 },
                        { "type": "keyword", "text": "awesome", "version": 1 },
                        { "type": "text", "text": " ", "version": 1 },
                        { "type": "equation", "equation": "a^2", "inline": true, "version": 1 },
                        { "type": "inline-image", "src": "/cat.png", "altText": "cat", "width": 320, "height": "inherit", "version": 1 },
                        { "type": "text", "text": "", "version": 1 }
                    ],
                    "direction": "ltr",
                    "format": "center",
                    "indent": 0,
                    "version": 1
                },
                {
                    "type": "poll",
                    "question": "Tea or coffee?",
                    "options": ["Tea", "Coffee"],
                    "version": 1
                },
                {
                    "type": "code",
                    "language": "rust",
                    "children": [{ "type": "text", "text": "fn main() {}", "version": 1 }],
                    "version": 1
                }
            ],
            "direction": "ltr",
            "format": "",
            "indent": 0,
            "type": "root",
            "version": 1
        }
    })
}

#[test]
fn document_round_trips_through_json() {
    let doc = Document::from_value(full_document()).unwrap();
    assert_eq!(doc.children().len(), 3);

    let json = doc.to_json().unwrap();
    let reloaded = Document::from_json(&json).unwrap();
    assert_eq!(reloaded, doc);
}

#[test]
fn persisted_shape_matches_the_record_format() {
    let doc = Document::from_value(full_document()).unwrap();
    let value = doc.to_value().unwrap();

    assert_eq!(value["root"]["type"], "root");
    assert_eq!(value["root"]["version"], 1);

    let paragraph = &value["root"]["children"][0];
    assert_eq!(paragraph["type"], "paragraph");
    assert_eq!(paragraph["format"], "center");
    assert_eq!(paragraph["children"][0]["format"], 1);
    assert_eq!(paragraph["children"][0]["style"], "color: red;");
    assert_eq!(paragraph["children"][1]["mentionName"], "John Doe");
    assert_eq!(paragraph["children"][6]["type"], "inline-image");
    assert_eq!(paragraph["children"][6]["width"], 320);
    assert_eq!(paragraph["children"][6]["height"], "inherit");
}

#[test]
fn text_format_bits_load_as_flags() {
    let doc = Document::from_value(full_document()).unwrap();
    let Node::Paragraph(paragraph) = &doc.children()[0] else {
        panic!("expected paragraph");
    };
    let Node::Text(text) = &paragraph.children[0] else {
        panic!("expected text");
    };
    assert_eq!(text.format, TextFormat::BOLD);
}

#[test]
fn unknown_and_invalid_nodes_are_skipped() {
    let doc = Document::from_value(serde_json::json!({
        "root": {
            "children": [
                {
                    "type": "paragraph",
                    "children": [
                        { "type": "text", "text": "kept" },
                        { "type": "tweet", "id": "123" },
                        { "type": "equation", "equation": "   " },
                        { "type": "mention", "text": "no name" }
                    ]
                },
                { "type": "sticky-note", "text": "gone" }
            ]
        }
    }))
    .unwrap();

    assert_eq!(doc.children().len(), 1);
    let Node::Paragraph(paragraph) = &doc.children()[0] else {
        panic!("expected paragraph");
    };
    assert_eq!(paragraph.children, vec![Node::text("kept")]);
}

#[test]
fn malformed_envelope_is_an_error() {
    let err = Document::from_json("{ \"root\": 3 }").unwrap_err();
    assert!(matches!(err, DocumentError::Json(_)));
}

#[test]
fn missing_optional_fields_use_defaults() {
    let doc = Document::from_value(serde_json::json!({
        "root": { "children": [{ "type": "paragraph", "children": [{ "type": "text", "text": "x" }] }] }
    }))
    .unwrap();
    let Node::Paragraph(paragraph) = &doc.children()[0] else {
        panic!("expected paragraph");
    };
    assert_eq!(paragraph.version, 1);
    let Node::Text(text) = &paragraph.children[0] else {
        panic!("expected text");
    };
    assert!(text.format.is_empty());
    assert!(text.style.is_empty());
}

#[test]
fn polls_with_too_few_options_load_but_do_not_save() {
    let doc = Document::new(vec![Node::Poll(PollNode::new("Lonely?", vec!["Yes".into()]))]);

    let err = doc.to_json().unwrap_err();
    assert!(matches!(
        err,
        DocumentError::Invalid(NodeError::TooFewPollOptions { min: 2, found: 1, .. })
    ));

    let loaded = Document::from_value(serde_json::json!({
        "root": { "children": [{ "type": "poll", "question": "Lonely?", "options": ["Yes"] }] }
    }))
    .unwrap();
    assert_eq!(loaded, doc);
}

#[test]
fn image_dimensions_other_than_pixels_load_as_unset() {
    let node = Node::from_value(serde_json::json!({
        "type": "inline-image",
        "src": "/a.png",
        "width": "inherit",
        "height": -4
    }))
    .unwrap();
    let expected = ImageNode::new("/a.png", "").unwrap();
    assert_eq!(node, Node::InlineImage(expected));
}

#[test]
fn zero_image_dimension_survives_a_round_trip() {
    let image = ImageNode::new("/a.png", "alt")
        .unwrap()
        .with_size(Some(0), Some(10));
    let doc = Document::new(vec![Node::paragraph_with(vec![Node::InlineImage(image)])]);

    let loaded = Document::from_json(&doc.to_json().unwrap()).unwrap();
    assert_eq!(loaded, doc);
}

#[test]
fn constructors_reject_missing_required_fields() {
    assert!(matches!(
        cms_editor_core::EquationNode::new(" ", false),
        Err(NodeError::EmptyEquation)
    ));
    assert!(matches!(
        cms_editor_core::MentionNode::new(""),
        Err(NodeError::EmptyMention)
    ));
    assert!(matches!(
        cms_editor_core::KeywordNode::new(""),
        Err(NodeError::EmptyKeyword)
    ));
    assert!(matches!(ImageNode::new("", "alt"), Err(NodeError::EmptyImageSource)));
}

#[test]
fn editor_drops_nodes_without_a_registered_plugin() {
    let json = full_document().to_string();
    let config = EditorConfig::default();

    let editor = Editor::from_json(&json, config.clone(), standard_plugins(&config)).unwrap();
    let Node::Paragraph(paragraph) = &editor.doc().children()[0] else {
        panic!("expected paragraph");
    };
    assert!(!paragraph
        .children
        .iter()
        .any(|node| matches!(node, Node::Mention(_))));

    let mut plugins = standard_plugins(&config);
    plugins.push(Box::new(MentionsPlugin::new(
        |_: &str| -> Result<Vec<String>, LookupError> { Ok(Vec::new()) },
    )) as Box<dyn EditorPlugin>);
    let editor = Editor::from_json(&json, config, plugins).unwrap();
    let Node::Paragraph(paragraph) = &editor.doc().children()[0] else {
        panic!("expected paragraph");
    };
    assert!(paragraph
        .children
        .iter()
        .any(|node| matches!(node, Node::Mention(m) if m.mention_name == "John Doe")));
}

#[test]
fn editor_round_trips_its_document() {
    let config = EditorConfig::default();
    let mut plugins = standard_plugins(&config);
    plugins.push(Box::new(MentionsPlugin::new(
        |_: &str| -> Result<Vec<String>, LookupError> { Ok(Vec::new()) },
    )));

    let editor = Editor::from_json(&full_document().to_string(), config, plugins).unwrap();
    let saved = editor.to_json().unwrap();
    assert_eq!(Document::from_json(&saved).unwrap(), *editor.doc());
}
