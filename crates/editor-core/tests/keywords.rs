use cms_editor_core::commands::{INSERT_TEXT, UNDO};
use cms_editor_core::plugins::code::CodePlugin;
use cms_editor_core::plugins::keywords::KeywordsPlugin;
use cms_editor_core::{
    CodeNode, Document, Editor, EditorConfig, EditorPlugin, Node, Point, Selection,
};

fn editor_with(doc: Document, keywords: KeywordsPlugin) -> Editor {
    let plugins: Vec<Box<dyn EditorPlugin>> = vec![Box::new(keywords), Box::new(CodePlugin)];
    Editor::new(doc, EditorConfig::default(), plugins).unwrap()
}

fn paragraph_children(editor: &Editor, ix: usize) -> &[Node] {
    editor.doc().children()[ix].children().unwrap()
}

fn keyword_text(node: &Node) -> Option<&str> {
    match node {
        Node::Keyword(k) => Some(k.text.as_str()),
        _ => None,
    }
}

#[test]
fn loaded_text_is_converted() {
    let editor = editor_with(
        Document::new(vec![Node::paragraph("This is awesome work")]),
        KeywordsPlugin::default(),
    );

    let children = paragraph_children(&editor, 0);
    assert_eq!(children.len(), 3);
    assert_eq!(children[0], Node::text("This is "));
    assert_eq!(keyword_text(&children[1]), Some("awesome"));
    assert_eq!(children[2], Node::text(" work"));
}

#[test]
fn typed_keyword_converts_and_caret_follows() {
    let mut editor = editor_with(
        Document::new(vec![Node::paragraph("This is ")]),
        KeywordsPlugin::default(),
    );
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 0], 8)));

    editor.dispatch(INSERT_TEXT, "awesome".to_string()).unwrap();

    let children = paragraph_children(&editor, 0);
    assert_eq!(keyword_text(&children[1]), Some("awesome"));
    assert_eq!(children[2], Node::text(""));
    assert_eq!(editor.selection().focus, Point::new(vec![0, 2], 0));
}

#[test]
fn typing_onto_a_keyword_turns_it_back_into_text() {
    let mut editor = editor_with(
        Document::new(vec![Node::paragraph("This is ")]),
        KeywordsPlugin::default(),
    );
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 0], 8)));
    editor.dispatch(INSERT_TEXT, "awesome".to_string()).unwrap();

    editor.dispatch(INSERT_TEXT, "ness".to_string()).unwrap();

    assert_eq!(
        paragraph_children(&editor, 0),
        [Node::text("This is awesomeness")]
    );
    assert_eq!(editor.selection().focus, Point::new(vec![0, 0], 19));
}

#[test]
fn matching_ignores_case() {
    let editor = editor_with(
        Document::new(vec![Node::paragraph("Bravo team")]),
        KeywordsPlugin::default(),
    );
    let children = paragraph_children(&editor, 0);
    assert_eq!(keyword_text(&children[0]), Some("Bravo"));
    assert_eq!(children[1], Node::text(" team"));
}

#[test]
fn code_blocks_are_left_alone() {
    let editor = editor_with(
        Document::new(vec![Node::Code(CodeNode::new(
            None,
            vec![Node::text("let awesome = 1;")],
        ))]),
        KeywordsPlugin::default(),
    );
    assert_eq!(
        paragraph_children(&editor, 0),
        [Node::text("let awesome = 1;")]
    );
}

#[test]
fn word_list_is_configurable() {
    let editor = editor_with(
        Document::new(vec![Node::paragraph("shipit now, awesome later")]),
        KeywordsPlugin::new(["shipit"]),
    );
    let children = paragraph_children(&editor, 0);
    assert_eq!(keyword_text(&children[0]), Some("shipit"));
    assert_eq!(children[1], Node::text(" now, awesome later"));
}

#[test]
fn conversion_is_undone_with_the_typing() {
    let mut editor = editor_with(
        Document::new(vec![Node::paragraph("So ")]),
        KeywordsPlugin::default(),
    );
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 0], 3)));
    editor.dispatch(INSERT_TEXT, "great".to_string()).unwrap();
    assert_eq!(keyword_text(&paragraph_children(&editor, 0)[1]), Some("great"));

    editor.dispatch(UNDO, ()).unwrap();
    assert_eq!(paragraph_children(&editor, 0), [Node::text("So ")]);
}
