use cms_editor_core::plugins::equations::{EquationsPlugin, INSERT_EQUATION, InsertEquation};
use cms_editor_core::{
    CommandError, Document, Editor, EditorConfig, EditorPlugin, Node, NodeError, Point, Selection,
};

fn editor() -> Editor {
    let plugins: Vec<Box<dyn EditorPlugin>> = vec![Box::new(EquationsPlugin)];
    let mut editor = Editor::new(
        Document::new(vec![Node::paragraph("Energy: ")]),
        EditorConfig::default(),
        plugins,
    )
    .unwrap();
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 0], 8)));
    editor
}

#[test]
fn block_equation_gets_its_own_paragraph() {
    let mut editor = editor();
    assert!(editor
        .dispatch(INSERT_EQUATION, InsertEquation::block("E=mc^2"))
        .unwrap());

    assert_eq!(editor.doc().children().len(), 2);
    let children = editor.doc().children()[1].children().unwrap();
    let Node::Equation(equation) = &children[0] else {
        panic!("expected equation");
    };
    assert_eq!(equation.equation, "E=mc^2");
    assert!(!equation.inline);
    assert_eq!(children[1], Node::text(""));
    assert_eq!(editor.selection().focus, Point::new(vec![1, 1], 0));
}

#[test]
fn inline_equation_goes_at_the_caret() {
    let mut editor = editor();
    editor
        .dispatch(INSERT_EQUATION, InsertEquation::inline("a^2+b^2"))
        .unwrap();

    let children = editor.doc().children()[0].children().unwrap();
    assert_eq!(children.len(), 3);
    assert_eq!(children[0], Node::text("Energy: "));
    assert!(matches!(&children[1], Node::Equation(e) if e.inline && e.equation == "a^2+b^2"));
    assert_eq!(editor.selection().focus, Point::new(vec![0, 2], 0));
}

#[test]
fn empty_equation_is_rejected_without_changes() {
    let mut editor = editor();
    let before = editor.doc().clone();

    let err = editor
        .dispatch(INSERT_EQUATION, InsertEquation::block("  "))
        .unwrap_err();
    assert!(matches!(err, CommandError::Node(NodeError::EmptyEquation)));
    assert_eq!(*editor.doc(), before);
    assert!(!editor.can_undo());
}

#[test]
fn equations_export_to_html() {
    let mut editor = editor();
    editor
        .dispatch(INSERT_EQUATION, InsertEquation::inline("x<y"))
        .unwrap();
    let html = editor.to_html();
    assert!(html.contains("<span class=\"equation\" data-equation=\"x&lt;y\">"));
}
