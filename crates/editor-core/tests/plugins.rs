use std::cell::RefCell;
use std::rc::Rc;

use cms_editor_core::commands::INSERT_PARAGRAPH;
use cms_editor_core::plugins::code::{CodePlugin, TOGGLE_CODE_BLOCK};
use cms_editor_core::plugins::image::{INSERT_IMAGE, InsertImage};
use cms_editor_core::plugins::keywords::KeywordsPlugin;
use cms_editor_core::plugins::poll::{ADD_POLL_OPTION, AddPollOption, INSERT_POLL, InsertPoll};
use cms_editor_core::plugins::standard_plugins;
use cms_editor_core::{
    Command, CommandError, CommandPriority, Document, Editor, EditorConfig, EditorPlugin, Node,
    NodeKind, NodeSpec, PluginError, Point, Selection,
};

const PING: Command<()> = Command::new("test.ping");

struct Recorder {
    id: &'static str,
    log: Rc<RefCell<Vec<&'static str>>>,
}

impl EditorPlugin for Recorder {
    fn id(&self) -> &'static str {
        self.id
    }

    fn register(&mut self, editor: &mut Editor) -> Result<(), CommandError> {
        let log = self.log.clone();
        let id = self.id;
        editor.register_command(PING, CommandPriority::Editor, move |_, _| {
            log.borrow_mut().push(id);
            Ok(false)
        })?;
        Ok(())
    }
}

struct KeywordImpostor;

impl EditorPlugin for KeywordImpostor {
    fn id(&self) -> &'static str {
        "impostor"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::inline_atomic(NodeKind::Keyword)]
    }
}

fn standard_editor(text: &str) -> Editor {
    let config = EditorConfig::default();
    let plugins = standard_plugins(&config);
    let mut editor =
        Editor::new(Document::new(vec![Node::paragraph(text)]), config, plugins).unwrap();
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 0], text.len())));
    editor
}

#[test]
fn standard_plugins_install_in_order() {
    let editor = standard_editor("");
    assert_eq!(
        editor.registry().plugins(),
        [
            "core",
            "keywords",
            "equations",
            "toolbar.formatting",
            "inline_image",
            "poll",
            "code"
        ]
    );
    assert!(editor.registry().is_known_kind(NodeKind::Poll));
    assert!(!editor.registry().is_known_kind(NodeKind::Mention));
}

#[test]
fn duplicate_plugin_is_skipped() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut editor = Editor::with_plugins(Vec::<Box<dyn EditorPlugin>>::new()).unwrap();

    let first = Recorder {
        id: "recorder",
        log: log.clone(),
    };
    let second = Recorder {
        id: "recorder",
        log: log.clone(),
    };
    assert!(editor.register_plugin(Box::new(first)).unwrap());
    assert!(!editor.register_plugin(Box::new(second)).unwrap());
    assert_eq!(editor.bus().handler_count(PING.id()), 1);
}

#[test]
fn node_kinds_have_a_single_provider() {
    let plugins: Vec<Box<dyn EditorPlugin>> =
        vec![Box::new(KeywordsPlugin::default()), Box::new(KeywordImpostor)];
    let err = Editor::with_plugins(plugins).err().unwrap();
    assert!(matches!(
        err,
        PluginError::DuplicateNodeKind {
            plugin: "impostor",
            kind: NodeKind::Keyword
        }
    ));
}

#[test]
fn registration_order_breaks_priority_ties() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let plugins: Vec<Box<dyn EditorPlugin>> = vec![
        Box::new(Recorder {
            id: "first",
            log: log.clone(),
        }),
        Box::new(Recorder {
            id: "second",
            log: log.clone(),
        }),
    ];
    let mut editor = Editor::with_plugins(plugins).unwrap();

    editor.dispatch(PING, ()).unwrap();
    assert_eq!(*log.borrow(), vec!["first", "second"]);
}

#[test]
fn image_is_inserted_at_the_caret() {
    let mut editor = standard_editor("Look ");
    editor
        .dispatch(
            INSERT_IMAGE,
            InsertImage {
                src: "/cat.png".into(),
                alt_text: "cat".into(),
                width: Some(64),
                ..InsertImage::default()
            },
        )
        .unwrap();

    let children = editor.doc().children()[0].children().unwrap();
    assert_eq!(children.len(), 3);
    assert!(matches!(&children[1], Node::InlineImage(img) if img.width == Some(64)));
    assert_eq!(children[2], Node::text(""));

    let err = editor
        .dispatch(INSERT_IMAGE, InsertImage::default())
        .unwrap_err();
    assert!(matches!(err, CommandError::Node(_)));
}

#[test]
fn poll_needs_two_options_before_saving() {
    let mut editor = standard_editor("Intro");
    editor
        .dispatch(
            INSERT_POLL,
            InsertPoll {
                question: "Tea or coffee?".into(),
                options: vec!["Tea".into()],
            },
        )
        .unwrap();

    let kinds: Vec<NodeKind> = editor.doc().children().iter().map(Node::kind).collect();
    assert_eq!(
        kinds,
        [NodeKind::Paragraph, NodeKind::Poll, NodeKind::Paragraph]
    );
    assert_eq!(editor.selection().focus, Point::new(vec![2, 0], 0));
    assert!(editor.to_json().is_err());

    editor
        .dispatch(
            ADD_POLL_OPTION,
            AddPollOption {
                index: 1,
                option: "Coffee".into(),
            },
        )
        .unwrap();
    assert!(editor.to_json().is_ok());

    let err = editor
        .dispatch(
            ADD_POLL_OPTION,
            AddPollOption {
                index: 0,
                option: "Juice".into(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, CommandError::Rejected(_)));
}

#[test]
fn poll_question_is_required() {
    let mut editor = standard_editor("Intro");
    let err = editor
        .dispatch(INSERT_POLL, InsertPoll::default())
        .unwrap_err();
    assert!(matches!(err, CommandError::InvalidPayload { .. }));
}

#[test]
fn code_block_toggles_and_keeps_line_breaks() {
    let plugins: Vec<Box<dyn EditorPlugin>> = vec![Box::new(CodePlugin)];
    let mut editor = Editor::new(
        Document::new(vec![Node::paragraph("let a = 1;")]),
        EditorConfig::default(),
        plugins,
    )
    .unwrap();
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 0], 10)));

    editor
        .dispatch(TOGGLE_CODE_BLOCK, Some("rust".to_string()))
        .unwrap();
    assert!(matches!(
        &editor.doc().children()[0],
        Node::Code(code) if code.language.as_deref() == Some("rust")
    ));

    editor.dispatch(INSERT_PARAGRAPH, ()).unwrap();
    assert_eq!(editor.doc().children().len(), 1);
    assert_eq!(editor.doc().text_content(), "let a = 1;\n");

    editor.dispatch(TOGGLE_CODE_BLOCK, None).unwrap();
    assert_eq!(editor.doc().children()[0].kind(), NodeKind::Paragraph);
}
