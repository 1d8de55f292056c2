use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cms_editor_core::commands::{INSERT_TEXT, UNDO};
use cms_editor_core::{Command, CommandError, CommandPriority, Editor, EditorPlugin};

const LOG: Command<String> = Command::new("test.log");

fn editor() -> Editor {
    Editor::with_plugins(Vec::<Box<dyn EditorPlugin>>::new()).unwrap()
}

fn recorder(
    editor: &mut Editor,
    log: &Rc<RefCell<Vec<String>>>,
    priority: CommandPriority,
    name: &'static str,
    claim: bool,
) {
    let log = log.clone();
    editor
        .register_command(LOG, priority, move |_, msg| {
            log.borrow_mut().push(format!("{name}:{msg}"));
            Ok(claim)
        })
        .unwrap();
}

#[test]
fn handlers_run_by_descending_priority() {
    let mut editor = editor();
    let log = Rc::new(RefCell::new(Vec::new()));

    recorder(&mut editor, &log, CommandPriority::Low, "low", false);
    recorder(&mut editor, &log, CommandPriority::Critical, "critical", false);
    recorder(&mut editor, &log, CommandPriority::Editor, "editor", false);

    let handled = editor.dispatch(LOG, "x".to_string()).unwrap();
    assert!(!handled);
    assert_eq!(
        *log.borrow(),
        vec!["critical:x", "editor:x", "low:x"]
    );
}

#[test]
fn first_claiming_handler_stops_dispatch() {
    let mut editor = editor();
    let log = Rc::new(RefCell::new(Vec::new()));

    recorder(&mut editor, &log, CommandPriority::Editor, "first", true);
    recorder(&mut editor, &log, CommandPriority::Editor, "second", false);
    recorder(&mut editor, &log, CommandPriority::Low, "low", false);

    assert!(editor.dispatch(LOG, "x".to_string()).unwrap());
    assert_eq!(*log.borrow(), vec!["first:x"]);
}

#[test]
fn unknown_command_is_not_handled() {
    let mut editor = editor();
    assert!(!editor.dispatch(LOG, "x".to_string()).unwrap());
}

#[test]
fn handler_error_propagates_and_skips_the_rest() {
    let mut editor = editor();
    let log = Rc::new(RefCell::new(Vec::new()));

    editor
        .register_command(LOG, CommandPriority::Critical, |_, _| {
            Err(CommandError::rejected("nope"))
        })
        .unwrap();
    recorder(&mut editor, &log, CommandPriority::Low, "low", true);

    let err = editor.dispatch(LOG, "x".to_string()).unwrap_err();
    assert!(matches!(err, CommandError::Rejected(msg) if msg == "nope"));
    assert!(log.borrow().is_empty());
}

#[test]
fn payload_type_is_fixed_per_command() {
    const SHARED_STRING: Command<String> = Command::new("test.shared");
    const SHARED_NUMBER: Command<u32> = Command::new("test.shared");

    let mut editor = editor();
    editor
        .register_command(SHARED_STRING, CommandPriority::Editor, |_, _| Ok(true))
        .unwrap();

    let err = editor
        .register_command(SHARED_NUMBER, CommandPriority::Editor, |_, _| Ok(true))
        .unwrap_err();
    assert!(matches!(
        err,
        CommandError::PayloadMismatch {
            command: "test.shared",
            ..
        }
    ));

    let err = editor.dispatch(SHARED_NUMBER, 1).unwrap_err();
    assert!(matches!(err, CommandError::PayloadMismatch { .. }));
    assert_eq!(editor.bus().handler_count("test.shared"), 1);
}

#[test]
fn unregister_removes_only_that_handler() {
    let mut editor = editor();
    let log = Rc::new(RefCell::new(Vec::new()));

    let log_a = log.clone();
    let a = editor
        .register_command(LOG, CommandPriority::Editor, move |_, msg| {
            log_a.borrow_mut().push(format!("a:{msg}"));
            Ok(false)
        })
        .unwrap();
    recorder(&mut editor, &log, CommandPriority::Editor, "b", false);

    assert!(editor.unregister_command(a));
    assert!(!editor.unregister_command(a));

    editor.dispatch(LOG, "x".to_string()).unwrap();
    assert_eq!(*log.borrow(), vec!["b:x"]);
    assert_eq!(editor.bus().handler_count(LOG.id()), 1);
}

#[test]
fn handlers_registered_during_dispatch_apply_from_the_next_dispatch() {
    let mut editor = editor();
    let log = Rc::new(RefCell::new(Vec::new()));
    let registered = Rc::new(Cell::new(false));

    let outer_log = log.clone();
    editor
        .register_command(LOG, CommandPriority::Low, move |editor, msg| {
            outer_log.borrow_mut().push(format!("outer:{msg}"));
            if !registered.replace(true) {
                let inner_log = outer_log.clone();
                editor.register_command(LOG, CommandPriority::Critical, move |_, msg| {
                    inner_log.borrow_mut().push(format!("inner:{msg}"));
                    Ok(false)
                })?;
            }
            Ok(false)
        })
        .unwrap();

    editor.dispatch(LOG, "1".to_string()).unwrap();
    editor.dispatch(LOG, "2".to_string()).unwrap();
    assert_eq!(*log.borrow(), vec!["outer:1", "inner:2", "outer:2"]);
}

#[test]
fn one_notification_and_one_undo_step_per_dispatch() {
    const INSERT_TWICE: Command<()> = Command::new("test.insert_twice");

    let mut editor = editor();
    editor
        .register_command(INSERT_TWICE, CommandPriority::Editor, |editor, _| {
            editor.dispatch(INSERT_TEXT, "ab".to_string())?;
            editor.dispatch(INSERT_TEXT, "cd".to_string())?;
            Ok(true)
        })
        .unwrap();

    let notifications = Rc::new(Cell::new(0));
    let counter = notifications.clone();
    editor.on_update(move |_, event| {
        assert!(event.content_changed);
        counter.set(counter.get() + 1);
    });

    assert!(editor.dispatch(INSERT_TWICE, ()).unwrap());
    assert_eq!(notifications.get(), 1);
    assert_eq!(editor.doc().text_content(), "abcd");

    assert!(editor.dispatch(UNDO, ()).unwrap());
    assert_eq!(editor.doc().text_content(), "");
    assert!(!editor.can_undo());
}

#[test]
fn listeners_can_be_removed() {
    let mut editor = editor();
    let notifications = Rc::new(Cell::new(0));
    let counter = notifications.clone();
    let id = editor.on_update(move |_, _| counter.set(counter.get() + 1));

    editor.dispatch(INSERT_TEXT, "a".to_string()).unwrap();
    assert!(editor.remove_update_listener(id));
    editor.dispatch(INSERT_TEXT, "b".to_string()).unwrap();

    assert_eq!(notifications.get(), 1);
}
