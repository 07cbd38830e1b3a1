use std::fs;

use pretty_assertions::assert_eq;
use task_context as tc;
use tc::{App, Command, Confirm, ContextError};
use tempfile::TempDir;

struct Yes;

impl Confirm for Yes {
    fn confirm(&mut self, _question: &str) -> bool {
        true
    }
}

fn setup(rc: &str) -> (TempDir, App) {
    let dir = tempfile::tempdir().unwrap();
    let rc_path = dir.path().join("taskrc");
    fs::write(&rc_path, rc).unwrap();
    let app = App::new(rc_path, Some(dir.path().join("data")));
    (dir, app)
}

fn context(app: &App, args: &str) -> tc::Result<String> {
    let args = args.split_whitespace().map(String::from).collect();
    app.run(Command::Context(args), &mut Yes)
}

fn rc(dir: &TempDir) -> String {
    fs::read_to_string(dir.path().join("taskrc")).unwrap()
}

#[test]
fn list_without_contexts() {
    let (_dir, app) = setup("");
    let err = context(&app, "list").unwrap_err();
    assert_eq!(err.to_string(), "No contexts defined.");
}

#[test]
fn define_needs_name_and_filter() {
    let (dir, app) = setup("");
    for args in ["define", "define work"] {
        let err = context(&app, args).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Both context name and its definition must be provided."
        );
    }
    assert_eq!(rc(&dir), "");
}

#[test]
fn delete_needs_a_name() {
    let (_dir, app) = setup("");
    let err = context(&app, "delete").unwrap_err();
    assert_eq!(err.to_string(), "Context name needs to be specified.");
}

#[test]
fn unknown_contexts() {
    let (dir, app) = setup("context.work.read=+work\n");
    let err = context(&app, "delete home").unwrap_err();
    assert_eq!(err.to_string(), "Context 'home' not found.");
    let err = context(&app, "home").unwrap_err();
    assert!(matches!(err, ContextError::NotFound(ref n) if n == "home"));
    let err = context(&app, "one two").unwrap_err();
    assert_eq!(err.to_string(), "Context 'one two' not found.");
    assert_eq!(rc(&dir), "context.work.read=+work\n");
}

#[test]
fn unset_with_nothing_active() {
    let (_dir, app) = setup("");
    let err = context(&app, "none").unwrap_err();
    assert_eq!(err.to_string(), "Context not unset.");
    assert_eq!(context(&app, "show").unwrap(), "No context is currently applied.");
    assert_eq!(context(&app, "").unwrap(), "No context is currently applied.");
}

#[test]
fn reserved_and_malformed_names() {
    let (dir, app) = setup("confirmation=off\n");
    for name in ["define", "delete", "list", "show", "none"] {
        let err = context(&app, &format!("define {name} +x")).unwrap_err();
        assert!(matches!(err, ContextError::Validation(_)), "{name}: {err}");
    }
    let err = context(&app, "define a=b +x").unwrap_err();
    assert!(matches!(err, ContextError::Validation(_)));
    assert_eq!(rc(&dir), "confirmation=off\n");
}

#[test]
fn unparsable_filter_is_rejected() {
    let (dir, app) = setup("confirmation=off\n");
    for filter in ["(+work", "+work )", "+work or"] {
        let err = context(&app, &format!("define work {filter}")).unwrap_err();
        assert!(matches!(err, ContextError::Parse(_)), "{filter}: {err}");
    }
    assert_eq!(rc(&dir), "confirmation=off\n");
}

#[test]
fn dangling_marker() {
    let (_dir, app) = setup("context=gone\n");
    let show = context(&app, "show").unwrap();
    assert!(show.starts_with("Context 'gone' is set but not defined."), "{show}");

    let list = app.run(
        Command::List {
            report: "list".into(),
            filter: vec![],
        },
        &mut Yes,
    );
    assert!(matches!(list, Err(ContextError::NotFound(ref n)) if n == "gone"));

    let add = app.run(Command::Add(vec!["x".into()]), &mut Yes);
    assert!(matches!(add, Err(ContextError::NotFound(_))));

    assert_eq!(context(&app, "none").unwrap(), "Context unset.");
}

#[test]
fn add_without_description() {
    let (_dir, app) = setup("");
    let err = app
        .run(Command::Add(vec!["project:Work".into()]), &mut Yes)
        .unwrap_err();
    assert_eq!(err.to_string(), "Additional text must be provided.");
}

#[test]
fn corrupt_task_data() {
    let (dir, app) = setup("");
    fs::create_dir_all(dir.path().join("data")).unwrap();
    fs::write(dir.path().join("data").join("tasks.json"), "{not json").unwrap();
    let err = app
        .run(
            Command::List {
                report: "list".into(),
                filter: vec![],
            },
            &mut Yes,
        )
        .unwrap_err();
    assert!(matches!(err, ContextError::Data { .. }));
    assert!(err.to_string().starts_with("invalid task data in '"));
}
