use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use desktop_session::{
    reduce_desktop, AppId, ContextMenu, Desktop, DesktopAction, DesktopConfig, DragCoordinator,
    DragPayload, DragSource, DropOutcome, DropZoneId, MenuEntry, MenuItem, MenuMetrics,
    OpenWindowRequest, PointerPosition, Preferences, SessionState, Viewport, WindowId,
};
use platform_host::{FilePrefsStore, NoopPrefsStore, PrefsStore};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let path = std::env::temp_dir().join(format!("{prefix}_{}_{}", process::id(), nanos));
    fs::create_dir_all(&path).expect("create temp dir");
    path
}

fn session() -> SessionState {
    SessionState::new(Preferences::load(
        Rc::new(NoopPrefsStore),
        "desktop.preferences.v1",
    ))
}

fn register(state: &mut SessionState, id: &str, app: &str) {
    state
        .register_window(WindowId::from(id), OpenWindowRequest::new(app))
        .expect("register window");
}

#[test]
fn window_count_tracks_registers_minus_matched_closes() {
    init_tracing();
    let mut state = session();
    let script: &[(&str, &str)] = &[
        ("open", "a"),
        ("open", "b"),
        ("close", "a"),
        ("close", "missing"),
        ("open", "c"),
        ("open", "d"),
        ("close", "d"),
        ("close", "d"),
        ("open", "e"),
    ];

    let mut registered = 0usize;
    let mut closed = 0usize;
    for (op, id) in script {
        match *op {
            "open" => {
                register(&mut state, id, "notes");
                registered += 1;
            }
            _ => {
                if state.close_window(&WindowId::from(*id)).is_ok() {
                    closed += 1;
                }
            }
        }
        state.check_invariants().expect("invariants hold");
    }

    assert_eq!(state.list_windows().len(), registered - closed);
    assert_eq!(state.list_windows().len(), 3);
}

#[test]
fn focus_calls_yield_strictly_increasing_values() {
    init_tracing();
    let mut state = session();
    for id in ["a", "b", "c"] {
        register(&mut state, id, "terminal");
    }

    let issued: Vec<u64> = ["a", "c", "a", "b", "b", "c", "a"]
        .iter()
        .map(|id| state.focus(&WindowId::from(*id)).expect("focus"))
        .collect();

    assert_eq!(issued.len(), 7);
    assert!(issued.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(state.z_counter(), *issued.last().expect("issued"));
}

#[test]
fn closing_active_window_activates_front_most_remainder() {
    init_tracing();
    let mut state = session();
    for id in ["a", "b", "c", "d"] {
        register(&mut state, id, "browser");
    }
    state.focus(&WindowId::from("b")).expect("focus b");
    state.focus(&WindowId::from("d")).expect("focus d");

    state.close_window(&WindowId::from("d")).expect("close d");
    assert_eq!(state.active_window_id(), Some(&WindowId::from("b")));

    state.close_window(&WindowId::from("b")).expect("close b");
    assert_eq!(state.active_window_id(), Some(&WindowId::from("c")));
    state.check_invariants().expect("invariants hold");
}

#[test]
fn running_apps_follow_window_ownership() {
    init_tracing();
    let mut state = session();
    register(&mut state, "a1", "A");
    register(&mut state, "a2", "A");
    register(&mut state, "b1", "B");

    state.close_window(&WindowId::from("a1")).expect("close a1");
    assert_eq!(
        state.running_apps(),
        vec![AppId::from("A"), AppId::from("B")]
    );

    state.close_window(&WindowId::from("a2")).expect("close a2");
    assert_eq!(state.running_apps(), vec![AppId::from("B")]);
    assert!(!state.is_app_running(&AppId::from("A")));
    state.check_invariants().expect("invariants hold");
}

#[test]
fn drag_round_trip_delivers_payload_once() {
    init_tracing();
    let mut drag = DragCoordinator::default();
    let received = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&received);
    drag.register_drop_target("inbox", move |payload, _| {
        sink.borrow_mut().push(payload.value().clone());
        json!("accepted")
    });

    drag.begin_drag(
        DragSource::element("icon"),
        DragPayload::new(42),
        PointerPosition::new(1, 1),
    )
    .expect("begin drag");
    drag.update_position(PointerPosition::new(80, 40));
    let outcome = drag.attempt_drop(&DropZoneId::from("inbox"));

    assert_eq!(outcome, DropOutcome::Delivered(json!("accepted")));
    assert_eq!(*received.borrow(), vec![json!(42)]);
    assert!(!drag.is_dragging());
    assert_eq!(drag.attempt_drop(&DropZoneId::from("inbox")), DropOutcome::NotDragging);
    assert_eq!(received.borrow().len(), 1);
}

#[test]
fn drop_on_unknown_zone_is_not_an_error() {
    init_tracing();
    let mut drag = DragCoordinator::default();
    drag.begin_drag(
        DragSource::element("icon"),
        DragPayload::new("doc"),
        PointerPosition::default(),
    )
    .expect("begin drag");

    assert_eq!(
        drag.attempt_drop(&DropZoneId::from("unknown")),
        DropOutcome::NoHandler
    );
    assert!(!drag.is_dragging());
    assert_eq!(drag.current_payload(), None);
}

#[test]
fn context_menu_stays_inside_viewport() {
    init_tracing();
    let viewport = Viewport {
        width: 1024,
        height: 768,
    };
    let mut menu = ContextMenu::new(viewport, MenuMetrics::default());
    menu.show(
        PointerPosition::new(viewport.width + 50, 10),
        vec![
            MenuEntry::Item(MenuItem::new("New Folder", "new-folder")),
            MenuEntry::Separator,
            MenuEntry::Item(MenuItem::new("Properties", "properties")),
        ],
    );

    let bounds = menu.bounds().expect("menu visible");
    assert!(bounds.right() <= viewport.width);
    assert!(bounds.x >= 0);
    assert_eq!(bounds.y, 10);
}

#[test]
fn preference_survives_a_fresh_load_from_disk() {
    init_tracing();
    let root = temp_dir("desktop_session_prefs");
    let store: Rc<dyn PrefsStore> =
        Rc::new(FilePrefsStore::from_root(&root).expect("init file store"));

    let mut desktop = Desktop::boot(DesktopConfig::default(), Rc::clone(&store));
    assert_eq!(desktop.session().preference("theme"), Some(json!("dark")));
    reduce_desktop(
        &mut desktop,
        DesktopAction::SetPreference {
            key: "theme".to_string(),
            value: json!("light"),
        },
    )
    .expect("set theme");
    desktop.shutdown().expect("shutdown");
    drop(desktop);

    let reopened: Rc<dyn PrefsStore> =
        Rc::new(FilePrefsStore::from_root(&root).expect("reopen file store"));
    let fresh = Preferences::load(reopened, "desktop.preferences.v1");
    assert_eq!(fresh.get("theme"), Some(json!("light")));
    assert_eq!(fresh.get("soundVolume"), Some(json!(0.5)));
    assert_eq!(fresh.get("notAPreference"), None::<Value>);

    let _ = fs::remove_dir_all(root);
}

#[test]
fn reducer_keeps_session_consistent_through_a_user_flow() {
    init_tracing();
    let mut desktop = Desktop::boot(DesktopConfig::default(), Rc::new(NoopPrefsStore));

    for app in ["terminal", "notes", "terminal"] {
        reduce_desktop(
            &mut desktop,
            DesktopAction::OpenWindow(OpenWindowRequest::new(app)),
        )
        .expect("open");
    }
    reduce_desktop(
        &mut desktop,
        DesktopAction::FocusWindow {
            window_id: WindowId::from("terminal-1"),
        },
    )
    .expect("focus");
    reduce_desktop(
        &mut desktop,
        DesktopAction::CloseWindow {
            window_id: WindowId::from("terminal-1"),
        },
    )
    .expect("close");
    reduce_desktop(
        &mut desktop,
        DesktopAction::CloseWindow {
            window_id: WindowId::from("terminal-1"),
        },
    )
    .expect("late close is absorbed");

    let snapshot = desktop.snapshot();
    assert_eq!(
        snapshot.active_window_id,
        Some(WindowId::from("terminal-3"))
    );
    assert_eq!(
        snapshot.running_apps,
        vec![AppId::from("notes"), AppId::from("terminal")]
    );
    desktop
        .session()
        .check_invariants()
        .expect("invariants hold");
}
