use std::sync::{Arc, Mutex};

use egui::Color32;
use sketchboard::config::StorageConfig;
use sketchboard::{BoardConfig, BoardContext, BoardError, BoardEvent, SurfaceError, ToolKind};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// Board storing its history in `dir`, with every emitted event recorded
fn board_in(dir: &std::path::Path) -> (BoardContext, Arc<Mutex<Vec<BoardEvent>>>) {
    init_logging();
    let config = BoardConfig {
        storage: StorageConfig {
            directory: dir.to_path_buf(),
            ..StorageConfig::default()
        },
        ..BoardConfig::default()
    };
    let board = BoardContext::new(config).unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    board.event_bus.subscribe(Box::new(move |event: &BoardEvent| {
        sink.lock().unwrap().push(event.clone());
    }));
    (board, events)
}

fn take(events: &Mutex<Vec<BoardEvent>>) -> Vec<BoardEvent> {
    std::mem::take(&mut *events.lock().unwrap())
}

fn scribble(board: &mut BoardContext) {
    board.on_pointer_down(4.0, 4.0).unwrap();
    board.on_pointer_move(20.0, 20.0);
    board.on_pointer_up(20.0, 20.0).unwrap();
}

#[test]
fn test_drawing_reports_content_and_undo_state() {
    let dir = tempfile::tempdir().unwrap();
    let (mut board, events) = board_in(dir.path());

    assert!(board.on_size_changed(32, 32).unwrap());
    assert_eq!(take(&events), vec![BoardEvent::CanvasInvalidated]);

    scribble(&mut board);
    let seen = take(&events);
    assert!(seen.contains(&BoardEvent::ContentChanged { has_content: true }));
    assert!(seen.contains(&BoardEvent::UndoAvailability {
        can_undo: true,
        can_redo: false
    }));

    // A second stroke changes neither signal.
    scribble(&mut board);
    let seen = take(&events);
    assert!(seen.iter().all(|event| *event == BoardEvent::CanvasInvalidated));

    board.request_undo().unwrap();
    board.request_undo().unwrap();
    let seen = take(&events);
    assert!(seen.contains(&BoardEvent::ContentChanged { has_content: false }));
    assert!(seen.contains(&BoardEvent::UndoAvailability {
        can_undo: false,
        can_redo: true
    }));

    assert!(!board.on_size_changed(32, 32).unwrap());
    assert!(take(&events).is_empty());
}

#[test]
fn test_tool_choice_reaches_the_canvas() {
    let dir = tempfile::tempdir().unwrap();
    let (mut board, _events) = board_in(dir.path());
    board.on_size_changed(40, 40).unwrap();

    board.set_color(Color32::RED);
    board.set_width(6.0).unwrap();
    board.on_pointer_down(5.0, 20.0).unwrap();
    board.on_pointer_move(35.0, 20.0);
    board.on_pointer_up(35.0, 20.0).unwrap();

    let marked = board.surface().canvas().unwrap().pixel(20, 20).unwrap();
    assert!(marked.r() > 128 && marked.g() < 64);

    board.set_tool(ToolKind::Eraser);
    board.on_pointer_down(0.0, 20.0).unwrap();
    board.on_pointer_move(40.0, 20.0);
    board.on_pointer_up(40.0, 20.0).unwrap();

    let snapshot = board.snapshot().unwrap();
    assert!(snapshot.pixels().all(|p| p.0 == [255, 255, 255, 255]));
}

#[test]
fn test_invalid_width_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (mut board, _events) = board_in(dir.path());

    assert!(matches!(
        board.set_width(0.0),
        Err(BoardError::Surface(SurfaceError::InvalidWidth(_)))
    ));
    assert_eq!(board.tools().brush_width(), 10.0);
}

#[test]
fn test_double_pointer_down_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let (mut board, _events) = board_in(dir.path());
    board.on_size_changed(16, 16).unwrap();

    board.on_pointer_down(1.0, 1.0).unwrap();
    assert!(matches!(
        board.on_pointer_down(2.0, 2.0),
        Err(BoardError::Surface(SurfaceError::InvalidState { .. }))
    ));
    assert!(board.request_undo().is_err());
    board.on_pointer_up(2.0, 2.0).unwrap();
    assert!(board.request_undo().unwrap());
}

#[test]
fn test_background_save_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let (mut board, events) = board_in(dir.path());
    board.on_size_changed(24, 24).unwrap();
    scribble(&mut board);
    take(&events);

    board.request_save().unwrap();
    board.request_save().unwrap();
    let results = board.wait_for_saves();
    assert!(!board.has_pending_saves());

    let ids: Vec<_> = results.into_iter().map(Result::unwrap).collect();
    assert_eq!(board.saved_drawings(), vec![ids[1], ids[0]]);
    assert_eq!(
        take(&events),
        vec![
            BoardEvent::SaveCompleted { id: ids[0] },
            BoardEvent::SaveCompleted { id: ids[1] },
        ]
    );

    let stored = board.load_drawing(ids[0]).unwrap();
    assert_eq!(stored, board.snapshot().unwrap());
    assert_eq!(board.drawing_thumbnail(ids[0]).unwrap().dimensions(), (200, 200));

    assert!(board.delete_drawing(ids[0]));
    assert_eq!(board.saved_drawings(), vec![ids[1]]);
}

#[test]
fn test_save_before_sizing_fails_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let (mut board, events) = board_in(dir.path());

    assert!(matches!(
        board.request_save(),
        Err(BoardError::Surface(SurfaceError::NotSized))
    ));
    assert!(matches!(
        take(&events).as_slice(),
        [BoardEvent::SaveFailed { .. }]
    ));
    assert_eq!(board.poll_saves(), 0);
}

#[test]
fn test_export_writes_a_png() {
    let dir = tempfile::tempdir().unwrap();
    let (mut board, events) = board_in(&dir.path().join("history"));
    board.on_size_changed(10, 10).unwrap();
    scribble(&mut board);
    take(&events);

    let out = dir.path().join("Pictures");
    let path = board.request_export(&out).unwrap();
    assert_eq!(take(&events), vec![BoardEvent::ExportCompleted { path: path.clone() }]);
    assert_eq!(
        image::open(&path).unwrap().to_rgba8(),
        board.snapshot().unwrap()
    );
}

#[test]
fn test_slider_drag_changes_eraser_width() {
    let dir = tempfile::tempdir().unwrap();
    let (mut board, _events) = board_in(dir.path());

    let height = board.tools().slider(ToolKind::Eraser).layout().height;
    let started = board.slider_pointer_down(ToolKind::Eraser, height);
    assert!(!started.is_empty());
    assert_eq!(board.tools().tool(), ToolKind::Eraser);
    assert_eq!(board.tools().eraser_width(), 5.0);

    board.slider_pointer_up(ToolKind::Eraser);
    assert!(!board.tools().slider(ToolKind::Eraser).is_tracking());
}
