use std::cell::RefCell;
use std::rc::Rc;

use edit_core::{DocumentEvent, TextDocument};

#[test]
fn test_undo_redo_single_replace() {
    let mut doc = TextDocument::new("hello world");

    doc.replace(0, 5, "goodbye", 0).unwrap();
    assert_eq!(doc.text(), "goodbye world");
    assert!(doc.undo_stack().can_undo());
    assert!(!doc.undo_stack().can_redo());

    assert!(doc.undo(None, false));
    assert_eq!(doc.text(), "hello world");
    assert!(!doc.undo_stack().can_undo());
    assert!(doc.undo_stack().can_redo());

    assert!(doc.redo(None, false));
    assert_eq!(doc.text(), "goodbye world");
    assert!(!doc.undo_stack().can_redo());
}

#[test]
fn test_nothing_to_undo_or_redo_is_not_an_error() {
    let mut doc = TextDocument::new("text");
    assert!(!doc.undo(None, false));
    assert!(!doc.redo(None, false));
}

#[test]
fn test_typing_with_coalesce_id_is_one_undo_step() {
    const TYPING: usize = 1;
    let mut doc = TextDocument::new("");

    for (offset, ch) in ["h", "e", "y"].iter().enumerate() {
        doc.replace(offset, 0, ch, TYPING).unwrap();
    }
    assert_eq!(doc.text(), "hey");
    assert_eq!(doc.undo_stack().len(), 1);

    assert!(doc.undo(None, false));
    assert_eq!(doc.text(), "");
    assert!(doc.redo(None, false));
    assert_eq!(doc.text(), "hey");
}

#[test]
fn test_coalesce_id_zero_never_merges_entries() {
    let mut doc = TextDocument::new("");
    doc.replace(0, 0, "a", 0).unwrap();
    doc.replace(1, 0, "b", 0).unwrap();
    assert_eq!(doc.undo_stack().len(), 2);

    assert!(doc.undo(None, false));
    assert_eq!(doc.text(), "a");
}

#[test]
fn test_end_group_coalescing_merges_groups() {
    // Two closed groups with the same non-zero coalesce id and no
    // intervening commit collapse into one history entry carrying both
    // groups' changes in order.
    const GROUP_ID: usize = 9;
    let mut doc = TextDocument::new("....");

    doc.begin_group(None);
    doc.replace(0, 1, "A", 0).unwrap();
    doc.end_group(GROUP_ID, true);

    doc.begin_group(None);
    doc.replace(2, 1, "B", 0).unwrap();
    doc.end_group(GROUP_ID, true);

    assert_eq!(doc.text(), "A.B.");
    assert_eq!(doc.undo_stack().len(), 1);

    assert!(doc.undo(None, false));
    assert_eq!(doc.text(), "....");
    assert!(doc.redo(None, false));
    assert_eq!(doc.text(), "A.B.");
}

#[test]
fn test_intervening_commit_blocks_coalescing() {
    const GROUP_ID: usize = 9;
    let mut doc = TextDocument::new("....");

    doc.begin_group(None);
    doc.replace(0, 1, "A", 0).unwrap();
    doc.end_group(GROUP_ID, true);

    doc.replace(3, 1, "x", 0).unwrap(); // separate entry in between

    doc.begin_group(None);
    doc.replace(2, 1, "B", 0).unwrap();
    doc.end_group(GROUP_ID, true);

    assert_eq!(doc.undo_stack().len(), 3);
}

#[test]
fn test_nested_groups_commit_as_one_entry() {
    let mut doc = TextDocument::new("");

    doc.begin_group(None);
    doc.replace(0, 0, "outer ", 0).unwrap();
    doc.begin_group(None);
    doc.replace(6, 0, "inner", 0).unwrap();
    doc.end_group(0, false);
    doc.end_group(0, true);

    assert_eq!(doc.text(), "outer inner");
    assert_eq!(doc.undo_stack().len(), 1);

    assert!(doc.undo(None, false));
    assert_eq!(doc.text(), "");
}

#[test]
fn test_new_edit_after_undo_discards_redo_branch() {
    let mut doc = TextDocument::new("");
    doc.replace(0, 0, "a", 0).unwrap();
    doc.replace(1, 0, "b", 0).unwrap();

    assert!(doc.undo(None, false));
    assert!(doc.undo_stack().can_redo());

    doc.replace(1, 0, "c", 0).unwrap();
    assert_eq!(doc.text(), "ac");
    assert!(!doc.undo_stack().can_redo());

    // The discarded branch is gone for good.
    assert!(doc.undo(None, false));
    assert!(doc.undo(None, false));
    assert_eq!(doc.text(), "");
    assert!(doc.redo(None, false));
    assert!(doc.redo(None, false));
    assert_eq!(doc.text(), "ac");
}

#[test]
fn test_persisted_marker_follows_cursor() {
    let mut doc = TextDocument::new("");
    doc.replace(0, 0, "draft", 0).unwrap();

    doc.set_persisted(true);
    assert!(doc.is_persisted());

    doc.replace(5, 0, "!", 0).unwrap();
    assert!(!doc.is_persisted());

    assert!(doc.undo(None, false));
    assert!(doc.is_persisted());

    assert!(doc.redo(None, false));
    assert!(!doc.is_persisted());
}

#[test]
fn test_persisted_state_discarded_with_redo_branch() {
    let mut doc = TextDocument::new("");
    doc.replace(0, 0, "a", 0).unwrap();
    doc.replace(1, 0, "b", 0).unwrap();
    doc.set_persisted(true);

    assert!(doc.undo(None, false));
    doc.replace(1, 0, "c", 0).unwrap(); // discards the entry marked saved

    assert!(!doc.is_persisted());
    assert!(doc.undo(None, false));
    assert!(!doc.is_persisted());
}

#[test]
fn test_soft_undo_reverts_only_tagged_entries() {
    let mut doc = TextDocument::new("hello world");
    let controller = doc.register_controller();
    let selection = doc.selection_set_id();

    // A document-scoped content edit.
    doc.replace(0, 5, "howdy", 0).unwrap();

    // A selection-only entry tagged to the controller: snapshot first,
    // then move the live selection.
    doc.store_selection(selection, Some(controller), 0);
    doc.selection_mut().reset_to_range(6, 6);

    // Soft undo recognizes the tagged entry and restores the snapshot.
    assert!(doc.undo(Some(controller), true));
    assert_eq!(doc.selection().range(0).caret(), 0);
    assert_eq!(doc.text(), "howdy world");

    // The next entry is document-scoped: soft undo refuses it.
    assert!(!doc.undo(Some(controller), true));
    assert_eq!(doc.text(), "howdy world");

    // A hard undo takes it.
    assert!(doc.undo(Some(controller), false));
    assert_eq!(doc.text(), "hello world");

    doc.unregister_controller(controller);
}

#[test]
fn test_hard_undo_unwinds_trailing_selection_entries() {
    let mut doc = TextDocument::new("hello world");
    let controller = doc.register_controller();
    let selection = doc.selection_set_id();

    doc.replace(0, 5, "howdy", 0).unwrap();
    doc.store_selection(selection, Some(controller), 0);
    doc.selection_mut().reset_to_range(6, 6);
    assert_eq!(doc.undo_stack().len(), 2);

    // One hard undo unwinds the dependent selection entry and the content
    // entry beneath it.
    assert!(doc.undo(None, false));
    assert_eq!(doc.text(), "hello world");
    assert_eq!(doc.selection().range(0).caret(), 0);
    assert!(!doc.undo_stack().can_undo());

    // The mirror redo re-applies the content entry and the selection run
    // that depends on it.
    assert!(doc.redo(None, false));
    assert_eq!(doc.text(), "howdy world");
    assert_eq!(doc.selection().range(0).caret(), 6);
    assert!(!doc.undo_stack().can_redo());

    doc.unregister_controller(controller);
}

#[test]
fn test_soft_redo_reapplies_tagged_entry() {
    let mut doc = TextDocument::new("hello");
    let controller = doc.register_controller();
    let selection = doc.selection_set_id();

    doc.store_selection(selection, Some(controller), 0);
    doc.selection_mut().reset_to_range(3, 3);

    assert!(doc.undo(Some(controller), true));
    assert_eq!(doc.selection().range(0).caret(), 0);

    assert!(doc.redo(Some(controller), true));
    assert_eq!(doc.selection().range(0).caret(), 3);

    doc.unregister_controller(controller);
}

#[test]
fn test_end_group_and_discard_suppresses_recording_only() {
    let mut doc = TextDocument::new("");

    doc.begin_group(None);
    doc.replace(0, 0, "applied", 0).unwrap();
    doc.end_group_and_discard();

    // The mutation stands; only the history entry is gone.
    assert_eq!(doc.text(), "applied");
    assert!(!doc.undo_stack().can_undo());
}

#[test]
fn test_disabled_collection_records_nothing() {
    let mut doc = TextDocument::new("");
    assert!(doc.is_collection_enabled());

    doc.set_collection_enabled(false);
    doc.replace(0, 0, "bulk", 0).unwrap();
    doc.set_collection_enabled(true);

    assert_eq!(doc.text(), "bulk");
    assert!(!doc.undo_stack().can_undo());
}

#[test]
fn test_raw_append_mode() {
    let events: Rc<RefCell<Vec<DocumentEvent>>> = Rc::default();
    let sink = Rc::clone(&events);

    let mut doc = TextDocument::new("# log\n");
    doc.subscribe(Box::new(move |event| sink.borrow_mut().push(event.clone())));

    doc.raw_append_begin();
    assert!(!doc.is_collection_enabled());
    doc.raw_append("line 1\n");
    doc.raw_append("line 2\n");
    doc.raw_append_end();

    assert!(doc.is_collection_enabled());
    assert_eq!(doc.text(), "# log\nline 1\nline 2\n");
    assert_eq!(doc.line_count(), 4);
    assert!(!doc.undo_stack().can_undo());

    // The whole bulk append surfaces as one change event.
    assert_eq!(
        events.borrow().as_slice(),
        &[DocumentEvent::TextChanged {
            offset: 6,
            old_length: 0,
            new_length: 14
        }]
    );
}

#[test]
fn test_undo_restores_line_structure() {
    let mut doc = TextDocument::new("one\ntwo\nthree");

    doc.replace(3, 1, " ", 0).unwrap(); // join lines one and two
    assert_eq!(doc.text(), "one two\nthree");
    assert_eq!(doc.line_count(), 2);

    assert!(doc.undo(None, false));
    assert_eq!(doc.text(), "one\ntwo\nthree");
    assert_eq!(doc.line_count(), 3);
}
