//! Demo 02: Drag and Drop
//!
//! Simulates a UI dragging cards between the pending and completed columns,
//! then reordering and clearing the completed column. Uses the SQLite backend.
//!
//! Run with: cargo run --example 02_drag_and_drop

use eyre::Result;
use todostore::dnd::drag_payload;
use todostore::{Column, SqliteBackend, TaskStore, handle_drop};

fn main() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let mut store = TaskStore::open(SqliteBackend::open(temp_dir.path())?);

    let write = store.add("Write report", "")?;
    let review = store.add("Review PR", "")?;
    let deploy = store.add("Deploy", "friday")?;

    print_board("Initial board", &store);

    // Drag "Review PR" onto the completed column
    let payload = drag_payload(store.get(review).expect("just added"))?;
    println!("Dragging payload: {}\n", payload);
    handle_drop(&mut store, &payload, Column::Completed)?;
    print_board("After dropping \"Review PR\" on completed", &store);

    // Move "Deploy" to the top
    store.move_task(deploy, 0)?;
    print_board("After moving \"Deploy\" to the top", &store);

    // Complete "Write report" and clear the completed column
    store.toggle_complete(write)?;
    let removed = store.clear_completed()?;
    println!("Cleared {} completed tasks\n", removed);
    print_board("Final board", &store);

    Ok(())
}

fn print_board<B: todostore::StorageBackend>(heading: &str, store: &TaskStore<B>) {
    println!("{}", heading);
    println!("{}", "-".repeat(heading.len()));
    println!("Pending:");
    for task in store.pending() {
        println!("  [ ] {} ({})", task.title, task.id);
    }
    println!("Completed:");
    for task in store.completed() {
        println!("  [x] {} ({})", task.title, task.id);
    }
    println!();
}
