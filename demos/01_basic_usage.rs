//! Demo 01: Basic Usage
//!
//! Adds, edits, completes, searches and deletes tasks, then reopens the
//! store from disk to show that state survives a restart.
//!
//! Run with: cargo run --example 01_basic_usage

use eyre::Result;
use todostore::{FileBackend, TaskPatch, TaskStore};

fn main() -> Result<()> {
    // Create a temporary directory for this demo
    let temp_dir = tempfile::tempdir()?;
    let data_dir = temp_dir.path().to_path_buf();

    println!("todostore Basic Usage");
    println!("=====================\n");
    println!("Data dir: {}\n", data_dir.display());

    let mut store = TaskStore::open(FileBackend::open(&data_dir)?);

    // CREATE
    println!("1. ADD");
    let milk = store.add("Buy milk", "2%")?;
    let dog = store.add("Walk dog", "")?;
    let taxes = store.add("File taxes", "before April")?;
    println!("   Added {}, {}, {}\n", milk, dog, taxes);

    // Validation happens in the store
    println!("2. VALIDATION");
    match store.add("  ", "") {
        Ok(_) => println!("   unexpectedly accepted a blank title"),
        Err(e) => println!("   Rejected blank title: {}", e),
    }
    match store.add("ab", "") {
        Ok(_) => println!("   unexpectedly accepted a short title"),
        Err(e) => println!("   Rejected short title: {}\n", e),
    }

    // UPDATE
    println!("3. UPDATE + TOGGLE");
    store.update(milk, TaskPatch::default().title("Buy oat milk"))?;
    store.toggle_complete(milk)?;
    println!("   Pending:   {:?}", titles(&store.pending()));
    println!("   Completed: {:?}\n", titles(&store.completed()));

    // SEARCH
    println!("4. SEARCH \"MILK\"");
    println!("   {:?}\n", titles(&store.search("MILK")));

    // DELETE
    println!("5. DELETE");
    store.delete(dog)?;
    println!("   Remaining: {:?}\n", titles(&store.tasks().iter().collect::<Vec<_>>()));

    // Reopen from disk
    drop(store);
    println!("6. REOPEN");
    let store = TaskStore::open(FileBackend::open(&data_dir)?);
    println!("   Loaded {} tasks: {:?}", store.len(), titles(&store.tasks().iter().collect::<Vec<_>>()));

    Ok(())
}

fn titles(tasks: &[&todostore::Task]) -> Vec<String> {
    tasks.iter().map(|t| t.title.clone()).collect()
}
