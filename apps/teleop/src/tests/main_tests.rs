use client_core::{Console, MessageKind};

use super::*;

#[test]
fn unseen_entries_skips_what_was_already_printed() {
    let mut console = Console::new();
    console.push(MessageKind::Info, "first");
    console.push(MessageKind::Warning, "second");
    console.push(MessageKind::Command, "third");

    let mut last_seen = 1;
    let mut printed = Vec::new();
    for entry in unseen_entries(console.entries(), last_seen) {
        printed.push(entry.content.clone());
        last_seen = entry.id;
    }
    assert_eq!(printed, vec!["second", "third"]);
    assert_eq!(last_seen, 3);
    assert_eq!(unseen_entries(console.entries(), last_seen).count(), 0);
}
