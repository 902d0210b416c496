//! Purpose: Render an item's sockets in Path of Building's link notation.
//! Exports: `format_sockets`.
//! Invariants: Groups render in ascending group id; sockets keep input order within a group.
//! Invariants: Never fails; unknown attribute codes render as `W`.
use std::collections::BTreeMap;

use crate::core::build::Socket;

/// `R-G-B W` style: `-` joins linked sockets, a space separates link groups.
pub fn format_sockets(sockets: &[Socket]) -> String {
    let mut groups: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for socket in sockets {
        groups
            .entry(socket.group)
            .or_default()
            .push(socket.color().letter().to_string());
    }
    groups
        .values()
        .map(|letters| letters.join("-"))
        .collect::<Vec<_>>()
        .join(" ")
}
