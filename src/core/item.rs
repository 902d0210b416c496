//! Purpose: Render one item as Path of Building's plain-text item block.
//! Exports: `format_item`, `MOD_SEPARATOR`.
//! Invariants: Lines are `\n`-joined with no trailing newline; line order is fixed.
//! Invariants: The separator line appears iff both implicit and explicit mods exist.
use crate::core::build::Item;
use crate::core::sockets::format_sockets;

pub const MOD_SEPARATOR: &str = "--------";

pub fn format_item(item: &Item) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("Rarity: {}", item.rarity().as_str()));

    if let Some(name) = item.name.as_deref().filter(|name| !name.is_empty()) {
        lines.push(name.to_string());
    }
    lines.push(item.type_line.clone());

    if let Some(ilvl) = item.ilvl {
        lines.push(format!("Item Level: {ilvl}"));
    }
    if !item.sockets.is_empty() {
        lines.push(format!("Sockets: {}", format_sockets(&item.sockets)));
    }

    lines.extend(item.implicit_mods.iter().cloned());
    if !item.implicit_mods.is_empty() && !item.explicit_mods.is_empty() {
        lines.push(MOD_SEPARATOR.to_string());
    }
    lines.extend(item.explicit_mods.iter().cloned());

    lines.join("\n")
}
