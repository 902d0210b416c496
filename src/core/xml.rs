//! Purpose: Serialize a `Build` into the Path of Building XML document.
//! Exports: `build_xml`, `TREE_VERSION`.
//! Role: Fixed skeleton with interpolated values; input to `codec::encode`.
//! Invariants: Output is a pure function of the input (byte-identical for equal builds).
//! Invariants: Items are numbered from 1 by position; passives keep input order and duplicates.
//! Notes: Interpolated strings are not XML-escaped; names or mods containing `<`, `&`, or `"`
//! produce a document that strict XML readers reject.
use crate::core::build::{Build, SkillGem};
use crate::core::item::format_item;

pub const TREE_VERSION: &str = "3_24";

pub fn build_xml(build: &Build) -> String {
    let character = &build.character;
    let items = build
        .items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            format!(
                "<Item id=\"{}\">\n{}\n</Item>",
                index + 1,
                format_item(item)
            )
        })
        .collect::<String>();
    let skills = build.skills.iter().map(gem_xml).collect::<String>();
    let nodes = build
        .passives
        .iter()
        .map(|node| node.to_string())
        .collect::<Vec<_>>()
        .join(",");

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<PathOfBuilding>
    <Build level="{level}" className="{class}" ascendClassName="{ascendancy}">
    </Build>
    <Items>
        {items}
    </Items>
    <Skills>
        <SkillSet>
            {skills}
        </SkillSet>
    </Skills>
    <Tree activeSpec="1">
        <Spec treeVersion="{TREE_VERSION}" nodes="{nodes}">
        </Spec>
    </Tree>
</PathOfBuilding>"#,
        level = character.level,
        class = character.class,
        ascendancy = character.ascendancy,
    )
}

fn gem_xml(gem: &SkillGem) -> String {
    format!(
        "<Gem nameSpec=\"{}\" level=\"{}\" quality=\"{}\"/>",
        gem.name, gem.level, gem.quality
    )
}
