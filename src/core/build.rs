//! Purpose: In-memory build model accepted by the `encode` and `stats` commands.
//! Exports: `Build`, `CharacterMeta`, `Item`, `Socket`, `SkillGem`, `Rarity`, `SocketColor`.
//! Role: Deserialization target for request payloads; all defaults live here.
//! Invariants: `Build::from_value` is the only path from wire JSON to a `Build`.
//! Invariants: After normalization, `Item::name` is never empty and `Item::ilvl` is never zero.
//! Invariants: Rarity and socket color lookups are total (unknown inputs clamp/default).
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::{Error, ErrorKind};

const DEFAULT_CLASS: &str = "Scion";
const DEFAULT_ASCENDANCY: &str = "None";
const DEFAULT_TYPE_LINE: &str = "Unknown Item";
const DEFAULT_GEM_NAME: &str = "Unknown";
const DEFAULT_SOCKET_ATTR: &str = "S";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Build {
    pub character: CharacterMeta,
    pub items: Vec<Item>,
    pub skills: Vec<SkillGem>,
    pub passives: Vec<u32>,
}

impl Build {
    /// Decodes a request payload and fills every default in one place.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        let build: Build = serde_json::from_value(value).map_err(|err| {
            Error::new(ErrorKind::Encode)
                .with_message("invalid build payload")
                .with_source(err)
        })?;
        Ok(build.normalized())
    }

    pub fn normalized(mut self) -> Self {
        self.character.level = self.character.level.max(1);
        for item in &mut self.items {
            if item.name.as_deref().is_some_and(str::is_empty) {
                item.name = None;
            }
            if item.ilvl == Some(0) {
                item.ilvl = None;
            }
        }
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterMeta {
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default = "default_class")]
    pub class: String,
    #[serde(default = "default_ascendancy")]
    pub ascendancy: String,
}

impl Default for CharacterMeta {
    fn default() -> Self {
        Self {
            level: default_level(),
            class: default_class(),
            ascendancy: default_ascendancy(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(default)]
    pub frame_type: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_type_line")]
    pub type_line: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ilvl: Option<u32>,
    #[serde(default)]
    pub sockets: Vec<Socket>,
    #[serde(default)]
    pub implicit_mods: Vec<String>,
    #[serde(default)]
    pub explicit_mods: Vec<String>,
}

impl Item {
    pub fn rarity(&self) -> Rarity {
        Rarity::from_frame_type(self.frame_type)
    }
}

impl Default for Item {
    fn default() -> Self {
        Self {
            frame_type: 0,
            name: None,
            type_line: default_type_line(),
            ilvl: None,
            sockets: Vec::new(),
            implicit_mods: Vec::new(),
            explicit_mods: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Socket {
    #[serde(default)]
    pub group: u32,
    #[serde(default = "default_socket_attr")]
    pub attr: String,
}

impl Socket {
    pub fn new(group: u32, attr: impl Into<String>) -> Self {
        Self {
            group,
            attr: attr.into(),
        }
    }

    pub fn color(&self) -> SocketColor {
        SocketColor::from_attr(&self.attr)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillGem {
    #[serde(default = "default_gem_name")]
    pub name: String,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub quality: u32,
}

impl Default for SkillGem {
    fn default() -> Self {
        Self {
            name: default_gem_name(),
            level: default_level(),
            quality: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Rarity {
    Normal,
    Magic,
    Rare,
    Unique,
    Gem,
}

impl Rarity {
    /// Frame types above 3 clamp to `Gem`; -1..=-5 count back from the end of the
    /// rarity list (-1 is `Gem`, -5 is `Normal`); anything lower is `Gem`.
    pub fn from_frame_type(frame_type: i64) -> Self {
        match frame_type {
            0 | -5 => Rarity::Normal,
            1 | -4 => Rarity::Magic,
            2 | -3 => Rarity::Rare,
            3 | -2 => Rarity::Unique,
            _ => Rarity::Gem,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rarity::Normal => "Normal",
            Rarity::Magic => "Magic",
            Rarity::Rare => "Rare",
            Rarity::Unique => "Unique",
            Rarity::Gem => "Gem",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SocketColor {
    Red,
    Green,
    Blue,
    White,
    Abyss,
}

impl SocketColor {
    pub fn from_attr(attr: &str) -> Self {
        match attr {
            "S" => SocketColor::Red,
            "D" => SocketColor::Green,
            "I" => SocketColor::Blue,
            "A" => SocketColor::Abyss,
            // "G" (white) and "DV" (delve resonator) both render as white.
            _ => SocketColor::White,
        }
    }

    pub fn letter(self) -> char {
        match self {
            SocketColor::Red => 'R',
            SocketColor::Green => 'G',
            SocketColor::Blue => 'B',
            SocketColor::White => 'W',
            SocketColor::Abyss => 'A',
        }
    }
}

fn default_level() -> u32 {
    1
}

fn default_class() -> String {
    DEFAULT_CLASS.to_string()
}

fn default_ascendancy() -> String {
    DEFAULT_ASCENDANCY.to_string()
}

fn default_type_line() -> String {
    DEFAULT_TYPE_LINE.to_string()
}

fn default_gem_name() -> String {
    DEFAULT_GEM_NAME.to_string()
}

fn default_socket_attr() -> String {
    DEFAULT_SOCKET_ATTR.to_string()
}
