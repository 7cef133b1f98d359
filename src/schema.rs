//! Fixed record layouts of the avatar DAT files
//!
//! Offsets and widths follow the game client's on-disk format. Body, head,
//! glass and flag files share the normal layout; ex-item files have their own.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::field::{Field, FieldId, FieldType};

/// Size of the file header that precedes the records
pub const HEADER_SIZE: usize = 4;

/// Size of a record in body/head/glass/flag files
pub const NORMAL_RECORD_SIZE: usize = 644;

/// Size of a record in ex-item files
pub const EXITEM_RECORD_SIZE: usize = 684;

const NAME_WIDTH: usize = 19;
const DESCRIPTION_WIDTH: usize = 63;

/// Layout shared by body, head, glass and flag records
pub static NORMAL_LAYOUT: Layout = Layout {
    family: LayoutFamily::Normal,
    record_size: NORMAL_RECORD_SIZE,
    fields: &[
        Field::new(FieldId::AvatarCode, 0, FieldType::U32),
        Field::new(FieldId::ImageNumber, 4, FieldType::U32),
        Field::new(FieldId::Name, 12, FieldType::Str(NAME_WIDTH)),
        Field::new(FieldId::ShowInShop, 35, FieldType::Flag),
        Field::new(FieldId::EnableSaleGold, 96, FieldType::U8),
        Field::new(FieldId::EnableSaleCash, 97, FieldType::U8),
        Field::new(FieldId::SellWeekly, 37, FieldType::U8),
        Field::new(FieldId::PriceWeeklyGold, 40, FieldType::U32),
        Field::new(FieldId::PriceWeeklyCash, 44, FieldType::U32),
        Field::new(FieldId::SellMonthly, 60, FieldType::U8),
        Field::new(FieldId::PriceMonthlyGold, 64, FieldType::U32),
        Field::new(FieldId::PriceMonthlyCash, 68, FieldType::U32),
        Field::new(FieldId::SellEternal, 84, FieldType::U8),
        Field::new(FieldId::PriceEternalGold, 88, FieldType::U32),
        Field::new(FieldId::PriceEternalCash, 92, FieldType::U32),
        Field::new(FieldId::CraterAttack, 104, FieldType::I32),
        Field::new(FieldId::Attack, 108, FieldType::I32),
        Field::new(FieldId::Defense, 112, FieldType::I32),
        Field::new(FieldId::Energy, 116, FieldType::I32),
        Field::new(FieldId::ShieldRegen, 120, FieldType::I32),
        Field::new(FieldId::ItemDelay, 124, FieldType::I32),
        Field::new(FieldId::Popularity, 128, FieldType::I32),
        Field::new(FieldId::Description, 132, FieldType::Str(DESCRIPTION_WIDTH)),
    ],
};

/// Layout of ex-item records
pub static EXITEM_LAYOUT: Layout = Layout {
    family: LayoutFamily::ExItem,
    record_size: EXITEM_RECORD_SIZE,
    fields: &[
        Field::new(FieldId::AvatarCode, 0, FieldType::U32),
        Field::new(FieldId::ExNumber, 8, FieldType::U32),
        Field::new(FieldId::Name, 20, FieldType::Str(NAME_WIDTH)),
        Field::new(FieldId::ShowInShop, 43, FieldType::Flag),
        Field::new(FieldId::EnableSaleGold, 104, FieldType::U8),
        Field::new(FieldId::EnableSaleCash, 105, FieldType::U8),
        Field::new(FieldId::SellWeekly, 45, FieldType::U8),
        Field::new(FieldId::PriceWeeklyGold, 48, FieldType::U32),
        Field::new(FieldId::PriceWeeklyCash, 52, FieldType::U32),
        Field::new(FieldId::SellMonthly, 68, FieldType::U8),
        Field::new(FieldId::PriceMonthlyGold, 72, FieldType::U32),
        Field::new(FieldId::PriceMonthlyCash, 76, FieldType::U32),
        Field::new(FieldId::SellEternal, 92, FieldType::U8),
        Field::new(FieldId::PriceEternalGold, 96, FieldType::U32),
        Field::new(FieldId::PriceEternalCash, 100, FieldType::U32),
        Field::new(FieldId::Description, 132, FieldType::Str(DESCRIPTION_WIDTH)),
    ],
};

/// The two distinct block layouts found in avatar DAT files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutFamily {
    /// 644-byte records with stats
    Normal,
    /// 684-byte records without stats
    ExItem,
}

impl LayoutFamily {
    /// Label used in the table's type column
    pub const fn label(&self) -> &'static str {
        match self {
            LayoutFamily::Normal => "Normal",
            LayoutFamily::ExItem => "Ex-item",
        }
    }
}

/// Byte layout of one record kind
#[derive(Debug)]
pub struct Layout {
    /// Which family this layout belongs to
    pub family: LayoutFamily,
    /// Size of one record block in bytes
    pub record_size: usize,
    /// Mapped fields, in table column order
    pub fields: &'static [Field],
}

impl Layout {
    /// Look up a field descriptor by id
    pub fn field(&self, id: FieldId) -> Option<&'static Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Check whether this layout contains a field
    pub fn contains(&self, id: FieldId) -> bool {
        self.field(id).is_some()
    }

    /// Iterate over the field ids of this layout
    pub fn field_ids(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.fields.iter().map(|f| f.id)
    }
}

/// The five kinds of avatar DAT file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Body,
    Head,
    Glass,
    Flag,
    ExItem,
}

impl RecordKind {
    /// All kinds, in menu order
    pub const ALL: [RecordKind; 5] = [
        RecordKind::Body,
        RecordKind::Head,
        RecordKind::Glass,
        RecordKind::Flag,
        RecordKind::ExItem,
    ];

    /// Byte layout used by this kind
    pub fn layout(&self) -> &'static Layout {
        match self {
            RecordKind::ExItem => &EXITEM_LAYOUT,
            _ => &NORMAL_LAYOUT,
        }
    }

    /// Size of one record of this kind
    pub fn record_size(&self) -> usize {
        self.layout().record_size
    }

    /// The field holding the picture number shown in game
    pub fn image_field(&self) -> FieldId {
        match self {
            RecordKind::ExItem => FieldId::ExNumber,
            _ => FieldId::ImageNumber,
        }
    }

    /// Whether a file of `len` bytes could hold records of this kind
    ///
    /// A length shorter than the header says nothing about the kind.
    pub fn fits(&self, len: usize) -> bool {
        len.checked_sub(HEADER_SIZE)
            .is_none_or(|payload| payload % self.record_size() == 0)
    }

    /// Lowercase name, as used in file names
    pub const fn name(&self) -> &'static str {
        match self {
            RecordKind::Body => "body",
            RecordKind::Head => "head",
            RecordKind::Glass => "glass",
            RecordKind::Flag => "flag",
            RecordKind::ExItem => "ex-item",
        }
    }

    /// Guess the kind of a file from its name, falling back to its size
    ///
    /// # Arguments
    /// - `path` - The path of the file, only the file stem is inspected
    /// - `len` - The total length of the file in bytes
    ///
    /// # Returns
    /// The kind named in the file stem when its record size fits `len`,
    /// otherwise `Body` or `ExItem` depending on which record size fits
    pub fn guess<P: AsRef<Path>>(path: P, len: usize) -> RecordKind {
        let stem = path
            .as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        for (needle, kind) in [
            ("body", RecordKind::Body),
            ("head", RecordKind::Head),
            ("glass", RecordKind::Glass),
            ("flag", RecordKind::Flag),
            ("ex", RecordKind::ExItem),
        ] {
            if stem.contains(needle) && kind.fits(len) {
                return kind;
            }
        }

        match detect_layout(len) {
            Some(LayoutFamily::ExItem) => RecordKind::ExItem,
            _ => RecordKind::Body,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "body" => Ok(RecordKind::Body),
            "head" => Ok(RecordKind::Head),
            "glass" => Ok(RecordKind::Glass),
            "flag" => Ok(RecordKind::Flag),
            "ex-item" | "exitem" | "ex_item" | "ex" => Ok(RecordKind::ExItem),
            other => Err(format!("unknown record kind: {}", other)),
        }
    }
}

/// Detect which layout a file of `len` bytes holds
///
/// The normal size is tried first. Returns `None` when neither record size
/// divides the payload.
pub fn detect_layout(len: usize) -> Option<LayoutFamily> {
    let payload = len.checked_sub(HEADER_SIZE)?;

    if payload % NORMAL_RECORD_SIZE == 0 {
        Some(LayoutFamily::Normal)
    } else if payload % EXITEM_RECORD_SIZE == 0 {
        Some(LayoutFamily::ExItem)
    } else {
        None
    }
}
