use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Storage types used by the avatar DAT layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Unsigned 8-bit integer (1 byte)
    U8,
    /// Boolean stored in one byte, any non-zero byte reads as 1
    Flag,
    /// Unsigned 32-bit little-endian integer (4 bytes)
    U32,
    /// Signed 32-bit little-endian integer (4 bytes)
    I32,
    /// NUL-padded text of a fixed byte width
    Str(usize),
}

impl FieldType {
    /// Size in bytes for this field type
    pub const fn size(&self) -> usize {
        match self {
            FieldType::U8 | FieldType::Flag => 1,
            FieldType::U32 | FieldType::I32 => 4,
            FieldType::Str(width) => *width,
        }
    }

    /// Inclusive value range for numeric types, `None` for text
    pub const fn range(&self) -> Option<(i64, i64)> {
        match self {
            FieldType::U8 => Some((0, u8::MAX as i64)),
            FieldType::Flag => Some((0, 1)),
            FieldType::U32 => Some((0, u32::MAX as i64)),
            FieldType::I32 => Some((i32::MIN as i64, i32::MAX as i64)),
            FieldType::Str(_) => None,
        }
    }

    /// Whether values of this type are numbers
    pub const fn is_numeric(&self) -> bool {
        !matches!(self, FieldType::Str(_))
    }

    /// Short type name for error messages and CSV headers
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::U8 => "U8",
            FieldType::Flag => "Flag",
            FieldType::U32 => "U32",
            FieldType::I32 => "I32",
            FieldType::Str(_) => "Str",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Str(width) => write!(f, "Str({})", width),
            other => write!(f, "{}", other.type_name()),
        }
    }
}

/// A value held by a record field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldValue {
    /// Integer value (for U8, Flag, U32, I32)
    Int(i64),
    /// Text value (for Str)
    Text(String),
}

impl FieldValue {
    /// Get the default value for a field type
    pub fn default_for(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Str(_) => FieldValue::Text(String::new()),
            _ => FieldValue::Int(0),
        }
    }

    /// Check if this value is compatible with a field type
    pub fn is_compatible_with(&self, field_type: FieldType) -> bool {
        matches!(
            (self, field_type),
            (FieldValue::Text(_), FieldType::Str(_))
                | (
                    FieldValue::Int(_),
                    FieldType::U8 | FieldType::Flag | FieldType::U32 | FieldType::I32
                )
        )
    }

    /// Get as integer, if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as string reference, if this is a Text value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Int(_) => "Int",
            FieldValue::Text(_) => "Text",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Int(v as i64)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(v as i64)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

macro_rules! field_ids {
    ($($variant:ident => $name:literal, $label:literal;)+) => {
        /// Every field that appears in at least one record layout
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum FieldId {
            $($variant,)+
        }

        impl FieldId {
            /// All field ids, in table column order
            pub const ALL: &'static [FieldId] = &[$(FieldId::$variant,)+];

            /// Stable snake_case name, used in CSV headers and batch edits
            pub const fn name(&self) -> &'static str {
                match self {
                    $(FieldId::$variant => $name,)+
                }
            }

            /// Column heading for the table view
            pub const fn label(&self) -> &'static str {
                match self {
                    $(FieldId::$variant => $label,)+
                }
            }
        }

        impl FromStr for FieldId {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(FieldId::$variant),)+
                    other => Err(ValidationError::UnknownField(other.to_string())),
                }
            }
        }
    };
}

field_ids! {
    AvatarCode => "avatar_code", "Avatar Code";
    ImageNumber => "image_number", "Image #";
    ExNumber => "ex_number", "EX #";
    Name => "name", "Name";
    ShowInShop => "show_in_shop", "Visible";
    EnableSaleGold => "enable_sale_gold", "Enable Gold";
    EnableSaleCash => "enable_sale_cash", "Enable Cash";
    SellWeekly => "sell_weekly", "Sell Weekly";
    PriceWeeklyGold => "price_weekly_gold", "Weekly Gold";
    PriceWeeklyCash => "price_weekly_cash", "Weekly Cash";
    SellMonthly => "sell_monthly", "Sell Monthly";
    PriceMonthlyGold => "price_monthly_gold", "Monthly Gold";
    PriceMonthlyCash => "price_monthly_cash", "Monthly Cash";
    SellEternal => "sell_eternal", "Sell Eternal";
    PriceEternalGold => "price_eternal_gold", "Eternal Gold";
    PriceEternalCash => "price_eternal_cash", "Eternal Cash";
    CraterAttack => "crater_attack", "Crater Attack";
    Attack => "attack", "Attack";
    Defense => "defense", "Defense";
    Energy => "energy", "Energy";
    ShieldRegen => "shield_regen", "Shield Regen";
    ItemDelay => "item_delay", "Item Delay";
    Popularity => "popularity", "Popularity";
    Description => "description", "Description";
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Placement of a field inside a record block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Which field this is
    pub id: FieldId,
    /// Offset within the record block
    pub offset: usize,
    /// Storage type
    pub field_type: FieldType,
}

impl Field {
    /// Create a new field descriptor
    pub const fn new(id: FieldId, offset: usize, field_type: FieldType) -> Self {
        Self {
            id,
            offset,
            field_type,
        }
    }

    /// Size of this field in bytes
    pub const fn size(&self) -> usize {
        self.field_type.size()
    }

    /// Byte range of this field within its record block
    pub const fn span(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.field_type.size()
    }

    /// Field name shortcut
    pub const fn name(&self) -> &'static str {
        self.id.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_parse_back() {
        for id in FieldId::ALL {
            assert_eq!(id.name().parse::<FieldId>().unwrap(), *id);
        }
        assert_eq!(
            "armor".parse::<FieldId>(),
            Err(ValidationError::UnknownField("armor".to_string()))
        );
    }

    #[test]
    fn test_ranges() {
        assert_eq!(FieldType::U8.range(), Some((0, 255)));
        assert_eq!(FieldType::Flag.range(), Some((0, 1)));
        assert_eq!(FieldType::U32.range(), Some((0, 4_294_967_295)));
        assert_eq!(FieldType::Str(19).range(), None);
        assert_eq!(FieldType::Str(19).size(), 19);
    }
}
