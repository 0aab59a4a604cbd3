//! Enum types for grade items.
//!
//! String-backed enums serialize as their Moodle string form and keep unknown
//! values in a catch-all variant so nothing read from the gradebook is lost.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// Macro: defines an enum with known string variants + a catch-all fallback.
// ---------------------------------------------------------------------------
macro_rules! define_enum {
    (
        $(#[$meta:meta])*
        $name:ident, default = $default:ident, custom_variant = $custom_variant:ident,
        variants: [
            $( ($variant:ident, $str:expr) ),+ $(,)?
        ]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant, )+
            $custom_variant(String),
        }

        impl $name {
            /// Returns the string representation.
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $str, )+
                    Self::$custom_variant(s) => s.as_str(),
                }
            }

            /// Returns `true` if this is the default variant.
            pub fn is_default(&self) -> bool {
                *self == Self::$default
            }

            /// Returns `true` if this is a built-in (non-custom) variant.
            pub fn is_builtin(&self) -> bool {
                !matches!(self, Self::$custom_variant(_))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok(Self::from(s.as_str()))
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                match s {
                    $( $str => Self::$variant, )+
                    other => Self::$custom_variant(other.to_owned()),
                }
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                match s.as_str() {
                    $( $str => Self::$variant, )+
                    _ => Self::$custom_variant(s),
                }
            }
        }
    };
}

// ===========================================================================
// ItemType
// ===========================================================================

define_enum! {
    /// What a grade item represents.
    ItemType, default = Mod, custom_variant = Other,
    variants: [
        (Course, "course"),
        (Category, "category"),
        (Mod, "mod"),
        (Manual, "manual"),
    ]
}

impl ItemType {
    /// Returns `true` for items that aggregate other items (course totals and
    /// category totals). Only these carry a meaningful calculation.
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Self::Course | Self::Category)
    }
}

// ===========================================================================
// DisplayType
// ===========================================================================

/// How a grade is displayed. Stored on items as the numeric Moodle code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DisplayType {
    /// Use the course default.
    CourseDefault,
    #[default]
    Real,
    Percentage,
    Letter,
    RealPercentage,
    RealLetter,
    LetterReal,
    LetterPercentage,
    PercentageLetter,
    PercentageReal,
}

impl DisplayType {
    /// Every display type in menu order.
    pub const ALL: [DisplayType; 10] = [
        Self::CourseDefault,
        Self::Real,
        Self::RealPercentage,
        Self::RealLetter,
        Self::Percentage,
        Self::PercentageReal,
        Self::PercentageLetter,
        Self::Letter,
        Self::LetterReal,
        Self::LetterPercentage,
    ];

    /// The numeric code stored in `grade_items.display`.
    pub fn code(self) -> i64 {
        match self {
            Self::CourseDefault => 0,
            Self::Real => 1,
            Self::Percentage => 2,
            Self::Letter => 3,
            Self::RealPercentage => 21,
            Self::RealLetter => 31,
            Self::LetterReal => 13,
            Self::LetterPercentage => 12,
            Self::PercentageLetter => 23,
            Self::PercentageReal => 32,
        }
    }

    /// Maps a stored code back to a display type. Unknown codes fall back to
    /// [`DisplayType::CourseDefault`].
    pub fn from_code(code: i64) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.code() == code)
            .unwrap_or(Self::CourseDefault)
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::CourseDefault => "Default",
            Self::Real => "Real",
            Self::Percentage => "Percentage",
            Self::Letter => "Letter",
            Self::RealPercentage => "Real (percentage)",
            Self::RealLetter => "Real (letter)",
            Self::LetterReal => "Letter (real)",
            Self::LetterPercentage => "Letter (percentage)",
            Self::PercentageLetter => "Percentage (letter)",
            Self::PercentageReal => "Percentage (real)",
        }
    }
}

impl fmt::Display for DisplayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ===========================================================================
// GradeType
// ===========================================================================

/// Kind of grade an item records. Stored as the numeric Moodle code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GradeType {
    None,
    Value,
    Scale,
    Text,
}

impl GradeType {
    pub const ALL: [GradeType; 4] = [Self::None, Self::Value, Self::Scale, Self::Text];

    pub fn code(self) -> i64 {
        match self {
            Self::None => 0,
            Self::Value => 1,
            Self::Scale => 2,
            Self::Text => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Value => "Value",
            Self::Scale => "Scale",
            Self::Text => "Text",
        }
    }
}
