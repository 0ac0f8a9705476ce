//! Learner-profile enums and the tool option enums derived from them.
//!
//! Every enum here travels as a `snake_case` string, both in the tool wire
//! format and in the orchestrator's parameter sets.

use serde::{Deserialize, Serialize};

/// Macro to define a string-valued enum.
///
/// Creates an enum with:
/// - `Serialize`/`Deserialize` as `snake_case` strings
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - `as_str()` and an `ALL` table in declaration order
/// - `Display` and `FromStr` using the same strings
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $value:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Returns the wire representation.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $value),+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("invalid ", stringify!($name), ": {}"), s)),
                }
            }
        }
    };
}

string_enum! {
    /// How the tutor prefers to teach this student.
    TeachingStyle {
        Direct => "direct",
        Socratic => "socratic",
        Visual => "visual",
        FlippedClassroom => "flipped_classroom",
    }
}

string_enum! {
    /// The student's current emotional state.
    EmotionalState {
        Focused => "focused",
        Anxious => "anxious",
        Confused => "confused",
        Tired => "tired",
    }
}

string_enum! {
    /// Layout of generated notes.
    NoteTakingStyle {
        Outline => "outline",
        BulletPoints => "bullet_points",
        Narrative => "narrative",
        Structured => "structured",
    }
}

string_enum! {
    /// Difficulty of generated practice material.
    DifficultyLevel {
        Easy => "easy",
        Medium => "medium",
        Hard => "hard",
    }
}

string_enum! {
    /// Level of detail for concept explanations.
    ExplanationDepth {
        Basic => "basic",
        Intermediate => "intermediate",
        Advanced => "advanced",
        Comprehensive => "comprehensive",
    }
}

impl EmotionalState {
    /// States in which the student should be given gentler material.
    #[must_use]
    pub const fn needs_support(&self) -> bool {
        matches!(self, Self::Anxious | Self::Confused | Self::Tired)
    }
}
