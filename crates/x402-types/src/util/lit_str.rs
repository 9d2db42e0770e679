//! Unit types standing for a single string literal.
//!
//! Protocol fields such as `scheme` only ever carry one value for a given
//! payment scheme. Modelling them as a unit type makes any other value a
//! deserialization error instead of something to check by hand.
//!
//! ```
//! use x402_types::lit_str;
//!
//! lit_str!(ExactScheme, "exact");
//!
//! let scheme: ExactScheme = serde_json::from_str("\"exact\"").unwrap();
//! assert_eq!(scheme.to_string(), "exact");
//! assert!(serde_json::from_str::<ExactScheme>("\"upto\"").is_err());
//! ```

/// Declares a unit struct that serializes as, and only parses from, `$val`.
///
/// The generated type has a `VALUE` constant and implements `AsRef<str>`,
/// `FromStr`, `Display`, `Serialize` and `Deserialize`.
#[macro_export]
macro_rules! lit_str {
    ($struct_name:ident, $val:expr) => {
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $struct_name;

        impl $struct_name {
            pub const VALUE: &'static str = $val;
        }

        impl AsRef<str> for $struct_name {
            fn as_ref(&self) -> &str {
                Self::VALUE
            }
        }

        impl std::str::FromStr for $struct_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s == Self::VALUE {
                    Ok($struct_name)
                } else {
                    Err(format!("expected '{}', got '{}'", Self::VALUE, s))
                }
            }
        }

        impl std::fmt::Display for $struct_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(Self::VALUE)
            }
        }

        impl serde::Serialize for $struct_name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(Self::VALUE)
            }
        }

        impl<'de> serde::Deserialize<'de> for $struct_name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse::<$struct_name>().map_err(serde::de::Error::custom)
            }
        }
    };
}
