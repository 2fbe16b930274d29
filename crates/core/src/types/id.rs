//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types.
//!
//! IDs are opaque strings on the client side. The server renders them into
//! element ids and data attributes, and JSON payloads may carry them either
//! as numbers or as strings, so deserialization accepts both.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize` as a plain string
/// - `Deserialize` from a JSON string or integer
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`
/// - `From<&str>`, `From<String>` and `From<u64>` implementations
///
/// # Example
///
/// ```rust
/// # use unibites_core::define_id;
/// define_id!(CategoryId);
/// define_id!(CouponId);
///
/// let category = CategoryId::new("7");
/// let coupon = CouponId::from(7_u64);
///
/// assert_eq!(category.as_str(), coupon.as_str());
/// // These are different types, so this won't compile:
/// // let _: CategoryId = coupon;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, ::serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from anything string-like.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id.to_string())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                deserializer
                    .deserialize_any($crate::types::id::IdVisitor)
                    .map(Self)
            }
        }
    };
}

/// Visitor accepting either a JSON string or an integer as an ID.
#[doc(hidden)]
pub struct IdVisitor;

impl serde::de::Visitor<'_> for IdVisitor {
    type Value = String;

    fn expecting(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("a string or integer id")
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(v.to_owned())
    }

    fn visit_string<E: serde::de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(v)
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }
}

// Define standard entity IDs
define_id!(ProductId);
define_id!(OrderId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_json_number_and_string() {
        let from_number: ProductId = serde_json::from_str("42").unwrap();
        let from_string: ProductId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(from_number.as_str(), "42");
    }

    #[test]
    fn test_id_serializes_as_string() {
        let id = OrderId::from(9_u64);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"9\"");
    }

    #[test]
    fn test_id_rejects_other_json_types() {
        assert!(serde_json::from_str::<ProductId>("true").is_err());
        assert!(serde_json::from_str::<ProductId>("{}").is_err());
    }

    #[test]
    fn test_id_display() {
        assert_eq!(ProductId::new("pizza-1").to_string(), "pizza-1");
    }
}
