//! Integer ids for stored records.
//!
//! Every table uses a `SERIAL` key, so each id wraps an `i32`. Separate
//! types keep a booking id from being passed where an order id is expected.

/// Define an `i32`-backed record id.
///
/// The generated type serialises as a bare number, displays as one, and with
/// the `postgres` feature binds and decodes as `INTEGER`.
///
/// ```rust
/// # use parlour_core::define_id;
/// define_id!(VoucherId);
///
/// let id = VoucherId::new(12);
/// assert_eq!(id.as_i32(), 12);
/// assert_eq!(id.to_string(), "12");
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[derive(::serde::Serialize, ::serde::Deserialize)]
        #[cfg_attr(feature = "postgres", derive(::sqlx::Type))]
        #[serde(transparent)]
        #[cfg_attr(feature = "postgres", sqlx(transparent))]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn as_i32(self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

define_id!(UserId);
define_id!(AppointmentId);
define_id!(OrderId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_display_as_plain_integers() {
        assert_eq!(AppointmentId::new(42).to_string(), "42");
        assert_eq!(OrderId::new(7).as_i32(), 7);
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&UserId::new(3)).unwrap();
        assert_eq!(json, "3");
        let back: OrderId = serde_json::from_str("19").unwrap();
        assert_eq!(back, OrderId::new(19));
    }
}
