//! Identifier and value types shared by the registries and handlers

/// Declares an accumulating bit-set newtype over `u32` with named bits.
macro_rules! bit_set {
    (
        $(#[$meta:meta])*
        $name:ident { $($flag:ident = $value:expr),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ::serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            $(pub const $flag: $name = $name($value);)+

            pub const fn bits(&self) -> u32 {
                self.0
            }

            pub const fn from_bits(bits: u32) -> Self {
                Self(bits)
            }

            pub const fn is_empty(&self) -> bool {
                self.0 == 0
            }

            /// True if every bit of `other` is set here
            pub const fn contains(&self, other: $name) -> bool {
                self.0 & other.0 == other.0
            }

            pub fn insert(&mut self, other: $name) {
                self.0 |= other.0;
            }

            pub const fn union(self, other: $name) -> $name {
                $name(self.0 | other.0)
            }
        }
    };
}

pub(crate) use bit_set;

mod counter;
mod crypt;
mod gps;
mod ip;
mod mac;
mod phy;
mod signal;

pub use counter::DecayingCounter;
pub use crypt::{CryptSet, CryptType};
pub use gps::{GpsAggregate, GpsFix};
pub use ip::{IpGuess, IpObservation, IpOrigin};
pub use mac::{MacAddr, OuiPrefix};
pub use phy::{CarrierSet, CarrierType, EncodingSet, EncodingType};
pub use signal::{PeakLocation, SignalAggregate, SignalSample};
