use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global string interner shared by every entity id kind.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Counter backing `with_prefix`, shared so minted ids never collide
/// across kinds.
static COUNTER: AtomicU64 = AtomicU64::new(0);

macro_rules! interned_id {
    ($(#[$meta:meta])* $name:ident, $display:literal, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Spur);

        impl $name {
            /// Intern a string as an id, or return the existing one.
            pub fn intern(s: &str) -> Self {
                Self(INTERNER.get_or_intern(s))
            }

            /// Resolve back to a string slice.
            pub fn as_str(&self) -> &'static str {
                INTERNER.resolve(&self.0)
            }

            /// Mint a fresh unique id with the default prefix.
            pub fn fresh() -> Self {
                Self::with_prefix($prefix)
            }

            /// Mint a fresh unique id such as `note_7`.
            pub fn with_prefix(prefix: &str) -> Self {
                let n = COUNTER.fetch_add(1, Ordering::Relaxed);
                Self::intern(&format!("{prefix}_{n}"))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($display, ":{}"), self.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($display, ":{}"), self.as_str())
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
                Ok(Self::intern(&s))
            }
        }
    };
}

interned_id!(
    /// Identifier of a canvas. Interned: 4 bytes, `Copy`, O(1) compare.
    CanvasId,
    "canvas",
    "canvas"
);

interned_id!(
    /// Identifier of a sticky note on some canvas.
    NoteId,
    "note",
    "note"
);
