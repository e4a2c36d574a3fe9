//! String interner backing [`Name`] handles.
//!
//! Interned strings are leaked to obtain `'static` references, so lookups
//! hand out plain `&str` without lifetime gymnastics. A single `RwLock`
//! guards the table; the engine itself is single-threaded, the lock only
//! keeps the interner safe to share behind an `Rc<Registry>` clone or a
//! scoped thread.

use crate::Name;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

struct InternTable {
    /// Map from string content to index.
    map: FxHashMap<&'static str, u32>,
    /// Storage for string contents, indexed by `Name::raw`.
    strings: Vec<&'static str>,
}

impl InternTable {
    fn with_empty() -> Self {
        let empty: &'static str = "";
        let mut map = FxHashMap::default();
        map.insert(empty, 0);
        Self {
            map,
            strings: vec![empty],
        }
    }
}

/// String interner handing out [`Name`] handles.
///
/// The empty string is pre-interned as `Name::EMPTY`, along with the module
/// names the builtin class universe uses.
pub struct StringInterner {
    table: RwLock<InternTable>,
}

impl StringInterner {
    /// Module name carried by every builtin class.
    pub const BUILTINS_MODULE: &'static str = "builtins";

    /// Create a new interner with the builtin module names pre-interned.
    pub fn new() -> Self {
        let interner = Self {
            table: RwLock::new(InternTable::with_empty()),
        };
        for common in [Self::BUILTINS_MODULE, "types", "typing"] {
            interner.intern(common);
        }
        interner
    }

    /// Intern a string, returning its [`Name`].
    ///
    /// # Panics
    /// Panics if more than `u32::MAX` distinct strings are interned.
    pub fn intern(&self, s: &str) -> Name {
        // Fast path: already interned.
        {
            let guard = self.table.read();
            if let Some(&idx) = guard.map.get(s) {
                return Name::from_raw(idx);
            }
        }

        let mut guard = self.table.write();

        // Double-check after acquiring the write lock.
        if let Some(&idx) = guard.map.get(s) {
            return Name::from_raw(idx);
        }

        // Leak to get a 'static reference; interned strings live for the
        // process lifetime.
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let idx = u32::try_from(guard.strings.len())
            .unwrap_or_else(|_| panic!("interner exceeded {} strings", u32::MAX));
        guard.strings.push(leaked);
        guard.map.insert(leaked, idx);
        Name::from_raw(idx)
    }

    /// Look up the string for a [`Name`].
    pub fn lookup(&self, name: Name) -> &'static str {
        let guard = self.table.read();
        guard.strings[name.raw() as usize]
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.table.read().strings.len()
    }

    /// Check if the interner holds only the pre-interned entries.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}
