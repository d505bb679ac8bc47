use std::cmp::Ordering;
use symbol_table::GlobalSymbol;

/// An interned identifier. Copying and comparing for equality is cheap;
/// ordering compares the underlying strings so that iteration order over
/// sorted collections does not depend on interning order.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id {
    id: GlobalSymbol,
}

impl Id {
    pub fn new<S: AsRef<str>>(id: S) -> Self {
        Self {
            id: GlobalSymbol::from(id.as_ref()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.id.as_str()
    }
}

impl PartialOrd for Id {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Id {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Debug for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self.as_str(), f)
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::new(s)
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::new(s)
    }
}

impl From<&String> for Id {
    fn from(s: &String) -> Self {
        Id::new(s)
    }
}

impl PartialEq<str> for Id {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl PartialEq<String> for Id {
    fn eq(&self, other: &String) -> bool {
        self.as_str() == other
    }
}

/// A trait representing something in the IR that has a name.
pub trait GetName {
    /// Return a reference to the object's name
    fn name(&self) -> Id;
}

#[cfg(test)]
mod tests {
    use super::Id;

    #[test]
    fn interned_equality_and_order() {
        let a = Id::from("reg0");
        let b = Id::new(String::from("reg0"));
        assert_eq!(a, b);
        assert_eq!(a, "reg0");
        let mut ids = vec![Id::from("zeta"), Id::from("alpha"), a];
        ids.sort();
        assert_eq!(
            ids.iter().map(|i| i.as_str()).collect::<Vec<_>>(),
            vec!["alpha", "reg0", "zeta"]
        );
    }
}
