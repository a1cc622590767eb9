//! Request attribute lookup.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

/// Read access to the attributes of an incoming request.
///
/// Implemented for the common map types and for slices, arrays and vectors of
/// `(field, value)` pairs; with pairs the first occurrence of a field wins.
pub trait Attributes {
    /// The value of `field`, if the request carries it.
    fn get(&self, field: &str) -> Option<&str>;
}

impl<K, V, S> Attributes for HashMap<K, V, S>
where
    K: Borrow<str> + Hash + Eq,
    V: AsRef<str>,
    S: BuildHasher,
{
    fn get(&self, field: &str) -> Option<&str> {
        HashMap::get(self, field).map(AsRef::as_ref)
    }
}

impl<K, V> Attributes for BTreeMap<K, V>
where
    K: Borrow<str> + Ord,
    V: AsRef<str>,
{
    fn get(&self, field: &str) -> Option<&str> {
        BTreeMap::get(self, field).map(AsRef::as_ref)
    }
}

impl<K, V> Attributes for [(K, V)]
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn get(&self, field: &str) -> Option<&str> {
        self.iter()
            .find(|(k, _)| k.as_ref() == field)
            .map(|(_, v)| v.as_ref())
    }
}

impl<K, V, const N: usize> Attributes for [(K, V); N]
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn get(&self, field: &str) -> Option<&str> {
        Attributes::get(self.as_slice(), field)
    }
}

impl<K, V> Attributes for Vec<(K, V)>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn get(&self, field: &str) -> Option<&str> {
        Attributes::get(self.as_slice(), field)
    }
}
