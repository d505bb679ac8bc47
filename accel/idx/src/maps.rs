use super::index_trait::IndexRef;
use std::{marker::PhantomData, ops};

/// A dense arena. Keys are handed out by [`IndexedMap::push`] and stay valid
/// for the lifetime of the map since entries are never removed.
#[derive(Debug, Clone)]
pub struct IndexedMap<K, D>
where
    K: IndexRef,
{
    data: Vec<D>,
    phantom: PhantomData<K>,
}

impl<K, D> ops::IndexMut<K> for IndexedMap<K, D>
where
    K: IndexRef,
{
    fn index_mut(&mut self, index: K) -> &mut Self::Output {
        &mut self.data[index.index()]
    }
}

impl<K, D> ops::Index<K> for IndexedMap<K, D>
where
    K: IndexRef,
{
    type Output = D;

    fn index(&self, index: K) -> &Self::Output {
        &self.data[index.index()]
    }
}

impl<K, D> IndexedMap<K, D>
where
    K: IndexRef,
{
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            phantom: PhantomData,
        }
    }

    pub fn get(&self, index: K) -> Option<&D> {
        self.data.get(index.index())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn push(&mut self, item: D) -> K {
        self.data.push(item);
        K::new(self.data.len() - 1)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &D)> {
        self.data.iter().enumerate().map(|(i, v)| (K::new(i), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut D)> {
        self.data
            .iter_mut()
            .enumerate()
            .map(|(i, v)| (K::new(i), v))
    }

    pub fn values(&self) -> impl Iterator<Item = &D> {
        self.data.iter()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut D> {
        self.data.iter_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + use<K, D> {
        (0..self.data.len()).map(K::new)
    }

    /// Returns the key of the first entry satisfying `pred`.
    pub fn find_key<F>(&self, mut pred: F) -> Option<K>
    where
        F: FnMut(&D) -> bool,
    {
        self.data.iter().position(|d| pred(d)).map(K::new)
    }
}

impl<K, D> Default for IndexedMap<K, D>
where
    K: IndexRef,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::{IndexRef, impl_index, maps::IndexedMap};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    struct MyIdx(u32);
    impl_index!(MyIdx);

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct MyData {
        number: usize,
    }

    #[test]
    fn push_hands_out_sequential_keys() {
        let mut map: IndexedMap<MyIdx, MyData> = IndexedMap::new();
        let a = map.push(MyData { number: 10 });
        let b = map.push(MyData { number: 20 });
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(map[b].number, 20);
        assert!(map.get(MyIdx::from(2_usize)).is_none());
        assert_eq!(map.find_key(|d| d.number == 20), Some(b));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec![a, b]);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn find_key_returns_first_match(
            numbers in prop::collection::vec(0_usize..20, 0..50),
            target in 0_usize..20,
        ) {
            let mut map: IndexedMap<MyIdx, MyData> = IndexedMap::new();
            let keys = numbers
                .iter()
                .map(|n| map.push(MyData { number: *n }))
                .collect::<Vec<_>>();
            let expected = numbers.iter().position(|n| *n == target).map(|i| keys[i]);
            prop_assert_eq!(map.find_key(|d| d.number == target), expected);
            prop_assert_eq!(map.len(), numbers.len());
        }
    }
}
