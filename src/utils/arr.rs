//! List helpers keyed by an extractor closure.
//!
//! Items match when `key(item) == key(data)`. For multi-field identity, return
//! a tuple from the extractor.

use std::cmp::Ordering;

/// Replaces the first item with the same key as `data`. Returns whether one was found.
pub fn set<T, K, F>(list: &mut [T], data: T, key: F) -> bool
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    match index_by(list, &data, key) {
        Some(idx) => {
            list[idx] = data;
            true
        }
        None => false,
    }
}

/// Removes the first item with the same key as `data`. Returns whether one was found.
pub fn del<T, K, F>(list: &mut Vec<T>, data: &T, key: F) -> bool
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    match index_by(list, data, key) {
        Some(idx) => {
            list.remove(idx);
            true
        }
        None => false,
    }
}

/// Removes every item for which `pred` returns true.
pub fn del_by<T, F>(list: &mut Vec<T>, pred: F)
where
    F: Fn(&T) -> bool,
{
    list.retain(|item| !pred(item));
}

/// Replaces the item with the same key as `data`, or appends it.
pub fn replace<T, K, F>(list: &mut Vec<T>, data: T, key: F)
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    match index_by(list, &data, key) {
        Some(idx) => list[idx] = data,
        None => list.push(data),
    }
}

/// Replaces the item with the same key as `data`, or inserts it at the front.
pub fn replace_front<T, K, F>(list: &mut Vec<T>, data: T, key: F)
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    match index_by(list, &data, key) {
        Some(idx) => list[idx] = data,
        None => list.insert(0, data),
    }
}

/// Position of the first item with the same key as `data`.
pub fn index_by<T, K, F>(list: &[T], data: &T, key: F) -> Option<usize>
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let wanted = key(data);
    list.iter().position(|item| key(item) == wanted)
}

/// Item at `index`; negative indices count from the end.
pub fn at<T>(list: &[T], index: isize) -> Option<&T> {
    let idx = if index < 0 {
        list.len().checked_sub(index.unsigned_abs())?
    } else {
        index as usize
    };
    list.get(idx)
}

/// Stable ascending sort by the extracted key.
pub fn sort_by_keys<T, K, F>(list: &mut [T], key: F)
where
    K: PartialOrd,
    F: Fn(&T) -> K,
{
    list.sort_by(|a, b| key(a).partial_cmp(&key(b)).unwrap_or(Ordering::Equal));
}

/// Stable sort comparing the extracted fields as text, field by field.
pub fn compare_by<T, F>(list: &mut [T], fields: F)
where
    F: Fn(&T) -> Vec<String>,
{
    list.sort_by(|a, b| fields(a).cmp(&fields(b)));
}

/// Sum of a list of numbers.
pub fn count(list: &[f64]) -> f64 {
    list.iter().sum()
}

/// Sum of the values extracted from each item; `None` counts as zero.
pub fn count_by<T, F>(list: &[T], value: F) -> f64
where
    F: Fn(&T) -> Option<f64>,
{
    list.iter().map(|item| value(item).unwrap_or(0.0)).sum()
}
