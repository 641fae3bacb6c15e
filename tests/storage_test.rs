use std::collections::BTreeMap;

use iarray::{
    allocate, allocate_from, freeze, index_of, lock_length, prevent_extension, seal,
    to_key_string, track_undefined, ArrayData, ArrayError, ArrayStorage, ObjectId, Store,
    StoreKind, Value, MAX_ARRAY_INDEX, MAX_DENSE_LENGTH, MAX_LENGTH,
};
use rand::prelude::*;
use serde_json::json;

#[global_allocator]
static ALLOCATOR: mockalloc::Mockalloc<std::alloc::System> =
    mockalloc::Mockalloc(std::alloc::System);

fn rank(kind: StoreKind) -> u8 {
    match kind {
        StoreKind::Empty => 0,
        StoreKind::Int => 1,
        StoreKind::Double => 2,
        StoreKind::Object => 3,
        other => panic!("unexpected kind {other:?}"),
    }
}

fn same(a: &Value, b: &Value) -> bool {
    if a.is_number() && b.is_number() {
        a.to_number() == b.to_number()
    } else {
        a == b
    }
}

fn random_value(rng: &mut StdRng) -> Value {
    match rng.gen_range(0..10) {
        0 => Value::Double(f64::from(rng.gen_range(-100..100)) + 0.5),
        1 => Value::from("s"),
        2 => Value::Undefined,
        3 => Value::Bool(rng.gen()),
        4 => Value::Object(ObjectId(rng.gen_range(0..4))),
        _ => Value::Int(rng.gen_range(-1000..1000)),
    }
}

#[mockalloc::test]
fn widens_int_to_double() {
    let x = allocate_from(vec![1, 2, 3]);
    assert_eq!(x.kind(), StoreKind::Int);
    assert_eq!(x.length(), 3);
    let x = x.set(1, Value::Double(2.5), false).unwrap();
    assert_eq!(x.kind(), StoreKind::Double);
    let elements: Vec<f64> = (0..3).map(|i| x.get_double(i)).collect();
    assert_eq!(elements, vec![1.0, 2.5, 3.0]);
}

#[mockalloc::test]
fn promotes_far_writes_to_sparse() {
    let x = allocate_from(vec![1, 2, 3]);
    let x = x.set(5_000_000_000, Value::Int(7), false).unwrap();
    assert_eq!(x.kind(), StoreKind::Sparse);
    assert!(x.has(5_000_000_000));
    assert!(!x.has(4));
    assert_eq!(x.length(), 5_000_000_001);
    assert_eq!(x.get_int(5_000_000_000), 7);
    assert_eq!(x.get_int(2), 3);
}

#[mockalloc::test]
fn frozen_push_is_ignored() {
    let x = freeze(allocate_from(vec![1, 2]));
    let x = x.push(Value::Int(3), false).unwrap();
    assert_eq!(x.length(), 2);
    assert_eq!(x.get_object(2), Value::Undefined);
}

#[mockalloc::test]
fn locked_length_keeps_extra_elements() {
    let x = lock_length(allocate(2));
    let x = x.set(5, Value::from("x"), false).unwrap();
    assert_eq!(x.length(), 2);
    assert!(x.has(5));
    assert_eq!(x.get_object(5), Value::from("x"));
}

#[mockalloc::test]
fn deleted_elements_read_as_undefined() {
    let x = allocate_from(vec![1, 2, 3]).delete(1);
    assert!(!x.has(1));
    assert_eq!(x.length(), 3);
    assert_eq!(x.get_object(1), Value::Undefined);
    assert_eq!(x.get_int(1), 0);
}

#[test]
fn index_keys_round_trip() {
    let mut rng = StdRng::seed_from_u64(7);
    let samples = (0..1000)
        .map(|_| rng.gen_range(0..=MAX_ARRAY_INDEX))
        .chain([0, 1, 9, 10, 1023, 1024, MAX_ARRAY_INDEX]);
    for index in samples {
        assert_eq!(index_of(to_key_string(index).as_ref()), Some(index));
    }
    for key in ["01", "00", "", "-1", "1a", "4294967295", "99999999999", " 1"] {
        assert_eq!(index_of(key), None, "{key:?}");
    }
}

#[mockalloc::test]
fn sparse_threshold() {
    let mut below = ArrayStorage::new();
    below.set(MAX_DENSE_LENGTH - 1, 1, false).unwrap();
    assert_eq!(below.kind(), StoreKind::Int);
    assert_eq!(below.length(), MAX_DENSE_LENGTH);

    let mut at = ArrayStorage::new();
    at.set(MAX_DENSE_LENGTH, 1, false).unwrap();
    assert_eq!(at.kind(), StoreKind::Sparse);

    let mut grown = ArrayStorage::from_store(allocate_from(vec![1]));
    grown.set(MAX_DENSE_LENGTH + 10, 2, false).unwrap();
    assert_eq!(grown.kind(), StoreKind::Sparse);
    assert_eq!(grown.get_int(0), 1);
}

#[mockalloc::test]
fn widening_is_monotonic() {
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut array = ArrayStorage::new();
        let mut last = rank(array.kind());
        for _ in 0..200 {
            let index = rng.gen_range(0..64);
            array.set(index, random_value(&mut rng), false).unwrap();
            let current = rank(array.kind());
            assert!(current >= last, "{:?} narrowed", array);
            last = current;
        }
    }
}

#[mockalloc::test]
fn views_are_transparent_for_reads() {
    let build = || -> Store {
        let x = allocate_from(vec![Value::Int(1), Value::from("a"), Value::NULL]);
        x.delete(1).set(5, Value::TRUE, false).unwrap()
    };
    let plain = build();
    let views: Vec<Store> = vec![
        seal(build()),
        freeze(build()),
        prevent_extension(build()),
        lock_length(build()),
        track_undefined(build()),
    ];
    for view in views {
        assert_eq!(view.kind(), plain.kind());
        assert_eq!(view.length(), plain.length());
        assert_eq!(view.as_object_array(), plain.as_object_array());
        for index in 0..8 {
            assert_eq!(view.has(index), plain.has(index), "{view:?} at {index}");
            assert_eq!(view.get_object(index), plain.get_object(index));
        }
    }
}

#[mockalloc::test]
fn frozen_arrays_never_change() {
    let mut array = ArrayStorage::from_store(allocate_from(vec![1.5, 2.5, 3.5]));
    array.delete(1, false).unwrap();
    array.freeze();
    let before = array.to_vec();

    array.set(0, "x", false).unwrap();
    array.set(10, 1, false).unwrap();
    assert_eq!(array.delete(0, false), Ok(false));
    assert_eq!(array.push(4, false), Ok(3));
    assert_eq!(array.pop(), Value::Double(3.5));
    array.set_length(0).unwrap();
    array.set_length(10).unwrap();

    assert_eq!(array.length(), 3);
    assert_eq!(array.to_vec(), before);
    assert!(!array.has(1));
}

#[mockalloc::test]
fn length_changes_pick_the_representation() {
    let mut array = ArrayStorage::new();
    array.set_length(3).unwrap();
    assert_eq!(array.kind(), StoreKind::Int);
    assert_eq!(array.length(), 3);
    assert_eq!(array.iter().count(), 0);

    array.set(1, 7, false).unwrap();
    array.set_length(MAX_DENSE_LENGTH * 4).unwrap();
    assert_eq!(array.kind(), StoreKind::Sparse);
    assert_eq!(array.length(), MAX_DENSE_LENGTH * 4);
    assert_eq!(array.iter().collect::<Vec<_>>(), vec![(1, Value::Int(7))]);

    assert_eq!(
        array.set_length(MAX_LENGTH + 1),
        Err(ArrayError::CapacityOverflow {
            requested: MAX_LENGTH + 1
        })
    );
    assert_eq!(array.length(), MAX_DENSE_LENGTH * 4);

    array.set_length(2).unwrap();
    assert_eq!(array.to_vec(), vec![Value::Undefined, Value::Int(7)]);

    let mut array = ArrayStorage::from_store(allocate_from(vec![1, 2]));
    array.set_length(MAX_DENSE_LENGTH + 1).unwrap();
    assert_eq!(array.kind(), StoreKind::Sparse);
    array.push(3, false).unwrap();
    assert_eq!(array.get(MAX_DENSE_LENGTH + 1), Value::Int(3));
    assert!(!array.has(2));
}

#[mockalloc::test]
fn snapshots_as_json() {
    let mut array = ArrayStorage::with_length(2);
    array.push(1, false).unwrap();
    array.push(2.5, false).unwrap();
    array.push("three", false).unwrap();
    array.set(7, Value::Object(ObjectId(4)), false).unwrap();
    assert_eq!(
        serde_json::to_value(&array).unwrap(),
        json!([null, null, 1.0, 2.5, "three", null, null, 4])
    );
}

// Too slow for miri
#[cfg(not(miri))]
#[mockalloc::test]
fn stress_test() {
    for i in 0..10 {
        // Random but reproducible
        let mut rng = StdRng::seed_from_u64(i);
        let mut array = ArrayStorage::new();
        let mut model: BTreeMap<u64, Value> = BTreeMap::new();
        let mut length = 0u64;

        for _ in 0..1000 {
            match rng.gen_range(0..10) {
                0..=3 => {
                    let index = rng.gen_range(0..length + 8);
                    let value = random_value(&mut rng);
                    array.set(index, value.clone(), false).unwrap();
                    model.insert(index, value);
                    length = length.max(index + 1);
                }
                4 => {
                    let index = rng.gen_range(0..length + 2);
                    assert_eq!(array.delete(index, false), Ok(true));
                    model.remove(&index);
                }
                5 | 6 => {
                    let value = random_value(&mut rng);
                    assert_eq!(array.push(value.clone(), false), Ok(length + 1));
                    model.insert(length, value);
                    length += 1;
                }
                7 => {
                    let popped = array.pop();
                    let expected = match length.checked_sub(1) {
                        Some(last) => {
                            length = last;
                            model.remove(&last).unwrap_or_default()
                        }
                        None => Value::Undefined,
                    };
                    assert!(same(&popped, &expected), "popped {popped:?}, expected {expected:?}");
                }
                _ => {
                    let new_length = rng.gen_range(0..length + 16).min(96);
                    array.set_length(new_length).unwrap();
                    model.retain(|&k, _| k < new_length);
                    length = new_length;
                }
            }

            assert_eq!(array.length(), length);
            if let Some(store) = array.store().as_continuous() {
                assert!(store.capacity() >= store.length());
            }
            for index in 0..length + 2 {
                let expected = model.get(&index);
                assert_eq!(array.has(index), expected.is_some(), "{array:?} at {index}");
                let actual = array.get(index);
                let expected = expected.cloned().unwrap_or_default();
                assert!(same(&actual, &expected), "{actual:?} != {expected:?} at {index}");
            }
            let present: Vec<u64> = array.iter().map(|(k, _)| k).collect();
            let expected: Vec<u64> = model.keys().copied().collect();
            assert_eq!(present, expected);
        }
    }
}
