use iarray::{
    allocate_from, allocate_typed, ArrayError, ArrayStorage, ByteOrder, CallSite, ObjectId,
    StoreKind, TypedKind, Value,
};

#[global_allocator]
static ALLOCATOR: mockalloc::Mockalloc<std::alloc::System> =
    mockalloc::Mockalloc(std::alloc::System);

fn ints(elements: Vec<i32>, id: u64) -> ArrayStorage {
    ArrayStorage::from_store(allocate_from(elements)).with_id(ObjectId(id))
}

#[mockalloc::test]
fn non_extensible_reports_the_array() {
    let mut x = ints(vec![1], 3);
    x.prevent_extension();
    assert!(!x.is_extensible());
    assert_eq!(
        x.set(1, 2, true),
        Err(ArrayError::NonExtensible {
            index: 1,
            array: Some(ObjectId(3))
        })
    );
    assert_eq!(x.length(), 1);

    x.set(1, 2, false).unwrap();
    assert!(!x.has(1));
    x.set(0, "x", true).unwrap();
    assert_eq!(x.kind(), StoreKind::Object);
    assert_eq!(x.get(0), Value::from("x"));
}

#[mockalloc::test]
fn sealed_keeps_occupied_elements() {
    let mut x = ints(vec![1, 2, 3], 4);
    x.seal();
    assert!(x.is_sealed());
    assert!(!x.is_frozen());

    x.set_length(1).unwrap();
    assert_eq!(x.length(), 3);
    assert_eq!(x.delete(2, false), Ok(false));
    assert_eq!(
        x.delete(2, true),
        Err(ArrayError::NotConfigurable {
            index: 2,
            array: Some(ObjectId(4))
        })
    );

    x.set_length(5).unwrap();
    assert_eq!(x.length(), 5);
    assert!(!x.has(3));
    x.set(4, 1, false).unwrap();
    assert!(!x.has(4));
    x.set(1, 20, false).unwrap();
    assert_eq!(x.get_int(1), 20);
}

#[mockalloc::test]
fn typed_arrays_have_fixed_shape() {
    let store = allocate_typed(vec![0; 4], TypedKind::U8Clamped, ByteOrder::Native);
    let mut x = ArrayStorage::from_store(store).with_id(ObjectId(5));
    assert_eq!(x.kind(), StoreKind::Typed(TypedKind::U8Clamped));

    x.set(0, 300, false).unwrap();
    x.set(1, -5, false).unwrap();
    x.set(2, 7, false).unwrap();
    assert_eq!(x.get_int(0), 255);
    assert_eq!(x.get_int(1), 0);
    assert_eq!(x.get_int(2), 7);

    assert_eq!(x.push(9, false), Ok(4));
    x.set_length(1).unwrap();
    assert_eq!(x.length(), 4);
    assert_eq!(x.delete(0, false), Ok(false));
    assert!(x.delete(0, true).unwrap_err().is_type_error());

    let y = ints(vec![1, 2], 6);
    let z = x.concat(&y).unwrap();
    assert_eq!(z.length(), 6);
    assert_eq!(z.get_int(0), 255);
    assert_eq!(z.get_int(5), 2);
    assert!(z.is_length_writable());
}

#[mockalloc::test]
fn splices_continuous_stores_in_place() {
    let mut x = ints(vec![1, 2, 3, 4, 5], 7);
    let removed = x
        .store_mut()
        .as_continuous_mut()
        .unwrap()
        .fast_splice(1, 2, 1)
        .unwrap();
    assert_eq!(removed.as_object_array(), vec![Value::Int(2), Value::Int(3)]);
    assert_eq!(x.length(), 4);

    let setter = x.element_setter::<i32>().unwrap();
    setter.set(x.store_mut(), 1, 9).unwrap();
    let items: Vec<i32> = (0..4).map(|i| x.get_int(i)).collect();
    assert_eq!(items, vec![1, 9, 4, 5]);
    assert_eq!(x.get_int_optimistic(3, CallSite(1)), Ok(5));
}

#[mockalloc::test]
fn tracked_undefined_survives_length_changes() {
    let mut x = ints(vec![1, 2], 8);
    x.track_undefined();
    x.set(1, Value::Undefined, false).unwrap();
    assert_eq!(x.kind(), StoreKind::Int);
    x.set_length(4).unwrap();
    x.push(Value::Undefined, false).unwrap();
    let items: Vec<(u64, Value)> = x.iter().collect();
    assert_eq!(
        items,
        vec![(0, Value::Int(1)), (1, Value::Undefined), (4, Value::Undefined)]
    );
    x.set_length(1).unwrap();
    assert_eq!(x.to_vec(), vec![Value::Int(1)]);
    assert_eq!(x.pop(), Value::Int(1));
    assert_eq!(x.length(), 0);
}
