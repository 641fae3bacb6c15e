#![no_main]

use arbitrary::Arbitrary;
use iarray::{ArrayStorage, CallSite, ObjectId, Value};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Element {
    Undefined,
    Null,
    Bool(bool),
    Int(i32),
    Double(f64),
    Text(String),
    Object(u64),
}

impl From<Element> for Value {
    fn from(other: Element) -> Self {
        match other {
            Element::Undefined => Value::Undefined,
            Element::Null => Value::Null,
            Element::Bool(b) => Value::Bool(b),
            Element::Int(i) => Value::Int(i),
            Element::Double(d) => Value::Double(d),
            Element::Text(s) => Value::from(s),
            Element::Object(id) => Value::Object(ObjectId(id)),
        }
    }
}

#[derive(Arbitrary, Debug)]
enum Op {
    Set(u16, Element, bool),
    SetFar(u32, Element),
    Delete(u16, bool),
    Push(Element),
    Pop,
    SetLength(u16),
    Slice(u16, u16),
    Concat,
    ReadOptimistic(u16),
    Freeze,
    Seal,
    PreventExtensions,
    LockLength,
    TrackUndefined,
}

fuzz_target!(|ops: Vec<Op>| {
    let mut array = ArrayStorage::new();
    for op in ops {
        match op {
            Op::Set(index, value, strict) => {
                let _ = array.set(u64::from(index), value, strict);
            }
            Op::SetFar(index, value) => {
                let _ = array.set(u64::from(index), value, false);
            }
            Op::Delete(index, strict) => {
                let _ = array.delete(u64::from(index), strict);
            }
            Op::Push(value) => {
                let _ = array.push(value, false);
            }
            Op::Pop => {
                array.pop();
            }
            Op::SetLength(length) => {
                let _ = array.set_length(u64::from(length));
            }
            Op::Slice(from, to) => {
                let slice = array.slice(u64::from(from), u64::from(to));
                assert!(slice.length() <= array.length().max(u64::from(to)));
            }
            Op::Concat => {
                if array.length() < 1 << 16 {
                    if let Ok(joined) = array.concat(&array) {
                        assert_eq!(joined.length(), array.length() * 2);
                    }
                }
            }
            Op::ReadOptimistic(index) => {
                let index = u64::from(index);
                if let Ok(i) = array.get_int_optimistic(index, CallSite(0)) {
                    assert_eq!(Value::from(i).to_number(), array.get(index).to_number());
                }
            }
            Op::Freeze => array.freeze(),
            Op::Seal => array.seal(),
            Op::PreventExtensions => array.prevent_extension(),
            Op::LockLength => array.lock_length(),
            Op::TrackUndefined => array.track_undefined(),
        }
        if let Some(store) = array.store().as_continuous() {
            assert!(store.capacity() >= store.length());
        }
        let _ = serde_json::to_string(&array);
    }
});
