#![no_main]

use arbitrary::Arbitrary;
use iarray::{index_of, to_key_string, Value, MAX_ARRAY_INDEX};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Key {
    Int(i64),
    Float(f64),
    Text(String),
    Index(u32),
}

fuzz_target!(|key: Key| {
    match key {
        Key::Int(i) => {
            let expected = u32::try_from(i).ok().filter(|&i| i <= MAX_ARRAY_INDEX);
            assert_eq!(index_of(i), expected);
        }
        Key::Float(f) => {
            if let Some(index) = index_of(f) {
                assert_eq!(f64::from(index), f);
                assert_eq!(index_of(Value::Double(f)), Some(index));
            }
        }
        Key::Text(s) => {
            if let Some(index) = index_of(s.as_str()) {
                assert_eq!(to_key_string(index), s.as_str());
            }
        }
        Key::Index(i) => {
            let expected = (i <= MAX_ARRAY_INDEX).then_some(i);
            assert_eq!(index_of(to_key_string(i).as_ref()), expected);
        }
    }
});
