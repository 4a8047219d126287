use super::*;
use pretty_assertions::assert_eq;

#[test]
fn integers_are_numbers() {
    let value = Value::from_integer(9);
    assert!(matches!(value, Value::Number(n) if n == 9.0));
    assert_eq!(value.type_of(), "number");
}

#[test]
fn number_formatting() {
    assert_eq!(format_number(4.5), "4.5");
    assert_eq!(format_number(3.0), "3");
    assert_eq!(format_number(-0.0), "0");
    assert_eq!(format_number(f64::NAN), "NaN");
    assert_eq!(format_number(f64::INFINITY), "Infinity");
    assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    assert_eq!(format_number(1e21), "1e+21");
    assert_eq!(format_number(1e-7), "1e-7");
    assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
    assert_eq!(format_number(123_456_789.0), "123456789");
}

#[test]
fn truthiness() {
    for falsy in [
        Value::Null,
        Value::Bool(false),
        Value::Number(0.0),
        Value::Number(f64::NAN),
        Value::string(""),
    ] {
        assert!(!falsy.is_truthy(), "{falsy:?} should be falsy");
    }
    for truthy in [
        Value::Number(-1.0),
        Value::string("0"),
        Value::array(Vec::new()),
        Value::empty_object(),
    ] {
        assert!(truthy.is_truthy(), "{truthy:?} should be truthy");
    }
}

#[test]
fn containers_compare_by_identity() {
    let a = Value::array(vec![Value::Number(1.0)]);
    let b = Value::array(vec![Value::Number(1.0)]);
    assert!(a.strict_equals(&a.clone()));
    assert!(!a.strict_equals(&b));
    assert!(Value::string("x").strict_equals(&Value::string("x")));
    assert!(!Value::Number(f64::NAN).strict_equals(&Value::Number(f64::NAN)));
    assert!(!Value::Number(1.0).strict_equals(&Value::string("1")));
}

#[test]
fn aliasing_is_observable() {
    let a = Value::array(Vec::new());
    let alias = a.clone();
    if let Value::Array(items) = &alias {
        items.borrow_mut().push(Value::Bool(true));
    }
    let Value::Array(items) = &a else {
        panic!("expected an array");
    };
    assert_eq!(items.borrow().len(), 1);
}

#[test]
fn display_strings() {
    let array = Value::array(vec![
        Value::Number(1.0),
        Value::Null,
        Value::string("a"),
        Value::array(vec![Value::Number(2.0), Value::Number(3.0)]),
    ]);
    assert_eq!(array.to_display_string(), "1,,a,2,3");
    assert_eq!(Value::empty_object().to_display_string(), "[object Object]");
    assert_eq!(
        Value::native(Native::ShowTime).to_display_string(),
        "function() { [native code: JoshuaScript#show_time] }"
    );
}

#[test]
fn self_containing_array_displays_finitely() {
    let array = Value::array(vec![Value::Number(1.0)]);
    if let Value::Array(items) = &array {
        items.borrow_mut().push(array.clone());
    }
    assert_eq!(array.to_display_string(), "1,");
}

#[test]
fn string_to_number() {
    assert_eq!(Value::string("  42 ").to_number(), Some(42.0));
    assert_eq!(Value::string("").to_number(), Some(0.0));
    assert!(Value::string("abc").to_number().is_some_and(f64::is_nan));
    assert!(Value::string("inf").to_number().is_some_and(f64::is_nan));
    assert_eq!(Value::Bool(true).to_number(), Some(1.0));
    assert_eq!(Value::Null.to_number(), Some(0.0));
    assert_eq!(Value::empty_object().to_number(), None);
}

#[test]
fn json_view() {
    let mut props = IndexMap::new();
    props.insert("a".to_string(), Value::Number(1.0));
    props.insert("b".to_string(), Value::Number(1.5));
    props.insert("c".to_string(), Value::array(vec![Value::Null]));
    let json = Value::object(props).to_json();
    assert_eq!(json, serde_json::json!({"a": 1, "b": 1.5, "c": [null]}));
    assert_eq!(number_to_json(f64::NAN), serde_json::json!("NaN"));
}

#[test]
fn property_keys() {
    assert_eq!(PropertyKey::from_value(&Value::Number(2.0)), PropertyKey::Index(2));
    assert_eq!(
        PropertyKey::from_value(&Value::Number(1.5)),
        PropertyKey::Name("1.5".to_string())
    );
    assert_eq!(PropertyKey::from_name("10"), PropertyKey::Index(10));
    assert_eq!(PropertyKey::from_name("01"), PropertyKey::Name("01".to_string()));
    assert_eq!(PropertyKey::from_name("length"), PropertyKey::Name("length".to_string()));
    assert_eq!(PropertyKey::Index(3).as_name(), "3");
}

#[test]
fn array_methods_by_name() {
    assert_eq!(ArrayMethod::from_name("forEach"), Some(ArrayMethod::ForEach));
    assert_eq!(ArrayMethod::from_name("reduce"), None);
    assert_eq!(ArrayMethod::Join.name(), "join");
}
