use small_rel_store::field::{Field, Type};
use small_rel_store::tuple::{Tuple, TupleDesc};

#[test]
fn encode_decode_round_trips_through_bytes() {
    let schema = TupleDesc::new(
        vec![Type::Int, Type::Char, Type::Double],
        vec!["id", "name", "score"],
    )
    .unwrap();
    let tuple = Tuple::new(vec![
        Field::Int(42),
        Field::Char("hopper".to_string()),
        Field::Double(3.5),
    ]);

    let bytes = schema.encode(&tuple).unwrap();
    assert_eq!(bytes.len(), schema.length());
    let back = schema.decode(&bytes).unwrap();
    assert_eq!(back, tuple);
}
