use std::sync::Arc;

use small_rel_store::btree_file::BTreeFile;
use small_rel_store::buffer_pool::BufferPool;
use small_rel_store::field::{Field, Type};
use small_rel_store::tuple::{Tuple, TupleDesc};

struct TestFile(std::path::PathBuf);

impl TestFile {
    fn new(name: &str) -> Self {
        let mut path = std::env::temp_dir();
        path.push(format!("small-rel-store-it-btree-{}", name));
        TestFile(path)
    }
}

impl Drop for TestFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn schema() -> TupleDesc {
    TupleDesc::new(vec![Type::Int, Type::Int], vec!["id", "value"]).unwrap()
}

#[test]
fn scanning_after_out_of_order_inserts_yields_ascending_keys() {
    let tf = TestFile::new("scan-order");
    let mut pool = BufferPool::with_default_capacity();
    let file = BTreeFile::new(Arc::from("t"), schema(), 0);
    file.open(&mut pool, &tf.0).unwrap();

    for k in [5, 1, 4, 2, 3] {
        file.insert(&mut pool, &Tuple::new(vec![Field::Int(k), Field::Int(k * 100)])).unwrap();
    }

    let mut cursor = file.begin(&mut pool).unwrap();
    let mut keys = Vec::new();
    while cursor != file.end() {
        keys.push(file.get(&mut pool, cursor).unwrap().field(0).as_int().unwrap());
        cursor = file.next(&mut pool, cursor).unwrap();
    }
    assert_eq!(keys, vec![1, 2, 3, 4, 5]);
}

#[test]
fn upsert_on_duplicate_key_replaces_the_value() {
    let tf = TestFile::new("upsert");
    let mut pool = BufferPool::with_default_capacity();
    let file = BTreeFile::new(Arc::from("t"), schema(), 0);
    file.open(&mut pool, &tf.0).unwrap();

    file.insert(&mut pool, &Tuple::new(vec![Field::Int(1), Field::Int(10)])).unwrap();
    file.insert(&mut pool, &Tuple::new(vec![Field::Int(1), Field::Int(20)])).unwrap();

    let found = file.search(&mut pool, 1).unwrap();
    assert_eq!(found.field(1).as_int(), Some(20));
}
