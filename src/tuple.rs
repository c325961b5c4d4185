//! Fixed-width tuple/schema codec.
//!
//! Grounded on `small-db`'s `TupleScheme`/`Tuple` pair (`src/tuple.rs`,
//! `src/btree/tuple.rs`) generalized from int-only fields to
//! `Int`/`Double`/`Char`, and on the original `Tuple.cpp`/`TupleDesc`
//! reference for `index_of`/`offset_of`/`merge` semantics.

use crate::error::{Error, Result};
use crate::field::{Field, Type, CHAR_WIDTH};
use std::fmt;

/// Schema metadata: parallel `types`/`names`, both non-empty and of equal
/// length, with pairwise-distinct non-empty names.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleDesc {
    types: Vec<Type>,
    names: Vec<String>,
}

impl TupleDesc {
    pub fn new<N: Into<String>>(types: Vec<Type>, names: Vec<N>) -> Result<Self> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if types.is_empty() {
            return Err(Error::InvalidArgument("schema must have at least one field".into()));
        }
        if types.len() != names.len() {
            return Err(Error::InvalidArgument(format!(
                "types/names length mismatch: {} vs {}",
                types.len(),
                names.len()
            )));
        }
        for name in &names {
            if name.is_empty() {
                return Err(Error::InvalidArgument("field name must not be empty".into()));
            }
        }
        let mut seen = std::collections::HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(Error::InvalidArgument(format!("duplicate field name: {}", name)));
            }
        }
        Ok(TupleDesc { types, names })
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn field_type(&self, i: usize) -> Type {
        self.types[i]
    }

    pub fn name(&self, i: usize) -> &str {
        &self.names[i]
    }

    /// Byte offset of field `i` within an encoded tuple.
    pub fn offset(&self, i: usize) -> usize {
        self.types[..i].iter().map(|t| t.width()).sum()
    }

    /// Total encoded length of a tuple under this schema.
    pub fn length(&self) -> usize {
        self.types.iter().map(|t| t.width()).sum()
    }

    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| Error::NotFound(format!("field not found: {}", name)))
    }

    pub fn compatible(&self, tuple: &Tuple) -> bool {
        if tuple.len() != self.len() {
            return false;
        }
        (0..self.len()).all(|i| tuple.field(i).field_type() == self.types[i])
    }

    /// Concatenate two schemas; fails if the combined names are not unique.
    pub fn merge(a: &TupleDesc, b: &TupleDesc) -> Result<TupleDesc> {
        let mut types = a.types.clone();
        types.extend(b.types.clone());
        let mut names = a.names.clone();
        names.extend(b.names.clone());
        TupleDesc::new(types, names)
    }

    pub fn encode(&self, tuple: &Tuple) -> Result<Vec<u8>> {
        if !self.compatible(tuple) {
            return Err(Error::TypeMismatch("tuple does not match schema".into()));
        }
        let mut buf = vec![0u8; self.length()];
        for i in 0..self.len() {
            let offset = self.offset(i);
            let width = self.types[i].width();
            match tuple.field(i) {
                Field::Int(v) => buf[offset..offset + width].copy_from_slice(&v.to_ne_bytes()),
                Field::Double(v) => buf[offset..offset + width].copy_from_slice(&v.to_ne_bytes()),
                Field::Char(s) => {
                    let bytes = s.as_bytes();
                    if bytes.len() > CHAR_WIDTH {
                        return Err(Error::InvalidArgument(format!(
                            "char field exceeds {} bytes: {:?}",
                            CHAR_WIDTH, s
                        )));
                    }
                    buf[offset..offset + bytes.len()].copy_from_slice(bytes);
                    // remaining bytes are already zero (NUL padding).
                }
            }
        }
        Ok(buf)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Tuple> {
        if bytes.len() < self.length() {
            return Err(Error::Corrupt(format!(
                "buffer too short to decode tuple: {} < {}",
                bytes.len(),
                self.length()
            )));
        }
        let mut fields = Vec::with_capacity(self.len());
        for i in 0..self.len() {
            let offset = self.offset(i);
            let width = self.types[i].width();
            let slice = &bytes[offset..offset + width];
            let field = match self.types[i] {
                Type::Int => Field::Int(i32::from_ne_bytes(slice.try_into().unwrap())),
                Type::Double => Field::Double(f64::from_ne_bytes(slice.try_into().unwrap())),
                Type::Char => {
                    let end = slice.iter().position(|&b| b == 0).unwrap_or(slice.len());
                    Field::Char(String::from_utf8_lossy(&slice[..end]).into_owned())
                }
            };
            fields.push(field);
        }
        Ok(Tuple::new(fields))
    }
}

/// An ordered sequence of typed fields. A tuple's shape is only meaningful
/// relative to a `TupleDesc`; it carries no schema of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    fields: Vec<Field>,
}

impl Tuple {
    pub fn new(fields: Vec<Field>) -> Self {
        Tuple { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, i: usize) -> &Field {
        &self.fields[i]
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field_type(&self, i: usize) -> Type {
        self.fields[i].field_type()
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", field)?;
        }
        write!(f, ")")
    }
}
