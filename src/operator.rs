//! Relational operators over in-memory tuple batches: projection, selection,
//! aggregation, and nested-loop join.
//!
//! Grounded on the original `Query.cpp` (`evaluateCondition`'s switch over
//! comparison ops, the grouped `aggregate` using a per-group running
//! `(sum, count)` pair and its degenerate-empty-input defaults, and `join`'s
//! nested loop with natural-join field de-duplication on equality), rewired
//! onto this crate's `Tuple`/`TupleDesc`/`Field` types.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::field::{Field, Type};
use crate::tuple::{Tuple, TupleDesc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    fn apply(&self, a: &Field, b: &Field) -> bool {
        match self {
            Op::Eq => a == b,
            Op::Ne => a != b,
            Op::Lt => matches!(a.partial_cmp(b), Some(std::cmp::Ordering::Less)),
            Op::Le => matches!(
                a.partial_cmp(b),
                Some(std::cmp::Ordering::Less) | Some(std::cmp::Ordering::Equal)
            ),
            Op::Gt => matches!(a.partial_cmp(b), Some(std::cmp::Ordering::Greater)),
            Op::Ge => matches!(
                a.partial_cmp(b),
                Some(std::cmp::Ordering::Greater) | Some(std::cmp::Ordering::Equal)
            ),
        }
    }
}

/// A single-field comparison against a constant: `tuple[field] OP value`.
pub struct Predicate {
    pub field: usize,
    pub op: Op,
    pub value: Field,
}

impl Predicate {
    pub fn new(field: usize, op: Op, value: Field) -> Self {
        Predicate { field, op, value }
    }

    pub fn evaluate(&self, tuple: &Tuple) -> bool {
        self.op.apply(tuple.field(self.field), &self.value)
    }
}

/// Returns the schema of `project`'s output: the named fields, in order.
pub fn project_schema(schema: &TupleDesc, fields: &[usize]) -> Result<TupleDesc> {
    let types = fields.iter().map(|&i| schema.field_type(i)).collect();
    let names = fields.iter().map(|&i| schema.name(i).to_string()).collect();
    TupleDesc::new(types, names)
}

pub fn project(tuple: &Tuple, fields: &[usize]) -> Tuple {
    Tuple::new(fields.iter().map(|&i| tuple.field(i).clone()).collect())
}

/// Keeps only the tuples matching `predicate`.
pub fn select<'a>(tuples: &'a [Tuple], predicate: &Predicate) -> Vec<&'a Tuple> {
    tuples.iter().filter(|t| predicate.evaluate(t)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggOp {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

impl AggOp {
    /// Output type for the *ungrouped* form: `Int` for COUNT, `Double` for
    /// AVG, and the aggregated field's own type for SUM/MIN/MAX.
    fn output_type(&self, input: Type) -> Type {
        match self {
            AggOp::Count => Type::Int,
            AggOp::Avg => Type::Double,
            AggOp::Sum | AggOp::Min | AggOp::Max => input,
        }
    }
}

/// An aggregate over `agg_field`, optionally grouped by `group_field`.
pub struct Aggregate {
    pub op: AggOp,
    pub agg_field: usize,
    pub group_field: Option<usize>,
}

impl Aggregate {
    pub fn new(op: AggOp, agg_field: usize, group_field: Option<usize>) -> Self {
        Aggregate { op, agg_field, group_field }
    }

    /// Output schema: `(group_field?, agg_field)`, the aggregate column
    /// named after `op`. A grouped aggregate always reports the aggregate
    /// column as `Double`, regardless of `op` or the source field's type;
    /// ungrouped, it follows `AggOp::output_type`.
    pub fn output_schema(&self, schema: &TupleDesc) -> Result<TupleDesc> {
        let mut types = Vec::new();
        let mut names = Vec::new();
        if let Some(g) = self.group_field {
            Self::check_groupable(schema.field_type(g))?;
            types.push(schema.field_type(g));
            names.push(schema.name(g).to_string());
            types.push(Type::Double);
        } else {
            types.push(self.op.output_type(schema.field_type(self.agg_field)));
        }
        names.push(format!("{:?}", self.op).to_lowercase());
        TupleDesc::new(types, names)
    }

    /// `Field`'s `Hash`/`Eq` panic on `Double` (it is not a legal group key),
    /// so a `Double` group field must be rejected here before any tuple's
    /// group value is ever hashed.
    fn check_groupable(group_type: Type) -> Result<()> {
        if group_type == Type::Double {
            return Err(Error::TypeMismatch("aggregate group field cannot be Double".into()));
        }
        Ok(())
    }

    /// Runs the aggregate. With no `group_field`, always emits exactly one
    /// row (COUNT and SUM default to 0 over empty input; AVG/MIN/MAX default
    /// to 0.0). With a `group_field`, emits one row per distinct group value
    /// seen, or zero rows if the input is empty.
    pub fn compute(&self, schema: &TupleDesc, tuples: &[Tuple]) -> Result<Vec<Tuple>> {
        match self.group_field {
            None => {
                let source_type = schema.field_type(self.agg_field);
                let (sum, count, min, max) = self.fold(tuples.iter())?;
                let value = self.finalize(sum, count, min, max, source_type);
                Ok(vec![Tuple::new(vec![value])])
            }
            Some(g) => {
                Self::check_groupable(schema.field_type(g))?;
                let mut groups: HashMap<Field, Vec<&Tuple>> = HashMap::new();
                let mut order: Vec<Field> = Vec::new();
                for t in tuples {
                    let key = t.field(g).clone();
                    if !groups.contains_key(&key) {
                        order.push(key.clone());
                    }
                    groups.entry(key).or_default().push(t);
                }
                let mut out = Vec::with_capacity(order.len());
                for key in order {
                    let members = &groups[&key];
                    let (sum, count, min, max) = self.fold(members.iter().copied())?;
                    let value = self.finalize(sum, count, min, max, Type::Double);
                    out.push(Tuple::new(vec![key, value]));
                }
                Ok(out)
            }
        }
    }

    fn fold<'a>(&self, tuples: impl Iterator<Item = &'a Tuple>) -> Result<(f64, i32, f64, f64)> {
        let mut sum = 0.0;
        let mut count = 0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for t in tuples {
            let v = t
                .field(self.agg_field)
                .as_f64()
                .ok_or_else(|| Error::TypeMismatch("aggregate field must be numeric".into()))?;
            sum += v;
            count += 1;
            min = min.min(v);
            max = max.max(v);
        }
        Ok((sum, count, min, max))
    }

    /// `source_type` is the aggregated field's declared type; SUM/MIN/MAX
    /// mirror it in the output (per `AggOp::output_type`), AVG and COUNT
    /// ignore it.
    fn finalize(&self, sum: f64, count: i32, min: f64, max: f64, source_type: Type) -> Field {
        match self.op {
            AggOp::Count => Field::Int(count),
            AggOp::Avg => Field::Double(if count == 0 { 0.0 } else { sum / count as f64 }),
            AggOp::Sum => match source_type {
                Type::Int => Field::Int(sum as i32),
                _ => Field::Double(sum),
            },
            AggOp::Min => match source_type {
                Type::Int => Field::Int(if count == 0 { 0 } else { min as i32 }),
                _ => Field::Double(if count == 0 { 0.0 } else { min }),
            },
            AggOp::Max => match source_type {
                Type::Int => Field::Int(if count == 0 { 0 } else { max as i32 }),
                _ => Field::Double(if count == 0 { 0.0 } else { max }),
            },
        }
    }
}

/// A join condition `left[left_field] OP right[right_field]`.
pub struct JoinPredicate {
    pub left_field: usize,
    pub right_field: usize,
    pub op: Op,
}

impl JoinPredicate {
    pub fn new(left_field: usize, right_field: usize, op: Op) -> Self {
        JoinPredicate { left_field, right_field, op }
    }

    /// True when this is an equality join on two identically-named fields,
    /// in which case the output keeps only one copy of the shared column.
    fn is_natural(&self, left: &TupleDesc, right: &TupleDesc) -> bool {
        self.op == Op::Eq && left.name(self.left_field) == right.name(self.right_field)
    }
}

pub fn join_schema(left: &TupleDesc, right: &TupleDesc, predicate: &JoinPredicate) -> Result<TupleDesc> {
    if predicate.is_natural(left, right) {
        let keep: Vec<usize> = (0..right.len()).filter(|&i| i != predicate.right_field).collect();
        let right_trimmed = project_schema(right, &keep)?;
        TupleDesc::merge(left, &right_trimmed)
    } else {
        TupleDesc::merge(left, right)
    }
}

/// Nested-loop join: for every `(l, r)` pair satisfying `predicate`, emits
/// the concatenation of `l` and `r` (dropping `r`'s copy of the join field
/// when the predicate is a natural equi-join).
pub fn join(left: &[Tuple], right: &[Tuple], left_schema: &TupleDesc, right_schema: &TupleDesc, predicate: &JoinPredicate) -> Vec<Tuple> {
    let natural = predicate.is_natural(left_schema, right_schema);
    let keep: Vec<usize> = if natural {
        (0..right_schema.len()).filter(|&i| i != predicate.right_field).collect()
    } else {
        (0..right_schema.len()).collect()
    };

    let mut out = Vec::new();
    for l in left {
        for r in right {
            if predicate.op.apply(l.field(predicate.left_field), r.field(predicate.right_field)) {
                let mut fields = l.fields().to_vec();
                fields.extend(keep.iter().map(|&i| r.field(i).clone()));
                out.push(Tuple::new(fields));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Type;

    fn schema() -> TupleDesc {
        TupleDesc::new(vec![Type::Int, Type::Int], vec!["id", "value"]).unwrap()
    }

    fn row(id: i32, value: i32) -> Tuple {
        Tuple::new(vec![Field::Int(id), Field::Int(value)])
    }

    #[test]
    fn selection_filters_by_comparison() {
        let rows = vec![row(1, 10), row(2, 20), row(3, 30)];
        let pred = Predicate::new(1, Op::Gt, Field::Int(15));
        let matched: Vec<i32> = select(&rows, &pred).iter().map(|t| t.field(0).as_int().unwrap()).collect();
        assert_eq!(matched, vec![2, 3]);
    }

    #[test]
    fn projection_reorders_and_drops_fields() {
        let t = row(1, 99);
        let projected = project(&t, &[1, 0]);
        assert_eq!(projected.field(0).as_int(), Some(99));
        assert_eq!(projected.field(1).as_int(), Some(1));
    }

    #[test]
    fn ungrouped_count_and_sum_default_to_zero_on_empty_input() {
        let rows: Vec<Tuple> = vec![];
        let count = Aggregate::new(AggOp::Count, 1, None).compute(&schema(), &rows).unwrap();
        assert_eq!(count[0].field(0).as_int(), Some(0));
        let sum = Aggregate::new(AggOp::Sum, 1, None).compute(&schema(), &rows).unwrap();
        assert_eq!(sum[0].field(0).as_f64(), Some(0.0));
    }

    #[test]
    fn ungrouped_sum_over_an_int_field_stays_int_typed() {
        let rows = vec![row(1, 10), row(2, 20), row(3, 30)];
        let aggregate = Aggregate::new(AggOp::Sum, 1, None);
        let out_schema = aggregate.output_schema(&schema()).unwrap();
        assert_eq!(out_schema.field_type(0), Type::Int);
        let out = aggregate.compute(&schema(), &rows).unwrap();
        assert_eq!(out[0].field(0).as_int(), Some(60));
    }

    #[test]
    fn grouped_average_computes_per_group_means() {
        let rows = vec![row(1, 10), row(1, 20), row(2, 100)];
        let out = Aggregate::new(AggOp::Avg, 1, Some(0)).compute(&schema(), &rows).unwrap();
        let as_map: HashMap<i32, f64> = out
            .iter()
            .map(|t| (t.field(0).as_int().unwrap(), t.field(1).as_f64().unwrap()))
            .collect();
        assert_eq!(as_map[&1], 15.0);
        assert_eq!(as_map[&2], 100.0);
    }

    #[test]
    fn grouped_aggregate_over_empty_input_yields_no_rows() {
        let rows: Vec<Tuple> = vec![];
        let out = Aggregate::new(AggOp::Sum, 1, Some(0)).compute(&schema(), &rows).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn grouped_sum_rejects_a_double_group_field() {
        let double_schema = TupleDesc::new(vec![Type::Double, Type::Int], vec!["g", "v"]).unwrap();
        let rows = vec![Tuple::new(vec![Field::Double(1.0), Field::Int(10)])];
        let aggregate = Aggregate::new(AggOp::Sum, 1, Some(0));
        assert!(aggregate.output_schema(&double_schema).is_err());
        assert!(aggregate.compute(&double_schema, &rows).is_err());
    }

    #[test]
    fn natural_join_drops_duplicate_key_column() {
        let left_schema = TupleDesc::new(vec![Type::Int, Type::Int], vec!["id", "a"]).unwrap();
        let right_schema = TupleDesc::new(vec![Type::Int, Type::Int], vec!["id", "b"]).unwrap();
        let predicate = JoinPredicate::new(0, 0, Op::Eq);

        let left = vec![Tuple::new(vec![Field::Int(1), Field::Int(11)])];
        let right = vec![Tuple::new(vec![Field::Int(1), Field::Int(99)])];

        let out_schema = join_schema(&left_schema, &right_schema, &predicate).unwrap();
        assert_eq!(out_schema.len(), 3); // id, a, b -- not id, a, id, b

        let out = join(&left, &right, &left_schema, &right_schema, &predicate);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 3);
        assert_eq!(out[0].field(2).as_int(), Some(99));
    }
}
