// Document interpreter for aggregation pipelines. Runs the same closed
// stage vocabulary the SQL generator compiles, over plain JSON documents,
// so the in-memory backend observes identical semantics.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::{
    AggregateError, Collection, ComputedField, Expr, LookupStage, MatchStage, Page, PageRequest,
    Pipeline, SortDirection, SortStage, Stage,
};

/// Read access to the collections a lookup stage may join against.
pub trait CollectionSource {
    fn documents(&self, collection: Collection) -> Vec<Value>;
}

pub fn execute<S: CollectionSource>(
    source: &S,
    pipeline: &Pipeline,
    page: &PageRequest,
) -> Result<Page<Value>, AggregateError> {
    let mut docs = source.documents(pipeline.collection);
    for stage in &pipeline.stages {
        docs = apply_stage(source, docs, stage)?;
    }

    let total = docs.len() as u64;
    let offset = page.offset() as usize;
    let items: Vec<Value> = docs.into_iter().skip(offset).take(page.limit as usize).collect();
    Ok(Page::from_parts(items, total, page))
}

pub fn apply_stage<S: CollectionSource>(
    source: &S,
    docs: Vec<Value>,
    stage: &Stage,
) -> Result<Vec<Value>, AggregateError> {
    match stage {
        Stage::Match(m) => Ok(apply_match(docs, m)),
        Stage::Lookup(l) => Ok(apply_lookup(source, docs, l)),
        Stage::AddFields(fields) => apply_add_fields(docs, fields),
        Stage::Sort(s) => Ok(apply_sort(docs, s)),
        Stage::Project(paths) => Ok(apply_project(docs, paths)),
    }
}

fn apply_match(docs: Vec<Value>, m: &MatchStage) -> Vec<Value> {
    docs.into_iter()
        .filter(|doc| doc.get(&m.field) == Some(&m.equals))
        .collect()
}

fn apply_lookup<S: CollectionSource>(source: &S, docs: Vec<Value>, l: &LookupStage) -> Vec<Value> {
    let foreign = source.documents(l.from);
    docs.into_iter()
        .map(|mut doc| {
            let local = doc.get(&l.local_field).cloned().unwrap_or(Value::Null);
            let joined: Vec<Value> = if local.is_null() {
                vec![]
            } else {
                foreign
                    .iter()
                    .filter(|f| f.get(&l.foreign_field) == Some(&local))
                    .cloned()
                    .collect()
            };
            if let Value::Object(obj) = &mut doc {
                obj.insert(l.target.clone(), Value::Array(joined));
            }
            doc
        })
        .collect()
}

fn apply_add_fields(
    docs: Vec<Value>,
    fields: &[ComputedField],
) -> Result<Vec<Value>, AggregateError> {
    docs.into_iter()
        .map(|mut doc| {
            let mut computed = Vec::with_capacity(fields.len());
            for field in fields {
                computed.push((field.name.clone(), eval_expr(&doc, &field.expr)?));
            }
            if let Value::Object(obj) = &mut doc {
                for (name, value) in computed {
                    obj.insert(name, value);
                }
            }
            Ok(doc)
        })
        .collect()
}

fn eval_expr(doc: &Value, expr: &Expr) -> Result<Value, AggregateError> {
    match expr {
        Expr::Size(field) => {
            let array = doc
                .get(field)
                .and_then(Value::as_array)
                .ok_or_else(|| AggregateError::UnknownField(field.clone()))?;
            Ok(Value::from(array.len() as u64))
        }
        Expr::First(field) => {
            let array = doc
                .get(field)
                .and_then(Value::as_array)
                .ok_or_else(|| AggregateError::UnknownField(field.clone()))?;
            Ok(array.first().cloned().unwrap_or(Value::Null))
        }
        Expr::In { needle, path } => {
            if needle.is_null() {
                return Ok(Value::Bool(false));
            }
            let (field, key) = path
                .split_once('.')
                .ok_or_else(|| AggregateError::UnknownField(path.clone()))?;
            let array = doc
                .get(field)
                .and_then(Value::as_array)
                .ok_or_else(|| AggregateError::UnknownField(field.to_string()))?;
            Ok(Value::Bool(array.iter().any(|e| e.get(key) == Some(needle))))
        }
    }
}

fn apply_sort(mut docs: Vec<Value>, s: &SortStage) -> Vec<Value> {
    docs.sort_by(|a, b| {
        let primary = value_cmp(a.get(&s.field), b.get(&s.field));
        let primary = match s.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then_with(|| value_cmp(a.get("id"), b.get("id")))
    });
    docs
}

/// Value ordering for sort stages. RFC 3339 strings are compared as
/// timestamps: the serialized form has varying subsecond width, which
/// plain string comparison would misorder.
fn value_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (
                chrono::DateTime::parse_from_rfc3339(x),
                chrono::DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(tx), Ok(ty)) => tx.cmp(&ty),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

fn apply_project(docs: Vec<Value>, paths: &[String]) -> Vec<Value> {
    docs.into_iter()
        .map(|doc| {
            let mut out = Map::new();
            for path in paths {
                match path.split_once('.') {
                    None => {
                        if let Some(value) = doc.get(path) {
                            out.insert(path.clone(), value.clone());
                        }
                    }
                    Some((head, rest)) => {
                        if let Some(value) = doc.get(head).and_then(|h| h.get(rest)) {
                            let entry = out
                                .entry(head.to_string())
                                .or_insert_with(|| Value::Object(Map::new()));
                            if let Value::Object(nested) = entry {
                                nested.insert(rest.to_string(), value.clone());
                            }
                        }
                    }
                }
            }
            Value::Object(out)
        })
        .collect()
}
