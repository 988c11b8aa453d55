// Compiles an aggregation pipeline into one parameterized Postgres query
// (plus a count query for the total). Lookup-derived expressions become
// correlated subqueries; the outer row_to_json keeps the result shape
// identical to the document interpreter.

use serde_json::Value;
use uuid::Uuid;

use super::{
    AggregateError, ComputedField, Expr, LookupStage, MatchStage, PageRequest, Pipeline,
    SortStage, Stage,
};

/// Typed bind parameter. The store layer binds each variant with its native
/// sqlx type so uuid and timestamp columns compare without casts.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Uuid(Uuid),
    Text(String),
    Int(i64),
    Bool(bool),
}

#[derive(Debug, Clone)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

fn to_param(value: &Value) -> SqlParam {
    match value {
        Value::String(s) => match s.parse::<Uuid>() {
            Ok(uuid) => SqlParam::Uuid(uuid),
            Err(_) => SqlParam::Text(s.clone()),
        },
        Value::Number(n) => SqlParam::Int(n.as_i64().unwrap_or_default()),
        Value::Bool(b) => SqlParam::Bool(*b),
        other => SqlParam::Text(other.to_string()),
    }
}

fn push(params: &mut Vec<SqlParam>, param: SqlParam) -> usize {
    params.push(param);
    params.len()
}

pub fn build_select(pipeline: &Pipeline, page: &PageRequest) -> Result<SqlQuery, AggregateError> {
    let plan = Plan::analyze(pipeline);
    let mut params = Vec::new();

    // Fragment order fixes the parameter numbering: select list, then
    // where clause, then limit/offset.
    let select_list = plan.select_sql(&mut params)?;
    let where_clause = plan.where_sql(&mut params);
    let order_clause = plan.order_sql();
    let limit_idx = push(&mut params, SqlParam::Int(i64::from(page.limit)));
    let offset_idx = push(&mut params, SqlParam::Int(page.offset() as i64));

    let sql = format!(
        "SELECT row_to_json(t) AS doc FROM (SELECT {} FROM \"{}\" base{}{} LIMIT ${} OFFSET ${}) t",
        select_list, plan.table, where_clause, order_clause, limit_idx, offset_idx
    );
    Ok(SqlQuery { sql, params })
}

pub fn build_count(pipeline: &Pipeline) -> Result<SqlQuery, AggregateError> {
    let plan = Plan::analyze(pipeline);
    let mut params = Vec::new();
    let where_clause = plan.where_sql(&mut params);
    let sql = format!(
        "SELECT count(*) AS total FROM \"{}\" base{}",
        plan.table, where_clause
    );
    Ok(SqlQuery { sql, params })
}

struct Plan<'a> {
    table: &'static str,
    matches: Vec<&'a MatchStage>,
    lookups: Vec<&'a LookupStage>,
    computed: Vec<&'a ComputedField>,
    sort: Option<&'a SortStage>,
    project: Option<&'a Vec<String>>,
}

impl<'a> Plan<'a> {
    fn analyze(pipeline: &'a Pipeline) -> Self {
        let mut plan = Plan {
            table: pipeline.collection.as_str(),
            matches: vec![],
            lookups: vec![],
            computed: vec![],
            sort: None,
            project: None,
        };
        for stage in &pipeline.stages {
            match stage {
                Stage::Match(m) => plan.matches.push(m),
                Stage::Lookup(l) => plan.lookups.push(l),
                Stage::AddFields(fields) => plan.computed.extend(fields.iter()),
                Stage::Sort(s) => plan.sort = Some(s),
                Stage::Project(paths) => plan.project = Some(paths),
            }
        }
        plan
    }

    fn lookup(&self, target: &str) -> Result<&'a LookupStage, AggregateError> {
        self.lookups
            .iter()
            .find(|l| l.target == target)
            .copied()
            .ok_or_else(|| AggregateError::UnknownField(target.to_string()))
    }

    fn computed(&self, name: &str) -> Option<&'a ComputedField> {
        self.computed.iter().find(|c| c.name == name).copied()
    }

    fn where_sql(&self, params: &mut Vec<SqlParam>) -> String {
        if self.matches.is_empty() {
            return String::new();
        }
        let conditions: Vec<String> = self
            .matches
            .iter()
            .map(|m| {
                let idx = push(params, to_param(&m.equals));
                format!("base.\"{}\" = ${}", m.field, idx)
            })
            .collect();
        format!(" WHERE {}", conditions.join(" AND "))
    }

    fn order_sql(&self) -> String {
        match self.sort {
            None => String::new(),
            Some(s) if s.field == "id" => {
                format!(" ORDER BY base.\"id\" {}", s.direction.to_sql())
            }
            Some(s) => format!(
                " ORDER BY base.\"{}\" {}, base.\"id\" ASC",
                s.field,
                s.direction.to_sql()
            ),
        }
    }

    fn select_sql(&self, params: &mut Vec<SqlParam>) -> Result<String, AggregateError> {
        let Some(paths) = self.project else {
            return Ok("base.*".to_string());
        };

        // Dotted paths group under their head in first-occurrence order:
        // "owner.username" + "owner.full_name" render as one object column.
        let mut items: Vec<(String, Vec<String>)> = vec![];
        for path in paths {
            match path.split_once('.') {
                Some((head, rest)) => {
                    if let Some(item) =
                        items.iter_mut().find(|(h, subs)| h == head && !subs.is_empty())
                    {
                        item.1.push(rest.to_string());
                    } else {
                        items.push((head.to_string(), vec![rest.to_string()]));
                    }
                }
                None => items.push((path.clone(), vec![])),
            }
        }

        let mut columns = Vec::with_capacity(items.len());
        for (head, subfields) in &items {
            if subfields.is_empty() {
                match self.computed(head) {
                    Some(field) => columns.push(self.expr_sql(head, &field.expr, params)?),
                    None => columns.push(format!("base.\"{}\" AS \"{}\"", head, head)),
                }
            } else {
                columns.push(self.first_object_sql(head, subfields)?);
            }
        }
        Ok(columns.join(", "))
    }

    fn expr_sql(
        &self,
        name: &str,
        expr: &Expr,
        params: &mut Vec<SqlParam>,
    ) -> Result<String, AggregateError> {
        match expr {
            Expr::Size(target) => {
                let lk = self.lookup(target)?;
                Ok(format!(
                    "(SELECT count(*) FROM \"{}\" j WHERE j.\"{}\" = base.\"{}\") AS \"{}\"",
                    lk.from.as_str(),
                    lk.foreign_field,
                    lk.local_field,
                    name
                ))
            }
            Expr::First(target) => {
                let lk = self.lookup(target)?;
                Ok(format!(
                    "(SELECT row_to_json(j) FROM \"{}\" j WHERE j.\"{}\" = base.\"{}\" LIMIT 1) AS \"{}\"",
                    lk.from.as_str(),
                    lk.foreign_field,
                    lk.local_field,
                    name
                ))
            }
            Expr::In { needle, path } => {
                let (target, key) = path
                    .split_once('.')
                    .ok_or_else(|| AggregateError::UnknownField(path.clone()))?;
                let lk = self.lookup(target)?;
                if needle.is_null() {
                    return Ok(format!("false AS \"{}\"", name));
                }
                let idx = push(params, to_param(needle));
                Ok(format!(
                    "EXISTS (SELECT 1 FROM \"{}\" j WHERE j.\"{}\" = base.\"{}\" AND j.\"{}\" = ${}) AS \"{}\"",
                    lk.from.as_str(),
                    lk.foreign_field,
                    lk.local_field,
                    key,
                    idx,
                    name
                ))
            }
        }
    }

    /// A grouped projection over a first-match lookup renders as a
    /// json_build_object subquery limited to one row.
    fn first_object_sql(
        &self,
        head: &str,
        subfields: &[String],
    ) -> Result<String, AggregateError> {
        let field = self
            .computed(head)
            .ok_or_else(|| AggregateError::UnknownField(head.to_string()))?;
        let Expr::First(target) = &field.expr else {
            return Err(AggregateError::UnknownField(head.to_string()));
        };
        let lk = self.lookup(target)?;
        let pairs: Vec<String> = subfields
            .iter()
            .map(|f| format!("'{}', j.\"{}\"", f, f))
            .collect();
        Ok(format!(
            "(SELECT json_build_object({}) FROM \"{}\" j WHERE j.\"{}\" = base.\"{}\" LIMIT 1) AS \"{}\"",
            pairs.join(", "),
            lk.from.as_str(),
            lk.foreign_field,
            lk.local_field,
            head
        ))
    }
}
