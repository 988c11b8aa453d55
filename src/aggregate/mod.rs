// Declarative aggregation pipelines: the closed vocabulary of query stages
// the resource-store boundary executes. A pipeline is a plain value, so each
// stage's contract is testable on its own in both backends (the document
// interpreter in `eval` and the SQL generator in `sql`).

pub mod eval;
pub mod page;
pub mod sql;

use serde_json::Value;
use thiserror::Error;

pub use page::{Page, PageError, PageLimits, PageRequest};

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("unknown pipeline field: {0}")]
    UnknownField(String),

    #[error("view decode failed: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Videos,
    Comments,
    Tweets,
    Likes,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Videos => "videos",
            Collection::Comments => "comments",
            Collection::Tweets => "tweets",
            Collection::Likes => "likes",
        }
    }
}

/// Scope the pipeline to documents whose `field` equals `equals`.
#[derive(Debug, Clone)]
pub struct MatchStage {
    pub field: String,
    pub equals: Value,
}

/// Left-join documents from another collection into an array field.
#[derive(Debug, Clone)]
pub struct LookupStage {
    pub from: Collection,
    pub local_field: String,
    pub foreign_field: String,
    pub target: String,
}

#[derive(Debug, Clone)]
pub struct ComputedField {
    pub name: String,
    pub expr: Expr,
}

impl ComputedField {
    pub fn new(name: impl Into<String>, expr: Expr) -> Self {
        Self { name: name.into(), expr }
    }
}

/// Expressions over joined array fields.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Cardinality of a joined array field.
    Size(String),
    /// First element of a joined array field (single-record resolution).
    First(String),
    /// Membership test: does `needle` appear at `path` ("array.field")
    /// across the joined documents. A null needle is never a member.
    In { needle: Value, path: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Deterministic ordering; both backends break ties on `id`.
#[derive(Debug, Clone)]
pub struct SortStage {
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone)]
pub enum Stage {
    Match(MatchStage),
    Lookup(LookupStage),
    AddFields(Vec<ComputedField>),
    Sort(SortStage),
    Project(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    pub collection: Collection,
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(collection: Collection) -> Self {
        Self { collection, stages: vec![] }
    }

    pub fn match_field(mut self, field: impl Into<String>, equals: Value) -> Self {
        self.stages.push(Stage::Match(MatchStage { field: field.into(), equals }));
        self
    }

    pub fn lookup(
        mut self,
        from: Collection,
        local_field: impl Into<String>,
        foreign_field: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.stages.push(Stage::Lookup(LookupStage {
            from,
            local_field: local_field.into(),
            foreign_field: foreign_field.into(),
            target: target.into(),
        }));
        self
    }

    pub fn add_fields(mut self, fields: Vec<ComputedField>) -> Self {
        self.stages.push(Stage::AddFields(fields));
        self
    }

    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.stages.push(Stage::Sort(SortStage { field: field.into(), direction }));
        self
    }

    pub fn project(mut self, fields: &[&str]) -> Self {
        self.stages.push(Stage::Project(fields.iter().map(|f| f.to_string()).collect()));
        self
    }
}
