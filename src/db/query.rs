//! Typed WHERE-clause builder for list queries.
//!
//! Column names are `&'static str` so only compile-time identifiers reach the
//! SQL text; every value travels as a bound parameter.

use rusqlite::types::ToSql;

#[derive(Default)]
pub struct FilterQuery {
    clauses: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl FilterQuery {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, clause: impl FnOnce(usize) -> String, value: Box<dyn ToSql>) -> Self {
        self.params.push(value);
        let idx = self.params.len();
        self.clauses.push(clause(idx));
        self
    }

    /// `column = value`, skipped when `value` is `None`.
    pub fn eq<T: ToSql + 'static>(self, column: &'static str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.push(|i| format!("{column} = ?{i}"), Box::new(v)),
            None => self,
        }
    }

    /// `column >= value`, skipped when `value` is `None`.
    pub fn gte<T: ToSql + 'static>(self, column: &'static str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.push(|i| format!("{column} >= ?{i}"), Box::new(v)),
            None => self,
        }
    }

    /// `column < value`, skipped when `value` is `None`.
    pub fn lt<T: ToSql + 'static>(self, column: &'static str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.push(|i| format!("{column} < ?{i}"), Box::new(v)),
            None => self,
        }
    }

    /// Case-insensitive substring match on any of `columns`. `%`, `_` and
    /// `\` in the needle match literally.
    pub fn any_like(self, columns: &[&'static str], needle: Option<&str>) -> Self {
        let needle = match needle.map(str::trim) {
            Some(n) if !n.is_empty() && !columns.is_empty() => n,
            _ => return self,
        };
        let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
        self.push(
            |i| {
                let ors: Vec<String> = columns
                    .iter()
                    .map(|c| format!("LOWER({c}) LIKE ?{i} ESCAPE '\\'"))
                    .collect();
                format!("({})", ors.join(" OR "))
            },
            Box::new(pattern),
        )
    }

    /// Hide soft-deleted rows unless `include_deleted` is set.
    pub fn not_deleted(mut self, column: &'static str, include_deleted: bool) -> Self {
        if !include_deleted {
            self.clauses.push(format!("{column} = 0"));
        }
        self
    }

    pub fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn param_refs(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
