//! Filter AST to SQL translation
//!
//! Walks the predicate tree and appends parameterized SQL. Operand typing
//! consults the route's introspected parameter types: numbers narrow to
//! integers for integer-family fields, and stringify for numeric/money
//! fields so exactness survives the trip (JSON numbers arrive as floats).

use pgway_filter::{Predicate, SortOrder, Value};
use pgway_protocol::{ParameterTypes, SqlParam};

use crate::builder::SqlBuilder;

/// Append the WHERE-clause SQL of a predicate
pub fn append_predicate(
    sql: &mut SqlBuilder,
    fts_function: &str,
    types: &ParameterTypes,
    predicate: &Predicate,
) {
    Sqlizer {
        sql,
        fts_function,
        types,
    }
    .predicate(predicate);
}

/// Append an ORDER BY list: quoted fields, ` DESC` when descending
pub fn append_sort_orders(sql: &mut SqlBuilder, orders: &[SortOrder]) {
    for (i, order) in orders.iter().enumerate() {
        if i > 0 {
            sql.push_sql(",");
        }
        sql.push_identifier(&order.field);
        if !order.ascending {
            sql.push_sql(" DESC");
        }
    }
}

struct Sqlizer<'a> {
    sql: &'a mut SqlBuilder,
    fts_function: &'a str,
    types: &'a ParameterTypes,
}

impl Sqlizer<'_> {
    fn predicate(&mut self, predicate: &Predicate) {
        match predicate {
            Predicate::Not(operand) => {
                self.sql.push_sql("(NOT ");
                self.predicate(operand);
                self.sql.push_sql(")");
            }
            Predicate::And(operands) => self.junction("AND", "true", operands),
            Predicate::Or(operands) => self.junction("OR", "false", operands),
            Predicate::Eq { field, values } => self.eq(field, values),
            Predicate::Lt { field, value } => self.comparison(field, "<", value),
            Predicate::Le { field, value } => self.comparison(field, "<=", value),
            Predicate::Gt { field, value } => self.comparison(field, ">", value),
            Predicate::Ge { field, value } => self.comparison(field, ">=", value),
            Predicate::Fts { field, query } => self.fts(field, query),
        }
    }

    fn junction(&mut self, operator: &str, identity: &str, operands: &[Predicate]) {
        self.sql.push_sql("(");
        if operands.is_empty() {
            self.sql.push_sql(identity);
        } else {
            for (i, operand) in operands.iter().enumerate() {
                if i > 0 {
                    self.sql.push_sql(" ");
                    self.sql.push_sql(operator);
                    self.sql.push_sql(" ");
                }
                self.predicate(operand);
            }
        }
        self.sql.push_sql(")");
    }

    fn comparison(&mut self, field: &str, operator: &str, value: &Value) {
        self.sql.push_identifier(field);
        self.sql.push_sql(operator);
        let operand = self.operand(field, value);
        self.sql.push_value(operand);
    }

    fn eq(&mut self, field: &str, values: &[Value]) {
        match values.len() {
            0 => self.sql.push_sql("false"),
            1 => {
                self.sql.push_identifier(field);
                if self.is_array_field(field) {
                    self.sql.push_sql("@>ARRAY[");
                    let operand = self.operand(field, &values[0]);
                    self.sql.push_value(operand);
                    self.sql.push_sql("]::");
                    self.push_declared_type(field);
                } else if values[0].is_null() {
                    self.sql.push_sql(" IS NULL");
                } else {
                    self.sql.push_sql("=");
                    let operand = self.operand(field, &values[0]);
                    self.sql.push_value(operand);
                }
            }
            _ => {
                self.sql.push_identifier(field);
                if self.is_array_field(field) {
                    self.sql.push_sql("&&ARRAY[");
                    for (i, value) in values.iter().enumerate() {
                        if i > 0 {
                            self.sql.push_sql(",");
                        }
                        let operand = self.operand(field, value);
                        self.sql.push_value(operand);
                    }
                    self.sql.push_sql("]::");
                    self.push_declared_type(field);
                } else {
                    let mut seen = 0;
                    let mut test_null = false;

                    for value in values {
                        if value.is_null() {
                            test_null = true;
                            continue;
                        }
                        self.sql
                            .push_sql(if seen == 0 { " IN (" } else { "," });
                        let operand = self.operand(field, value);
                        self.sql.push_value(operand);
                        seen += 1;
                    }
                    if seen > 0 {
                        self.sql.push_sql(")");
                    }

                    if test_null {
                        self.sql.push_sql(" OR ");
                        self.sql.push_identifier(field);
                        self.sql.push_sql(" IS NULL");
                    }
                }
            }
        }
    }

    fn fts(&mut self, field: &str, query: &str) {
        self.sql.push_identifier(field);
        self.sql.push_sql(" @@ ");
        self.sql.push_identifier(self.fts_function);
        self.sql.push_sql("(");
        self.sql.push_value(SqlParam::Text(query.to_string()));
        self.sql.push_sql(")");
    }

    fn is_array_field(&self, field: &str) -> bool {
        self.types.get(field).is_some_and(|t| t.is_array())
    }

    /// Cast target for array containment/overlap; introspection guarantees
    /// the name, so it appends as a trusted fragment
    fn push_declared_type(&mut self, field: &str) {
        if let Some(ty) = self.types.get(field) {
            self.sql.push_sql(&ty.name);
        }
    }

    fn operand(&self, field: &str, value: &Value) -> SqlParam {
        match value {
            Value::Null => SqlParam::Null,
            Value::Bool(b) => SqlParam::Bool(*b),
            Value::String(s) => SqlParam::Text(s.clone()),
            Value::Number(f) => match self.types.get(field).map(|t| t.name.as_str()) {
                Some(
                    "smallint" | "integer" | "bigint" | "smallint[]" | "integer[]" | "bigint[]",
                ) => SqlParam::Integer(*f as i64),
                Some("numeric" | "money" | "numeric[]" | "money[]") => {
                    // decimal string, never a binary float
                    SqlParam::Text(format!("{f}"))
                }
                _ => SqlParam::Float(*f),
            },
        }
    }
}
