//! SQL dialects.
//!
//! The [`Dialect`] trait renders the closed expression, condition and
//! statement trees. Rendering of every node is a provided method matching
//! exhaustively; backend differences are the required hooks.

mod mysql;
mod postgres;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;

use crate::ast::{
    CompareOp, Condition, Constraint, Expression, HashAlgorithm, InCandidates, IntervalUnit,
    SqlValue,
    UpdateStrategy,
};
use crate::builder::{
    AlterAction, AlterTable, CreateProcedure, CreateTable, CreateTrigger, Delete, DropStatement,
    Insert, Join, RenderContext, Returning, Scope, Select, Statement, TableRef, Truncate, Update,
};
use crate::error::{BuildError, Result};
use crate::schema::{ColumnDefinition, DefaultValue};

/// SQL produced by one ALTER TABLE action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlterClauses {
    /// Statements that must run before the ALTER TABLE.
    pub before: Vec<String>,
    /// Clauses of the ALTER TABLE statement itself.
    pub clauses: Vec<String>,
    /// Statements that must run after the ALTER TABLE.
    pub after: Vec<String>,
}

impl AlterClauses {
    #[must_use]
    pub fn clause(clause: String) -> Self {
        Self {
            clauses: vec![clause],
            ..Self::default()
        }
    }
}

/// Trait for dialect-specific SQL generation.
pub trait Dialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Identifier quote character.
    fn quote_char(&self) -> char;

    /// Placeholder for the parameter at 1-based `index`.
    fn placeholder(&self, index: usize) -> String;

    /// Operator of a regular-expression match.
    fn regex_operator(&self) -> &'static str;

    /// Concrete type name of a column.
    fn column_type(&self, column: &ColumnDefinition) -> String;

    /// `base` shifted by `amount` units.
    fn date_shift(&self, base: &str, amount: i64, unit: IntervalUnit) -> String;

    /// JSON array aggregate over an already rendered argument.
    fn json_array_agg(&self, argument: &str) -> String;

    /// JSON object aggregate over already rendered key and value.
    fn json_object_agg(&self, key: &str, value: &str) -> String;

    /// Hex digest of an already rendered argument.
    fn hash(&self, argument: &str, algorithm: HashAlgorithm) -> String;

    /// Conflict clause of an INSERT, including its leading space.
    ///
    /// # Errors
    ///
    /// A strategy the backend cannot express.
    fn upsert_clause(&self, strategy: &UpdateStrategy, ctx: &mut RenderContext<'_>) -> Result<String>;

    /// RETURNING clause (with leading space) and how the keys come back.
    ///
    /// # Errors
    ///
    /// A column list the backend cannot return.
    fn returning(&self, columns: &[String]) -> Result<(String, Returning)>;

    /// What follows the table name in an INSERT without columns.
    fn default_values(&self) -> &'static str;

    /// Renders the current-table marker in the active scope.
    ///
    /// # Errors
    ///
    /// The marker is used outside a procedure or trigger, or the procedure
    /// does not declare it.
    fn current_table(&self, ctx: &RenderContext<'_>) -> Result<String>;

    /// Renders the current-column marker in the active scope.
    ///
    /// # Errors
    ///
    /// As [`Dialect::current_table`], plus unknown parameters.
    fn current_column(&self, name: &str, ctx: &RenderContext<'_>) -> Result<String>;

    /// Statements that must run before a CREATE TABLE.
    fn create_table_prelude(&self, table: &CreateTable) -> Vec<String>;

    /// SQL for one ALTER TABLE action.
    ///
    /// # Errors
    ///
    /// An action the backend cannot express.
    fn alter_action(&self, table: &str, action: &AlterAction) -> Result<AlterClauses>;

    /// CREATE PROCEDURE statement.
    ///
    /// # Errors
    ///
    /// Any error raised while rendering the body.
    fn create_procedure(&self, procedure: &CreateProcedure) -> Result<String>;

    /// CREATE TRIGGER statement.
    ///
    /// # Errors
    ///
    /// An argument the backend cannot pass to the procedure.
    fn create_trigger(&self, trigger: &CreateTrigger) -> Result<String>;

    /// DROP statement.
    fn drop_statement(&self, statement: &DropStatement) -> String;

    /// LIMIT and OFFSET clauses, including the leading space.
    fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        let mut sql = String::new();
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        sql
    }

    /// Quotes one identifier, doubling embedded quote characters.
    fn quote_identifier(&self, name: &str) -> String {
        if name == "*" {
            return String::from("*");
        }
        let quote = self.quote_char();
        let escaped = name.replace(quote, &format!("{quote}{quote}"));
        format!("{quote}{escaped}{quote}")
    }

    /// Quotes every part of a dotted name.
    fn quote_path(&self, path: &str) -> String {
        path.split('.')
            .map(|part| self.quote_identifier(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn quote_table(&self, table: &TableRef) -> String {
        match &table.alias {
            Some(alias) => format!(
                "{} {}",
                self.quote_path(&table.name),
                self.quote_identifier(alias)
            ),
            None => self.quote_path(&table.name),
        }
    }

    /// Escaped literal for inlined values.
    fn inline_literal(&self, value: &SqlValue) -> String {
        value.to_sql_inline()
    }

    /// Binds a value: a placeholder normally, a literal in inline contexts.
    fn bind(&self, value: &SqlValue, ctx: &mut RenderContext<'_>) -> String {
        if ctx.is_inline() {
            self.inline_literal(value)
        } else {
            let index = ctx.push(value.clone());
            self.placeholder(index)
        }
    }

    /// Renders an expression.
    ///
    /// # Errors
    ///
    /// Empty argument lists and markers unsupported in the active scope.
    fn expression(&self, expression: &Expression, ctx: &mut RenderContext<'_>) -> Result<String> {
        match expression {
            Expression::Column(name) => Ok(self.quote_path(name)),
            Expression::Value(value) => Ok(self.bind(value, ctx)),
            Expression::Raw(sql) => Ok(sql.clone()),
            Expression::CurrentTimestamp => Ok(String::from("CURRENT_TIMESTAMP")),
            Expression::Arithmetic { left, op, right } => {
                let left = self.operand(left, ctx)?;
                let right = self.operand(right, ctx)?;
                Ok(format!("{left} {} {right}", op.as_sql()))
            }
            Expression::CaseWhen {
                condition,
                then,
                otherwise,
            } => {
                let condition = self.condition(condition, ctx)?;
                let then = self.expression(then, ctx)?;
                let otherwise = self.expression(otherwise, ctx)?;
                Ok(format!("CASE WHEN {condition} THEN {then} ELSE {otherwise} END"))
            }
            Expression::Aggregate { function, argument } => {
                let argument = match argument {
                    Some(argument) => self.expression(argument, ctx)?,
                    None => String::from("*"),
                };
                Ok(format!("{}({argument})", function.as_sql()))
            }
            Expression::Coalesce(arguments) => {
                if arguments.is_empty() {
                    return Err(BuildError::EmptyGroup("COALESCE"));
                }
                let arguments = self.expression_list(arguments, ctx)?;
                Ok(format!("COALESCE({arguments})"))
            }
            Expression::DateShift { base, amount, unit } => {
                let base = self.expression(base, ctx)?;
                Ok(self.date_shift(&base, *amount, *unit))
            }
            Expression::JsonArrayAgg(argument) => {
                let argument = self.expression(argument, ctx)?;
                Ok(self.json_array_agg(&argument))
            }
            Expression::JsonObjectAgg { key, value } => {
                let key = self.expression(key, ctx)?;
                let value = self.expression(value, ctx)?;
                Ok(self.json_object_agg(&key, &value))
            }
            Expression::Hash {
                argument,
                algorithm,
            } => {
                let argument = self.expression(argument, ctx)?;
                Ok(self.hash(&argument, *algorithm))
            }
            Expression::Alias { expression, alias } => {
                let expression = self.expression(expression, ctx)?;
                Ok(format!("{expression} AS {}", self.quote_identifier(alias)))
            }
            Expression::Subquery(select) => Ok(format!("({})", self.select(select, ctx)?)),
            Expression::CurrentTable => self.current_table(ctx),
            Expression::CurrentColumn(name) => self.current_column(name, ctx),
        }
    }

    /// Renders an arithmetic operand, parenthesizing nested arithmetic.
    ///
    /// # Errors
    ///
    /// As [`Dialect::expression`].
    fn operand(&self, expression: &Expression, ctx: &mut RenderContext<'_>) -> Result<String> {
        let rendered = self.expression(expression, ctx)?;
        if matches!(expression, Expression::Arithmetic { .. }) {
            Ok(format!("({rendered})"))
        } else {
            Ok(rendered)
        }
    }

    /// Comma-separated expressions.
    ///
    /// # Errors
    ///
    /// As [`Dialect::expression`].
    fn expression_list(&self, expressions: &[Expression], ctx: &mut RenderContext<'_>) -> Result<String> {
        let mut rendered = Vec::with_capacity(expressions.len());
        for expression in expressions {
            rendered.push(self.expression(expression, ctx)?);
        }
        Ok(rendered.join(", "))
    }

    /// Renders a condition.
    ///
    /// # Errors
    ///
    /// [`BuildError::EmptyInList`], [`BuildError::EmptyGroup`], or any
    /// expression error.
    fn condition(&self, condition: &Condition, ctx: &mut RenderContext<'_>) -> Result<String> {
        match condition {
            Condition::Compare { left, op, right } => {
                let left = self.expression(left, ctx)?;
                match (op, right) {
                    (CompareOp::Eq, Expression::Value(SqlValue::Null)) => {
                        Ok(format!("{left} IS NULL"))
                    }
                    (CompareOp::Ne, Expression::Value(SqlValue::Null)) => {
                        Ok(format!("{left} IS NOT NULL"))
                    }
                    _ => {
                        let right = self.expression(right, ctx)?;
                        Ok(format!("{left} {} {right}", op.as_sql()))
                    }
                }
            }
            Condition::And(conditions) => self.condition_group(conditions, "AND", ctx),
            Condition::Or(conditions) => self.condition_group(conditions, "OR", ctx),
            Condition::Not(inner) => {
                let rendered = self.condition(inner, ctx)?;
                if matches!(**inner, Condition::And(_) | Condition::Or(_)) {
                    Ok(format!("NOT {rendered}"))
                } else {
                    Ok(format!("NOT ({rendered})"))
                }
            }
            Condition::IsNull {
                expression,
                negated,
            } => {
                let expression = self.expression(expression, ctx)?;
                let not = if *negated { "NOT " } else { "" };
                Ok(format!("{expression} IS {not}NULL"))
            }
            Condition::Like {
                expression,
                pattern,
                negated,
            } => {
                let expression = self.expression(expression, ctx)?;
                let pattern = self.expression(pattern, ctx)?;
                let not = if *negated { "NOT " } else { "" };
                Ok(format!("{expression} {not}LIKE {pattern}"))
            }
            Condition::Regex {
                expression,
                pattern,
            } => {
                let expression = self.expression(expression, ctx)?;
                let pattern = self.expression(pattern, ctx)?;
                Ok(format!("{expression} {} {pattern}", self.regex_operator()))
            }
            Condition::In {
                needle,
                candidates,
                negated,
            } => {
                if matches!(candidates, InCandidates::List(list) if list.is_empty()) {
                    return Err(BuildError::EmptyInList);
                }
                let needle = self.expression(needle, ctx)?;
                let candidates = match candidates {
                    InCandidates::List(list) => self.expression_list(list, ctx)?,
                    InCandidates::Select(select) => self.select(select, ctx)?,
                };
                let not = if *negated { "NOT " } else { "" };
                Ok(format!("{needle} {not}IN ({candidates})"))
            }
            Condition::Exists(select) => Ok(format!("EXISTS ({})", self.select(select, ctx)?)),
            Condition::Bool(expression) => self.expression(expression, ctx),
        }
    }

    /// `(a AND b ...)`.
    ///
    /// # Errors
    ///
    /// [`BuildError::EmptyGroup`] for an empty group.
    fn condition_group(
        &self,
        conditions: &[Condition],
        operator: &'static str,
        ctx: &mut RenderContext<'_>,
    ) -> Result<String> {
        if conditions.is_empty() {
            return Err(BuildError::EmptyGroup(operator));
        }
        let mut rendered = Vec::with_capacity(conditions.len());
        for condition in conditions {
            rendered.push(self.condition(condition, ctx)?);
        }
        Ok(format!("({})", rendered.join(&format!(" {operator} "))))
    }

    /// A condition wrapped in parentheses unless it already is.
    ///
    /// # Errors
    ///
    /// As [`Dialect::condition`].
    fn enclosed_condition(&self, condition: &Condition, ctx: &mut RenderContext<'_>) -> Result<String> {
        let rendered = self.condition(condition, ctx)?;
        if matches!(condition, Condition::And(_) | Condition::Or(_)) {
            Ok(rendered)
        } else {
            Ok(format!("({rendered})"))
        }
    }

    /// ` WHERE a AND b`, or nothing without conditions.
    ///
    /// # Errors
    ///
    /// As [`Dialect::condition`].
    fn where_clause(&self, conditions: &[Condition], ctx: &mut RenderContext<'_>) -> Result<String> {
        self.predicate_clause("WHERE", conditions, ctx)
    }

    /// ` KEYWORD a AND b`, or nothing without conditions.
    ///
    /// # Errors
    ///
    /// As [`Dialect::condition`].
    fn predicate_clause(
        &self,
        keyword: &str,
        conditions: &[Condition],
        ctx: &mut RenderContext<'_>,
    ) -> Result<String> {
        if conditions.is_empty() {
            return Ok(String::new());
        }
        let mut rendered = Vec::with_capacity(conditions.len());
        for condition in conditions {
            rendered.push(self.condition(condition, ctx)?);
        }
        Ok(format!(" {keyword} {}", rendered.join(" AND ")))
    }

    /// ` TYPE JOIN table alias ON (condition)`.
    ///
    /// # Errors
    ///
    /// As [`Dialect::condition`].
    fn join(&self, join: &Join, ctx: &mut RenderContext<'_>) -> Result<String> {
        let on = self.enclosed_condition(&join.on, ctx)?;
        Ok(format!(
            " {} {} ON {on}",
            join.join_type.as_sql(),
            self.quote_table(&join.table)
        ))
    }

    /// Renders a SELECT.
    ///
    /// # Errors
    ///
    /// Any expression or condition error.
    fn select(&self, select: &Select, ctx: &mut RenderContext<'_>) -> Result<String> {
        let mut sql = String::from("SELECT ");
        if select.distinct {
            sql.push_str("DISTINCT ");
        }
        if select.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.expression_list(&select.columns, ctx)?);
        }
        sql.push_str(" FROM ");
        sql.push_str(&self.quote_table(&select.table));
        for join in &select.joins {
            sql.push_str(&self.join(join, ctx)?);
        }
        sql.push_str(&self.where_clause(&select.conditions, ctx)?);
        if !select.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.expression_list(&select.group_by, ctx)?);
        }
        sql.push_str(&self.predicate_clause("HAVING", &select.having, ctx)?);
        if !select.order_by.is_empty() {
            let mut orders = Vec::with_capacity(select.order_by.len());
            for (expression, order) in &select.order_by {
                orders.push(format!("{} {}", self.expression(expression, ctx)?, order.as_sql()));
            }
            sql.push_str(" ORDER BY ");
            sql.push_str(&orders.join(", "));
        }
        sql.push_str(&self.limit_clause(select.limit, select.offset));
        if select.for_update {
            sql.push_str(" FOR UPDATE");
        }
        Ok(sql)
    }

    /// Renders an INSERT.
    ///
    /// # Errors
    ///
    /// Empty or ragged rows, unsupported conflict or RETURNING clauses.
    fn insert(&self, insert: &Insert, ctx: &mut RenderContext<'_>) -> Result<String> {
        insert.validate()?;
        let mut sql = format!("INSERT INTO {}", self.quote_path(&insert.table));
        if insert.columns.is_empty() {
            if insert.rows.len() > 1 {
                return Err(BuildError::unsupported(
                    self.name(),
                    "multi-row INSERT without columns",
                ));
            }
            sql.push(' ');
            sql.push_str(self.default_values());
        } else {
            let columns: Vec<String> = insert
                .columns
                .iter()
                .map(|column| self.quote_identifier(column))
                .collect();
            let mut rows = Vec::with_capacity(insert.rows.len());
            for row in &insert.rows {
                rows.push(format!("({})", self.expression_list(row, ctx)?));
            }
            sql.push_str(&format!(" ({}) VALUES {}", columns.join(", "), rows.join(", ")));
        }
        if let Some(strategy) = &insert.on_conflict {
            sql.push_str(&self.upsert_clause(strategy, ctx)?);
        }
        let (returning, _) = self.returning(&insert.returning)?;
        sql.push_str(&returning);
        Ok(sql)
    }

    /// Renders an UPDATE.
    ///
    /// # Errors
    ///
    /// [`BuildError::EmptyUpdate`] or any expression or condition error.
    fn update(&self, update: &Update, ctx: &mut RenderContext<'_>) -> Result<String> {
        if update.assignments.is_empty() {
            return Err(BuildError::EmptyUpdate {
                table: update.table.clone(),
            });
        }
        let mut assignments = Vec::with_capacity(update.assignments.len());
        for (column, value) in &update.assignments {
            assignments.push(format!(
                "{} = {}",
                self.quote_identifier(column),
                self.expression(value, ctx)?
            ));
        }
        let where_clause = self.where_clause(&update.conditions, ctx)?;
        Ok(format!(
            "UPDATE {} SET {}{where_clause}",
            self.quote_path(&update.table),
            assignments.join(", ")
        ))
    }

    /// Renders a DELETE.
    ///
    /// # Errors
    ///
    /// Any condition error.
    fn delete(&self, delete: &Delete, ctx: &mut RenderContext<'_>) -> Result<String> {
        let where_clause = self.where_clause(&delete.conditions, ctx)?;
        Ok(format!(
            "DELETE FROM {}{where_clause}",
            self.quote_path(&delete.table)
        ))
    }

    fn truncate(&self, truncate: &Truncate) -> String {
        format!("TRUNCATE TABLE {}", self.quote_path(&truncate.table))
    }

    /// DEFAULT literal of a column.
    fn default_value(&self, value: &DefaultValue) -> String {
        match value {
            DefaultValue::Null => String::from("NULL"),
            DefaultValue::Boolean(b) => self.inline_literal(&SqlValue::Bool(*b)),
            DefaultValue::Integer(n) => n.to_string(),
            DefaultValue::Float(f) => f.to_string(),
            DefaultValue::String(s) => self.inline_literal(&SqlValue::Text(s.clone())),
            DefaultValue::CurrentTimestamp => String::from("CURRENT_TIMESTAMP"),
            DefaultValue::Expression(sql) => sql.clone(),
        }
    }

    /// Whether the column type accepts a DEFAULT clause.
    fn accepts_default(&self, _column: &ColumnDefinition) -> bool {
        true
    }

    /// `name TYPE[ NOT NULL][ DEFAULT value]`.
    fn column_definition(&self, column: &ColumnDefinition) -> String {
        let mut sql = format!(
            "{} {}",
            self.quote_identifier(&column.name),
            self.column_type(column)
        );
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        if self.accepts_default(column) {
            if let Some(default) = column.effective_default() {
                sql.push_str(" DEFAULT ");
                sql.push_str(&self.default_value(default));
            }
        }
        sql
    }

    fn quoted_columns(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|column| self.quote_identifier(column))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Table constraint clause.
    fn constraint(&self, constraint: &Constraint) -> String {
        let prefix = constraint
            .name()
            .map(|name| format!("CONSTRAINT {} ", self.quote_identifier(name)))
            .unwrap_or_default();
        match constraint {
            Constraint::PrimaryKey { columns, .. } => {
                format!("{prefix}PRIMARY KEY ({})", self.quoted_columns(columns))
            }
            Constraint::Unique { columns, .. } => {
                format!("{prefix}UNIQUE ({})", self.quoted_columns(columns))
            }
            Constraint::ForeignKey {
                column,
                references_table,
                references_column,
                on_delete,
                ..
            } => format!(
                "{prefix}FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
                self.quote_identifier(column),
                self.quote_path(references_table),
                self.quote_identifier(references_column),
                on_delete.as_sql()
            ),
        }
    }

    /// The CREATE TABLE statement itself.
    fn create_table(&self, table: &CreateTable) -> String {
        let mut parts: Vec<String> = table
            .columns
            .iter()
            .map(|column| self.column_definition(column))
            .collect();
        parts.extend(table.constraints.iter().map(|c| self.constraint(c)));
        let if_not_exists = if table.if_not_exists {
            "IF NOT EXISTS "
        } else {
            ""
        };
        format!(
            "CREATE TABLE {if_not_exists}{} ({})",
            self.quote_path(&table.name),
            parts.join(", ")
        )
    }

    /// Every statement of an ALTER TABLE, in execution order.
    ///
    /// # Errors
    ///
    /// Any action the backend cannot express.
    fn alter_table(&self, alter: &AlterTable) -> Result<Vec<String>> {
        let mut before = Vec::new();
        let mut clauses = Vec::new();
        let mut after = Vec::new();
        for action in &alter.actions {
            let parts = self.alter_action(&alter.table, action)?;
            before.extend(parts.before);
            clauses.extend(parts.clauses);
            after.extend(parts.after);
        }
        if !clauses.is_empty() {
            before.push(format!(
                "ALTER TABLE {} {}",
                self.quote_path(&alter.table),
                clauses.join(", ")
            ));
        }
        before.extend(after);
        Ok(before)
    }

    /// Renders any statement, possibly as several texts.
    ///
    /// # Errors
    ///
    /// Any error of the statement's own rendering.
    fn statement(&self, statement: &Statement, ctx: &mut RenderContext<'_>) -> Result<Vec<String>> {
        match statement {
            Statement::Select(select) => Ok(vec![self.select(select, ctx)?]),
            Statement::Insert(insert) => Ok(vec![self.insert(insert, ctx)?]),
            Statement::Update(update) => Ok(vec![self.update(update, ctx)?]),
            Statement::Delete(delete) => Ok(vec![self.delete(delete, ctx)?]),
            Statement::Truncate(truncate) => Ok(vec![self.truncate(truncate)]),
            Statement::Drop(drop) => Ok(vec![self.drop_statement(drop)]),
            Statement::CreateTable(table) => {
                let mut texts = self.create_table_prelude(table);
                texts.push(self.create_table(table));
                Ok(texts)
            }
            Statement::AlterTable(alter) => self.alter_table(alter),
            Statement::CreateProcedure(procedure) => Ok(vec![self.create_procedure(procedure)?]),
            Statement::CreateTrigger(trigger) => Ok(vec![self.create_trigger(trigger)?]),
            Statement::Raw(sql) => Ok(vec![sql.clone()]),
        }
    }

    /// Body statements of a procedure, values inlined.
    ///
    /// # Errors
    ///
    /// Any statement error, including unknown parameters.
    fn procedure_body(&self, procedure: &CreateProcedure) -> Result<Vec<String>> {
        let mut ctx = RenderContext::inline(Scope::Procedure(procedure));
        let mut texts = Vec::new();
        for statement in &procedure.body {
            texts.extend(self.statement(statement, &mut ctx)?);
        }
        Ok(texts)
    }
}

/// `NUMERIC`, `NUMERIC(t)` or `NUMERIC(t,d)`.
pub(crate) fn numeric_type(total: Option<u32>, decimals: Option<u32>) -> String {
    match (total, decimals) {
        (Some(total), Some(decimals)) => format!("NUMERIC({total},{decimals})"),
        (Some(total), None) => format!("NUMERIC({total})"),
        _ => String::from("NUMERIC"),
    }
}

/// Error for a marker used in an ordinary statement.
pub(crate) fn marker_out_of_scope(dialect: &'static str, marker: &str) -> BuildError {
    BuildError::unsupported(dialect, format!("{marker} outside a procedure or trigger"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::col;

    #[test]
    fn test_quote_identifier_escapes_quote_char() {
        assert_eq!(MySqlDialect.quote_identifier("we`ird"), "`we``ird`");
        assert_eq!(PostgresDialect.quote_identifier("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(PostgresDialect.quote_identifier("*"), "*");
    }

    #[test]
    fn test_quote_path_quotes_each_part() {
        assert_eq!(PostgresDialect.quote_path("User.name"), "\"User\".\"name\"");
        assert_eq!(MySqlDialect.quote_path("t1.*"), "`t1`.*");
    }

    #[test]
    fn test_quote_table_keeps_alias() {
        assert_eq!(
            PostgresDialect.quote_table(&TableRef::aliased("Group", "t1")),
            "\"Group\" \"t1\""
        );
    }

    #[test]
    fn test_nested_arithmetic_is_parenthesized() {
        let mut ctx = RenderContext::new();
        let expression = col("a").add(col("b")).mul(2);
        assert_eq!(
            MySqlDialect.expression(&expression, &mut ctx).unwrap(),
            "(`a` + `b`) * ?"
        );
    }

    #[test]
    fn test_numeric_type() {
        assert_eq!(numeric_type(Some(10), Some(2)), "NUMERIC(10,2)");
        assert_eq!(numeric_type(Some(10), None), "NUMERIC(10)");
        assert_eq!(numeric_type(None, None), "NUMERIC");
    }

    #[test]
    fn test_empty_group_is_rejected() {
        let mut ctx = RenderContext::new();
        assert_eq!(
            PostgresDialect.condition(&Condition::and([]), &mut ctx),
            Err(BuildError::EmptyGroup("AND"))
        );
        assert_eq!(
            PostgresDialect.expression(&Expression::Coalesce(vec![]), &mut ctx),
            Err(BuildError::EmptyGroup("COALESCE"))
        );
    }
}
