//! MySQL / MariaDB dialect.

use super::{marker_out_of_scope, numeric_type, AlterClauses, Dialect};
use crate::ast::{
    Constraint, Expression, HashAlgorithm, IntervalUnit, SqlValue, UpdateStrategy,
};
use crate::builder::{
    AlterAction, CreateProcedure, CreateTable, CreateTrigger, DropKind, DropStatement,
    ProcedureParam, RenderContext, Returning, Scope,
};
use crate::error::{BuildError, Result};
use crate::schema::{ColumnDefinition, ColumnType};

/// Name of the implicit table-name parameter of trigger procedures.
const CURRENT_TABLE_PARAM: &str = "CURRENT_TABLE";

/// MySQL dialect: backtick quoting, `?` placeholders, no RETURNING.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "MySQL"
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn placeholder(&self, _index: usize) -> String {
        String::from("?")
    }

    fn regex_operator(&self) -> &'static str {
        "REGEXP"
    }

    fn inline_literal(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Text(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''")),
            other => other.to_sql_inline(),
        }
    }

    fn column_type(&self, column: &ColumnDefinition) -> String {
        let unsigned = |name: &str, unsigned: bool| {
            if unsigned {
                format!("{name} UNSIGNED")
            } else {
                String::from(name)
            }
        };
        match &column.column_type {
            ColumnType::Serial => String::from("INTEGER AUTO_INCREMENT"),
            ColumnType::String {
                max_length: Some(length),
            } => format!("VARCHAR({length})"),
            ColumnType::String { max_length: None } => String::from("TEXT"),
            ColumnType::Int { unsigned: u } => unsigned("INT", *u),
            ColumnType::BigInt { unsigned: u } => unsigned("BIGINT", *u),
            ColumnType::Bool => String::from("BOOLEAN"),
            ColumnType::Float => String::from("FLOAT"),
            ColumnType::Double => String::from("DOUBLE"),
            ColumnType::Numeric { total, decimals } => numeric_type(*total, *decimals),
            ColumnType::DateTime => String::from("DATETIME"),
            ColumnType::Json => String::from("LONGTEXT"),
            ColumnType::Enum { values } => {
                let values: Vec<String> = values
                    .iter()
                    .map(|value| self.inline_literal(&SqlValue::Text(value.clone())))
                    .collect();
                format!("ENUM({})", values.join(","))
            }
        }
    }

    // LONGTEXT and TEXT columns cannot carry a DEFAULT
    fn accepts_default(&self, column: &ColumnDefinition) -> bool {
        !matches!(
            column.column_type,
            ColumnType::Json | ColumnType::String { max_length: None }
        )
    }

    fn date_shift(&self, base: &str, amount: i64, unit: IntervalUnit) -> String {
        let function = if amount < 0 { "DATE_SUB" } else { "DATE_ADD" };
        format!(
            "{function}({base}, INTERVAL {} {})",
            amount.unsigned_abs(),
            unit.as_sql()
        )
    }

    fn json_array_agg(&self, argument: &str) -> String {
        format!("JSON_ARRAYAGG({argument})")
    }

    fn json_object_agg(&self, key: &str, value: &str) -> String {
        format!("JSON_OBJECTAGG({key}, {value})")
    }

    fn hash(&self, argument: &str, algorithm: HashAlgorithm) -> String {
        format!("SHA2({argument}, {})", algorithm.bits())
    }

    // OFFSET is only valid after a LIMIT.
    fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (limit, offset) {
            (Some(limit), Some(offset)) => format!(" LIMIT {limit} OFFSET {offset}"),
            (Some(limit), None) => format!(" LIMIT {limit}"),
            (None, Some(offset)) => format!(" LIMIT {} OFFSET {offset}", u64::MAX),
            (None, None) => String::new(),
        }
    }

    fn upsert_clause(&self, strategy: &UpdateStrategy, ctx: &mut RenderContext<'_>) -> Result<String> {
        let mut assignments = Vec::with_capacity(strategy.values.len());
        for (column, value) in &strategy.values {
            let column = self.quote_identifier(column);
            let value = match value {
                Expression::Column(source) => {
                    format!("VALUES({})", self.quote_identifier(source))
                }
                other => self.expression(other, ctx)?,
            };
            assignments.push(format!("{column}={value}"));
        }
        if assignments.is_empty() {
            // a no-op assignment keeps the existing row
            let Some(column) = strategy.conflicting_columns.first() else {
                return Err(BuildError::unsupported(
                    self.name(),
                    "ON DUPLICATE KEY UPDATE without columns",
                ));
            };
            let column = self.quote_identifier(column);
            assignments.push(format!("{column}={column}"));
        }
        Ok(format!(" ON DUPLICATE KEY UPDATE {}", assignments.join(", ")))
    }

    fn returning(&self, columns: &[String]) -> Result<(String, Returning)> {
        match columns {
            [] => Ok((String::new(), Returning::None)),
            [column] => Ok((String::new(), Returning::LastInsertId(column.clone()))),
            _ => Err(BuildError::unsupported(
                self.name(),
                format!("RETURNING {} columns", columns.len()),
            )),
        }
    }

    fn default_values(&self) -> &'static str {
        "() VALUES ()"
    }

    fn current_table(&self, ctx: &RenderContext<'_>) -> Result<String> {
        match ctx.scope() {
            Scope::Procedure(procedure) => {
                if procedure
                    .parameters()
                    .iter()
                    .any(|param| matches!(param, ProcedureParam::CurrentTable))
                {
                    Ok(String::from(CURRENT_TABLE_PARAM))
                } else {
                    Err(BuildError::UnknownParameter {
                        procedure: String::from(procedure.name()),
                        parameter: String::from(CURRENT_TABLE_PARAM),
                    })
                }
            }
            Scope::TriggerCall(trigger) => {
                Ok(self.inline_literal(&SqlValue::Text(String::from(trigger.table()))))
            }
            Scope::Statement => Err(marker_out_of_scope(self.name(), "CURRENT_TABLE")),
        }
    }

    fn current_column(&self, name: &str, ctx: &RenderContext<'_>) -> Result<String> {
        match ctx.scope() {
            Scope::Procedure(procedure) => match procedure.parameter(name) {
                Some(_) => Ok(String::from(name)),
                None => Err(BuildError::UnknownParameter {
                    procedure: String::from(procedure.name()),
                    parameter: String::from(name),
                }),
            },
            Scope::TriggerCall(trigger) => Ok(format!(
                "{}.{}",
                trigger.event().row_variable(),
                self.quote_identifier(name)
            )),
            Scope::Statement => Err(marker_out_of_scope(self.name(), "CURRENT_COLUMN")),
        }
    }

    fn create_table_prelude(&self, _table: &CreateTable) -> Vec<String> {
        Vec::new()
    }

    fn alter_action(&self, table: &str, action: &AlterAction) -> Result<AlterClauses> {
        let clause = match action {
            AlterAction::AddColumn(column) => {
                format!("ADD COLUMN {}", self.column_definition(column))
            }
            AlterAction::ModifyColumn(column) => {
                format!("MODIFY COLUMN {}", self.column_definition(column))
            }
            AlterAction::DropColumn(column) => {
                format!("DROP COLUMN {}", self.quote_identifier(column))
            }
            AlterAction::AddConstraint(constraint) => format!("ADD {}", self.constraint(constraint)),
            AlterAction::DropConstraint(constraint) => match (constraint, constraint.name()) {
                (Constraint::PrimaryKey { .. }, _) => String::from("DROP PRIMARY KEY"),
                (Constraint::Unique { .. }, Some(name)) => {
                    format!("DROP INDEX {}", self.quote_identifier(name))
                }
                (Constraint::ForeignKey { .. }, Some(name)) => {
                    format!("DROP FOREIGN KEY {}", self.quote_identifier(name))
                }
                (_, None) => {
                    return Err(BuildError::UnnamedConstraint {
                        table: String::from(table),
                    })
                }
            },
            AlterAction::ResetAutoIncrement => String::from("AUTO_INCREMENT = 1"),
            AlterAction::AddEnumValue { column, value } => {
                let ColumnType::Enum { values } = &column.column_type else {
                    return Err(BuildError::unsupported(
                        self.name(),
                        format!("adding an enum value to non-enum column '{}'", column.name),
                    ));
                };
                let mut values = values.clone();
                if !values.contains(value) {
                    values.push(value.clone());
                }
                let column = ColumnDefinition {
                    column_type: ColumnType::Enum { values },
                    ..column.clone()
                };
                format!("MODIFY COLUMN {}", self.column_definition(&column))
            }
        };
        Ok(AlterClauses::clause(clause))
    }

    fn create_procedure(&self, procedure: &CreateProcedure) -> Result<String> {
        let parameters: Vec<String> = procedure
            .parameters()
            .iter()
            .map(|param| match param {
                ProcedureParam::CurrentTable => {
                    format!("IN {CURRENT_TABLE_PARAM} VARCHAR(64)")
                }
                ProcedureParam::RowColumn(column) | ProcedureParam::Argument(column) => {
                    format!("IN {} {}", column.name, self.column_type(column))
                }
            })
            .collect();
        let body: String = self
            .procedure_body(procedure)?
            .into_iter()
            .map(|statement| format!("{statement}; "))
            .collect();
        Ok(format!(
            "CREATE PROCEDURE {}({}) BEGIN {body}END",
            self.quote_identifier(procedure.name()),
            parameters.join(", ")
        ))
    }

    fn create_trigger(&self, trigger: &CreateTrigger) -> Result<String> {
        let mut ctx = RenderContext::inline(Scope::TriggerCall(trigger));
        let arguments = self.expression_list(&trigger.arguments, &mut ctx)?;
        let if_not_exists = if trigger.if_not_exists {
            "IF NOT EXISTS "
        } else {
            ""
        };
        Ok(format!(
            "CREATE TRIGGER {if_not_exists}{} {} {} ON {} FOR EACH ROW CALL {}({arguments})",
            self.quote_identifier(&trigger.name),
            trigger.timing.as_sql(),
            trigger.event.as_sql(),
            self.quote_path(&trigger.table),
            self.quote_identifier(&trigger.procedure)
        ))
    }

    fn drop_statement(&self, statement: &DropStatement) -> String {
        let kind = match statement.kind {
            DropKind::Table => "TABLE",
            DropKind::Procedure => "PROCEDURE",
            DropKind::Trigger { .. } => "TRIGGER",
        };
        let if_exists = if statement.if_exists { "IF EXISTS " } else { "" };
        format!(
            "DROP {kind} {if_exists}{}",
            self.quote_path(&statement.name)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{col, val};
    use crate::builder::{Filtered, Insert, Select};

    #[test]
    fn test_placeholders_are_question_marks() {
        let query = Select::from("User")
            .where_eq("a", 1)
            .where_eq("b", 2)
            .build(&MySqlDialect)
            .unwrap();
        assert_eq!(query.sql, "SELECT * FROM `User` WHERE `a` = ? AND `b` = ?");
    }

    #[test]
    fn test_inline_literal_escapes_backslash() {
        assert_eq!(
            MySqlDialect.inline_literal(&SqlValue::Text(String::from(r"a\'b"))),
            r"'a\\''b'"
        );
    }

    #[test]
    fn test_date_shift() {
        let mut ctx = RenderContext::new();
        let future = Expression::CurrentTimestamp.shift(3, IntervalUnit::Day);
        let past = col("modified").shift(-2, IntervalUnit::Hour);
        assert_eq!(
            MySqlDialect.expression(&future, &mut ctx).unwrap(),
            "DATE_ADD(CURRENT_TIMESTAMP, INTERVAL 3 DAY)"
        );
        assert_eq!(
            MySqlDialect.expression(&past, &mut ctx).unwrap(),
            "DATE_SUB(`modified`, INTERVAL 2 HOUR)"
        );
    }

    #[test]
    fn test_json_object_agg_and_hash() {
        let query = Select::from("Setting")
            .expression(Expression::json_object_agg(col("name"), col("value")).alias("settings"))
            .expression(val("secret").hash(HashAlgorithm::Sha256).alias("digest"))
            .build(&MySqlDialect)
            .unwrap();
        assert_eq!(
            query.sql,
            "SELECT JSON_OBJECTAGG(`name`, `value`) AS `settings`, SHA2(?, 256) AS `digest` FROM `Setting`"
        );
        assert_eq!(query.params, vec![SqlValue::Text(String::from("secret"))]);
    }

    #[test]
    fn test_single_returning_column_uses_last_insert_id() {
        let query = Insert::into("User")
            .set("name", "a")
            .returning(["id"])
            .build(&MySqlDialect)
            .unwrap();
        assert_eq!(query.sql, "INSERT INTO `User` (`name`) VALUES (?)");
        assert_eq!(query.returning, Returning::LastInsertId(String::from("id")));
    }

    #[test]
    fn test_multiple_returning_columns_are_unsupported() {
        let result = Insert::into("User")
            .set("name", "a")
            .returning(["id", "name"])
            .build(&MySqlDialect);
        assert!(matches!(
            result,
            Err(BuildError::UnsupportedConstruct { dialect: "MySQL", .. })
        ));
    }

    #[test]
    fn test_text_columns_drop_default() {
        let column = ColumnDefinition::json("payload").nullable();
        assert_eq!(MySqlDialect.column_definition(&column), "`payload` LONGTEXT");
    }
}
