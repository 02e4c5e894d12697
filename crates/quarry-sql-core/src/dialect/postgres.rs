//! PostgreSQL dialect.

use super::{marker_out_of_scope, numeric_type, AlterClauses, Dialect};
use crate::ast::{
    Constraint, Expression, HashAlgorithm, IntervalUnit, SqlValue, UpdateStrategy,
};
use crate::builder::{
    AlterAction, CreateProcedure, CreateTable, CreateTrigger, DropKind, DropStatement,
    ProcedureParam, ProcedureReturn, RenderContext, Returning, Scope,
};
use crate::error::{BuildError, Result};
use crate::schema::{ColumnDefinition, ColumnType};

/// Parameter name standing for the table in non-trigger functions.
const CURRENT_TABLE_PARAM: &str = "current_table";

/// PostgreSQL dialect: double-quote quoting, `$n` placeholders, RETURNING.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Name of the enum type backing `column`.
    fn enum_type_name(&self, column: &str) -> String {
        self.quote_identifier(&format!("{column}_type"))
    }

    /// Guarded `CREATE TYPE ... AS ENUM` for an enum column.
    fn create_enum_type(&self, column: &ColumnDefinition) -> Option<String> {
        let ColumnType::Enum { values } = &column.column_type else {
            return None;
        };
        let values: Vec<String> = values
            .iter()
            .map(|value| self.inline_literal(&SqlValue::Text(value.clone())))
            .collect();
        Some(format!(
            "DO $$ BEGIN CREATE TYPE {} AS ENUM ({}); EXCEPTION WHEN duplicate_object THEN NULL; END $$",
            self.enum_type_name(&column.name),
            values.join(", ")
        ))
    }

    /// `ALTER COLUMN` clauses replacing a column definition.
    fn modify_column(&self, column: &ColumnDefinition) -> Vec<String> {
        let name = self.quote_identifier(&column.name);
        let column_type = self.column_type(column);
        let mut clauses = vec![format!(
            "ALTER COLUMN {name} TYPE {column_type} USING {name}::{column_type}"
        )];
        if column.nullable {
            clauses.push(format!("ALTER COLUMN {name} DROP NOT NULL"));
        } else {
            clauses.push(format!("ALTER COLUMN {name} SET NOT NULL"));
        }
        match column.effective_default() {
            Some(default) => clauses.push(format!(
                "ALTER COLUMN {name} SET DEFAULT {}",
                self.default_value(default)
            )),
            None => clauses.push(format!("ALTER COLUMN {name} DROP DEFAULT")),
        }
        clauses
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn quote_char(&self) -> char {
        '"'
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn regex_operator(&self) -> &'static str {
        "~"
    }

    fn inline_literal(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Blob(bytes) => {
                let hex: String = bytes.iter().map(|byte| format!("{byte:02x}")).collect();
                format!("'\\x{hex}'")
            }
            other => other.to_sql_inline(),
        }
    }

    fn column_type(&self, column: &ColumnDefinition) -> String {
        match &column.column_type {
            ColumnType::Serial => String::from("SERIAL"),
            ColumnType::String {
                max_length: Some(length),
            } => format!("VARCHAR({length})"),
            ColumnType::String { max_length: None } => String::from("TEXT"),
            ColumnType::Int { .. } => String::from("INTEGER"),
            ColumnType::BigInt { .. } => String::from("BIGINT"),
            ColumnType::Bool => String::from("BOOLEAN"),
            ColumnType::Float => String::from("REAL"),
            ColumnType::Double => String::from("DOUBLE PRECISION"),
            ColumnType::Numeric { total, decimals } => numeric_type(*total, *decimals),
            ColumnType::DateTime => String::from("TIMESTAMP"),
            ColumnType::Json => String::from("JSON"),
            ColumnType::Enum { .. } => self.enum_type_name(&column.name),
        }
    }

    fn date_shift(&self, base: &str, amount: i64, unit: IntervalUnit) -> String {
        let operator = if amount < 0 { "-" } else { "+" };
        format!(
            "({base} {operator} INTERVAL '{} {}')",
            amount.unsigned_abs(),
            unit.as_sql()
        )
    }

    fn json_array_agg(&self, argument: &str) -> String {
        format!("JSON_AGG({argument})")
    }

    fn json_object_agg(&self, key: &str, value: &str) -> String {
        format!("JSON_OBJECT_AGG({key}, {value})")
    }

    fn hash(&self, argument: &str, algorithm: HashAlgorithm) -> String {
        format!(
            "encode(sha{}(convert_to({argument}, 'UTF8')), 'hex')",
            algorithm.bits()
        )
    }

    fn upsert_clause(&self, strategy: &UpdateStrategy, ctx: &mut RenderContext<'_>) -> Result<String> {
        let target = if strategy.conflicting_columns.is_empty() {
            String::new()
        } else {
            format!(" ({})", self.quoted_columns(&strategy.conflicting_columns))
        };
        if strategy.values.is_empty() {
            return Ok(format!(" ON CONFLICT{target} DO NOTHING"));
        }
        if target.is_empty() {
            return Err(BuildError::unsupported(
                self.name(),
                "ON CONFLICT DO UPDATE without conflicting columns",
            ));
        }
        let mut assignments = Vec::with_capacity(strategy.values.len());
        for (column, value) in &strategy.values {
            let column = self.quote_identifier(column);
            let value = match value {
                Expression::Column(source) => {
                    format!("EXCLUDED.{}", self.quote_identifier(source))
                }
                other => self.expression(other, ctx)?,
            };
            assignments.push(format!("{column}={value}"));
        }
        Ok(format!(
            " ON CONFLICT{target} DO UPDATE SET {}",
            assignments.join(", ")
        ))
    }

    fn returning(&self, columns: &[String]) -> Result<(String, Returning)> {
        if columns.is_empty() {
            return Ok((String::new(), Returning::None));
        }
        Ok((
            format!(" RETURNING {}", self.quoted_columns(columns)),
            Returning::Rows(columns.to_vec()),
        ))
    }

    fn default_values(&self) -> &'static str {
        "DEFAULT VALUES"
    }

    fn current_table(&self, ctx: &RenderContext<'_>) -> Result<String> {
        match ctx.scope() {
            Scope::Procedure(procedure) if procedure.is_trigger() => {
                Ok(String::from("TG_TABLE_NAME"))
            }
            Scope::Procedure(procedure) => {
                if procedure
                    .parameters()
                    .iter()
                    .any(|param| matches!(param, ProcedureParam::CurrentTable))
                {
                    Ok(self.quote_identifier(CURRENT_TABLE_PARAM))
                } else {
                    Err(BuildError::UnknownParameter {
                        procedure: String::from(procedure.name()),
                        parameter: String::from(CURRENT_TABLE_PARAM),
                    })
                }
            }
            Scope::TriggerCall(_) | Scope::Statement => {
                Err(marker_out_of_scope(self.name(), "CURRENT_TABLE"))
            }
        }
    }

    fn current_column(&self, name: &str, ctx: &RenderContext<'_>) -> Result<String> {
        let Scope::Procedure(procedure) = ctx.scope() else {
            return Err(marker_out_of_scope(self.name(), "CURRENT_COLUMN"));
        };
        let unknown = || BuildError::UnknownParameter {
            procedure: String::from(procedure.name()),
            parameter: String::from(name),
        };
        let param = procedure.parameter(name).ok_or_else(unknown)?;
        if !procedure.is_trigger() {
            return Ok(self.quote_identifier(name));
        }
        match param {
            ProcedureParam::RowColumn(_) => {
                let column = self.quote_identifier(name);
                Ok(format!(
                    "CASE WHEN TG_OP = 'DELETE' THEN OLD.{column} ELSE NEW.{column} END"
                ))
            }
            ProcedureParam::Argument(column) => {
                let index = procedure.argument_index(name).ok_or_else(unknown)?;
                Ok(format!("TG_ARGV[{index}]::{}", self.column_type(column)))
            }
            ProcedureParam::CurrentTable => Err(unknown()),
        }
    }

    fn create_table_prelude(&self, table: &CreateTable) -> Vec<String> {
        table
            .columns()
            .iter()
            .filter_map(|column| self.create_enum_type(column))
            .collect()
    }

    fn alter_action(&self, table: &str, action: &AlterAction) -> Result<AlterClauses> {
        match action {
            AlterAction::AddColumn(column) => Ok(AlterClauses {
                before: self.create_enum_type(column).into_iter().collect(),
                clauses: vec![format!("ADD COLUMN {}", self.column_definition(column))],
                after: Vec::new(),
            }),
            AlterAction::ModifyColumn(column) => Ok(AlterClauses {
                before: self.create_enum_type(column).into_iter().collect(),
                clauses: self.modify_column(column),
                after: Vec::new(),
            }),
            AlterAction::DropColumn(column) => Ok(AlterClauses::clause(format!(
                "DROP COLUMN {}",
                self.quote_identifier(column)
            ))),
            AlterAction::AddConstraint(constraint) => {
                Ok(AlterClauses::clause(format!("ADD {}", self.constraint(constraint))))
            }
            AlterAction::DropConstraint(constraint) => match constraint.name() {
                Some(name) => Ok(AlterClauses::clause(format!(
                    "DROP CONSTRAINT {}",
                    self.quote_identifier(name)
                ))),
                None => Err(BuildError::UnnamedConstraint {
                    table: String::from(table),
                }),
            },
            AlterAction::ResetAutoIncrement => Err(BuildError::unsupported(
                self.name(),
                "resetting the auto-increment counter",
            )),
            AlterAction::AddEnumValue { column, value } => {
                if !matches!(column.column_type, ColumnType::Enum { .. }) {
                    return Err(BuildError::unsupported(
                        self.name(),
                        format!("adding an enum value to non-enum column '{}'", column.name),
                    ));
                }
                Ok(AlterClauses {
                    after: vec![format!(
                        "ALTER TYPE {} ADD VALUE IF NOT EXISTS {}",
                        self.enum_type_name(&column.name),
                        self.inline_literal(&SqlValue::Text(value.clone()))
                    )],
                    ..AlterClauses::default()
                })
            }
        }
    }

    fn create_procedure(&self, procedure: &CreateProcedure) -> Result<String> {
        let body: String = self
            .procedure_body(procedure)?
            .into_iter()
            .map(|statement| format!("{statement}; "))
            .collect();
        let name = self.quote_identifier(procedure.name());
        if procedure.is_trigger() {
            return Ok(format!(
                "CREATE OR REPLACE FUNCTION {name}() RETURNS TRIGGER AS $$ BEGIN {body}RETURN NEW; END; $$ LANGUAGE plpgsql"
            ));
        }
        let parameters: Vec<String> = procedure
            .parameters()
            .iter()
            .map(|param| match param {
                ProcedureParam::CurrentTable => {
                    format!("{} VARCHAR(64)", self.quote_identifier(CURRENT_TABLE_PARAM))
                }
                ProcedureParam::RowColumn(column) | ProcedureParam::Argument(column) => format!(
                    "{} {}",
                    self.quote_identifier(&column.name),
                    self.column_type(column)
                ),
            })
            .collect();
        let returns = match &procedure.returns {
            Some(ProcedureReturn::Type(column_type)) => {
                self.column_type(&ColumnDefinition::new("result", column_type.clone()))
            }
            Some(ProcedureReturn::Trigger) | None => String::from("void"),
        };
        Ok(format!(
            "CREATE OR REPLACE FUNCTION {name}({}) RETURNS {returns} AS $$ BEGIN {body}END; $$ LANGUAGE plpgsql",
            parameters.join(", ")
        ))
    }

    fn create_trigger(&self, trigger: &CreateTrigger) -> Result<String> {
        let mut arguments = Vec::new();
        for argument in &trigger.arguments {
            match argument {
                // row data reaches the function through NEW/OLD and TG_TABLE_NAME
                Expression::CurrentTable | Expression::CurrentColumn(_) => {}
                Expression::Value(value) => arguments.push(self.inline_literal(value)),
                other => {
                    return Err(BuildError::unsupported(
                        self.name(),
                        format!("non-literal trigger argument {other:?}"),
                    ))
                }
            }
        }
        let create = if trigger.if_not_exists {
            "CREATE OR REPLACE TRIGGER"
        } else {
            "CREATE TRIGGER"
        };
        Ok(format!(
            "{create} {} {} {} ON {} FOR EACH ROW EXECUTE PROCEDURE {}({})",
            self.quote_identifier(&trigger.name),
            trigger.timing.as_sql(),
            trigger.event.as_sql(),
            self.quote_path(&trigger.table),
            self.quote_identifier(&trigger.procedure),
            arguments.join(", ")
        ))
    }

    fn drop_statement(&self, statement: &DropStatement) -> String {
        let if_exists = if statement.if_exists { "IF EXISTS " } else { "" };
        let name = self.quote_path(&statement.name);
        match &statement.kind {
            DropKind::Table => format!("DROP TABLE {if_exists}{name}"),
            DropKind::Procedure => format!("DROP FUNCTION {if_exists}{name}"),
            DropKind::Trigger { table } => format!(
                "DROP TRIGGER {if_exists}{name} ON {}",
                self.quote_path(table)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::col;
    use crate::builder::{Filtered, Select};

    #[test]
    fn test_placeholders_are_numbered() {
        let query = Select::from("User")
            .where_eq("a", 1)
            .filter(col("b").in_list([2, 3]))
            .build(&PostgresDialect)
            .unwrap();
        assert_eq!(
            query.sql,
            r#"SELECT * FROM "User" WHERE "a" = $1 AND "b" IN ($2, $3)"#
        );
        assert_eq!(query.params.len(), 3);
    }

    #[test]
    fn test_blob_literal_uses_hex_escape() {
        assert_eq!(
            PostgresDialect.inline_literal(&SqlValue::Blob(vec![0xDE, 0xAD])),
            r"'\xdead'"
        );
    }

    #[test]
    fn test_date_shift() {
        let mut ctx = RenderContext::new();
        let past = col("modified").shift(-90, IntervalUnit::Day);
        assert_eq!(
            PostgresDialect.expression(&past, &mut ctx).unwrap(),
            r#"("modified" - INTERVAL '90 DAY')"#
        );
    }

    #[test]
    fn test_json_object_agg_and_hash() {
        let mut ctx = RenderContext::new();
        let settings = Expression::json_object_agg(col("name"), col("value"));
        let digest = col("password").hash(HashAlgorithm::Sha512);
        assert_eq!(
            PostgresDialect.expression(&settings, &mut ctx).unwrap(),
            r#"JSON_OBJECT_AGG("name", "value")"#
        );
        assert_eq!(
            PostgresDialect.expression(&digest, &mut ctx).unwrap(),
            r#"encode(sha512(convert_to("password", 'UTF8')), 'hex')"#
        );
    }

    #[test]
    fn test_enum_column_type_is_named_after_column() {
        let column = ColumnDefinition::enumeration("status", ["a", "b"]);
        assert_eq!(PostgresDialect.column_type(&column), r#""status_type""#);
    }

    #[test]
    fn test_reset_auto_increment_is_unsupported() {
        let result = PostgresDialect.alter_action("User", &AlterAction::ResetAutoIncrement);
        assert!(matches!(
            result,
            Err(BuildError::UnsupportedConstruct {
                dialect: "PostgreSQL",
                ..
            })
        ));
    }

    #[test]
    fn test_drop_constraint_requires_name() {
        let result = PostgresDialect.alter_action(
            "User",
            &AlterAction::DropConstraint(Constraint::unique(["name"])),
        );
        assert_eq!(
            result,
            Err(BuildError::UnnamedConstraint {
                table: String::from("User")
            })
        );
    }
}
