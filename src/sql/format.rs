//! SQL output formatting.

use std::fmt::{self, Display, Write};

use super::parser::{Identifier, InsertHeader, QualifiedName};

/// Quote an identifier with double quotes, doubling embedded quotes.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for c in name.chars() {
        if c == '"' {
            out.push_str("\"\"");
        } else {
            out.push(c);
        }
    }
    out.push('"');
    out
}

impl Display for Identifier<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            f.write_str(&quote_identifier(&self.name))
        } else {
            f.write_str(&self.name)
        }
    }
}

impl Display for QualifiedName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{schema}.")?;
        }
        write!(f, "{}", self.name)
    }
}

/// Trait for types that can be formatted as SQL text.
pub trait FormatSql {
    /// Format this value as a SQL string.
    fn format_sql(&self) -> String;
}

impl FormatSql for InsertHeader<'_> {
    fn format_sql(&self) -> String {
        let mut sql = String::new();
        let _ = write!(sql, "INSERT INTO {} (", self.table);
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            let _ = write!(sql, "{col}");
        }
        sql.push_str(") VALUES");
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("operator_id"), "\"operator_id\"");
        assert_eq!(quote_identifier("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn test_format_header_quoted() {
        let header = InsertHeader {
            table: QualifiedName {
                schema: Some(Identifier::quoted("public")),
                name: Identifier::quoted("organizations"),
            },
            columns: vec![Identifier::quoted("id"), Identifier::quoted("created_by")],
            column_spans: Vec::new(),
            span: 0..0,
        };
        assert_eq!(
            header.format_sql(),
            r#"INSERT INTO "public"."organizations" ("id", "created_by") VALUES"#
        );
    }

    #[test]
    fn test_format_header_bare() {
        let header = InsertHeader {
            table: QualifiedName {
                schema: None,
                name: Identifier::bare("users"),
            },
            columns: vec![Identifier::bare("id"), Identifier::bare("name")],
            column_spans: Vec::new(),
            span: 0..0,
        };
        assert_eq!(header.format_sql(), "INSERT INTO users (id, name) VALUES");
    }
}
