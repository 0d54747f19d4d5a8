//! Transaction naming for trace backends.
//!
//! Raw event codes are collapsed into a few semantic categories so that
//! latency dashboards group related calls: every PostgreSQL `SELECT` lands
//! under `DB:SELECT` regardless of its text, every server call under its
//! method name.

use crate::types::ParsedEvent;

/// Fallback when a server call carries no method name.
const UNKNOWN_METHOD: &str = "Unknown";

/// Semantic category of a techlog event code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A call into the DBMS (`DBPOSTGRS`, `DBMSSQL`, ...).
    Database,
    /// A server-side procedure call (`SCALL`).
    ServerCall,
    /// Anything else; named verbatim.
    Other,
}

impl EventKind {
    /// Classifies an event code.
    #[must_use]
    pub fn of(event_name: &str) -> Self {
        match event_name {
            "DBPOSTGRS" | "DBMSSQL" | "DBORACLE" | "DB2" | "DBV8DBENG" => Self::Database,
            "SCALL" => Self::ServerCall,
            _ => Self::Other,
        }
    }
}

/// Derives the transaction name for an event.
#[must_use]
pub fn transaction_name(event: &ParsedEvent) -> String {
    match EventKind::of(&event.event_name) {
        EventKind::Database => {
            let verb = event
                .sql_text
                .as_deref()
                .and_then(|sql| sql.split_whitespace().next());
            match verb {
                Some(verb) => format!("DB:{}", verb.to_uppercase()),
                None => "DB:Query".to_string(),
            }
        }
        EventKind::ServerCall => {
            let method = event
                .parameters
                .get("MName")
                .map_or(UNKNOWN_METHOD, String::as_str);
            format!("SCALL:{method}")
        }
        EventKind::Other => event.event_name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use test_case::test_case;

    fn event(name: &str) -> ParsedEvent {
        let ts = NaiveDate::from_ymd_opt(2025, 6, 5)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .expect("valid timestamp");
        ParsedEvent::new(ts, 1000, name, "3")
    }

    fn with_sql(name: &str, sql: &str) -> ParsedEvent {
        ParsedEvent {
            sql_text: Some(sql.to_string()),
            ..event(name)
        }
    }

    #[test_case("DBPOSTGRS", EventKind::Database)]
    #[test_case("DBMSSQL", EventKind::Database)]
    #[test_case("DBV8DBENG", EventKind::Database)]
    #[test_case("SCALL", EventKind::ServerCall)]
    #[test_case("CALL", EventKind::Other)]
    #[test_case("dbpostgrs", EventKind::Other ; "codes are case sensitive")]
    fn event_kind_of(name: &str, expected: EventKind) {
        assert_eq!(EventKind::of(name), expected);
    }

    #[test_case("select * from t", "DB:SELECT" ; "lowercase verb")]
    #[test_case("SELECT 1", "DB:SELECT" ; "uppercase verb")]
    #[test_case("  \n update t set a = 1", "DB:UPDATE" ; "leading whitespace")]
    #[test_case("INSERT\nINTO t VALUES (1)", "DB:INSERT" ; "verb followed by newline")]
    fn database_named_by_sql_verb(sql: &str, expected: &str) {
        assert_eq!(transaction_name(&with_sql("DBPOSTGRS", sql)), expected);
    }

    #[test]
    fn database_without_sql_is_query() {
        assert_eq!(transaction_name(&event("DBPOSTGRS")), "DB:Query");
    }

    #[test]
    fn database_with_blank_sql_is_query() {
        assert_eq!(transaction_name(&with_sql("DBPOSTGRS", "")), "DB:Query");
        assert_eq!(transaction_name(&with_sql("DBPOSTGRS", "   ")), "DB:Query");
    }

    #[test]
    fn server_call_uses_method_name() {
        let mut scall = event("SCALL");
        scall.parameters.insert("MName".into(), "Foo".into());
        assert_eq!(transaction_name(&scall), "SCALL:Foo");
    }

    #[test]
    fn server_call_without_method_is_unknown() {
        assert_eq!(transaction_name(&event("SCALL")), "SCALL:Unknown");

        let mut scall = event("SCALL");
        scall.parameters.insert("IName".into(), "IBank".into());
        assert_eq!(transaction_name(&scall), "SCALL:Unknown");
    }

    #[test]
    fn other_events_pass_through() {
        assert_eq!(transaction_name(&event("X")), "X");
        assert_eq!(transaction_name(&with_sql("EXCP", "SELECT 1")), "EXCP");
    }
}
