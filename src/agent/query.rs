//! Query agent: natural language to SQL, safety validation, and execution.
//!
//! SQL comes out of the model, so nothing it produces is trusted: every
//! statement passes the date-safety gate before it reaches the warehouse.
//! The gate is deliberately conservative; a query it cannot recognize as
//! date-bounded is rejected rather than run.

use crate::providers::Provider;
use crate::warehouse::{Row, Warehouse};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// Result of one warehouse execution, in the shape downstream agents consume.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub data: Vec<Row>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub execution_time: f64,
    pub row_count: usize,
    pub date_range: (DateTime<Utc>, DateTime<Utc>),
}

/// Why the date-safety gate rejected a statement. Each variant carries the
/// fix to show the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateSafetyError {
    #[error("Query lacks date filtering (add 'WHERE date >= DATE_SUB(CURRENT_DATE(), \
             INTERVAL 7 DAY)' to limit data scan)")]
    MissingDateFilter,
    #[error("Date range too large: {bound_days} days (reduce date range to {max_days} days or less)")]
    RangeTooLarge { bound_days: i64, max_days: i64 },
}

fn date_filter_patterns() -> &'static [Regex; 4] {
    static PATTERNS: OnceLock<[Regex; 4]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(
                r"date\s*>=\s*date_sub\s*\(\s*current_date\s*\(\s*\)\s*,\s*interval\s+(\d+)\s+day\s*\)",
            )
            .expect("static regex"),
            Regex::new(r"date\s*>=\s*current_date\s*\(\s*\)\s*-\s*(\d+)").expect("static regex"),
            Regex::new(r"date\s*between.*and.*current_date").expect("static regex"),
            Regex::new(r"where.*date.*>=.*date_sub.*interval\s+(\d+)\s+day").expect("static regex"),
        ]
    })
}

const RELATIVE_TERMS: [(&str, i64); 5] = [
    ("last week", 7),
    ("past week", 7),
    ("last 7 days", 7),
    ("last month", 30),
    ("past month", 30),
];

/// Checks that the SQL is bounded to at most `max_days` of data.
///
/// Recognition is pattern-based over a lowercased copy of the statement:
/// DATE_SUB intervals, current-date arithmetic, BETWEEN..CURRENT_DATE, and a
/// short list of relative-period phrases. Absent any recognizable bound the
/// query is unsafe.
pub fn validate_date_safety(sql: &str, max_days: i64) -> Result<(), DateSafetyError> {
    let query = sql.to_lowercase();

    let mut has_date_filter = false;
    let mut bound_days = 0i64;

    for pattern in date_filter_patterns() {
        if let Some(captures) = pattern.captures(&query) {
            has_date_filter = true;
            if let Some(days) = captures.get(1) {
                if let Ok(days) = days.as_str().parse::<i64>() {
                    bound_days = bound_days.max(days);
                }
            }
        }
    }

    for (term, days) in RELATIVE_TERMS {
        if query.contains(term) {
            has_date_filter = true;
            bound_days = bound_days.max(days);
        }
    }

    if !has_date_filter {
        return Err(DateSafetyError::MissingDateFilter);
    }

    if bound_days > max_days {
        return Err(DateSafetyError::RangeTooLarge {
            bound_days,
            max_days,
        });
    }

    Ok(())
}

/// Strips a markdown code fence from a model-produced SQL answer.
pub fn strip_sql_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop a language tag on the opening fence ("sql", "SQL", ...).
    let inner = match inner.split_once('\n') {
        Some((first, rest)) if first.trim().eq_ignore_ascii_case("sql") || first.trim().is_empty() => rest,
        _ => inner,
    };
    inner.trim().to_string()
}

pub struct QueryAgent {
    provider: Arc<dyn Provider>,
    warehouse: Arc<dyn Warehouse>,
    table: String,
    max_date_range_days: i64,
}

const SQL_SYSTEM_PROMPT: &str = "You are a senior data engineer generating safe, efficient \
BigQuery SQL. You return only SQL, never explanations.";

impl QueryAgent {
    pub fn new(
        provider: Arc<dyn Provider>,
        warehouse: Arc<dyn Warehouse>,
        table: &str,
        max_date_range_days: i64,
    ) -> Self {
        Self {
            provider,
            warehouse,
            table: table.to_string(),
            max_date_range_days,
        }
    }

    fn sql_prompt(&self, natural_language_query: &str) -> String {
        let table = &self.table;
        let max_days = self.max_date_range_days;
        format!(
            r#"TASK: Convert natural language to safe BigQuery SQL

USER REQUEST: "{natural_language_query}"
TARGET TABLE: `{table}`

SAFETY REQUIREMENTS:
1. MANDATORY: Add date filtering to limit data scan to <={max_days} days
2. MANDATORY: Include ORDER BY clause for consistent results
3. MANDATORY: Add LIMIT clause (<=1000 rows)
4. Use proper BigQuery syntax and functions
5. Prevent SQL injection - use only safe column references

INSTRUCTIONS:
1. Generate SQL that answers the user's question against the target table
2. Always include date filtering on the table's date column
3. Return only the SQL query, no explanations

EXAMPLE PATTERN:
SELECT [columns]
FROM `{table}`
WHERE [date_column] >= DATE_SUB(CURRENT_DATE(), INTERVAL [days] DAY)
[GROUP BY if needed]
ORDER BY [appropriate_column]
LIMIT [appropriate_limit]

Generate the SQL query now:"#
        )
    }

    /// One model call: natural language in, fence-stripped SQL out. The
    /// result is unvalidated; `run` applies the safety gate.
    pub async fn generate_sql(&self, natural_language_query: &str) -> anyhow::Result<String> {
        let prompt = self.sql_prompt(natural_language_query);
        let answer = self.provider.chat(SQL_SYSTEM_PROMPT, &prompt).await?;
        let sql = strip_sql_fences(&answer);
        if sql.is_empty() {
            anyhow::bail!("model returned an empty SQL statement");
        }
        Ok(sql)
    }

    /// Full query path: generate SQL, validate it, execute it, package the
    /// result. A safety rejection is an error carrying the suggested fix so
    /// the user sees how to rephrase.
    pub async fn run(&self, natural_language_query: &str) -> anyhow::Result<QueryResult> {
        let sql = self.generate_sql(natural_language_query).await?;
        tracing::debug!(sql, "generated SQL");

        validate_date_safety(&sql, self.max_date_range_days)?;

        let started = Instant::now();
        let data = self.warehouse.execute(&sql).await?;
        let execution_time = started.elapsed().as_secs_f64();

        let now = Utc::now();
        let row_count = data.len();
        let mut metadata = serde_json::Map::new();
        metadata.insert("sql".to_string(), serde_json::Value::String(sql));
        metadata.insert(
            "table".to_string(),
            serde_json::Value::String(self.table.clone()),
        );

        tracing::info!(row_count, execution_time, "query executed");

        Ok(QueryResult {
            data,
            metadata,
            execution_time,
            row_count,
            date_range: (now - Duration::days(self.max_date_range_days), now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct CannedProvider(&'static str);

    #[async_trait]
    impl Provider for CannedProvider {
        async fn chat(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct EchoWarehouse;

    #[async_trait]
    impl Warehouse for EchoWarehouse {
        async fn execute(&self, sql: &str) -> anyhow::Result<Vec<Row>> {
            let mut row = Row::new();
            row.insert("sql".to_string(), serde_json::json!(sql));
            Ok(vec![row])
        }
    }

    #[test]
    fn date_sub_interval_within_limit_is_safe() {
        let result = validate_date_safety(
            "SELECT * FROM t WHERE date >= DATE_SUB(CURRENT_DATE(), INTERVAL 7 DAY) \
             ORDER BY date LIMIT 100",
            30,
        );
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn interval_beyond_limit_is_rejected() {
        let err = validate_date_safety(
            "SELECT * FROM t WHERE date >= DATE_SUB(CURRENT_DATE(), INTERVAL 90 DAY)",
            30,
        )
        .unwrap_err();
        assert_eq!(
            err,
            DateSafetyError::RangeTooLarge {
                bound_days: 90,
                max_days: 30
            }
        );
        assert!(err.to_string().contains("90 days"));
        assert!(err.to_string().contains("30 days"));
    }

    #[test]
    fn missing_date_filter_is_rejected_with_fix() {
        let err = validate_date_safety("SELECT COUNT(*) FROM t", 30).unwrap_err();
        assert_eq!(err, DateSafetyError::MissingDateFilter);
        assert!(err.to_string().contains("DATE_SUB"));
    }

    #[test]
    fn relative_terms_bound_the_range() {
        assert!(validate_date_safety("-- last week\nSELECT 1", 30).is_ok());
        assert!(validate_date_safety("-- past month\nSELECT 1", 30).is_ok());
        // "past month" implies 30 days, which exceeds a 7-day limit.
        assert!(validate_date_safety("-- past month\nSELECT 1", 7).is_err());
    }

    #[test]
    fn fences_are_stripped() {
        assert_eq!(strip_sql_fences("```sql\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_sql_fences("```\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_sql_fences("  SELECT 1  "), "SELECT 1");
    }

    #[tokio::test]
    async fn run_executes_safe_sql_and_packages_result() {
        let agent = QueryAgent::new(
            Arc::new(CannedProvider(
                "```sql\nSELECT day FROM `p.d.t` WHERE date >= \
                 DATE_SUB(CURRENT_DATE(), INTERVAL 7 DAY) ORDER BY day LIMIT 10\n```",
            )),
            Arc::new(EchoWarehouse),
            "p.d.t",
            30,
        );
        let result = agent.run("show days").await.unwrap();
        assert_eq!(result.row_count, 1);
        assert_eq!(result.data.len(), 1);
        let sql = result.metadata["sql"].as_str().unwrap();
        assert!(sql.starts_with("SELECT day"));
        assert!(!sql.contains("```"));
    }

    #[tokio::test]
    async fn run_refuses_unbounded_sql() {
        let agent = QueryAgent::new(
            Arc::new(CannedProvider("SELECT * FROM `p.d.t`")),
            Arc::new(EchoWarehouse),
            "p.d.t",
            30,
        );
        let err = agent.run("show everything").await.unwrap_err();
        assert!(err.to_string().contains("date filtering"));
    }
}
