//! Analysis agent: turns a query result into business insights or a chart
//! recommendation.
//!
//! The data itself travels to the model as a compact summary: column names,
//! row count, timing, and the first few records. Full result sets never
//! leave the process.

use crate::agent::query::QueryResult;
use crate::providers::Provider;
use std::sync::Arc;

const INSIGHTS_SYSTEM_PROMPT: &str = "You are a business intelligence analyst. You turn raw \
query results into clear, actionable insights for management. You never invent numbers that \
are not in the data.";

const CHART_SYSTEM_PROMPT: &str = "You are a data visualization advisor. Given a query result \
summary, you recommend the most effective chart and describe it precisely enough to build.";

const SAMPLE_ROWS: usize = 3;

pub struct AnalysisAgent {
    provider: Arc<dyn Provider>,
}

impl AnalysisAgent {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Business insights for an executed query. Empty results short-circuit
    /// without a model call.
    pub async fn insights(
        &self,
        result: &QueryResult,
        original_query: &str,
    ) -> anyhow::Result<String> {
        if result.data.is_empty() {
            return Ok(
                "No data found for your query. Try adjusting your date range or criteria."
                    .to_string(),
            );
        }
        let prompt = insights_prompt(result, original_query);
        self.provider.chat(INSIGHTS_SYSTEM_PROMPT, &prompt).await
    }

    /// Textual chart recommendation for an executed query. Same empty-result
    /// short-circuit as `insights`.
    pub async fn chart_recommendation(
        &self,
        result: &QueryResult,
        original_query: &str,
    ) -> anyhow::Result<String> {
        if result.data.is_empty() {
            return Ok(
                "No data found for your query, so there is nothing to visualize. Try \
                 adjusting your date range or criteria."
                    .to_string(),
            );
        }
        let prompt = chart_prompt(result, original_query);
        self.provider.chat(CHART_SYSTEM_PROMPT, &prompt).await
    }
}

fn column_names(result: &QueryResult) -> Vec<&str> {
    result
        .data
        .first()
        .map(|row| row.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

fn sample_rows(result: &QueryResult) -> String {
    let sample: Vec<_> = result.data.iter().take(SAMPLE_ROWS).collect();
    serde_json::to_string_pretty(&sample).unwrap_or_else(|_| "[]".to_string())
}

fn insights_prompt(result: &QueryResult, original_query: &str) -> String {
    let columns = column_names(result).join(", ");
    let (from, to) = result.date_range;
    format!(
        r#"BUSINESS DATA ANALYSIS REQUEST

User asked: "{original_query}"

DATASET CONTEXT:
- {row_count} records analyzed in {execution_time:.1} seconds
- Time period: {from} to {to}
- Column Schema: {columns} (infer business context from column names)

SAMPLE DATA (first {sample_count} records):
{sample}

Please provide clear business insights that answer the user's question. Focus on:
1. Key findings that directly address their query
2. Notable trends or patterns
3. Business implications or recommendations
4. Any concerning anomalies or opportunities

Keep insights business-focused and actionable."#,
        row_count = result.row_count,
        execution_time = result.execution_time,
        from = from.format("%Y-%m-%d"),
        to = to.format("%Y-%m-%d"),
        sample_count = result.data.len().min(SAMPLE_ROWS),
        sample = sample_rows(result),
    )
}

fn chart_prompt(result: &QueryResult, original_query: &str) -> String {
    let columns = column_names(result).join(", ");
    format!(
        r#"CHART RECOMMENDATION REQUEST

User asked: "{original_query}"

DATASET CONTEXT:
- {row_count} records
- Column Schema: {columns}

SAMPLE DATA (first {sample_count} records):
{sample}

Recommend the single most effective chart for this data. Describe:
1. Chart type (bar, line, pie, scatter, table)
2. Which column goes on each axis or dimension
3. Any aggregation or sorting to apply
4. A one-line title for the chart"#,
        row_count = result.row_count,
        sample_count = result.data.len().min(SAMPLE_ROWS),
        sample = sample_rows(result),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::Row;
    use async_trait::async_trait;
    use chrono::Utc;

    struct EchoProvider;

    #[async_trait]
    impl Provider for EchoProvider {
        async fn chat(&self, _system: &str, user: &str) -> anyhow::Result<String> {
            Ok(user.to_string())
        }
    }

    fn result_with_rows(rows: Vec<Row>) -> QueryResult {
        let now = Utc::now();
        QueryResult {
            row_count: rows.len(),
            data: rows,
            metadata: serde_json::Map::new(),
            execution_time: 0.42,
            date_range: (now - chrono::Duration::days(7), now),
        }
    }

    fn revenue_row(day: &str, revenue: f64) -> Row {
        let mut row = Row::new();
        row.insert("day".to_string(), serde_json::json!(day));
        row.insert("revenue".to_string(), serde_json::json!(revenue));
        row
    }

    #[tokio::test]
    async fn empty_result_skips_the_model() {
        let agent = AnalysisAgent::new(Arc::new(EchoProvider));
        let result = result_with_rows(vec![]);
        let text = agent.insights(&result, "any trends?").await.unwrap();
        assert!(text.contains("No data found"));
    }

    #[tokio::test]
    async fn insights_prompt_carries_query_columns_and_sample() {
        let agent = AnalysisAgent::new(Arc::new(EchoProvider));
        let result = result_with_rows(vec![
            revenue_row("2025-01-01", 100.0),
            revenue_row("2025-01-02", 250.0),
        ]);
        let prompt = agent.insights(&result, "revenue trend?").await.unwrap();
        assert!(prompt.contains("\"revenue trend?\""));
        assert!(prompt.contains("day"));
        assert!(prompt.contains("revenue"));
        assert!(prompt.contains("2 records"));
        assert!(prompt.contains("2025-01-02"));
    }

    #[tokio::test]
    async fn sample_is_capped_at_three_rows() {
        let agent = AnalysisAgent::new(Arc::new(EchoProvider));
        let rows = (1..=10)
            .map(|i| revenue_row(&format!("2025-01-{i:02}"), f64::from(i)))
            .collect();
        let prompt = agent
            .chart_recommendation(&result_with_rows(rows), "chart it")
            .await
            .unwrap();
        assert!(prompt.contains("2025-01-03"));
        assert!(!prompt.contains("2025-01-04"));
    }
}
