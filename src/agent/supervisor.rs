//! Supervisor: classifies a user query and produces a routing decision.
//!
//! The classification itself is a single LLM call; everything that can go
//! wrong with it is absorbed here and downgraded to the safe raw-data route.
//! The interactive loop never sees a supervisor error.

use crate::agent::router::{self, RoutingDecision};
use crate::providers::Provider;
use std::sync::Arc;

const CLASSIFY_SYSTEM_PROMPT: &str = "You are an intelligent supervisor for a business \
intelligence system. Your job is to understand what users really want from their queries \
and route them to the right workflow.";

pub struct Supervisor {
    provider: Arc<dyn Provider>,
}

impl Supervisor {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    fn classification_prompt(user_query: &str) -> String {
        format!(
            r#"TASK: Classify user intent for business intelligence query routing

USER QUERY: "{user_query}"

CLASSIFICATION OPTIONS:
1. DIRECT_DATA: Simple data retrieval (count, show, list, get specific data)
   - Examples: "count transactions", "show revenue today", "list top users"
   - Route: Query Agent only

2. ANALYSIS_REQUEST: User wants insights or analysis
   - Examples: "analyze user behavior", "what trends do you see", "insights about revenue"
   - Route: Query Agent -> Analysis Agent

3. VISUALIZATION_REQUEST: Explicitly asks for charts/graphs
   - Examples: "show revenue in bar chart", "create graph of trends", "visualize data"
   - Route: Query Agent -> Visualization Agent

4. AMBIGUOUS: Unclear intent, needs clarification
   - Examples: "what's interesting", "tell me about our data", "any insights"
   - Route: Ask user for clarification with smart recommendations

INSTRUCTIONS:
1. Analyze the query for explicit keywords and intent
2. Consider what the user likely wants as output
3. Return ONLY the classification (DIRECT_DATA, ANALYSIS_REQUEST, VISUALIZATION_REQUEST, or AMBIGUOUS)
4. No explanations, just the classification

Classification:"#
        )
    }

    /// Classifies the query and returns the workflow decision. Infallible by
    /// contract: a failed classification call yields the raw-data fallback
    /// with the error recorded on the decision.
    pub async fn route(&self, user_query: &str) -> RoutingDecision {
        let prompt = Self::classification_prompt(user_query);
        match self.provider.chat(CLASSIFY_SYSTEM_PROMPT, &prompt).await {
            Ok(answer) => {
                let decision = router::decide(&answer, user_query);
                tracing::info!(
                    classification = %decision.classification,
                    route = %decision.route,
                    "classified query"
                );
                decision
            }
            Err(err) => {
                tracing::error!(error = %err, "classification call failed");
                router::decide_from_error(err, user_query)
            }
        }
    }
}
